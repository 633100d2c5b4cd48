use async_trait::async_trait;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{KeepAliveConfig, SchedulerMode};
use crate::error::PingError;

/// Outbound liveness probe.
#[async_trait]
pub trait Pinger: Send + Sync + 'static {
    async fn ping(&self) -> Result<(), PingError>;
}

pub struct HttpPinger {
    client: reqwest::Client,
    target_url: String,
}

impl HttpPinger {
    pub fn new(target_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, target_url })
    }
}

#[async_trait]
impl Pinger for HttpPinger {
    async fn ping(&self) -> Result<(), PingError> {
        let response = self
            .client
            .get(&self.target_url)
            .send()
            .await
            .map_err(|e| PingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PingError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Strategy interface for the keep-alive schedule. Implementations fire the
/// first ping immediately, then once per interval, one attempt at a time.
pub trait PingScheduler: Send {
    /// Signal the schedule to stop. Never blocks on in-flight work.
    fn shutdown(&self);
}

/// Repeating tokio task driven by `tokio::time::interval`.
pub struct TimerScheduler {
    shutdown_tx: watch::Sender<bool>,
}

impl TimerScheduler {
    pub fn start(pinger: Arc<dyn Pinger>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_ping(pinger.as_ref()).await,
                    _ = shutdown_rx.changed() => {
                        info!("Keep-alive timer stopped");
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx }
    }
}

impl PingScheduler for TimerScheduler {
    fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Long-lived background thread waiting on the interval between pings; the
/// wait is interrupted by the shutdown channel.
pub struct ThreadLoopScheduler {
    shutdown_tx: mpsc::Sender<()>,
}

impl ThreadLoopScheduler {
    pub fn start(pinger: Arc<dyn Pinger>, period: Duration) -> anyhow::Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new().name("keepalive".to_string()).spawn(move || {
            loop {
                runtime.block_on(run_ping(pinger.as_ref()));

                match shutdown_rx.recv_timeout(period) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                        info!("Keep-alive loop stopped");
                        break;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
            }
        })?;

        Ok(Self { shutdown_tx })
    }
}

impl PingScheduler for ThreadLoopScheduler {
    fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// Failures are logged and never stop the schedule.
async fn run_ping(pinger: &dyn Pinger) {
    match pinger.ping().await {
        Ok(()) => debug!("Keep-alive ping succeeded"),
        Err(e) => warn!("Keep-alive ping failed: {}", e),
    }
}

/// Build and start the scheduler selected by configuration.
pub fn start(config: &KeepAliveConfig) -> anyhow::Result<Option<Box<dyn PingScheduler>>> {
    if !config.enabled {
        info!("Keep-alive disabled");
        return Ok(None);
    }
    anyhow::ensure!(
        config.interval_minutes > 0,
        "keep-alive interval must be at least one minute"
    );

    let period = Duration::from_secs(config.interval_minutes * 60);
    let pinger = Arc::new(HttpPinger::new(
        config.target_url.clone(),
        Duration::from_secs(config.ping_timeout_seconds),
    )?);

    info!(
        "Starting keep-alive ({:?}): {} every {} minutes",
        config.mode, config.target_url, config.interval_minutes
    );

    let scheduler: Box<dyn PingScheduler> = match config.mode {
        SchedulerMode::Timer => Box::new(TimerScheduler::start(pinger, period)),
        SchedulerMode::ThreadLoop => Box::new(ThreadLoopScheduler::start(pinger, period)?),
    };
    Ok(Some(scheduler))
}
