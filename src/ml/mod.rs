pub mod classifier;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scaler;

pub use classifier::CategoryClassifier;
pub use features::ValidatedSeries;
pub use model::{LstmForecaster, SequenceModel};
pub use pipeline::{ForecastPipeline, ForecastResult};
pub use scaler::FeatureScaler;
