use chrono::{Datelike, Duration, Local, NaiveDate};
use nalgebra::DMatrix;

use crate::error::ServiceError;

pub const SEQ_LEN: usize = 30;
pub const HORIZON: usize = 7;
pub const FEATURE_COLS: usize = 3;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Daily series with one date per observation, checked and ready for
/// feature construction. Validation happens entirely here, before any
/// scaler or model is touched.
#[derive(Debug, Clone)]
pub struct ValidatedSeries {
    pub values: Vec<f64>,
    pub dates: Vec<NaiveDate>,
}

impl ValidatedSeries {
    pub fn new(series: Vec<f64>, dates: Option<Vec<String>>) -> Result<Self, ServiceError> {
        if series.len() < SEQ_LEN {
            return Err(ServiceError::Validation(format!(
                "'series' must contain at least {} values, got {}",
                SEQ_LEN,
                series.len()
            )));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ServiceError::Validation(
                "'series' values must be finite numbers".to_string(),
            ));
        }

        let dates = match dates {
            Some(raw) => {
                if raw.len() != series.len() {
                    return Err(ServiceError::Validation(
                        "if provided, 'dates' must match the length of 'series'".to_string(),
                    ));
                }
                raw.iter()
                    .map(|s| {
                        NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| {
                            ServiceError::Validation(format!(
                                "invalid date '{}', expected {}",
                                s, DATE_FORMAT
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => default_dates(series.len()),
        };

        Ok(Self {
            values: series,
            dates,
        })
    }

    /// Feature matrix with one row per time step and columns, in order:
    /// log_amt, dow, is_weekend.
    pub fn feature_frame(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.values.len(), FEATURE_COLS, |row, col| match col {
            0 => self.values[row].ln_1p(),
            1 => dow(self.dates[row]) as f64,
            _ => {
                if is_weekend(self.dates[row]) {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }
}

/// Consecutive calendar days ending today, oldest first.
pub fn default_dates(len: usize) -> Vec<NaiveDate> {
    let end = Local::now().date_naive();
    (0..len)
        .rev()
        .map(|back| end - Duration::days(back as i64))
        .collect()
}

// Monday = 0, matching the encoding the scaler and model were trained on.
fn dow(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn is_weekend(date: NaiveDate) -> bool {
    dow(date) >= 5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_of(len: usize) -> Vec<f64> {
        (0..len).map(|i| 10.0 + i as f64).collect()
    }

    #[test]
    fn rejects_series_shorter_than_window() {
        let err = ValidatedSeries::new(series_of(29), None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn accepts_series_of_window_length() {
        let validated = ValidatedSeries::new(series_of(30), None).unwrap();
        assert_eq!(validated.values.len(), 30);
        assert_eq!(validated.dates.len(), 30);
    }

    #[test]
    fn rejects_dates_length_mismatch() {
        let dates: Vec<String> = (1..=29).map(|d| format!("2025-01-{:02}", d)).collect();
        let err = ValidatedSeries::new(series_of(30), Some(dates)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_unparseable_date() {
        let mut dates: Vec<String> = (1..=30).map(|d| format!("2025-01-{:02}", d)).collect();
        dates[4] = "01/05/2025".to_string();
        let err = ValidatedSeries::new(series_of(30), Some(dates)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut series = series_of(30);
        series[7] = f64::NAN;
        let err = ValidatedSeries::new(series, None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn default_dates_end_today_oldest_first() {
        let dates = default_dates(30);
        let today = Local::now().date_naive();

        assert_eq!(dates.len(), 30);
        assert_eq!(*dates.last().unwrap(), today);
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn feature_frame_columns_match_definition() {
        let dates: Vec<String> = (1..=30).map(|d| format!("2025-06-{:02}", d)).collect();
        let validated = ValidatedSeries::new(series_of(30), Some(dates)).unwrap();
        let frame = validated.feature_frame();

        assert_eq!(frame.nrows(), 30);
        assert_eq!(frame.ncols(), FEATURE_COLS);

        // 2025-06-01 is a Sunday: dow 6, weekend
        assert!((frame[(0, 0)] - 10.0f64.ln_1p()).abs() < 1e-12);
        assert_eq!(frame[(0, 1)], 6.0);
        assert_eq!(frame[(0, 2)], 1.0);

        // 2025-06-02 is a Monday: dow 0, weekday
        assert_eq!(frame[(1, 1)], 0.0);
        assert_eq!(frame[(1, 2)], 0.0);
    }

    #[test]
    fn log_transform_round_trips() {
        for value in [0.0f64, 0.5, 1.0, 42.0, 1_000_000.0] {
            let round_tripped = value.ln_1p().exp_m1();
            assert!((round_tripped - value).abs() < 1e-9 * value.max(1.0));
        }
    }
}
