//! Chart series over a filtered view.
//!
//! Per boat: a channel against time, and two channels paired sample by
//! sample with an ordinary least-squares trendline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ChannelValue;
use crate::services::filter::TrackView;

/// One point of a channel-over-time line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One point of an X/Y scatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; absent when every y is the same
    pub r_squared: Option<f64>,
}

fn numeric(value: Option<&ChannelValue>) -> Option<f64> {
    value.and_then(ChannelValue::as_f64)
}

/// Numeric values of `channel` against time, in sample order.
pub fn time_series(track: &TrackView, channel: &str) -> Vec<TimePoint> {
    track
        .samples
        .iter()
        .filter_map(|s| {
            Some(TimePoint {
                timestamp: s.timestamp,
                value: numeric(s.channels.get(channel))?,
            })
        })
        .collect()
}

/// Samples carrying numeric values for both `x` and `y`.
pub fn paired_points(track: &TrackView, x: &str, y: &str) -> Vec<XyPoint> {
    track
        .samples
        .iter()
        .filter_map(|s| {
            Some(XyPoint {
                x: numeric(s.channels.get(x))?,
                y: numeric(s.channels.get(y))?,
            })
        })
        .collect()
}

/// Ordinary least-squares fit. `None` with fewer than two points or when
/// every x is the same (vertical line).
pub fn least_squares(points: &[XyPoint]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.x).sum();
    let sum_y: f64 = points.iter().map(|p| p.y).sum();
    let sum_xy: f64 = points.iter().map(|p| p.x * p.y).sum();
    let sum_xx: f64 = points.iter().map(|p| p.x * p.x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|p| (p.y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.y - (slope * p.x + intercept)).powi(2))
        .sum();
    let r_squared = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{t0, track};
    use crate::models::Dataset;
    use crate::services::filter::{filter, FilterCriteria};
    use chrono::Duration;

    const SPEED: &str = "BOAT_SPEED_km_h_1";
    const TWS: &str = "TWS_SGP_km_h_1";

    /// Alpha, 6 samples: speed = 2 * tws + 1, speed missing on the third.
    fn dataset() -> Dataset {
        let mut alpha = track("Alpha", 0, 6, 10);
        for (i, s) in alpha.samples.iter_mut().enumerate() {
            let tws = i as f64;
            s.channels.insert(TWS.to_string(), ChannelValue::Number(tws));
            if i != 2 {
                s.channels
                    .insert(SPEED.to_string(), ChannelValue::Number(2.0 * tws + 1.0));
            }
        }
        Dataset::new(
            vec![alpha],
            vec!["AWA_SGP_deg".to_string(), SPEED.to_string(), TWS.to_string()],
        )
    }

    #[test]
    fn test_time_series_skips_missing_values() {
        let ds = dataset();
        let outcome = filter(&ds, &FilterCriteria::everything(&ds).unwrap());
        let series = time_series(outcome.view.track("Alpha").unwrap(), SPEED);
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], TimePoint { timestamp: t0(), value: 1.0 });
        assert_eq!(series[2].timestamp, t0() + Duration::seconds(30));
    }

    #[test]
    fn test_time_series_follows_the_filter() {
        let ds = dataset();
        let mut criteria = FilterCriteria::everything(&ds).unwrap();
        criteria.time_range = (t0() + Duration::seconds(30), t0() + Duration::seconds(50));
        let outcome = filter(&ds, &criteria);
        let series = time_series(outcome.view.track("Alpha").unwrap(), TWS);
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_paired_points_need_both_channels() {
        let ds = dataset();
        let outcome = filter(&ds, &FilterCriteria::everything(&ds).unwrap());
        let points = paired_points(outcome.view.track("Alpha").unwrap(), TWS, SPEED);
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| p.y == 2.0 * p.x + 1.0));
    }

    #[test]
    fn test_least_squares_exact_line() {
        let ds = dataset();
        let outcome = filter(&ds, &FilterCriteria::everything(&ds).unwrap());
        let points = paired_points(outcome.view.track("Alpha").unwrap(), TWS, SPEED);
        let fit = least_squares(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_least_squares_noisy() {
        let points = [
            XyPoint { x: 1.0, y: 1.0 },
            XyPoint { x: 2.0, y: 3.0 },
            XyPoint { x: 3.0, y: 2.0 },
            XyPoint { x: 4.0, y: 4.0 },
        ];
        let fit = least_squares(&points).unwrap();
        // slope = (4*29 - 10*10) / (4*30 - 100) = 0.8, intercept = (10 - 8) / 4
        assert!((fit.slope - 0.8).abs() < 1e-12);
        assert!((fit.intercept - 0.5).abs() < 1e-12);
        assert!((fit.r_squared.unwrap() - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_least_squares_degenerate() {
        assert_eq!(least_squares(&[]), None);
        assert_eq!(least_squares(&[XyPoint { x: 1.0, y: 2.0 }]), None);
        let vertical = [XyPoint { x: 3.0, y: 1.0 }, XyPoint { x: 3.0, y: 5.0 }];
        assert_eq!(least_squares(&vertical), None);
        let flat = [XyPoint { x: 1.0, y: 5.0 }, XyPoint { x: 3.0, y: 5.0 }];
        let fit = least_squares(&flat).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 5.0);
        assert_eq!(fit.r_squared, None);
    }
}
