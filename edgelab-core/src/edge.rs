//! Edge standardization — turning a price forecast into a dimensionless score.
//!
//! For each day the forecast log-return is divided by the forecast standard
//! deviation over the horizon: `z = ln(forecast / spot) / (sigma * sqrt(h))`.
//! Days where the scale is non-finite or non-positive cannot be standardized
//! and are excluded rather than reported as errors.
//!
//! The builder is a pure function of its inputs: the same rows always produce
//! the same series, so any consumer may rebuild or re-slice it at will.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One aligned input row: spot price plus the forecast for the same horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub spot: f64,
    /// Forecast expected price at the end of the horizon.
    pub forecast_price: f64,
    /// Forecast daily volatility (standard deviation of daily log-returns).
    pub sigma: f64,
}

/// A single standardized edge observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePoint {
    pub date: NaiveDate,
    pub z: f64,
}

/// Date-sorted standardized edge series.
///
/// Backed by a plain sorted vector; date lookup is binary search. All hot
/// loops address it by index range, never by date-keyed map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeSeries {
    points: Vec<EdgePoint>,
}

impl EdgeSeries {
    /// Build the series from aligned forecast rows and a horizon in trading
    /// days.
    ///
    /// Rows are excluded (not errors) when:
    /// - spot or forecast price is not a finite positive number, or
    /// - the scale `sigma * sqrt(horizon)` is non-finite or <= 0.
    ///
    /// Input rows must already be in ascending date order; out-of-order or
    /// duplicate-date rows are dropped to preserve the ordering invariant.
    pub fn build(rows: &[ForecastRow], horizon_days: u32) -> Self {
        let sqrt_h = f64::from(horizon_days).sqrt();
        let mut points: Vec<EdgePoint> = Vec::with_capacity(rows.len());

        for row in rows {
            if let Some(last) = points.last() {
                if row.date <= last.date {
                    continue;
                }
            }
            if !(row.spot.is_finite() && row.spot > 0.0)
                || !(row.forecast_price.is_finite() && row.forecast_price > 0.0)
            {
                continue;
            }
            let scale = row.sigma * sqrt_h;
            if !scale.is_finite() || scale <= 0.0 {
                continue;
            }
            let edge = (row.forecast_price / row.spot).ln();
            points.push(EdgePoint {
                date: row.date,
                z: edge / scale,
            });
        }

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[EdgePoint] {
        &self.points
    }

    /// Index of the point at `date`, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    /// Borrowed view over `[start, end)`, clamped to the series bounds.
    ///
    /// This is the copy-free slice handed to each fold evaluation: the
    /// backing array is never mutated, so views may be read concurrently.
    pub fn window(&self, start: usize, end: usize) -> &[EdgePoint] {
        let end = end.min(self.points.len());
        let start = start.min(end);
        &self.points[start..end]
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(day: u32, spot: f64, forecast: f64, sigma: f64) -> ForecastRow {
        ForecastRow {
            date: d(day),
            spot,
            forecast_price: forecast,
            sigma,
        }
    }

    #[test]
    fn standardizes_log_return() {
        // spot 100, forecast 105, sigma 0.01, horizon 16 → scale 0.04
        let series = EdgeSeries::build(&[row(2, 100.0, 105.0, 0.01)], 16);
        assert_eq!(series.len(), 1);
        let expected = (105.0_f64 / 100.0).ln() / 0.04;
        assert!((series.points()[0].z - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_sigma_excluded() {
        let series = EdgeSeries::build(
            &[row(2, 100.0, 105.0, 0.0), row(3, 100.0, 105.0, 0.01)],
            16,
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].date, d(3));
    }

    #[test]
    fn negative_sigma_excluded() {
        let series = EdgeSeries::build(&[row(2, 100.0, 105.0, -0.5)], 16);
        assert!(series.is_empty());
    }

    #[test]
    fn nan_inputs_excluded() {
        let series = EdgeSeries::build(
            &[
                row(2, f64::NAN, 105.0, 0.01),
                row(3, 100.0, f64::NAN, 0.01),
                row(4, 100.0, 105.0, f64::NAN),
            ],
            16,
        );
        assert!(series.is_empty());
    }

    #[test]
    fn non_positive_prices_excluded() {
        let series = EdgeSeries::build(
            &[row(2, 0.0, 105.0, 0.01), row(3, 100.0, -1.0, 0.01)],
            16,
        );
        assert!(series.is_empty());
    }

    #[test]
    fn duplicate_dates_dropped() {
        let series = EdgeSeries::build(
            &[
                row(2, 100.0, 105.0, 0.01),
                row(2, 100.0, 101.0, 0.01),
                row(3, 100.0, 102.0, 0.01),
            ],
            16,
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, d(2));
        assert_eq!(series.points()[1].date, d(3));
    }

    #[test]
    fn rebuild_is_identical() {
        let rows: Vec<ForecastRow> = (2..20)
            .map(|i| row(i, 100.0 + i as f64, 101.0 + i as f64, 0.01))
            .collect();
        let a = EdgeSeries::build(&rows, 16);
        let b = EdgeSeries::build(&rows, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn index_of_binary_search() {
        let rows: Vec<ForecastRow> = (2..10).map(|i| row(i, 100.0, 101.0, 0.01)).collect();
        let series = EdgeSeries::build(&rows, 16);
        assert_eq!(series.index_of(d(5)), Some(3));
        assert_eq!(series.index_of(d(25)), None);
    }

    #[test]
    fn window_clamps_bounds() {
        let rows: Vec<ForecastRow> = (2..10).map(|i| row(i, 100.0, 101.0, 0.01)).collect();
        let series = EdgeSeries::build(&rows, 16);
        assert_eq!(series.window(2, 100).len(), 6);
        assert_eq!(series.window(100, 200).len(), 0);
    }
}
