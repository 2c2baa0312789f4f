//! SignalBar — one trading day of price tagged with a position intent.

use super::side::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single trading day: closing price plus the signal the strategy (or an
/// external heuristic) assigned to it.
///
/// The simulator consumes these in strictly ascending date order and does not
/// care how the signal was derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBar {
    pub date: NaiveDate,
    pub price: f64,
    pub signal: Side,
}

impl SignalBar {
    pub fn new(date: NaiveDate, price: f64, signal: Side) -> Self {
        Self {
            date,
            price,
            signal,
        }
    }

    /// A bar is usable when its price is a finite positive number.
    ///
    /// Unusable bars are skipped by the simulator (no snapshot emitted),
    /// never treated as an error.
    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn usable_bar() {
        assert!(SignalBar::new(d(2), 100.0, Side::Flat).is_usable());
    }

    #[test]
    fn zero_price_unusable() {
        assert!(!SignalBar::new(d(2), 0.0, Side::Long).is_usable());
    }

    #[test]
    fn negative_price_unusable() {
        assert!(!SignalBar::new(d(2), -5.0, Side::Long).is_usable());
    }

    #[test]
    fn nan_price_unusable() {
        assert!(!SignalBar::new(d(2), f64::NAN, Side::Long).is_usable());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = SignalBar::new(d(3), 101.5, Side::Short);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: SignalBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
