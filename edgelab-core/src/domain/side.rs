//! Side — the closed three-state position tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position intent for a single trading day.
///
/// There is deliberately no fourth state: "partially open", "pending" and
/// similar intermediates do not exist at daily resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Flat,
    Long,
    Short,
}

impl Side {
    /// Direction multiplier: +1 for long, -1 for short, 0 for flat.
    pub fn signum(&self) -> f64 {
        match self {
            Side::Flat => 0.0,
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Side::Flat)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Flat => write!(f, "flat"),
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signum_values() {
        assert_eq!(Side::Long.signum(), 1.0);
        assert_eq!(Side::Short.signum(), -1.0);
        assert_eq!(Side::Flat.signum(), 0.0);
    }

    #[test]
    fn is_open() {
        assert!(Side::Long.is_open());
        assert!(Side::Short.is_open());
        assert!(!Side::Flat.is_open());
    }

    #[test]
    fn side_serialization_roundtrip() {
        for side in [Side::Flat, Side::Long, Side::Short] {
            let json = serde_json::to_string(&side).unwrap();
            let deser: Side = serde_json::from_str(&json).unwrap();
            assert_eq!(side, deser);
        }
    }
}
