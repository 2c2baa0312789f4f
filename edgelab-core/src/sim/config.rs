//! SimConfig — cost and risk parameters for one simulation run.

use crate::domain::Side;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable configuration for a single margin-account simulation.
///
/// All rates are fractions per day (or per trade for the spread); `spread_bps`
/// is in basis points of price. The zero-cost configuration (`spread_bps = 0`,
/// zero swap and FX rates) is a regression contract: while flat, equity must
/// be preserved exactly, and entries/exits happen at the market price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_equity: f64,
    pub leverage: f64,
    /// Daily conversion charge on notional when the instrument currency
    /// differs from the account currency. Zero is the same-currency case.
    pub fx_fee_rate: f64,
    pub daily_long_swap_rate: f64,
    pub daily_short_swap_rate: f64,
    /// Full bid/ask spread in basis points; half is charged on entry.
    pub spread_bps: f64,
    /// Margin level below which a margin-call event is recorded.
    pub margin_call_level: f64,
    /// Margin level below which the position is force-liquidated.
    pub stop_out_level: f64,
    /// Fraction of equity committed as margin when opening a position.
    pub position_fraction: f64,
}

/// Configuration rejected before simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial equity must be a positive finite number, got {0}")]
    InvalidInitialEquity(f64),
    #[error("leverage must be a positive finite number, got {0}")]
    InvalidLeverage(f64),
    #[error("rate '{name}' must be a non-negative finite number, got {value}")]
    NegativeRate { name: &'static str, value: f64 },
    #[error("position fraction must be in (0, 1], got {0}")]
    InvalidPositionFraction(f64),
    #[error("risk levels must satisfy 0 <= stop_out {stop_out} < margin_call {margin_call}")]
    InvalidRiskLevels { stop_out: f64, margin_call: f64 },
}

impl SimConfig {
    /// Frictionless configuration used by the regression contract and as a
    /// base for tests.
    pub fn frictionless(initial_equity: f64, leverage: f64) -> Self {
        Self {
            initial_equity,
            leverage,
            fx_fee_rate: 0.0,
            daily_long_swap_rate: 0.0,
            daily_short_swap_rate: 0.0,
            spread_bps: 0.0,
            margin_call_level: 1.0,
            stop_out_level: 0.5,
            position_fraction: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_equity.is_finite() || self.initial_equity <= 0.0 {
            return Err(ConfigError::InvalidInitialEquity(self.initial_equity));
        }
        if !self.leverage.is_finite() || self.leverage <= 0.0 {
            return Err(ConfigError::InvalidLeverage(self.leverage));
        }
        let rates = [
            ("fx_fee_rate", self.fx_fee_rate),
            ("daily_long_swap_rate", self.daily_long_swap_rate),
            ("daily_short_swap_rate", self.daily_short_swap_rate),
            ("spread_bps", self.spread_bps),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeRate { name, value });
            }
        }
        if !self.position_fraction.is_finite()
            || self.position_fraction <= 0.0
            || self.position_fraction > 1.0
        {
            return Err(ConfigError::InvalidPositionFraction(self.position_fraction));
        }
        if !self.stop_out_level.is_finite()
            || !self.margin_call_level.is_finite()
            || self.stop_out_level < 0.0
            || self.stop_out_level >= self.margin_call_level
        {
            return Err(ConfigError::InvalidRiskLevels {
                stop_out: self.stop_out_level,
                margin_call: self.margin_call_level,
            });
        }
        Ok(())
    }

    /// Half the bid/ask spread as a price fraction.
    pub fn half_spread_fraction(&self) -> f64 {
        self.spread_bps / 2.0 / 10_000.0
    }

    /// Daily carrying rate for a given side (swap plus FX conversion fee).
    pub fn daily_carry_rate(&self, side: Side) -> f64 {
        let swap = match side {
            Side::Long => self.daily_long_swap_rate,
            Side::Short => self.daily_short_swap_rate,
            Side::Flat => 0.0,
        };
        swap + self.fx_fee_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    #[test]
    fn frictionless_is_valid() {
        assert!(SimConfig::frictionless(10_000.0, 5.0).validate().is_ok());
    }

    #[test]
    fn zero_leverage_rejected() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.leverage = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidLeverage(_))));
    }

    #[test]
    fn negative_spread_rejected() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.spread_bps = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::NegativeRate { name: "spread_bps", .. })
        ));
    }

    #[test]
    fn position_fraction_bounds() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.position_fraction = 0.0;
        assert!(c.validate().is_err());
        c.position_fraction = 1.5;
        assert!(c.validate().is_err());
        c.position_fraction = 1.0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn stop_out_must_sit_below_margin_call() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.stop_out_level = 1.0;
        c.margin_call_level = 0.5;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidRiskLevels { .. })
        ));
    }

    #[test]
    fn half_spread_fraction_from_bps() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.spread_bps = 50.0;
        assert!((c.half_spread_fraction() - 0.0025).abs() < 1e-15);
    }

    #[test]
    fn carry_rate_is_side_dependent() {
        let mut c = SimConfig::frictionless(10_000.0, 5.0);
        c.daily_long_swap_rate = 0.0001;
        c.daily_short_swap_rate = 0.0002;
        c.fx_fee_rate = 0.00005;
        assert!((c.daily_carry_rate(Side::Long) - 0.00015).abs() < 1e-15);
        assert!((c.daily_carry_rate(Side::Short) - 0.00025).abs() < 1e-15);
        assert_eq!(c.daily_carry_rate(Side::Flat), 0.0);
    }

    #[test]
    fn config_serialization_roundtrip() {
        let c = SimConfig::frictionless(10_000.0, 5.0);
        let json = serde_json::to_string(&c).unwrap();
        let deser: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, deser);
    }
}
