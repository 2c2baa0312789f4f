//! Signal state machine — hysteresis conversion of edge scores into sides.
//!
//! The machine carries exactly one piece of state (the current side) and
//! applies separate enter/exit/flip bands per direction so a noisy edge near
//! a single boundary cannot thrash the position. Transition checks run in a
//! fixed priority order — flip before exit — which guarantees at most one
//! state change per day.

use crate::domain::{Side, SignalBar, ThresholdSet};
use crate::edge::EdgePoint;
use chrono::NaiveDate;

/// One day of signal output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDay {
    pub date: NaiveDate,
    pub side: Side,
}

/// Pure transition function: previous side + today's standardized edge → new
/// side.
///
/// `thresholds` must have passed [`ThresholdSet::validate`].
pub fn step(prev: Side, z: f64, thresholds: &ThresholdSet) -> Side {
    match prev {
        Side::Flat => {
            if z >= thresholds.enter_long {
                Side::Long
            } else if z <= -thresholds.enter_short {
                Side::Short
            } else {
                Side::Flat
            }
        }
        Side::Long => {
            // Flip check takes priority over the exit check.
            if z <= -thresholds.flip_short {
                Side::Short
            } else if z <= thresholds.exit_long {
                Side::Flat
            } else {
                Side::Long
            }
        }
        Side::Short => {
            if z >= thresholds.flip_long {
                Side::Long
            } else if z >= -thresholds.exit_short {
                Side::Flat
            } else {
                Side::Short
            }
        }
    }
}

/// Run the machine over an edge window starting from an explicit side.
///
/// The explicit start is the no-carry-in contract: a fold boundary may force
/// `Side::Flat` regardless of what a full-history run would have carried in.
pub fn run(edges: &[EdgePoint], start: Side, thresholds: &ThresholdSet) -> Vec<SignalDay> {
    let mut side = start;
    edges
        .iter()
        .map(|p| {
            side = step(side, p.z, thresholds);
            SignalDay {
                date: p.date,
                side,
            }
        })
        .collect()
}

/// Index (relative to `days`) of the first flat day, if any.
///
/// A flat day inside a window is a clean restart point: a machine restarted
/// flat there reproduces the remainder of the trajectory. Windows without
/// one cannot be evaluated independently and must be reported as infeasible.
pub fn first_flat_day(days: &[SignalDay]) -> Option<usize> {
    days.iter().position(|d| d.side == Side::Flat)
}

/// Whether a flat→open transition occurs anywhere in `days`.
pub fn has_flat_entry(days: &[SignalDay], start: Side) -> bool {
    let mut prev = start;
    for day in days {
        if prev == Side::Flat && day.side.is_open() {
            return true;
        }
        prev = day.side;
    }
    false
}

/// Zip edges, prices, and machine output into simulator-ready bars.
///
/// All three slices must be aligned index-for-index; `days` is normally the
/// output of [`run`] over the same edge slice.
pub fn tag_bars(edges: &[EdgePoint], prices: &[f64], days: &[SignalDay]) -> Vec<SignalBar> {
    edges
        .iter()
        .zip(prices.iter())
        .zip(days.iter())
        .map(|((point, &price), day)| SignalBar::new(point.date, price, day.side))
        .collect()
}

/// Fraction of days spent flat.
pub fn flat_fraction(days: &[SignalDay]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    let flat = days.iter().filter(|d| d.side == Side::Flat).count();
    flat as f64 / days.len() as f64
}
