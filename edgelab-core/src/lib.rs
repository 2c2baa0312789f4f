//! edgelab core — edge standardization, hysteresis signalling, margin
//! simulation.
//!
//! This crate contains the deterministic heart of the platform:
//! - Domain types (signal bars, sides, thresholds, snapshots, trades)
//! - Edge series builder (forecast log-return standardized by horizon vol)
//! - Hysteresis signal state machine with explicit restart support
//! - Day-by-day leveraged margin-account simulator
//!
//! No I/O happens here: everything operates over in-memory sequences and is
//! replayable bit-for-bit.

pub mod domain;
pub mod edge;
pub mod signal;
pub mod sim;
