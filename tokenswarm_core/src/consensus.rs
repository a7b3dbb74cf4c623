//! Majority-vote consensus over agent reports.
//!
//! Every reported coordinate is quantized to one decimal place, tallied
//! across all reports, and accepted iff its tally is strictly greater than
//! `floor(active_count / 2)`. Roughly a Byzantine quorum (`n/2 + 1`
//! observations) without any message exchange: a coordinate seen by a true
//! majority survives even when a large minority fabricates noise.
//!
//! # Quantization
//!
//! Values are scaled by 10 and rounded half away from zero (`f64::round`),
//! so `0.25 -> 0.3` and `-0.25 -> -0.3`. The result is kept as integer
//! tenths so equality and hashing are exact.
//!
//! # Edge cases
//!
//! - A tally equal to the threshold is rejected.
//! - `active_count == 0` gives threshold 0, so anything reported at least
//!   once is accepted.

use crate::record::{Coord, TokenReport};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Quantization steps per unit (one decimal digit).
pub const QUANTA_PER_UNIT: f64 = 10.0;

/// A coordinate rounded to the consensus grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuantizedCoord {
    x_tenths: i64,
    y_tenths: i64,
}

impl QuantizedCoord {
    /// Snaps a coordinate to the nearest tenth, half away from zero.
    pub fn from_coord(p: &Coord) -> Self {
        Self {
            x_tenths: (p.x * QUANTA_PER_UNIT).round() as i64,
            y_tenths: (p.y * QUANTA_PER_UNIT).round() as i64,
        }
    }

    pub fn x(&self) -> f64 {
        self.x_tenths as f64 / QUANTA_PER_UNIT
    }

    pub fn y(&self) -> f64 {
        self.y_tenths as f64 / QUANTA_PER_UNIT
    }

    pub fn to_coord(&self) -> Coord {
        Coord::new(self.x(), self.y())
    }
}

impl std::fmt::Display for QuantizedCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x(), self.y())
    }
}

/// The agreed-upon token set.
pub type TokenSet = HashSet<QuantizedCoord>;

/// Turns a batch of reports into an accepted token set.
///
/// Implemented for any `Fn(&[TokenReport], usize) -> TokenSet`, so an
/// alternative quorum rule can be dropped into the orchestrator as a closure.
pub trait ConsensusStrategy {
    fn decide(&self, reports: &[TokenReport], active_count: usize) -> TokenSet;
}

impl<F> ConsensusStrategy for F
where
    F: Fn(&[TokenReport], usize) -> TokenSet,
{
    fn decide(&self, reports: &[TokenReport], active_count: usize) -> TokenSet {
        self(reports, active_count)
    }
}

/// Strict-majority vote over quantized coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityConsensus;

impl ConsensusStrategy for MajorityConsensus {
    fn decide(&self, reports: &[TokenReport], active_count: usize) -> TokenSet {
        majority_consensus(reports, active_count)
    }
}

/// Minimum tally a coordinate must exceed.
pub fn majority_threshold(active_count: usize) -> usize {
    active_count / 2
}

/// Counts quantized coordinates across every report.
pub fn tally(reports: &[TokenReport]) -> HashMap<QuantizedCoord, usize> {
    let mut counts = HashMap::new();
    for report in reports {
        for p in report {
            *counts.entry(QuantizedCoord::from_coord(p)).or_insert(0) += 1;
        }
    }
    counts
}

/// Accepts every coordinate whose tally strictly exceeds the threshold.
pub fn majority_consensus(reports: &[TokenReport], active_count: usize) -> TokenSet {
    let threshold = majority_threshold(active_count);

    tally(reports)
        .into_iter()
        .filter(|&(_, count)| count > threshold)
        .map(|(coord, _)| coord)
        .collect()
}
