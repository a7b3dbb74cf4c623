//! Classifier inputs built from reports.
//!
//! Only [`Report`] is accepted here, never a full record, so the audit
//! label cannot end up in a feature vector.

use crate::record::{AgentId, Report};

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

/// Number of features per report.
pub const FEATURE_DIM: usize = 4;

/// `[x, y, reported_count, mean_distance]` for one report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    /// Builds the feature vector of a report.
    ///
    /// `mean_distance` is the mean Euclidean distance from the reported
    /// position to each reported token, or 0 when nothing was reported.
    pub fn from_report(report: &Report) -> Self {
        let pos = report.position();
        let tokens = report.tokens();

        let mean_distance = if tokens.is_empty() {
            0.0
        } else {
            tokens.iter().map(|t| nalgebra::distance(&pos, t)).sum::<f64>() / tokens.len() as f64
        };

        Self([pos.x, pos.y, report.reported_count() as f64, mean_distance])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// A full, oldest-first run of an agent's feature vectors.
pub type FeatureWindow = Vec<FeatureVector>;

/// Trailing fixed-length feature history per agent.
#[derive(Debug, Clone)]
pub struct FeatureWindows {
    len: NonZeroUsize,
    windows: HashMap<AgentId, VecDeque<FeatureVector>>,
}

impl FeatureWindows {
    pub fn new(len: NonZeroUsize) -> Self {
        Self {
            len,
            windows: HashMap::new(),
        }
    }

    pub fn window_len(&self) -> usize {
        self.len.get()
    }

    /// Appends a vector, evicting the oldest past the window length.
    ///
    /// Returns a snapshot of the window once it is full.
    pub fn push(&mut self, agent: &AgentId, feature: FeatureVector) -> Option<FeatureWindow> {
        let len = self.len.get();
        let window = self
            .windows
            .entry(agent.clone())
            .or_insert_with(|| VecDeque::with_capacity(len));

        window.push_back(feature);
        while window.len() > len {
            window.pop_front();
        }

        (window.len() == len).then(|| window.iter().copied().collect())
    }

    /// Number of vectors currently held for an agent.
    pub fn depth(&self, agent: &AgentId) -> usize {
        self.windows.get(agent).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Coord;
    use approx::assert_relative_eq;

    fn report(pos: (f64, f64), tokens: &[(f64, f64)]) -> Report {
        Report::new(
            AgentId::from("robot_0_1000"),
            0,
            Coord::new(pos.0, pos.1),
            tokens.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
        )
    }

    fn fv(v: f64) -> FeatureVector {
        FeatureVector([v, 0.0, 0.0, 0.0])
    }

    #[test]
    fn test_feature_vector_layout() {
        let f = FeatureVector::from_report(&report((1.0, 2.0), &[(4.0, 6.0), (1.0, 2.0)]));

        assert_eq!(f.0[0], 1.0);
        assert_eq!(f.0[1], 2.0);
        assert_eq!(f.0[2], 2.0);
        // distances 5 and 0
        assert_relative_eq!(f.0[3], 2.5);
    }

    #[test]
    fn test_feature_vector_empty_report() {
        let f = FeatureVector::from_report(&report((3.0, 4.0), &[]));
        assert_eq!(f, FeatureVector([3.0, 4.0, 0.0, 0.0]));
    }

    #[test]
    fn test_window_ready_only_when_full() {
        let mut windows = FeatureWindows::new(NonZeroUsize::new(3).unwrap());
        let id = AgentId::from("a");

        assert!(windows.push(&id, fv(1.0)).is_none());
        assert!(windows.push(&id, fv(2.0)).is_none());
        let full = windows.push(&id, fv(3.0)).unwrap();

        assert_eq!(full, vec![fv(1.0), fv(2.0), fv(3.0)]);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut windows = FeatureWindows::new(NonZeroUsize::new(2).unwrap());
        let id = AgentId::from("a");

        windows.push(&id, fv(1.0));
        windows.push(&id, fv(2.0));
        let next = windows.push(&id, fv(3.0)).unwrap();

        assert_eq!(next, vec![fv(2.0), fv(3.0)]);
        assert_eq!(windows.depth(&id), 2);
    }

    #[test]
    fn test_windows_are_per_agent() {
        let mut windows = FeatureWindows::new(NonZeroUsize::new(2).unwrap());
        let a = AgentId::from("a");
        let b = AgentId::from("b");

        windows.push(&a, fv(1.0));
        assert!(windows.push(&b, fv(1.0)).is_none());
        assert!(windows.push(&a, fv(2.0)).is_some());
        assert_eq!(windows.depth(&b), 1);
    }
}
