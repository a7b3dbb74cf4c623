//! Ground truth oracle for evaluating runs.
//!
//! The Oracle keeps the "God's eye view" the orchestrator never sees:
//! - True token positions (quantized onto the consensus grid)
//! - Which agents were faulty
//!
//! and scores a finished run against it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokenswarm_core::{Agent, QuantizedCoord, RunOutcome, Token};

/// Token-level agreement between consensus and ground truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenScore {
    /// Accepted coordinates matching a real token
    pub true_positives: usize,

    /// Accepted coordinates matching no real token
    pub false_positives: usize,

    /// Real tokens not accepted
    pub missed: usize,

    pub precision: f64,
    pub recall: f64,
}

/// How well the exclusion audit lines up with the true faulty agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionScore {
    /// Agents the classifier excluded
    pub excluded: usize,

    /// Excluded agents that really were faulty
    pub excluded_byzantine: usize,

    /// Faulty agents in the roster
    pub total_byzantine: usize,

    pub precision: f64,
    pub recall: f64,
}

/// Full evaluation of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub tokens: TokenScore,

    /// Present iff the run had a classifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionScore>,
}

/// The Oracle - holds ground truth and scores outcomes.
#[derive(Debug, Clone)]
pub struct Oracle {
    truth: HashSet<QuantizedCoord>,
    total_byzantine: usize,
}

impl Oracle {
    /// Captures ground truth from a freshly set-up swarm.
    pub fn new(tokens: &[Token], agents: &[Agent]) -> Self {
        Self {
            truth: tokens
                .iter()
                .map(|t| QuantizedCoord::from_coord(&t.position()))
                .collect(),
            total_byzantine: agents.iter().filter(|a| a.audit_label().is_byzantine()).count(),
        }
    }

    /// Ground-truth tokens on the consensus grid.
    pub fn quantized_truth(&self) -> &HashSet<QuantizedCoord> {
        &self.truth
    }

    pub fn total_byzantine(&self) -> usize {
        self.total_byzantine
    }

    /// Scores a run's accepted tokens and exclusions.
    pub fn evaluate(&self, outcome: &RunOutcome) -> Evaluation {
        let true_positives = outcome.tokens.intersection(&self.truth).count();
        let false_positives = outcome.tokens.len() - true_positives;
        let missed = self.truth.len() - true_positives;

        let tokens = TokenScore {
            true_positives,
            false_positives,
            missed,
            precision: ratio(true_positives, outcome.tokens.len()),
            recall: ratio(true_positives, self.truth.len()),
        };

        let detection = outcome.exclusions.as_ref().map(|audit| {
            let excluded = audit.len();
            let excluded_byzantine = audit.values().filter(|&&byzantine| byzantine).count();
            DetectionScore {
                excluded,
                excluded_byzantine,
                total_byzantine: self.total_byzantine,
                precision: ratio(excluded_byzantine, excluded),
                recall: ratio(excluded_byzantine, self.total_byzantine),
            }
        });

        Evaluation { tokens, detection }
    }
}

/// `num / den`, or 1.0 when there was nothing to get wrong.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}
