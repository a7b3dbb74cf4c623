//! Tokens, agent identifiers and communication records.
//!
//! A [`CommunicationRecord`] is deliberately split in two halves:
//!
//! - [`Report`]: what the agent actually transmitted (position, tokens).
//!   This is the only half feature extraction and consensus ever see.
//! - [`AuditLabel`]: the agent's ground-truth honesty, kept next to the
//!   report purely for post-run evaluation.
//!
//! Code paths that build classifier inputs or vote take `&Report` or token
//! lists, so the honesty flag cannot leak into a decision by accident.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A 2D field coordinate.
pub type Coord = Point2<f64>;

/// The coordinates one agent reported in one round.
///
/// Not deduplicated: a coordinate listed twice is voted twice.
pub type TokenReport = Vec<Coord>;

/// A ground-truth token. Created once at setup, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Token {
    position: Coord,
}

impl Token {
    pub fn new(x: f64, y: f64) -> Self {
        Self { position: Coord::new(x, y) }
    }

    pub fn position(&self) -> Coord {
        self.position
    }
}

impl From<Coord> for Token {
    fn from(position: Coord) -> Self {
        Self { position }
    }
}

/// Unique agent identifier, e.g. `robot_3_4821`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Builds a roster id from the agent's index and a random tag.
    pub fn new(index: usize, tag: u16) -> Self {
        Self(format!("robot_{}_{}", index, tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ground-truth behaviour assigned at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Honesty {
    Honest,
    Byzantine,
}

/// Audit-only view of an agent's honesty.
///
/// Only an [`Agent`](crate::Agent) can mint one, and nothing in feature
/// extraction or consensus accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLabel {
    is_byzantine: bool,
}

impl AuditLabel {
    pub(crate) fn from_honesty(honesty: Honesty) -> Self {
        Self {
            is_byzantine: matches!(honesty, Honesty::Byzantine),
        }
    }

    /// True if the agent that produced the record was faulty.
    pub fn is_byzantine(&self) -> bool {
        self.is_byzantine
    }
}

/// The observable part of a communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    agent_id: AgentId,
    timestamp: u64,
    position: Coord,
    tokens: TokenReport,
}

impl Report {
    pub(crate) fn new(agent_id: AgentId, timestamp: u64, position: Coord, tokens: TokenReport) -> Self {
        Self {
            agent_id,
            timestamp,
            position,
            tokens,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Logical seconds since the start of the run.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Position the agent claimed when reporting.
    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn tokens(&self) -> &[Coord] {
        &self.tokens
    }

    pub fn reported_count(&self) -> usize {
        self.tokens.len()
    }
}

/// One entry of the orchestrator's communication history. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationRecord {
    report: Report,
    audit: AuditLabel,
}

impl CommunicationRecord {
    pub(crate) fn new(report: Report, audit: AuditLabel) -> Self {
        Self { report, audit }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn audit(&self) -> AuditLabel {
        self.audit
    }
}
