//! TokenSwarm Core - Byzantine-tolerant token search
//!
//! A swarm of mobile agents searches a bounded field for scattered tokens.
//! Some agents are faulty and fabricate what they report. This crate turns
//! the swarm's noisy, partly adversarial reports into one agreed token set.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │   tick: move + scan ──► round: report ──► features ──┐       │
//! │                                                      ▼       │
//! │                                         ┌──────────────────┐ │
//! │   exclusion (permanent) ◄────────────── │    Classifier    │ │
//! │                                         │ PerSample | Seq. │ │
//! │                                         └──────────────────┘ │
//! │   accumulated reports ──► (at end) ──► ConsensusStrategy     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Agents** ([`Agent`]): wander, sense tokens within range, report.
//! - **Consensus** ([`consensus`]): quantize, tally, keep strict majorities.
//! - **Classifier** ([`classifier`]): optional, flags agents for exclusion.
//! - **Orchestrator** ([`Orchestrator`]): the counted tick loop.
//!
//! Randomness always comes from a caller-supplied `rand::Rng`, so a seeded
//! generator reproduces a run exactly.
//!
//! # Usage
//!
//! ```ignore
//! use tokenswarm_core::{Orchestrator, OrchestratorConfig};
//!
//! let mut orchestrator = Orchestrator::new(agents, OrchestratorConfig::default());
//! let outcome = orchestrator.run(&mut rng);
//! println!("{} tokens agreed", outcome.tokens.len());
//! ```

pub mod agent;
pub mod classifier;
pub mod consensus;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod record;

// Re-export key types for convenience
pub use agent::{Agent, AgentParams, Field};
pub use classifier::{Classifier, ClassifierKind, Label, SampleModel, SequenceModel};
pub use consensus::{majority_consensus, ConsensusStrategy, MajorityConsensus, QuantizedCoord, TokenSet};
pub use error::SwarmError;
pub use features::{FeatureVector, FeatureWindow};
pub use orchestrator::{
    ExclusionAudit, Orchestrator, OrchestratorConfig, OrchestratorState, RoundSchedule, RunOutcome,
    DEFAULT_ROUND_SCHEDULE,
};
pub use record::{AgentId, AuditLabel, CommunicationRecord, Coord, Honesty, Report, Token, TokenReport};
