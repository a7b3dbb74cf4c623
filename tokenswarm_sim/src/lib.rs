//! TokenSwarm seeded simulation harness
//!
//! Everything `tokenswarm_core` leaves to the caller lives here: building
//! a swarm, loading classifier artifacts, scoring a run against ground
//! truth and exporting the communication log.
//!
//! # Determinism
//!
//! A run is a pure function of its seed:
//! - **Setup**: `ChaCha8Rng::seed_from_u64(seed)` places tokens, picks the
//!   byzantine roster and start positions
//! - **Behaviour**: a second generator seeded with
//!   `seed * 0x9e3779b97f4a7c15` drives movement and fabrication
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                       │
//! │                                                           │
//! │  ScenarioId ──► SetupConfig ──► setup_simulation()        │
//! │                                       │                   │
//! │               ┌───────────────────────┴──────┐            │
//! │               ▼                              ▼            │
//! │      Orchestrator (core) ◄── ClassifierSpec  Oracle       │
//! │               │               (artifact)     │            │
//! │               └────► RunOutcome ─────────────┤            │
//! │                                              ▼            │
//! │                        ScenarioResult ──► SimExport       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tokenswarm_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_duration(200).run(ScenarioId::Baseline)?;
//! assert!(result.passed);
//! ```

pub mod artifact;
pub mod error;
pub mod exporter;
pub mod oracle;
pub mod runner;
pub mod scenarios;
pub mod setup;

pub use artifact::{ClassifierSpec, LstmArtifact, DEFAULT_WINDOW};
pub use error::SimError;
pub use exporter::{LogEntry, SimExport};
pub use oracle::{DetectionScore, Evaluation, Oracle, TokenScore};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use setup::{setup_simulation, SetupConfig, Swarm};
