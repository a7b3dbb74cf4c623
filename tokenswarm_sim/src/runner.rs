//! Scenario runner - sets up a swarm, runs it, scores the outcome.

use crate::artifact::ClassifierSpec;
use crate::error::SimError;
use crate::oracle::{Evaluation, Oracle};
use crate::scenarios::ScenarioId;
use crate::setup::{setup_simulation, SetupConfig};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::num::NonZeroU64;
use tokenswarm_core::{
    CommunicationRecord, ExclusionAudit, Orchestrator, OrchestratorConfig, RoundSchedule, TokenSet,
};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// True when no fabricated token made it through consensus
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Communication rounds that fired
    pub rounds: u64,

    /// Agents still active when consensus ran
    pub active_agents: usize,

    /// Accepted token set
    pub tokens: TokenSet,

    /// Exclusion audit, present iff a classifier was configured
    pub exclusions: Option<ExclusionAudit>,

    pub evaluation: Evaluation,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Every record kept during the run, in arrival order
    pub history: Vec<CommunicationRecord>,
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    orchestrator: OrchestratorConfig,

    classifier: Option<ClassifierSpec>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with the default run length.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            orchestrator: OrchestratorConfig::default(),
            classifier: None,
        }
    }

    /// Sets the run length in logical seconds.
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.orchestrator.duration_secs = secs;
        self
    }

    /// Sets the ticks between communication rounds.
    pub fn with_comm_interval(mut self, interval: NonZeroU64) -> Self {
        self.orchestrator.comm_interval = interval;
        self
    }

    pub fn with_schedule(mut self, schedule: RoundSchedule) -> Self {
        self.orchestrator.schedule = schedule;
        self
    }

    /// Enables classifier-driven exclusion. The artifact is read on every run.
    pub fn with_classifier(mut self, spec: ClassifierSpec) -> Self {
        self.classifier = Some(spec);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn orchestrator_config(&self) -> &OrchestratorConfig {
        &self.orchestrator
    }

    /// Runs a preset scenario.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.run_with_setup(scenario, &scenario.setup_config())
    }

    /// Runs `scenario` with an explicit swarm configuration.
    ///
    /// Setup draws from `seed`; movement, scanning and fabrication draw from
    /// a second generator derived from it, so changing the run length never
    /// changes the initial swarm.
    pub fn run_with_setup(&self, scenario: ScenarioId, setup: &SetupConfig) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        // Fail before any tick if the classifier cannot be built
        let classifier = self.classifier.as_ref().map(ClassifierSpec::load).transpose()?;

        let setup_seed = self.seed;
        let behaviour_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let mut setup_rng = ChaCha8Rng::seed_from_u64(setup_seed);
        let swarm = setup_simulation(setup, &mut setup_rng);
        let oracle = Oracle::new(&swarm.tokens, &swarm.agents);

        debug!(
            "  {} agents ({} byzantine), {} tokens on {}x{}",
            swarm.agents.len(),
            oracle.total_byzantine(),
            swarm.tokens.len(),
            setup.field_width,
            setup.field_height
        );

        let mut orchestrator = Orchestrator::new(swarm.agents, self.orchestrator.clone());
        if let Some(classifier) = classifier {
            orchestrator = orchestrator.with_classifier(classifier);
        }

        let mut behaviour_rng = ChaCha8Rng::seed_from_u64(behaviour_seed);
        let outcome = orchestrator.run(&mut behaviour_rng);
        let evaluation = oracle.evaluate(&outcome);

        let fabricated = evaluation.tokens.false_positives;
        let passed = fabricated == 0;
        if !passed {
            warn!("{} fabricated token(s) accepted", fabricated);
        }

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: self.orchestrator.duration_secs,
            rounds: outcome.rounds,
            active_agents: outcome.active_count,
            tokens: outcome.tokens,
            exclusions: outcome.exclusions,
            evaluation,
            failure_reason: if passed {
                None
            } else {
                Some(format!("{} fabricated token(s) accepted by consensus", fabricated))
            },
            history: orchestrator.history().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;

    fn artifact_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tokenswarm_{}_{}.json", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_honest_swarm_scenario() {
        let runner = ScenarioRunner::new(42);

        let result = runner.run(ScenarioId::HonestSwarm).unwrap();

        assert!(result.passed);
        assert_eq!(result.total_ticks, 100);
        assert_eq!(result.rounds, 10);
        assert_eq!(result.active_agents, 10);
        assert!(result.exclusions.is_none());
        assert!(result.history.iter().all(|r| !r.audit().is_byzantine()));
    }

    #[test]
    fn test_zero_duration_runs_nothing() {
        let runner = ScenarioRunner::new(42).with_duration(0);

        let result = runner.run(ScenarioId::Baseline).unwrap();

        assert_eq!(result.rounds, 0);
        assert!(result.history.is_empty());
        assert!(result.tokens.is_empty());
    }

    #[test]
    fn test_comm_interval_sets_round_count() {
        let runner = ScenarioRunner::new(7)
            .with_duration(30)
            .with_comm_interval(NonZeroU64::new(7).unwrap());

        assert_eq!(runner.run(ScenarioId::Baseline).unwrap().rounds, 5);

        let late = ScenarioRunner::new(7)
            .with_duration(30)
            .with_comm_interval(NonZeroU64::new(7).unwrap())
            .with_schedule(RoundSchedule::AfterFirstInterval);

        assert_eq!(late.run(ScenarioId::Baseline).unwrap().rounds, 4);
    }

    #[test]
    fn test_run_deterministic() {
        let a = ScenarioRunner::new(1234).run(ScenarioId::Baseline).unwrap();
        let b = ScenarioRunner::new(1234).run(ScenarioId::Baseline).unwrap();

        assert_eq!(a.tokens, b.tokens);
        assert_eq!(a.history, b.history);
        assert_eq!(a.evaluation, b.evaluation);
    }

    #[test]
    fn test_classifier_flagging_everyone() {
        let path = artifact_file("all_faulty", r#"{ "trees": [ { "nodes": [ { "leaf": "faulty" } ] } ] }"#);
        let spec = ClassifierSpec::parse("random_forest", &path, NonZeroUsize::new(5).unwrap()).unwrap();
        let runner = ScenarioRunner::new(9).with_classifier(spec);

        let result = runner.run(ScenarioId::HonestSwarm).unwrap();
        std::fs::remove_file(&path).ok();

        // Everyone reports in the first round, is flagged, and stays silent afterwards
        let audit = result.exclusions.unwrap();
        assert_eq!(audit.len(), 10);
        assert!(audit.values().all(|&byzantine| !byzantine));
        assert_eq!(result.active_agents, 0);
        assert_eq!(result.history.len(), 10);
        assert!(result.history.iter().all(|r| r.report().timestamp() == 0));
    }

    #[test]
    fn test_missing_artifact_fails_before_run() {
        let spec = ClassifierSpec::parse("lstm", "/nonexistent/model.json", NonZeroUsize::new(5).unwrap()).unwrap();
        let runner = ScenarioRunner::new(3).with_classifier(spec);

        assert!(matches!(runner.run(ScenarioId::Baseline), Err(SimError::Io(_))));
    }
}
