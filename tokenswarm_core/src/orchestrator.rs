//! The round-based orchestration loop.
//!
//! # Tick state machine
//!
//! ```text
//!            step()                          step() at elapsed + 1 == duration
//! Running { elapsed } ──────► Running { elapsed + 1 } ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─► Done
//! ```
//!
//! One tick is one logical second:
//!
//! 1. every active agent moves, then scans;
//! 2. on a communication round every agent is asked to report (excluded
//!    agents stay silent);
//! 3. with a classifier configured, the round's reports are turned into a
//!    single batch, classified once, and flagged agents are excluded for
//!    good. Each agent's own record is then appended to the history and its
//!    tokens to the accumulated vote, whatever its label;
//! 4. elapsed advances; the machine is `Done` once it reaches the duration.
//!
//! The round step is a barrier: exclusions from a round take effect before
//! the next tick's movement.

use crate::agent::Agent;
use crate::classifier::{Classifier, SampleModel, SequenceModel};
use crate::consensus::{ConsensusStrategy, MajorityConsensus, TokenSet};
use crate::features::{FeatureVector, FeatureWindows};
use crate::record::{AgentId, CommunicationRecord, Report, TokenReport};

use rand::Rng;
use std::collections::BTreeMap;
use std::num::NonZeroU64;
use tracing::{debug, info, warn};

/// When communication rounds fire relative to `elapsed % interval == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundSchedule {
    /// The zero boundary counts: rounds at `0, k, 2k, ...`
    #[default]
    FromStart,

    /// First round after one full interval: `k, 2k, ...`
    AfterFirstInterval,
}

/// Rounds fire at `elapsed = 0`, giving `ceil(duration / interval)` rounds.
pub const DEFAULT_ROUND_SCHEDULE: RoundSchedule = RoundSchedule::FromStart;

impl RoundSchedule {
    /// Whether a round fires at `elapsed`.
    pub fn is_round(&self, elapsed: u64, interval: NonZeroU64) -> bool {
        if elapsed % interval.get() != 0 {
            return false;
        }
        match self {
            RoundSchedule::FromStart => true,
            RoundSchedule::AfterFirstInterval => elapsed > 0,
        }
    }

    /// Number of rounds in a run of `duration` ticks.
    pub fn round_count(&self, duration: u64, interval: NonZeroU64) -> u64 {
        if duration == 0 {
            return 0;
        }
        let k = interval.get();
        match self {
            RoundSchedule::FromStart => duration.div_ceil(k),
            RoundSchedule::AfterFirstInterval => (duration - 1) / k,
        }
    }
}

const DEFAULT_COMM_INTERVAL: NonZeroU64 = match NonZeroU64::new(10) {
    Some(k) => k,
    None => panic!("communication interval must be non-zero"),
};

/// Run length and round timing.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Total ticks (logical seconds) to run
    pub duration_secs: u64,

    /// Ticks between communication rounds
    pub comm_interval: NonZeroU64,

    pub schedule: RoundSchedule,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            duration_secs: 100,
            comm_interval: DEFAULT_COMM_INTERVAL,
            schedule: DEFAULT_ROUND_SCHEDULE,
        }
    }
}

/// Where the tick loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Running { elapsed: u64 },
    Done,
}

/// Excluded agent -> its ground-truth `is_byzantine` flag.
///
/// Audit output only; never read back by the run.
pub type ExclusionAudit = BTreeMap<AgentId, bool>;

/// What a finished run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Accepted token coordinates
    pub tokens: TokenSet,

    /// Present iff a classifier was configured
    pub exclusions: Option<ExclusionAudit>,

    /// Agents still active when consensus ran
    pub active_count: usize,

    /// Communication rounds that fired
    pub rounds: u64,
}

/// Classifier plus whatever per-agent state its variant needs.
enum ClassifierStage {
    PerSample(Box<dyn SampleModel>),
    Sequential {
        model: Box<dyn SequenceModel>,
        windows: FeatureWindows,
    },
}

impl From<Classifier> for ClassifierStage {
    fn from(classifier: Classifier) -> Self {
        match classifier {
            Classifier::PerSample(model) => ClassifierStage::PerSample(model),
            Classifier::Sequential { model, window } => ClassifierStage::Sequential {
                model,
                windows: FeatureWindows::new(window),
            },
        }
    }
}

impl ClassifierStage {
    /// Classifies one round's reports in a single batch and returns the
    /// agents predicted faulty.
    fn flag(&mut self, reports: &[&Report]) -> Vec<AgentId> {
        let (ids, labels) = match self {
            ClassifierStage::PerSample(model) => {
                let ids: Vec<AgentId> = reports.iter().map(|r| r.agent_id().clone()).collect();
                let batch: Vec<FeatureVector> = reports.iter().map(|r| FeatureVector::from_report(r)).collect();
                let labels = if batch.is_empty() { Vec::new() } else { model.predict(&batch) };
                (ids, labels)
            }
            ClassifierStage::Sequential { model, windows } => {
                let mut ids = Vec::new();
                let mut batch = Vec::new();
                for report in reports {
                    if let Some(window) = windows.push(report.agent_id(), FeatureVector::from_report(report)) {
                        ids.push(report.agent_id().clone());
                        batch.push(window);
                    }
                }
                let labels = if batch.is_empty() { Vec::new() } else { model.predict(&batch) };
                (ids, labels)
            }
        };

        if labels.len() != ids.len() {
            warn!("Classifier returned {} labels for {} inputs", labels.len(), ids.len());
        }

        ids.into_iter()
            .zip(labels)
            .filter(|(_, label)| label.is_faulty())
            .map(|(id, _)| id)
            .collect()
    }
}

/// Drives agents through the tick loop and runs consensus at the end.
pub struct Orchestrator<S = MajorityConsensus> {
    config: OrchestratorConfig,
    agents: Vec<Agent>,
    consensus: S,
    classifier: Option<ClassifierStage>,

    /// One entry per non-empty record, in arrival order
    reports: Vec<TokenReport>,
    history: Vec<CommunicationRecord>,
    exclusions: ExclusionAudit,

    state: OrchestratorState,
    rounds: u64,
}

impl Orchestrator<MajorityConsensus> {
    /// Creates an orchestrator using strict-majority consensus and no classifier.
    pub fn new(agents: Vec<Agent>, config: OrchestratorConfig) -> Self {
        let state = if config.duration_secs == 0 {
            OrchestratorState::Done
        } else {
            OrchestratorState::Running { elapsed: 0 }
        };

        Self {
            config,
            agents,
            consensus: MajorityConsensus,
            classifier: None,
            reports: Vec::new(),
            history: Vec::new(),
            exclusions: ExclusionAudit::new(),
            state,
            rounds: 0,
        }
    }
}

impl<S: ConsensusStrategy> Orchestrator<S> {
    /// Swaps in a different quorum rule.
    pub fn with_consensus<T: ConsensusStrategy>(self, consensus: T) -> Orchestrator<T> {
        Orchestrator {
            config: self.config,
            agents: self.agents,
            consensus,
            classifier: self.classifier,
            reports: self.reports,
            history: self.history,
            exclusions: self.exclusions,
            state: self.state,
            rounds: self.rounds,
        }
    }

    /// Enables classifier-driven exclusion.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        info!("Classifier enabled: {:?}", classifier);
        self.classifier = Some(classifier.into());
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn history(&self) -> &[CommunicationRecord] {
        &self.history
    }

    pub fn accumulated_reports(&self) -> &[TokenReport] {
        &self.reports
    }

    pub fn exclusions(&self) -> &ExclusionAudit {
        &self.exclusions
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn active_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_active()).count()
    }

    /// Advances one tick. A no-op once `Done`.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> OrchestratorState {
        let elapsed = match self.state {
            OrchestratorState::Done => return OrchestratorState::Done,
            OrchestratorState::Running { elapsed } => elapsed,
        };

        for agent in self.agents.iter_mut() {
            agent.move_step(rng);
            agent.scan();
        }

        if self.config.schedule.is_round(elapsed, self.config.comm_interval) {
            self.communication_round(elapsed, rng);
        }

        let next = elapsed + 1;
        self.state = if next >= self.config.duration_secs {
            OrchestratorState::Done
        } else {
            OrchestratorState::Running { elapsed: next }
        };
        self.state
    }

    /// Runs every remaining tick, then consensus.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RunOutcome {
        while self.step(rng) != OrchestratorState::Done {}
        self.finish()
    }

    /// Runs consensus over everything accumulated so far.
    pub fn finish(&self) -> RunOutcome {
        let active_count = self.active_count();
        let tokens = self.consensus.decide(&self.reports, active_count);

        info!(
            "Run finished: {} rounds, {} reports, {}/{} agents active, {} tokens accepted",
            self.rounds,
            self.reports.len(),
            active_count,
            self.agents.len(),
            tokens.len()
        );

        RunOutcome {
            tokens,
            exclusions: self.classifier.as_ref().map(|_| self.exclusions.clone()),
            active_count,
            rounds: self.rounds,
        }
    }

    fn communication_round<R: Rng + ?Sized>(&mut self, elapsed: u64, rng: &mut R) {
        self.rounds += 1;

        let records: Vec<CommunicationRecord> = self
            .agents
            .iter()
            .filter_map(|agent| agent.report(elapsed, rng))
            .collect();

        debug!("  t={}s | round {} | {} reports", elapsed, self.rounds, records.len());

        if let Some(stage) = self.classifier.as_mut() {
            let reports: Vec<&Report> = records.iter().map(CommunicationRecord::report).collect();
            for id in stage.flag(&reports) {
                self.exclude(&id, elapsed);
            }
        }

        for record in records {
            self.reports.push(record.report().tokens().to_vec());
            self.history.push(record);
        }
    }

    fn exclude(&mut self, id: &AgentId, elapsed: u64) {
        let Some(agent) = self.agents.iter_mut().find(|a| a.id() == id) else {
            warn!("Classifier flagged unknown agent {}", id);
            return;
        };

        if agent.is_active() {
            agent.deactivate();
            self.exclusions.insert(id.clone(), agent.audit_label().is_byzantine());
            info!("  t={}s | excluded {}", elapsed, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentParams, Field};
    use crate::classifier::Label;
    use crate::consensus::QuantizedCoord;
    use crate::features::FeatureWindow;
    use crate::record::{Coord, Honesty, Token};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn interval(k: u64) -> NonZeroU64 {
        NonZeroU64::new(k).unwrap()
    }

    fn config(duration_secs: u64, k: u64) -> OrchestratorConfig {
        OrchestratorConfig {
            duration_secs,
            comm_interval: interval(k),
            schedule: DEFAULT_ROUND_SCHEDULE,
        }
    }

    fn roster(honesty: &[Honesty], scan_range: f64, tokens: &[(f64, f64)]) -> Vec<Agent> {
        let field = Field::new(100.0, 100.0);
        let sensible: Arc<[Token]> = tokens.iter().map(|&(x, y)| Token::new(x, y)).collect();
        honesty
            .iter()
            .enumerate()
            .map(|(i, h)| {
                Agent::new(
                    AgentId::new(i, 1000 + i as u16),
                    field,
                    field.center(),
                    AgentParams {
                        movement_range: 10.0,
                        scan_range,
                    },
                    *h,
                    sensible.clone(),
                )
            })
            .collect()
    }

    fn honest(n: usize) -> Vec<Honesty> {
        vec![Honesty::Honest; n]
    }

    #[test]
    fn test_round_schedule_boundary() {
        let k = interval(5);
        assert!(DEFAULT_ROUND_SCHEDULE.is_round(0, k));
        assert!(!RoundSchedule::AfterFirstInterval.is_round(0, k));
        assert!(RoundSchedule::AfterFirstInterval.is_round(5, k));
        assert!(!RoundSchedule::FromStart.is_round(4, k));
    }

    #[test]
    fn test_round_counts() {
        assert_eq!(RoundSchedule::FromStart.round_count(10, interval(3)), 4);
        assert_eq!(RoundSchedule::AfterFirstInterval.round_count(10, interval(3)), 3);
        assert_eq!(RoundSchedule::FromStart.round_count(9, interval(3)), 3);
        assert_eq!(RoundSchedule::AfterFirstInterval.round_count(9, interval(3)), 2);
        assert_eq!(RoundSchedule::FromStart.round_count(0, interval(3)), 0);

        for schedule in [RoundSchedule::FromStart, RoundSchedule::AfterFirstInterval] {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let mut orch = Orchestrator::new(
                roster(&honest(2), 5.0, &[]),
                OrchestratorConfig {
                    schedule,
                    ..config(10, 3)
                },
            );
            let outcome = orch.run(&mut rng);
            assert_eq!(outcome.rounds, schedule.round_count(10, interval(3)));
        }
    }

    #[test]
    fn test_state_machine_reaches_done() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut orch = Orchestrator::new(roster(&honest(1), 5.0, &[]), config(3, 1));

        assert_eq!(orch.state(), OrchestratorState::Running { elapsed: 0 });
        assert_eq!(orch.step(&mut rng), OrchestratorState::Running { elapsed: 1 });
        assert_eq!(orch.step(&mut rng), OrchestratorState::Running { elapsed: 2 });
        assert_eq!(orch.step(&mut rng), OrchestratorState::Done);
        assert_eq!(orch.step(&mut rng), OrchestratorState::Done);
        assert_eq!(orch.rounds(), 3);

        let empty = Orchestrator::new(roster(&honest(1), 5.0, &[]), config(0, 1));
        assert_eq!(empty.state(), OrchestratorState::Done);
    }

    #[test]
    fn test_honest_swarm_agrees_on_tokens() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tokens = [(10.04, 20.0), (70.0, 80.06)];
        let mut orch = Orchestrator::new(roster(&honest(3), 1000.0, &tokens), config(1, 1));

        let outcome = orch.run(&mut rng);

        let expected: HashSet<QuantizedCoord> = tokens
            .iter()
            .map(|&(x, y)| QuantizedCoord::from_coord(&Coord::new(x, y)))
            .collect();
        assert_eq!(outcome.tokens, expected);
        assert!(outcome.exclusions.is_none());
        assert_eq!(outcome.active_count, 3);
    }

    #[test]
    fn test_history_has_one_record_per_agent_per_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let honesty = [Honesty::Honest, Honesty::Byzantine, Honesty::Honest, Honesty::Byzantine];
        let mut orch = Orchestrator::new(roster(&honesty, 5.0, &[(50.0, 50.0)]), config(20, 4));

        let outcome = orch.run(&mut rng);

        assert_eq!(outcome.rounds, 5);
        assert_eq!(orch.history().len(), 4 * 5);
        assert_eq!(orch.accumulated_reports().len(), orch.history().len());

        let pairs: HashSet<(AgentId, u64)> = orch
            .history()
            .iter()
            .map(|r| (r.report().agent_id().clone(), r.report().timestamp()))
            .collect();
        assert_eq!(pairs.len(), 20);

        for agent in orch.agents() {
            for t in [0, 4, 8, 12, 16] {
                assert!(pairs.contains(&(agent.id().clone(), t)));
            }
        }
    }

    #[test]
    fn test_exclusion_is_permanent() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        // First call flags the second input; every later call clears everyone
        let model = move |batch: &[FeatureVector]| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            (0..batch.len())
                .map(|i| if call == 0 && i == 1 { Label::Faulty } else { Label::Honest })
                .collect::<Vec<_>>()
        };

        let honesty = [Honesty::Honest, Honesty::Byzantine, Honesty::Honest];
        let mut orch = Orchestrator::new(roster(&honesty, 5.0, &[]), config(30, 5))
            .with_classifier(Classifier::per_sample(model));

        orch.step(&mut rng);
        let excluded = orch.agents()[1].id().clone();
        let frozen_at = orch.agents()[1].position();
        assert!(!orch.agents()[1].is_active());

        let outcome = orch.run(&mut rng);

        let agent = &orch.agents()[1];
        assert!(!agent.is_active());
        assert_eq!(agent.position(), frozen_at);
        assert_eq!(outcome.active_count, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        let exclusions = outcome.exclusions.unwrap();
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions.get(&excluded), Some(&true));

        // Its round-0 record is kept, nothing after
        let from_excluded: Vec<_> = orch
            .history()
            .iter()
            .filter(|r| r.report().agent_id() == &excluded)
            .collect();
        assert_eq!(from_excluded.len(), 1);
        assert_eq!(from_excluded[0].report().timestamp(), 0);
    }

    #[test]
    fn test_audit_map_only_holds_excluded_agents() {
        let honesty = [Honesty::Honest, Honesty::Byzantine, Honesty::Honest];

        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let none = |batch: &[FeatureVector]| vec![Label::Honest; batch.len()];
        let mut orch = Orchestrator::new(roster(&honesty, 5.0, &[]), config(10, 2))
            .with_classifier(Classifier::per_sample(none));
        let outcome = orch.run(&mut rng);
        assert_eq!(outcome.exclusions, Some(ExclusionAudit::new()));
        assert_eq!(outcome.active_count, 3);

        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let all = |batch: &[FeatureVector]| vec![Label::Faulty; batch.len()];
        let mut orch = Orchestrator::new(roster(&honesty, 5.0, &[]), config(10, 2))
            .with_classifier(Classifier::per_sample(all));
        let outcome = orch.run(&mut rng);

        let exclusions = outcome.exclusions.unwrap();
        assert_eq!(exclusions.len(), 3);
        for agent in orch.agents() {
            assert!(!agent.is_active());
            assert_eq!(exclusions[agent.id()], agent.audit_label().is_byzantine());
        }
        assert_eq!(outcome.active_count, 0);

        // Each agent's own record from round 0, not a repeat of the last one
        let ids: HashSet<&AgentId> = orch.history().iter().map(|r| r.report().agent_id()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(orch.history().len(), 3);
    }

    #[test]
    fn test_sequential_waits_for_full_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let model = move |batch: &[FeatureWindow]| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(batch.iter().all(|w| w.len() == 2));
            vec![Label::Faulty; batch.len()]
        };

        let mut orch = Orchestrator::new(roster(&honest(3), 5.0, &[]), config(5, 1))
            .with_classifier(Classifier::sequential(model, NonZeroUsize::new(2).unwrap()));

        orch.step(&mut rng);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.active_count(), 3);

        orch.step(&mut rng);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.active_count(), 0);

        let outcome = orch.run(&mut rng);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.history().len(), 6);
        assert_eq!(outcome.exclusions.map(|e| e.len()), Some(3));
    }

    #[test]
    fn test_custom_consensus_strategy() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let seen = |reports: &[TokenReport], active: usize| {
            assert_eq!(active, 2);
            crate::consensus::tally(reports).into_keys().collect::<TokenSet>()
        };

        let mut orch = Orchestrator::new(roster(&honest(2), 1000.0, &[(1.0, 1.0)]), config(2, 1)).with_consensus(seen);
        let outcome = orch.run(&mut rng);

        assert_eq!(outcome.tokens.len(), 1);
    }

    #[test]
    fn test_same_seed_same_run() {
        let honesty = [Honesty::Honest, Honesty::Byzantine, Honesty::Honest, Honesty::Honest];
        let tokens = [(40.0, 40.0), (55.0, 60.0), (20.0, 75.0)];

        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut orch = Orchestrator::new(roster(&honesty, 8.0, &tokens), config(50, 5));
            let outcome = orch.run(&mut rng);
            (outcome.tokens, orch.history().to_vec())
        };

        assert_eq!(run(9), run(9));
    }
}
