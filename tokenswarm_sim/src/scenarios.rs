//! Preset swarm configurations.

use crate::setup::SetupConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// TS-001: default field, 30% faulty agents
    Baseline,

    /// TS-002: nobody lies
    HonestSwarm,

    /// TS-003: 60% faulty agents, majority vote alone cannot hold
    ByzantineMajority,

    /// TS-004: every agent starts at the field center
    CenterStart,

    /// TS-005: large field, few tokens, wide scanners
    SparseField,

    /// TS-006: 50 agents and 40 tokens
    Crowd,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::HonestSwarm,
            ScenarioId::ByzantineMajority,
            ScenarioId::CenterStart,
            ScenarioId::SparseField,
            ScenarioId::Crowd,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::HonestSwarm => "honest_swarm",
            ScenarioId::ByzantineMajority => "byzantine_majority",
            ScenarioId::CenterStart => "center_start",
            ScenarioId::SparseField => "sparse_field",
            ScenarioId::Crowd => "crowd",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "10 agents, 10 tokens, 30% byzantine on a 100x100 field",
            ScenarioId::HonestSwarm => "10 honest agents, consensus should never accept a fabrication",
            ScenarioId::ByzantineMajority => "10 agents, 60% byzantine, classifier has to carry the run",
            ScenarioId::CenterStart => "all agents start at the center instead of random positions",
            ScenarioId::SparseField => "300x300 field, 5 tokens, scan range 15",
            ScenarioId::Crowd => "50 agents, 40 tokens, 30% byzantine",
        }
    }

    /// Swarm parameters for this scenario.
    pub fn setup_config(&self) -> SetupConfig {
        let base = SetupConfig::default();
        match self {
            ScenarioId::Baseline => base,
            ScenarioId::HonestSwarm => SetupConfig {
                byzantine_fraction: 0.0,
                ..base
            },
            ScenarioId::ByzantineMajority => SetupConfig {
                byzantine_fraction: 0.6,
                ..base
            },
            ScenarioId::CenterStart => SetupConfig {
                randomize: false,
                ..base
            },
            ScenarioId::SparseField => SetupConfig {
                field_width: 300.0,
                field_height: 300.0,
                num_tokens: 5,
                scan_range: 15.0,
                ..base
            },
            ScenarioId::Crowd => SetupConfig {
                num_agents: 50,
                num_tokens: 40,
                ..base
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "ts-001" => Ok(ScenarioId::Baseline),
            "honest_swarm" | "honestswarm" | "honest" | "ts-002" => Ok(ScenarioId::HonestSwarm),
            "byzantine_majority" | "byzantinemajority" | "ts-003" => Ok(ScenarioId::ByzantineMajority),
            "center_start" | "centerstart" | "center" | "ts-004" => Ok(ScenarioId::CenterStart),
            "sparse_field" | "sparsefield" | "sparse" | "ts-005" => Ok(ScenarioId::SparseField),
            "crowd" | "ts-006" => Ok(ScenarioId::Crowd),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
