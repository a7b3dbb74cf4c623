//! JSON exporter for offline analysis.
//!
//! Writes the communication log in the flat layout classifier training
//! consumes, plus the run's consensus, detections and evaluation.

use crate::oracle::Evaluation;
use crate::runner::ScenarioResult;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tokenswarm_core::CommunicationRecord;

/// One communication record, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub robot_id: String,
    pub timestamp: u64,
    pub position: [f64; 2],
    pub reported_tokens: Vec<[f64; 2]>,
    pub num_reported_tokens: usize,
    pub is_byzantine: bool,
}

impl From<&CommunicationRecord> for LogEntry {
    fn from(record: &CommunicationRecord) -> Self {
        let report = record.report();
        let position = report.position();
        Self {
            robot_id: report.agent_id().to_string(),
            timestamp: report.timestamp(),
            position: [position.x, position.y],
            reported_tokens: report.tokens().iter().map(|t| [t.x, t.y]).collect(),
            num_reported_tokens: report.reported_count(),
            is_byzantine: record.audit().is_byzantine(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Run length in logical seconds
    pub duration_secs: u64,

    pub rounds: u64,

    /// Communication log in arrival order
    pub communications: Vec<LogEntry>,

    /// Accepted tokens, sorted
    pub consensus_tokens: Vec<[f64; 2]>,

    /// Excluded agent -> was it really byzantine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<BTreeMap<String, bool>>,

    pub evaluation: Evaluation,

    /// Final results
    pub passed: bool,
}

impl SimExport {
    /// Builds an export from a finished run.
    pub fn from_result(result: &ScenarioResult) -> Self {
        let mut tokens: Vec<_> = result.tokens.iter().copied().collect();
        tokens.sort();

        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            duration_secs: result.total_ticks,
            rounds: result.rounds,
            communications: result.history.iter().map(LogEntry::from).collect(),
            consensus_tokens: tokens.iter().map(|t| [t.x(), t.y()]).collect(),
            detected: result
                .exclusions
                .as_ref()
                .map(|audit| audit.iter().map(|(id, &b)| (id.to_string(), b)).collect()),
            evaluation: result.evaluation.clone(),
            passed: result.passed,
        }
    }

    /// Writes export to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;

    #[test]
    fn test_export_mirrors_result() {
        let result = ScenarioRunner::new(5).with_duration(40).run(ScenarioId::Baseline).unwrap();

        let export = SimExport::from_result(&result);

        assert_eq!(export.scenario, "baseline");
        assert_eq!(export.communications.len(), result.history.len());
        assert_eq!(export.consensus_tokens.len(), result.tokens.len());
        assert!(export.detected.is_none());
        assert!(export
            .communications
            .iter()
            .all(|e| e.num_reported_tokens == e.reported_tokens.len()));
        assert!(export.consensus_tokens.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_log_entry_field_names() {
        let result = ScenarioRunner::new(5).with_duration(1).run(ScenarioId::Baseline).unwrap();
        let entry = LogEntry::from(&result.history[0]);

        let json = serde_json::to_value(&entry).unwrap();

        for key in ["robot_id", "timestamp", "position", "reported_tokens", "num_reported_tokens", "is_byzantine"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["timestamp"], 0);
    }

    #[test]
    fn test_write_to_file() {
        let result = ScenarioRunner::new(8).with_duration(20).run(ScenarioId::HonestSwarm).unwrap();
        let export = SimExport::from_result(&result);
        let path = std::env::temp_dir().join(format!("tokenswarm_export_{}.json", std::process::id()));

        export.write_to_file(&path).unwrap();
        let back: SimExport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.seed, 8);
        assert_eq!(back.communications.len(), export.communications.len());
        assert_eq!(back.communications[0].robot_id, export.communications[0].robot_id);
        assert!(back.passed);
    }
}
