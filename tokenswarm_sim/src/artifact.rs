//! Classifier artifact loading.
//!
//! Artifacts are JSON. A per-sample artifact is a serialized
//! [`DecisionForest`]; a sequential artifact carries LSTM weights in the
//! row-major layout PyTorch exports (`weight_ih` is `4H x 4`, gate order
//! input, forget, cell, output).
//!
//! The kind selector is validated before the file is opened, so an
//! unsupported kind aborts setup without touching the filesystem.

use crate::error::SimError;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokenswarm_core::classifier::lstm::NUM_CLASSES;
use tokenswarm_core::classifier::{DecisionForest, LstmNetwork};
use tokenswarm_core::features::FEATURE_DIM;
use tokenswarm_core::{Classifier, ClassifierKind};
use tracing::info;

/// Default sequence length for sequential classifiers.
pub const DEFAULT_WINDOW: usize = 5;

/// Everything needed to build a classifier.
#[derive(Debug, Clone)]
pub struct ClassifierSpec {
    pub kind: ClassifierKind,
    pub path: PathBuf,

    /// Only used by the sequential kind
    pub window: NonZeroUsize,
}

impl ClassifierSpec {
    /// Parses the kind selector. Fails with `UnsupportedClassifierKind`.
    pub fn parse(kind: &str, path: impl Into<PathBuf>, window: NonZeroUsize) -> Result<Self, SimError> {
        Ok(Self {
            kind: kind.parse()?,
            path: path.into(),
            window,
        })
    }

    /// Reads and validates the artifact.
    pub fn load(&self) -> Result<Classifier, SimError> {
        let classifier = load_classifier(self.kind, &self.path, self.window)?;
        info!("Loaded {} classifier from {}", self.kind, self.path.display());
        Ok(classifier)
    }
}

/// Opens `path` and builds the classifier variant named by `kind`.
pub fn load_classifier(kind: ClassifierKind, path: &Path, window: NonZeroUsize) -> Result<Classifier, SimError> {
    let reader = BufReader::new(File::open(path)?);
    match kind {
        ClassifierKind::PerSample => Ok(Classifier::per_sample(read_forest(reader)?)),
        ClassifierKind::Sequential => Ok(Classifier::sequential(read_lstm(reader)?, window)),
    }
}

/// Parses and validates a decision forest.
pub fn read_forest<R: Read>(reader: R) -> Result<DecisionForest, SimError> {
    let forest: DecisionForest = serde_json::from_reader(reader)?;
    if !forest.is_well_formed() {
        return Err(SimError::malformed(
            "forest has no trees, a dangling child, or splits on an unknown feature",
        ));
    }
    Ok(forest)
}

/// LSTM weights as exported from training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmArtifact {
    pub hidden_size: usize,
    pub weight_ih: Vec<Vec<f64>>,
    pub weight_hh: Vec<Vec<f64>>,
    pub bias_ih: Vec<f64>,
    pub bias_hh: Vec<f64>,
    pub fc_weight: Vec<Vec<f64>>,
    pub fc_bias: Vec<f64>,
}

impl LstmArtifact {
    /// Checks every shape against `hidden_size` and assembles the network.
    pub fn into_network(self) -> Result<LstmNetwork, SimError> {
        let h = self.hidden_size;
        if h == 0 {
            return Err(SimError::malformed("hidden_size must be positive"));
        }

        let w_ih = matrix("weight_ih", &self.weight_ih, 4 * h, FEATURE_DIM)?;
        let w_hh = matrix("weight_hh", &self.weight_hh, 4 * h, h)?;
        let b_ih = vector("bias_ih", self.bias_ih, 4 * h)?;
        let b_hh = vector("bias_hh", self.bias_hh, 4 * h)?;
        let fc_w = matrix("fc_weight", &self.fc_weight, NUM_CLASSES, h)?;
        let fc_b = vector("fc_bias", self.fc_bias, NUM_CLASSES)?;

        LstmNetwork::new(w_ih, w_hh, b_ih, b_hh, fc_w, fc_b)
            .ok_or_else(|| SimError::malformed("inconsistent LSTM shapes"))
    }
}

/// Parses and validates LSTM weights.
pub fn read_lstm<R: Read>(reader: R) -> Result<LstmNetwork, SimError> {
    let artifact: LstmArtifact = serde_json::from_reader(reader)?;
    artifact.into_network()
}

fn matrix(name: &str, rows: &[Vec<f64>], nrows: usize, ncols: usize) -> Result<DMatrix<f64>, SimError> {
    if rows.len() != nrows || rows.iter().any(|r| r.len() != ncols) {
        return Err(SimError::malformed(format!("{} must be {}x{}", name, nrows, ncols)));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(nrows, ncols, &flat))
}

fn vector(name: &str, values: Vec<f64>, len: usize) -> Result<DVector<f64>, SimError> {
    if values.len() != len {
        return Err(SimError::malformed(format!("{} must have {} entries", name, len)));
    }
    Ok(DVector::from_vec(values))
}
