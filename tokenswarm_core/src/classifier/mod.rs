//! Faulty-agent classifier adapter.
//!
//! Two closed variants share one batch-predict contract:
//!
//! | Variant | Input per agent | Ready when |
//! |---------|-----------------|------------|
//! | [`Classifier::PerSample`] | one [`FeatureVector`] | every report |
//! | [`Classifier::Sequential`] | a [`FeatureWindow`] | the agent's window is full |
//!
//! Models are plugged in through [`SampleModel`] / [`SequenceModel`]. Both
//! traits are implemented for plain closures, and this module ships one
//! concrete model per variant: [`DecisionForest`] and [`LstmNetwork`].
//! Reading model artifacts from disk is left to the caller.

pub mod forest;
pub mod lstm;

pub use forest::{DecisionForest, DecisionTree, TreeNode};
pub use lstm::LstmNetwork;

use crate::error::SwarmError;
use crate::features::{FeatureVector, FeatureWindow};

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Classifier verdict for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Honest,
    Faulty,
}

impl Label {
    /// Maps a class index (`0 = honest`, `1 = faulty`).
    ///
    /// Any index other than 1 is treated as honest.
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Label::Faulty
        } else {
            Label::Honest
        }
    }

    pub fn is_faulty(&self) -> bool {
        matches!(self, Label::Faulty)
    }
}

/// Predicts one label per feature vector, in input order.
pub trait SampleModel: Send + Sync {
    fn predict(&self, batch: &[FeatureVector]) -> Vec<Label>;
}

impl<F> SampleModel for F
where
    F: Fn(&[FeatureVector]) -> Vec<Label> + Send + Sync,
{
    fn predict(&self, batch: &[FeatureVector]) -> Vec<Label> {
        self(batch)
    }
}

/// Predicts one label per feature window, in input order.
pub trait SequenceModel: Send + Sync {
    fn predict(&self, batch: &[FeatureWindow]) -> Vec<Label>;
}

impl<F> SequenceModel for F
where
    F: Fn(&[FeatureWindow]) -> Vec<Label> + Send + Sync,
{
    fn predict(&self, batch: &[FeatureWindow]) -> Vec<Label> {
        self(batch)
    }
}

/// Which classifier variant to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    PerSample,
    Sequential,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::PerSample => "per_sample",
            ClassifierKind::Sequential => "sequential",
        }
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ClassifierKind {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per_sample" | "per-sample" | "random_forest" | "forest" => Ok(ClassifierKind::PerSample),
            "sequential" | "lstm" => Ok(ClassifierKind::Sequential),
            _ => Err(SwarmError::unsupported_kind(s)),
        }
    }
}

/// A configured classifier, one of exactly two variants.
pub enum Classifier {
    /// Classifies each report on its own
    PerSample(Box<dyn SampleModel>),

    /// Classifies the last `window` reports of an agent
    Sequential {
        model: Box<dyn SequenceModel>,
        window: NonZeroUsize,
    },
}

impl Classifier {
    pub fn per_sample(model: impl SampleModel + 'static) -> Self {
        Classifier::PerSample(Box::new(model))
    }

    pub fn sequential(model: impl SequenceModel + 'static, window: NonZeroUsize) -> Self {
        Classifier::Sequential {
            model: Box::new(model),
            window,
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::PerSample(_) => ClassifierKind::PerSample,
            Classifier::Sequential { .. } => ClassifierKind::Sequential,
        }
    }

    /// Window length for the sequential variant.
    pub fn window(&self) -> Option<NonZeroUsize> {
        match self {
            Classifier::PerSample(_) => None,
            Classifier::Sequential { window, .. } => Some(*window),
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("kind", &self.kind())
            .field("window", &self.window())
            .finish()
    }
}
