//! Single-layer LSTM for sequential classification.
//!
//! Runs a window of feature vectors through one LSTM layer (gate order
//! input, forget, cell, output) and maps the final hidden state through a
//! linear layer to two logits `[honest, faulty]`.

use super::{Label, SequenceModel};
use crate::features::{FeatureWindow, FEATURE_DIM};

use nalgebra::{DMatrix, DVector};

/// Number of output classes.
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct LstmNetwork {
    hidden: usize,

    /// `4H x FEATURE_DIM`
    w_ih: DMatrix<f64>,

    /// `4H x H`
    w_hh: DMatrix<f64>,

    /// Input and recurrent biases, pre-summed (`4H`)
    bias: DVector<f64>,

    /// `NUM_CLASSES x H`
    fc_w: DMatrix<f64>,

    /// `NUM_CLASSES`
    fc_b: DVector<f64>,
}

impl LstmNetwork {
    /// Assembles a network, or `None` if the shapes disagree.
    pub fn new(
        w_ih: DMatrix<f64>,
        w_hh: DMatrix<f64>,
        b_ih: DVector<f64>,
        b_hh: DVector<f64>,
        fc_w: DMatrix<f64>,
        fc_b: DVector<f64>,
    ) -> Option<Self> {
        let hidden = w_hh.ncols();
        let gates = 4 * hidden;

        let consistent = hidden > 0
            && w_ih.shape() == (gates, FEATURE_DIM)
            && w_hh.shape() == (gates, hidden)
            && b_ih.len() == gates
            && b_hh.len() == gates
            && fc_w.shape() == (NUM_CLASSES, hidden)
            && fc_b.len() == NUM_CLASSES;

        consistent.then(|| Self {
            hidden,
            w_ih,
            w_hh,
            bias: b_ih + b_hh,
            fc_w,
            fc_b,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden
    }

    /// Final-state logits for one window.
    pub fn logits(&self, window: &FeatureWindow) -> DVector<f64> {
        let h_len = self.hidden;
        let mut h = DVector::<f64>::zeros(h_len);
        let mut c = DVector::<f64>::zeros(h_len);

        for step in window {
            let x = DVector::from_row_slice(step.as_slice());
            let z = &self.w_ih * x + &self.w_hh * &h + &self.bias;

            let i = z.rows(0, h_len).map(sigmoid);
            let f = z.rows(h_len, h_len).map(sigmoid);
            let g = z.rows(2 * h_len, h_len).map(f64::tanh);
            let o = z.rows(3 * h_len, h_len).map(sigmoid);

            c = f.component_mul(&c) + i.component_mul(&g);
            h = o.component_mul(&c.map(f64::tanh));
        }

        &self.fc_w * h + &self.fc_b
    }

    /// Argmax over the logits; a tie is honest.
    pub fn classify(&self, window: &FeatureWindow) -> Label {
        let logits = self.logits(window);
        if logits[1] > logits[0] {
            Label::Faulty
        } else {
            Label::Honest
        }
    }
}

impl SequenceModel for LstmNetwork {
    fn predict(&self, batch: &[FeatureWindow]) -> Vec<Label> {
        batch.iter().map(|w| self.classify(w)).collect()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
