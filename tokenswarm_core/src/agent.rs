//! Mobile search agents.
//!
//! An agent wanders the field, records every ground-truth token that comes
//! within its scan range, and reports its findings when asked. A Byzantine
//! agent fabricates its report instead of telling the truth.
//!
//! All randomness is drawn from the generator passed in by the caller, so a
//! seeded generator reproduces a run exactly.

use crate::record::{AgentId, AuditLabel, CommunicationRecord, Coord, Honesty, Report, Token, TokenReport};

use nalgebra::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::sync::Arc;

/// Largest amount a faulty agent skews its reported token count by.
pub const MAX_COUNT_SKEW: i32 = 3;

/// Fabricated tokens land within this many scan ranges of the agent, per axis.
pub const FABRICATION_SPREAD: f64 = 2.0;

/// Rectangular search field `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub width: f64,
    pub height: f64,
}

impl Field {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Coord {
        Coord::new(self.width / 2.0, self.height / 2.0)
    }

    /// Clamps a point onto the field.
    pub fn clamp(&self, p: Coord) -> Coord {
        Coord::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }

    pub fn contains(&self, p: &Coord) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

/// Movement and sensing parameters.
#[derive(Debug, Clone, Copy)]
pub struct AgentParams {
    /// Full width of the per-axis step window (10 means +/-5)
    pub movement_range: f64,

    /// Tokens strictly closer than this are sensed
    pub scan_range: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            movement_range: 10.0,
            scan_range: 5.0,
        }
    }
}

/// A single searcher in the swarm.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    field: Field,
    params: AgentParams,
    position: Coord,
    honesty: Honesty,
    active: bool,

    /// Append-only, deduplicated by value
    found: Vec<Coord>,

    /// Ground truth this agent is able to sense
    sensible: Arc<[Token]>,
}

impl Agent {
    /// Creates an active agent. `start` is clamped onto the field.
    pub fn new(
        id: AgentId,
        field: Field,
        start: Coord,
        params: AgentParams,
        honesty: Honesty,
        sensible: Arc<[Token]>,
    ) -> Self {
        Self {
            id,
            field,
            params,
            position: field.clamp(start),
            honesty,
            active: true,
            found: Vec::new(),
            sensible,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn found_tokens(&self) -> &[Coord] {
        &self.found
    }

    pub fn params(&self) -> AgentParams {
        self.params
    }

    /// Ground truth for post-run evaluation only.
    pub fn audit_label(&self) -> AuditLabel {
        AuditLabel::from_honesty(self.honesty)
    }

    /// Takes a random step and clamps back onto the field.
    pub fn move_step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.active {
            return;
        }

        let half = self.params.movement_range.abs() / 2.0;
        let step = Uniform::new_inclusive(-half, half);
        let delta = Vector2::new(step.sample(rng), step.sample(rng));

        self.position = self.field.clamp(self.position + delta);
    }

    /// Records every sensible token within scan range not already found.
    pub fn scan(&mut self) {
        if !self.active {
            return;
        }

        for token in self.sensible.iter() {
            let pos = token.position();
            if nalgebra::distance(&self.position, &pos) < self.params.scan_range
                && !self.found.contains(&pos)
            {
                self.found.push(pos);
            }
        }
    }

    /// Produces this round's communication, or `None` once excluded.
    pub fn report<R: Rng + ?Sized>(&self, timestamp: u64, rng: &mut R) -> Option<CommunicationRecord> {
        if !self.active {
            return None;
        }

        let tokens = match self.honesty {
            Honesty::Honest => self.found.clone(),
            Honesty::Byzantine => {
                let skew = rng.gen_range(-MAX_COUNT_SKEW..=MAX_COUNT_SKEW);
                self.fabricate(skew, rng)
            }
        };

        let report = Report::new(self.id.clone(), timestamp, self.position, tokens);
        Some(CommunicationRecord::new(report, self.audit_label()))
    }

    /// Invents `max(0, found + skew)` tokens scattered around the agent.
    pub fn fabricate<R: Rng + ?Sized>(&self, skew: i32, rng: &mut R) -> TokenReport {
        let count = (self.found.len() as i64 + skew as i64).max(0) as usize;
        let spread = FABRICATION_SPREAD * self.params.scan_range.abs();
        let offset = Uniform::new_inclusive(-spread, spread);

        (0..count)
            .map(|_| self.position + Vector2::new(offset.sample(rng), offset.sample(rng)))
            .collect()
    }

    /// Permanently excludes the agent. There is no way back.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }
}
