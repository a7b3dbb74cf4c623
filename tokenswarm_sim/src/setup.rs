//! Initial token placement and agent roster.
//!
//! Tokens are scattered uniformly over the field. Exactly
//! `floor(num_agents * byzantine_fraction)` agents are made faulty, chosen by
//! sampling indices without replacement.

use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::sync::Arc;
use tokenswarm_core::{Agent, AgentId, AgentParams, Coord, Field, Honesty, Token};

/// Parameters for building a swarm.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub field_width: f64,
    pub field_height: f64,
    pub num_tokens: usize,
    pub num_agents: usize,

    /// Random start positions; otherwise every agent starts at the center
    pub randomize: bool,

    pub movement_range: f64,
    pub scan_range: f64,

    /// Share of faulty agents, clamped to `[0, 1]`
    pub byzantine_fraction: f64,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            field_width: 100.0,
            field_height: 100.0,
            num_tokens: 10,
            num_agents: 10,
            randomize: true,
            movement_range: 10.0,
            scan_range: 5.0,
            byzantine_fraction: 0.3,
        }
    }
}

impl SetupConfig {
    pub fn field(&self) -> Field {
        Field::new(self.field_width.max(0.0), self.field_height.max(0.0))
    }

    pub fn byzantine_count(&self) -> usize {
        (self.num_agents as f64 * self.byzantine_fraction.clamp(0.0, 1.0)).floor() as usize
    }
}

/// Ground truth plus roster, ready to hand to an orchestrator.
#[derive(Debug, Clone)]
pub struct Swarm {
    pub tokens: Arc<[Token]>,
    pub agents: Vec<Agent>,
}

/// Builds tokens and agents from the given generator.
pub fn setup_simulation<R: Rng + ?Sized>(config: &SetupConfig, rng: &mut R) -> Swarm {
    let field = config.field();
    let xs = Uniform::new_inclusive(0.0, field.width);
    let ys = Uniform::new_inclusive(0.0, field.height);

    let tokens: Arc<[Token]> = (0..config.num_tokens)
        .map(|_| Token::new(xs.sample(rng), ys.sample(rng)))
        .collect();

    let byzantine = index::sample(rng, config.num_agents, config.byzantine_count());
    let mut honesty = vec![Honesty::Honest; config.num_agents];
    for i in byzantine.iter() {
        honesty[i] = Honesty::Byzantine;
    }

    let params = AgentParams {
        movement_range: config.movement_range,
        scan_range: config.scan_range,
    };

    let agents = honesty
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let id = AgentId::new(i, rng.gen_range(1000..=9999));
            let start = if config.randomize {
                Coord::new(xs.sample(rng), ys.sample(rng))
            } else {
                field.center()
            };
            Agent::new(id, field, start, params, h, tokens.clone())
        })
        .collect();

    Swarm { tokens, agents }
}
