use crate::{rng, AgentId, SplitMix64};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, seed: u64) -> Self {
        Self {
            tick,
            dt_seconds: 0.05,
            seed,
        }
    }

    /// The same context one tick later.
    pub fn next(&self) -> Self {
        Self {
            tick: self.tick.wrapping_add(1),
            ..*self
        }
    }

    /// RNG stream private to `(agent, stream)` on this tick.
    ///
    /// Two calls with the same inputs on the same tick yield the same sequence; the tick is mixed
    /// in so consecutive ticks draw independent values.
    pub fn rng_for_agent<A: AgentId>(&self, agent: A, stream: u64) -> SplitMix64 {
        let global = self.seed ^ rng::mix64(self.tick);
        let seed = rng::derive_seed(global, agent.stable_id(), stream);
        SplitMix64::new(seed)
    }
}
