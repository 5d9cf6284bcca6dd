//! Deterministic random stream provider.
//!
//! Two modes are offered:
//!
//! - **Keyed (derived) mode**: every draw is made from a fresh stream derived
//!   from `(base seed, tick, key, channel)`. The result depends only on that
//!   tuple, never on how many other draws happened first, so per-machine
//!   logic can run in any order (or in parallel) and still reproduce.
//! - **Stateful mode**: sequential draws from one shared stream. Simpler for
//!   one-off callers, but the result of each draw depends on every draw made
//!   before it, so call order is part of the determinism contract.
//!
//! [`RandomStreams::begin_tick`] must be called at every tick boundary before
//! any keyed draw for that tick. The orchestrator does this automatically.

use crate::fixed::Ticks;
use crate::hash::fnv1a_32;
use crate::rng::SimRng;

/// Lower/upper clamp on uniform draws feeding `ln()`.
const UNIT_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Namespace separating independent random processes of the same entity.
///
/// Two decisions for one machine that use different channels never share a
/// stream, so they cannot spuriously correlate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(pub u32);

impl Channel {
    pub const FAILURES: Channel = Channel(0);
    pub const BEHAVIOR: Channel = Channel(1);
    pub const QUALITY: Channel = Channel(2);
    pub const ARRIVALS: Channel = Channel(3);
    pub const TIMING: Channel = Channel(4);
}

impl From<u32> for Channel {
    fn from(v: u32) -> Self {
        Channel(v)
    }
}

// ---------------------------------------------------------------------------
// Seed mixing
// ---------------------------------------------------------------------------

/// Avalanche-mix two 32-bit values: FNV-style xor/multiply, then two
/// xor-shift/multiply rounds.
#[inline]
pub fn mix_seed(a: u32, b: u32) -> u32 {
    let mut x = a ^ 0x811C_9DC5;
    x ^= b;
    x = x.wrapping_mul(16_777_619);
    x ^= x >> 13;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 16;
    x
}

/// Derive the 32-bit stream seed for one `(seed, tick, key, channel)` tuple.
pub fn derive_seed(base_seed: u32, tick: Ticks, key: &str, channel: Channel) -> u32 {
    // Ticks are folded to 32 bits; at a 0.01 s floor that is ~497 days of
    // sim time before wrap.
    let mut s = base_seed;
    s = mix_seed(s, tick as u32);
    s = mix_seed(s, fnv1a_32(key));
    mix_seed(s, channel.0)
}

// ---------------------------------------------------------------------------
// RandomStreams
// ---------------------------------------------------------------------------

/// Session-wide random stream provider.
#[derive(Debug, Clone)]
pub struct RandomStreams {
    base_seed: u32,
    tick: Ticks,
    /// Shared stream for stateful mode.
    sequential: SimRng,
}

impl RandomStreams {
    pub fn new(base_seed: u32) -> Self {
        Self {
            base_seed,
            tick: 0,
            sequential: SimRng::new(base_seed as u64),
        }
    }

    /// Reset to a new base seed. Rewinds the tick index and the stateful
    /// stream.
    pub fn initialize(&mut self, base_seed: u32) {
        self.base_seed = base_seed;
        self.tick = 0;
        self.sequential = SimRng::new(base_seed as u64);
    }

    /// Record the current tick index for subsequent keyed draws.
    pub fn begin_tick(&mut self, tick: Ticks) {
        self.tick = tick;
    }

    pub fn base_seed(&self) -> u32 {
        self.base_seed
    }

    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    // -- Keyed mode ---------------------------------------------------------

    /// A fresh stream for `(seed, tick, key, channel)`. The same tuple always
    /// yields the same sequence.
    pub fn derived_stream(&self, key: &str, channel: Channel) -> SimRng {
        SimRng::new(derive_seed(self.base_seed, self.tick, key, channel) as u64)
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn uniform_int(&self, key: &str, channel: Channel, min: i32, max: i32) -> i32 {
        self.derived_stream(key, channel).range_i32(min, max)
    }

    /// Uniform float in `[min, max)`.
    pub fn uniform_float(&self, key: &str, channel: Channel, min: f64, max: f64) -> f64 {
        self.derived_stream(key, channel).range_f64(min, max)
    }

    /// Exponentially distributed duration with the given mean.
    ///
    /// # Panics
    ///
    /// Panics if `mean` is not strictly positive.
    pub fn exponential_from_mean(&self, key: &str, channel: Channel, mean: f64) -> f64 {
        assert!(mean > 0.0, "exponential mean must be > 0, got {mean}");
        let u = self.derived_stream(key, channel).next_f64();
        exponential(u, 1.0 / mean)
    }

    /// Whether a Poisson process with rate `lambda` fires at least once
    /// during a step of `delta_secs`. `delta_secs <= 0` never fires.
    ///
    /// # Panics
    ///
    /// Panics if `lambda` is not strictly positive.
    pub fn bernoulli_event_in_step(
        &self,
        key: &str,
        channel: Channel,
        lambda: f64,
        delta_secs: f64,
    ) -> bool {
        assert!(lambda > 0.0, "event rate must be > 0, got {lambda}");
        if delta_secs <= 0.0 {
            return false;
        }
        let p = 1.0 - (-lambda * delta_secs).exp();
        self.derived_stream(key, channel).next_f64() < p
    }

    /// Draw one uniform float per key in parallel. Equivalent to calling
    /// [`uniform_float`](Self::uniform_float) for each key in turn.
    #[cfg(feature = "parallel")]
    pub fn uniform_floats_par(
        &self,
        keys: &[&str],
        channel: Channel,
        min: f64,
        max: f64,
    ) -> Vec<f64> {
        use rayon::prelude::*;
        keys.par_iter()
            .map(|key| self.uniform_float(key, channel, min, max))
            .collect()
    }

    // -- Stateful mode ------------------------------------------------------

    /// Next integer in `[min, max]` from the shared stream.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        self.sequential.range_i32(min, max)
    }

    /// Next probability in `[0, 1)` from the shared stream.
    pub fn next_probability(&mut self) -> f64 {
        self.sequential.next_f64()
    }

    /// Exponential sample with rate `lambda` from the shared stream.
    ///
    /// # Panics
    ///
    /// Panics if `lambda` is not strictly positive.
    pub fn sample_exponential(&mut self, lambda: f64) -> f64 {
        assert!(lambda > 0.0, "exponential rate must be > 0, got {lambda}");
        let u = self.sequential.next_f64();
        exponential(u, lambda)
    }

    /// Stateful counterpart of
    /// [`bernoulli_event_in_step`](Self::bernoulli_event_in_step).
    ///
    /// # Panics
    ///
    /// Panics if `lambda` is not strictly positive.
    pub fn event_occurs_in_step(&mut self, lambda: f64, delta_secs: f64) -> bool {
        assert!(lambda > 0.0, "event rate must be > 0, got {lambda}");
        if delta_secs <= 0.0 {
            return false;
        }
        let p = 1.0 - (-lambda * delta_secs).exp();
        self.sequential.next_f64() < p
    }
}

#[inline]
fn exponential(u: f64, lambda: f64) -> f64 {
    let u = u.clamp(UNIT_EPSILON, 1.0 - UNIT_EPSILON);
    -u.ln() / lambda
}

// ===========================================================================
// Tests
// ===========================================================================
