use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shared random source for the engines' stochastic heuristics.
///
/// Clones share the same generator, so a suite seeded once produces one
/// reproducible sequence across all engines.
#[derive(Clone, Debug)]
pub struct EngineRng {
    source: Source,
}

#[derive(Clone, Debug)]
enum Source {
    Std(Arc<Mutex<StdRng>>),
    /// Every unit draw returns the same fraction of the requested range.
    Fixed(f64),
}

impl EngineRng {
    pub fn seeded(seed: u64) -> Self {
        Self { source: Source::Std(Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))) }
    }

    pub fn from_entropy() -> Self {
        Self { source: Source::Std(Arc::new(Mutex::new(StdRng::from_entropy()))) }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Constant source: `unit()` always yields `fraction` (clamped to `[0, 1)`), and
    /// ranged draws land at that fraction of their range.
    pub fn fixed(fraction: f64) -> Self {
        Self { source: Source::Fixed(fraction.clamp(0.0, 1.0 - f64::EPSILON)) }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        match &self.source {
            Source::Std(rng) => with_rng(rng, |rng| rng.gen::<f64>()),
            Source::Fixed(fraction) => *fraction,
        }
    }

    /// Uniform draw in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn uniform(&self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        match &self.source {
            Source::Std(rng) => with_rng(rng, |rng| rng.gen_range(lo..hi)),
            Source::Fixed(fraction) => lo + (hi - lo) * fraction,
        }
    }

    /// Uniform integer draw in `[lo, hi]`.
    pub fn int_inclusive(&self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        match &self.source {
            Source::Std(rng) => with_rng(rng, |rng| rng.gen_range(lo..=hi)),
            Source::Fixed(fraction) => {
                let span = (hi - lo + 1) as f64;
                (lo + (span * fraction).floor() as i64).min(hi)
            }
        }
    }
}

fn with_rng<R>(rng: &Mutex<StdRng>, draw: impl FnOnce(&mut StdRng) -> R) -> R {
    match rng.lock() {
        Ok(mut rng) => draw(&mut rng),
        Err(poisoned) => draw(&mut poisoned.into_inner()),
    }
}

impl Default for EngineRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
