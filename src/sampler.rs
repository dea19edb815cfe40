//! Probabilistic boundary sampler
//!
//! Decides which traces are recorded. Uses a fast xorshift PRNG against a
//! precomputed threshold - lock-free, no allocations, safe for concurrent
//! use by many interceptor instances.

use std::sync::atomic::{AtomicU64, Ordering};

/// Probabilistic sampler
///
/// Samples traces with the given probability (0.0 to 1.0). A rate of zero
/// never samples and marks the whole tracer as a no-op.
pub struct Sampler {
    /// Threshold for sampling (0 = none, u64::MAX = all)
    threshold: u64,
    /// PRNG state
    state: AtomicU64,
}

impl Sampler {
    /// Create a sampler with the given rate (0.0 to 1.0)
    ///
    /// # Panics
    /// Panics if rate is not in [0.0, 1.0]. The tracer factory validates
    /// rates before construction and falls back to [`Sampler::never`].
    pub fn new(rate: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&rate),
            "sample rate must be between 0.0 and 1.0"
        );

        // Convert rate to threshold: floor(rate * (2^64 - 1)), computed
        // stably since 2^64 is exactly representable in f64.
        let threshold = if rate >= 1.0 {
            u64::MAX
        } else if rate <= 0.0 {
            0
        } else {
            let two64 = (1u64 << 32) as f64 * (1u64 << 32) as f64;
            let y = rate * two64;
            let t = y.floor();
            let frac = y - t;
            let t_u64 = t as u64;
            if frac < rate {
                t_u64.saturating_sub(1)
            } else {
                t_u64
            }
        };

        // Seed from system time (fallback to fixed seed if clock is misconfigured)
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0xDEADBEEF);

        Self {
            threshold,
            state: AtomicU64::new(seed | 1), // Ensure non-zero for xorshift
        }
    }

    /// Sampler that never records (the misconfiguration fallback)
    pub fn never() -> Self {
        Self::new(0.0)
    }

    /// Create sampler with explicit seed (for testing)
    pub fn with_seed(rate: f64, seed: u64) -> Self {
        let sampler = Self::new(rate);
        sampler.state.store(seed | 1, Ordering::Relaxed);
        sampler
    }

    /// True when no trace can ever be sampled
    pub fn is_never(&self) -> bool {
        self.threshold == 0
    }

    /// Generate next random number (xorshift64)
    ///
    /// Lock-free CAS loop. Under contention threads may retry but progress
    /// is always made.
    fn next_random(&self) -> u64 {
        loop {
            let old = self.state.load(Ordering::Acquire);

            let mut x = old;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;

            if self
                .state
                .compare_exchange_weak(old, x, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return x;
            }
        }
    }

    /// Decide whether the next trace should be recorded
    pub fn is_sampled(&self) -> bool {
        self.threshold != 0 && self.next_random() <= self.threshold
    }
}
