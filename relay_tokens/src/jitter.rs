//! Utilities for spreading out instances that start at the same time

use std::time::Duration;

/// A type that picks how long a periodic task waits before its first run
pub trait JitterSource {
    /// Picks a delay no longer than `cadence`
    fn initial_delay(&mut self, cadence: Duration) -> Duration;
}

/// A jitter source that never delays
#[derive(Debug)]
pub struct NullJitter;

impl JitterSource for NullJitter {
    #[inline]
    fn initial_delay(&mut self, _cadence: Duration) -> Duration {
        Duration::ZERO
    }
}

#[cfg(feature = "rand")]
mod random {
    use std::time::Duration;

    use rand::{Rng, SeedableRng};

    /// Delays the first run by a random fraction of the cadence
    ///
    /// Delays are uniformly distributed over `[0, cadence)` at millisecond
    /// granularity.
    #[derive(Debug)]
    pub struct RandomStartJitter<R> {
        rand_source: R,
    }

    impl RandomStartJitter<rand::rngs::StdRng> {
        /// Constructs a jitter source seeded from the operating system
        pub fn new() -> Self {
            Self::with_rng(rand::rngs::StdRng::from_entropy())
        }
    }

    impl Default for RandomStartJitter<rand::rngs::StdRng> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<R> RandomStartJitter<R> {
        /// Constructs a jitter source drawing from `rand_source`
        pub fn with_rng(rand_source: R) -> Self {
            Self { rand_source }
        }
    }

    impl<R: Rng> super::JitterSource for RandomStartJitter<R> {
        fn initial_delay(&mut self, cadence: Duration) -> Duration {
            let max = u64::try_from(cadence.as_millis()).unwrap_or(u64::MAX);
            if max == 0 {
                return Duration::ZERO;
            }
            Duration::from_millis(self.rand_source.gen_range(0..max))
        }
    }
}

#[cfg(feature = "rand")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand")))]
pub use random::RandomStartJitter;
