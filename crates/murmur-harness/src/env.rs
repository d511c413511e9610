//! Deterministic `Environment` implementation for tests.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use murmur_core::env::Environment;

/// Virtual clock and seeded RNG.
///
/// Time only advances when [`TestEnv::advance`] is called or `sleep` runs;
/// random bytes come from a seeded xorshift so every run with the same seed
/// observes the same sequence.
#[derive(Clone)]
pub struct TestEnv {
    start: Instant,
    offset: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<u64>>,
}

impl TestEnv {
    /// A test environment with the default seed.
    pub fn new() -> Self {
        Self::with_seed(0x5eed_5eed_5eed_5eed)
    }

    /// A test environment with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            // xorshift needs a nonzero state
            rng: Arc::new(Mutex::new(seed | 1)),
        }
    }

    /// Advance the virtual clock.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for TestEnv {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let mut state = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        for byte in buffer.iter_mut() {
            *state ^= *state << 13;
            *state ^= *state >> 7;
            *state ^= *state << 17;
            *byte = (*state & 0xff) as u8;
        }
    }
}
