//! Deterministic random streams for playback.
//!
//! Every random decision made during rendering (voice allocation jitter,
//! processor noise, control-variable fan-out) must be reproducible from the
//! module seed. Each subsystem owns a [`Random`] with a distinct context
//! label, so streams stay independent while deriving from one seed.
//!
//! The generator is a 64-bit linear congruential generator; it implements
//! [`rand::RngCore`] so call sites can use the full `rand` API.

use rand::RngCore;

const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Maximum length of a context label, bytes.
pub const CONTEXT_LEN_MAX: usize = 16;

/// A context-labelled deterministic random number generator.
#[derive(Debug, Clone)]
pub struct Random {
    context: [u8; CONTEXT_LEN_MAX],
    context_len: usize,
    seed: u64,
    state: u64,
}

impl Random {
    /// Create a generator with an empty context and seed 1.
    pub fn new() -> Self {
        let mut random = Self {
            context: [0; CONTEXT_LEN_MAX],
            context_len: 0,
            seed: 0,
            state: 0,
        };
        random.set_seed(1);
        random
    }

    /// Create a generator with the given context label.
    pub fn with_context(context: &str) -> Self {
        let mut random = Self::new();
        random.set_context(context);
        random
    }

    /// Set the context label and re-derive the stream from the current seed.
    ///
    /// The label must be at most [`CONTEXT_LEN_MAX`] bytes.
    pub fn set_context(&mut self, context: &str) {
        assert!(context.len() <= CONTEXT_LEN_MAX);
        self.context = [0; CONTEXT_LEN_MAX];
        self.context[..context.len()].copy_from_slice(context.as_bytes());
        self.context_len = context.len();
        self.set_seed(self.seed);
    }

    /// Seed the generator.
    ///
    /// The context label is folded into the numeric seed so generators with
    /// different labels produce independent streams from the same seed.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        let mut mixed = seed;
        for &byte in &self.context[..self.context_len] {
            mixed = mixed
                .wrapping_mul(MULTIPLIER)
                .wrapping_add(INCREMENT)
                ^ u64::from(byte);
        }
        self.state = mixed;
    }

    /// Rewind the stream to its seeded start.
    pub fn reset(&mut self) {
        let seed = self.seed;
        self.set_seed(seed);
    }

    /// The next 64 random bits.
    pub fn get_u64(&mut self) -> u64 {
        self.state = MULTIPLIER
            .wrapping_mul(self.state)
            .wrapping_add(INCREMENT);
        self.state
    }

    /// A float in `[0, 1)`.
    pub fn get_float_lb(&mut self) -> f64 {
        self.get_u64() as f64 / (u64::MAX as f64 + 1.0)
    }

    /// A float in `[0, 1]`.
    pub fn get_float_scale(&mut self) -> f64 {
        self.get_u64() as f64 / u64::MAX as f64
    }

    /// A float in `[-1, 1]`, symmetric around zero.
    pub fn get_float_signal(&mut self) -> f64 {
        let bits = (self.get_u64() >> 1) & !1u64;
        (bits as i64 - 0x3fff_ffff_ffff_ffff) as f64 / 0x3fff_ffff_ffff_ffff_i64 as f64
    }

    /// An index in `[0, size)`.
    pub fn get_index(&mut self, size: usize) -> usize {
        assert!(size > 0);
        ((self.get_u64() >> 33) as usize) % size
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        (self.get_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.get_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.get_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = Random::new();
        let mut b = Random::new();
        a.set_seed(42);
        b.set_seed(42);
        for _ in 0..100 {
            assert_eq!(a.get_u64(), b.get_u64());
        }
    }

    #[test]
    fn test_reset_rewinds_stream() {
        let mut random = Random::new();
        random.set_seed(7);
        let first: Vec<u64> = (0..10).map(|_| random.get_u64()).collect();
        random.reset();
        let second: Vec<u64> = (0..10).map(|_| random.get_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_contexts_produce_distinct_streams() {
        let mut a = Random::with_context("voices");
        let mut b = Random::with_context("procs");
        a.set_seed(1);
        b.set_seed(1);
        let same = (0..16).filter(|_| a.get_u64() == b.get_u64()).count();
        assert!(same < 16);
    }

    #[test]
    fn test_float_ranges() {
        let mut random = Random::new();
        random.set_seed(99);
        for _ in 0..1000 {
            let lb = random.get_float_lb();
            assert!((0.0..1.0).contains(&lb));
            let scale = random.get_float_scale();
            assert!((0.0..=1.0).contains(&scale));
            let signal = random.get_float_signal();
            assert!((-1.0..=1.0).contains(&signal));
        }
    }

    #[test]
    fn test_index_in_bounds() {
        let mut random = Random::new();
        for _ in 0..1000 {
            assert!(random.get_index(13) < 13);
        }
    }

    #[test]
    fn test_rng_core_gen_range() {
        use rand::Rng;
        let mut random = Random::with_context("test");
        random.set_seed(5);
        for _ in 0..100 {
            let v: f64 = random.gen_range(0.0..1.0);
            assert!((0.0..1.0).contains(&v));
        }
    }
}
