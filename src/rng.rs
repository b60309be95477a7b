//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` is a WELL19937a generator (Panneton, L'Ecuyer and
//! Matsumoto): a 624-word state with a period of 2^19937 - 1. Every stochastic
//! decision in the engine draws from one of these, and each thread owns its
//! own instance, so a fixed seed reproduces a run bit for bit.
//!
//! The generator also implements [`rand::RngCore`] and [`rand::SeedableRng`],
//! which makes the helpers of [`rand::Rng`] available on the same stream.
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::new(42);
//! let word = rng.next_u32();
//! let value = rng.uniform(-1.0, 2.0);
//! assert!((-1.0..1.0).contains(&value));
//!
//! let mut again = RandomNumberGenerator::new(42);
//! assert_eq!(again.next_u32(), word);
//! ```

use std::fmt;

use rand::{RngCore, SeedableRng};

const STATE_WORDS: usize = 624;
const DISCARD: u32 = 31;
const MASK_UPPER: u32 = u32::MAX >> (32 - DISCARD);
const MASK_LOWER: u32 = !MASK_UPPER;
const M1: usize = 70;
const M2: usize = 179;
const M3: usize = 449;

/// 2^32, the divisor turning a raw word into a value in `[0, 1)`.
const RANDOM_MAX: f64 = 4_294_967_296.0;

/// Which neighbours of the state cursor wrap around the end of the state array.
///
/// The cursor walks the state backwards, so the transition is chosen by the
/// cursor position instead of reducing every offset modulo the state length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Cursor at 0: both predecessors wrap to the end of the state.
    First,
    /// Cursor at 1: the second predecessor wraps.
    Second,
    /// `index + M1 >= R`: all three forward taps wrap.
    WrapM1,
    /// `index + M2 >= R`: the M2 and M3 taps wrap.
    WrapM2,
    /// `index + M3 >= R`: only the M3 tap wraps.
    WrapM3,
    /// `2 <= index < R - M3`: nothing wraps.
    Interior,
}

/// A seeded WELL19937a pseudo-random number generator.
#[derive(Clone)]
pub struct RandomNumberGenerator {
    state: Box<[u32; STATE_WORDS]>,
    index: usize,
    transition: Transition,
    z0: u32,
    z1: u32,
    z2: u32,
}

impl RandomNumberGenerator {
    /// Creates a generator whose state is derived deterministically from `seed`.
    pub fn new(seed: u32) -> Self {
        let mut rng = Self {
            state: Box::new([0; STATE_WORDS]),
            index: 0,
            transition: Transition::First,
            z0: 0,
            z1: 0,
            z2: 0,
        };
        rng.reseed(seed);
        rng
    }

    /// Resets the state as if the generator had just been created with `seed`.
    pub fn reseed(&mut self, seed: u32) {
        self.state[0] = seed;
        for i in 1..STATE_WORDS {
            let prev = self.state[i - 1];
            self.state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        self.index = 0;
        self.transition = Transition::First;
        self.z0 = 0;
        self.z1 = 0;
        self.z2 = 0;
    }

    /// Returns the next uniformly distributed 32 bit word.
    pub fn next_u32(&mut self) -> u32 {
        self.advance()
    }

    /// Returns a uniformly distributed value in `[min, min + range)`.
    pub fn uniform(&mut self, min: f64, range: f64) -> f64 {
        min + (f64::from(self.advance()) / RANDOM_MAX) * range
    }

    fn advance(&mut self) -> u32 {
        let i = self.index;
        let (rm1, rm2) = match self.transition {
            Transition::First => (STATE_WORDS - 1, STATE_WORDS - 2),
            Transition::Second => (0, STATE_WORDS - 1),
            _ => (i - 1, i - 2),
        };
        let (m1, m2, m3) = match self.transition {
            Transition::WrapM1 => (i + M1 - STATE_WORDS, i + M2 - STATE_WORDS, i + M3 - STATE_WORDS),
            Transition::WrapM2 => (i + M1, i + M2 - STATE_WORDS, i + M3 - STATE_WORDS),
            Transition::WrapM3 => (i + M1, i + M2, i + M3 - STATE_WORDS),
            _ => (i + M1, i + M2, i + M3),
        };

        let s = &mut self.state;
        let v0 = s[i];
        let vm1 = s[m1];
        let vm2 = s[m2];
        let vm3 = s[m3];

        self.z0 = (s[rm1] & MASK_LOWER) | (s[rm2] & MASK_UPPER);
        self.z1 = (v0 ^ (v0 << 25)) ^ (vm1 ^ (vm1 >> 27));
        self.z2 = (vm2 >> 9) ^ (vm3 ^ (vm3 >> 1));

        let new_v1 = self.z1 ^ self.z2;
        s[i] = new_v1;
        s[rm1] = self.z0
            ^ (self.z1 ^ (self.z1 << 9))
            ^ (self.z2 ^ (self.z2 << 21))
            ^ (new_v1 ^ (new_v1 >> 21));

        self.index = rm1;
        self.transition = match self.transition {
            Transition::First => Transition::WrapM1,
            Transition::Second => Transition::First,
            Transition::WrapM1 if rm1 + M1 < STATE_WORDS => Transition::WrapM2,
            Transition::WrapM2 if rm1 + M2 < STATE_WORDS => Transition::WrapM3,
            Transition::WrapM3 if rm1 + M3 < STATE_WORDS => Transition::Interior,
            Transition::Interior if rm1 == 1 => Transition::Second,
            unchanged => unchanged,
        };

        self.state[self.index]
    }
}

impl fmt::Debug for RandomNumberGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomNumberGenerator")
            .field("index", &self.index)
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}

impl RngCore for RandomNumberGenerator {
    fn next_u32(&mut self) -> u32 {
        self.advance()
    }

    /// Two consecutive words glued together, the first one in the high half.
    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.advance());
        let low = u64::from(self.advance());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.advance().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RandomNumberGenerator {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new((state ^ (state >> 32)) as u32)
    }
}
