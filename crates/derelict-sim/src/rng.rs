//! Seeded, replayable randomness.
//!
//! Every roll builds a fresh ChaCha8 stream from the process-wide seed mixed
//! with a stream tag and two call-specific values (a job or drone id and the
//! tick counter). Nothing about a roll depends on how many other rolls
//! happened before it, so a restored save replays identically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Independent roll streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollStream {
    JobRisk = 1,
    JobGlitch = 2,
    DroneRepair = 3,
    Reboot = 4,
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive the seed for one roll.
pub fn derive_seed(seed: u64, stream: RollStream, a: u64, b: u64) -> u64 {
    mix(mix(mix(seed ^ (stream as u64).rotate_left(56)) ^ a) ^ b)
}

/// Uniform sample in [0, 1).
pub fn roll(seed: u64, stream: RollStream, a: u64, b: u64) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, stream, a, b));
    rng.gen::<f64>()
}

/// True with probability `p` (clamped to [0, 1]).
pub fn chance(p: f64, seed: u64, stream: RollStream, a: u64, b: u64) -> bool {
    let p = p.clamp(0.0, 1.0);
    p > 0.0 && roll(seed, stream, a, b) < p
}
