//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle used by every stochastic stage of the generator.
///
/// A master `seed: u64` is supplied by the caller (usually from the
/// configuration's seed policy). Substreams are derived by hashing
/// `(master_seed, substream_id)` with SipHash-1-3 under fixed zero keys, so
/// the optimizer, the singleton pass, the instantiator and the jitter pass
/// each draw from an independent, reproducible stream.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a handle for the given substream of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Well-known substream identifiers for the pipeline stages.
pub mod streams {
    /// Genetic search (population and variation).
    pub const OPTIMIZER: u64 = 0x0001;
    /// Singleton-presence insertion pass.
    pub const SINGLETON: u64 = 0x0002;
    /// Per-position condition sampling.
    pub const INSTANTIATE: u64 = 0x0003;
    /// Inter-trial interval jitter.
    pub const ITI_JITTER: u64 = 0x0004;
    /// Cue to stimulus delay jitter.
    pub const CUE_JITTER: u64 = 0x0005;
    /// Cue shuffling.
    pub const CUES: u64 = 0x0006;
}

/// Derives the seed for one block of one subject.
pub fn block_seed(master_seed: u64, subject_id: u32, block: u32) -> u64 {
    derive_substream_seed(master_seed, (subject_id as u64) << 32 | block as u64)
}
