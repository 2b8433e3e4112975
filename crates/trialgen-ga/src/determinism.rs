use trialgen_core::derive_substream_seed;
use trialgen_core::rng::streams;

/// Seed for the initial population.
pub fn population_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed, streams::OPTIMIZER)
}

/// Seed for parent selection in one generation.
pub fn selection_seed(master_seed: u64, generation: usize) -> u64 {
    derive_substream_seed(population_seed(master_seed), generation as u64)
}

/// Seed for the crossover and mutation of one offspring.
pub fn offspring_seed(master_seed: u64, generation: usize, slot: usize) -> u64 {
    let intermediate = derive_substream_seed(
        population_seed(master_seed) ^ 0xA5A5_A5A5_A5A5_A5A5,
        generation as u64,
    );
    derive_substream_seed(intermediate, slot as u64)
}

/// Seed for one singleton insertion attempt.
pub fn singleton_seed(master_seed: u64, attempt: usize) -> u64 {
    derive_substream_seed(
        derive_substream_seed(master_seed, streams::SINGLETON),
        attempt as u64,
    )
}
