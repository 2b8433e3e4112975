use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trialgen_core::{format_labels, RngHandle, TrialLabel, TrialgenError};

use crate::config::GaConfig;
use crate::constraints::{ConstraintSet, Genome};
use crate::determinism;
use crate::fitness::{self, FitnessBounds, FitnessBreakdown};
use crate::metrics::{FitnessHistory, GenerationSample};
use crate::selection;
use crate::variation;

/// Result of one optimizer run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizeSummary {
    /// Best genome found.
    pub genome: Genome,
    /// Best genome decoded into labels.
    pub labels: Vec<TrialLabel>,
    /// Fitness breakdown of the best genome.
    pub fitness: FitnessBreakdown,
    /// Normalisation bounds used for scoring.
    pub bounds: FitnessBounds,
    /// Generations evaluated after the initial population.
    pub generations_completed: usize,
    /// Whether the fitness threshold ended the search.
    pub stopped_early: bool,
    /// Occurrences of each label in the best sequence.
    pub label_counts: BTreeMap<String, usize>,
    /// Per-generation fitness samples.
    pub history: Vec<GenerationSample>,
}

struct Scored {
    genome: Genome,
    fitness: FitnessBreakdown,
}

/// Runs the generational search with the provided configuration and seed.
///
/// The search never fails on constraint residue: the best individual seen is
/// returned and any remaining violations are logged as warnings.
pub fn optimize(config: &GaConfig, seed: u64) -> Result<OptimizeSummary, TrialgenError> {
    config.validate()?;
    let constraints = config.constraints()?;
    let bounds = FitnessBounds::for_constraints(&constraints, config.num_trials);
    let genes_to_mutate = config.genes_to_mutate();

    let mut init_rng = RngHandle::from_seed(determinism::population_seed(seed));
    let mut population: Vec<Scored> = (0..config.sol_per_pop)
        .map(|_| {
            let mut genome =
                variation::random_genome(config.num_trials, constraints.alphabet_len(), &mut init_rng);
            if config.repair_adjacency {
                variation::repair_adjacency(&mut genome, &constraints, &mut init_rng);
            }
            score(genome, &constraints, &bounds)
        })
        .collect();
    sort_by_fitness(&mut population);

    let mut history = FitnessHistory::new();
    history.record(0, &population[0].fitness, &normalized(&population));
    let mut best_genome = population[0].genome.clone();
    let mut best_fitness = population[0].fitness.clone();
    let mut generations_completed = 0usize;
    let mut stopped_early = false;

    for generation in 0..config.num_generations {
        let fitness_values = windowed(&population);
        let mut selection_rng =
            RngHandle::from_seed(determinism::selection_seed(seed, generation));
        let parents = selection::stochastic_universal(
            &fitness_values,
            config.num_parents_mating,
            &mut selection_rng,
        );

        let mut next: Vec<Scored> = population
            .iter()
            .take(config.keep_parents)
            .map(|elite| Scored {
                genome: elite.genome.clone(),
                fitness: elite.fitness.clone(),
            })
            .collect();
        for slot in 0..config.sol_per_pop - config.keep_parents {
            let mut rng = RngHandle::from_seed(determinism::offspring_seed(seed, generation, slot));
            let first = &population[parents[slot % parents.len()]].genome;
            let second = &population[parents[(slot + 1) % parents.len()]].genome;
            let mut child = variation::single_point_crossover(first, second, &mut rng);
            variation::random_mutation(
                &mut child,
                constraints.alphabet_len(),
                genes_to_mutate,
                &mut rng,
            );
            if config.repair_adjacency {
                variation::repair_adjacency(&mut child, &constraints, &mut rng);
            }
            next.push(score(child, &constraints, &bounds));
        }
        sort_by_fitness(&mut next);
        population = next;
        generations_completed = generation + 1;

        let leader = &population[0];
        history.record(generations_completed, &leader.fitness, &normalized(&population));
        if leader.fitness.normalized > best_fitness.normalized {
            best_genome = leader.genome.clone();
            best_fitness = leader.fitness.clone();
            debug!(
                generation = generations_completed,
                fitness = best_fitness.normalized,
                "new best sequence"
            );
        }
        if best_fitness.normalized >= config.fitness_threshold {
            info!(
                threshold = config.fitness_threshold,
                generation = generations_completed,
                proportion_penalty = best_fitness.proportion_penalty,
                max_count_deviation = best_fitness.max_count_deviation,
                "fitness threshold reached, stopping early"
            );
            stopped_early = true;
            break;
        }
    }

    let labels = constraints.decode(&best_genome);
    let label_counts = count_labels(&labels);
    info!(
        generations = generations_completed,
        fitness = best_fitness.normalized,
        counts = ?label_counts,
        "optimizer finished"
    );
    debug!(sequence = %format_labels(&labels), "best label sequence");
    report_residue(&best_fitness);

    Ok(OptimizeSummary {
        genome: best_genome,
        labels,
        fitness: best_fitness,
        bounds,
        generations_completed,
        stopped_early,
        label_counts,
        history: history.into_samples(),
    })
}

fn score(genome: Genome, constraints: &ConstraintSet, bounds: &FitnessBounds) -> Scored {
    let fitness = fitness::evaluate(&genome, constraints, bounds);
    Scored { genome, fitness }
}

fn sort_by_fitness(population: &mut [Scored]) {
    population.sort_by(|a, b| {
        b.fitness
            .normalized
            .partial_cmp(&a.fitness.normalized)
            .unwrap_or(Ordering::Equal)
    });
}

/// Selection weights relative to the weakest individual of the generation.
fn windowed(population: &[Scored]) -> Vec<f64> {
    let values = normalized(population);
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);
    values.iter().map(|value| value - floor).collect()
}

fn normalized(population: &[Scored]) -> Vec<f64> {
    population
        .iter()
        .map(|individual| individual.fitness.normalized)
        .collect()
}

/// Occurrences of every label, keyed by its rendered form.
pub fn count_labels(labels: &[TrialLabel]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

fn report_residue(fitness: &FitnessBreakdown) {
    if fitness.adjacency_violations > 0 {
        warn!(
            violations = fitness.adjacency_violations,
            "best sequence still breaks adjacency rules"
        );
    }
    if fitness.anchor_violated {
        warn!("best sequence does not open with the anchor category");
    }
    if fitness.max_count_deviation > 1.0 {
        warn!(
            deviation = fitness.max_count_deviation,
            "category counts deviate from their targets by more than one trial"
        );
    }
}
