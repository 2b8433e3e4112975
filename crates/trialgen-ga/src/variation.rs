use rand::seq::index;
use rand::Rng;

use crate::constraints::{ConstraintSet, Gene, Genome};

/// Draws a uniformly random genome.
pub fn random_genome<R: Rng + ?Sized>(num_genes: usize, alphabet_len: usize, rng: &mut R) -> Genome {
    (0..num_genes)
        .map(|_| rng.gen_range(0..alphabet_len) as Gene)
        .collect()
}

/// Single-point crossover: head of `first`, tail of `second`.
pub fn single_point_crossover<R: Rng + ?Sized>(first: &[Gene], second: &[Gene], rng: &mut R) -> Genome {
    let len = first.len().min(second.len());
    if len < 2 {
        return first.to_vec();
    }
    let point = rng.gen_range(1..len);
    let mut child = Vec::with_capacity(len);
    child.extend_from_slice(&first[..point]);
    child.extend_from_slice(&second[point..len]);
    child
}

/// Replaces `genes` distinct positions with uniformly drawn gene values.
pub fn random_mutation<R: Rng + ?Sized>(
    genome: &mut [Gene],
    alphabet_len: usize,
    genes: usize,
    rng: &mut R,
) {
    let amount = genes.min(genome.len());
    if amount == 0 || alphabet_len == 0 {
        return;
    }
    for position in index::sample(rng, genome.len(), amount) {
        genome[position] = rng.gen_range(0..alphabet_len) as Gene;
    }
}

/// Moves genes that break adjacency rules (or the anchor) to positions where
/// they do not.
///
/// A gene is first swapped with a partner elsewhere in the genome, which
/// keeps every gene count intact. When no partner fits, the gene is
/// overwritten with the first alphabet value that is legal in place, leaving
/// the count drift to the proportion penalty. Returns the number of edits.
pub fn repair_adjacency<R: Rng + ?Sized>(
    genome: &mut [Gene],
    constraints: &ConstraintSet,
    rng: &mut R,
) -> usize {
    let len = genome.len();
    if len == 0 || constraints.alphabet_len() == 0 {
        return 0;
    }
    let mut edits = 0usize;

    if let Some(anchor) = constraints.anchor {
        if genome[0] != anchor {
            let mut swapped = false;
            for partner in 1..len {
                if genome[partner] == anchor && swap_fits(genome, constraints, 0, partner) {
                    genome.swap(0, partner);
                    swapped = true;
                    break;
                }
            }
            if !swapped {
                genome[0] = anchor;
            }
            edits += 1;
        }
    }

    let protect_anchor = constraints.anchor.is_some();
    for position in 0..len {
        if !constraints.rules.iter().any(|rule| rule.breaks_at(genome, position)) {
            continue;
        }
        if protect_anchor && position == 0 {
            continue;
        }
        if swap_with_partner(genome, constraints, position, protect_anchor, rng)
            || overwrite_in_place(genome, constraints, position)
        {
            edits += 1;
        }
    }
    edits
}

fn swap_with_partner<R: Rng + ?Sized>(
    genome: &mut [Gene],
    constraints: &ConstraintSet,
    position: usize,
    protect_anchor: bool,
    rng: &mut R,
) -> bool {
    let len = genome.len();
    let start = rng.gen_range(0..len);
    for offset in 0..len {
        let partner = (start + offset) % len;
        if partner == position
            || (protect_anchor && partner == 0)
            || genome[partner] == genome[position]
        {
            continue;
        }
        if swap_fits(genome, constraints, position, partner) {
            genome.swap(position, partner);
            return true;
        }
    }
    false
}

/// Whether swapping `a` and `b` leaves both positions free of violations.
fn swap_fits(genome: &mut [Gene], constraints: &ConstraintSet, a: usize, b: usize) -> bool {
    genome.swap(a, b);
    let fits = constraints.fits_at(genome, a) && constraints.fits_at(genome, b);
    genome.swap(a, b);
    fits
}

fn overwrite_in_place(genome: &mut [Gene], constraints: &ConstraintSet, position: usize) -> bool {
    let original = genome[position];
    for value in 0..constraints.alphabet_len() as Gene {
        if value == original {
            continue;
        }
        genome[position] = value;
        if constraints.fits_at(genome, position) {
            return true;
        }
    }
    genome[position] = original;
    false
}
