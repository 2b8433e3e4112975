use rand::Rng;

/// Stochastic universal sampling over non-negative fitness values.
///
/// Draws `count` indices with evenly spaced pointers over the cumulative
/// fitness, so the returned indices are ascending. When every fitness is zero
/// the draw falls back to uniform sampling with replacement.
pub fn stochastic_universal<R: Rng + ?Sized>(fitness: &[f64], count: usize, rng: &mut R) -> Vec<usize> {
    if fitness.is_empty() || count == 0 {
        return Vec::new();
    }
    let total: f64 = fitness.iter().map(|value| value.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        let mut picks: Vec<usize> = (0..count).map(|_| rng.gen_range(0..fitness.len())).collect();
        picks.sort_unstable();
        return picks;
    }
    let spacing = total / count as f64;
    let start = rng.gen::<f64>() * spacing;
    let mut selected = Vec::with_capacity(count);
    let mut cumulative = fitness[0].max(0.0);
    let mut index = 0usize;
    for pointer in 0..count {
        let target = start + pointer as f64 * spacing;
        while cumulative <= target && index + 1 < fitness.len() {
            index += 1;
            cumulative += fitness[index].max(0.0);
        }
        selected.push(index);
    }
    selected
}
