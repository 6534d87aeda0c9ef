//! Population-level operations shared by every backend.
//!
//! A population is a fixed-size `Vec<Individual>`. Index 0 is the elitism
//! slot: it receives the best individual of the previous generation verbatim
//! and is never mutated. All backends replace the population wholesale at
//! each generation boundary; no resizing ever happens mid-run.

use rand::Rng;

use super::individual::Individual;
use super::rng::{RngPhase, RngStream};
use crate::schema::{GaConfig, ItemCatalog};

/// Position and fitness of a best-so-far candidate.
///
/// Used as the merge value when best-of-population is computed from partial
/// per-partition results. [`BestIndex::better`] is associative and
/// commutative, so the merged result is independent of how the index range
/// was partitioned across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestIndex {
    /// Index into the population.
    pub index: usize,
    /// Fitness at that index.
    pub fitness: i64,
}

impl BestIndex {
    /// Merge two candidates: higher fitness wins, ties go to the lower index.
    pub fn better(self, other: BestIndex) -> BestIndex {
        if other.fitness > self.fitness
            || (other.fitness == self.fitness && other.index < self.index)
        {
            other
        } else {
            self
        }
    }
}

/// Scan `population[offset..]` for its best individual.
///
/// `offset` is the absolute index of the first element so partial scans can
/// be merged with [`BestIndex::better`]. The scan keeps the first encountered
/// maximum (strict `>`), which is the lowest index within the range.
pub fn best_of(population: &[Individual], offset: usize) -> BestIndex {
    let mut best = BestIndex {
        index: offset,
        fitness: population[0].fitness,
    };
    for (i, other) in population.iter().enumerate().skip(1) {
        if other.fitness > best.fitness {
            best = BestIndex {
                index: offset + i,
                fitness: other.fitness,
            };
        }
    }
    best
}

/// Pick the best of `tournament_size` uniformly-random draws (with
/// replacement). Ties keep the earlier draw.
pub fn tournament<'a>(
    rng: &mut impl Rng,
    population: &'a [Individual],
    tournament_size: usize,
) -> &'a Individual {
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..tournament_size {
        let other = &population[rng.gen_range(0..population.len())];
        if other.fitness > best.fitness {
            best = other;
        }
    }
    best
}

/// Create the generation-0 population. Each element draws from its own
/// index-keyed stream, so the initial population is the same no matter how
/// (or whether) this loop is parallelized.
pub fn initial_population(
    catalog: &ItemCatalog,
    config: &GaConfig,
    stream: &RngStream,
) -> Vec<Individual> {
    (0..config.population_size)
        .map(|i| Individual::random(catalog, &mut stream.at(0, RngPhase::Init, i)))
        .collect()
}

/// Breed the child for `index` of the next generation: two tournament
/// winners from the current population, crossed. All draws come from the
/// element's own stream, in a fixed order.
pub fn breed(
    config: &GaConfig,
    stream: &RngStream,
    current: &[Individual],
    generation: usize,
    index: usize,
) -> Individual {
    let mut rng = stream.at(generation, RngPhase::Crossover, index);
    let parent1 = tournament(&mut rng, current, config.tournament_size);
    let parent2 = tournament(&mut rng, current, config.tournament_size);
    parent1.crossover_with(parent2, &mut rng)
}

/// Mutate the next-generation individual at `index` with probability
/// `prob_mutation`. Never called for index 0, the elite slot.
pub fn mutate_slot(
    config: &GaConfig,
    stream: &RngStream,
    generation: usize,
    index: usize,
    individual: &mut Individual,
) {
    let mut rng = stream.at(generation, RngPhase::Mutation, index);
    if rng.r#gen::<f64>() < config.prob_mutation {
        individual.mutate(&mut rng);
    }
}

/// Split `[lo, hi)` into consecutive ranges of at most `chunk_size`.
pub fn chunk_ranges(lo: usize, hi: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = lo;
    while start < hi {
        let end = (start + chunk_size).min(hi);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Split a vector into owned chunks of at most `chunk_size`, preserving
/// order. Used by the ownership-transfer backends to hand whole chunks to
/// workers without copying gene data.
pub fn into_chunks<T>(mut items: Vec<T>, chunk_size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(chunk_size));
    while !items.is_empty() {
        let tail = items.split_off(chunk_size.min(items.len()));
        chunks.push(std::mem::replace(&mut items, tail));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn individual_with_fitness(fitness: i64) -> Individual {
        Individual {
            genes: vec![false; 8],
            fitness,
        }
    }

    #[test]
    fn best_of_prefers_the_lowest_index_on_ties() {
        let population: Vec<Individual> =
            [3, 9, 9, 1, 9].iter().map(|&f| individual_with_fitness(f)).collect();
        let best = best_of(&population, 0);
        assert_eq!(best.index, 1);
        assert_eq!(best.fitness, 9);
    }

    #[test]
    fn merge_is_independent_of_partitioning() {
        let fitness: Vec<i64> = vec![2, 7, 7, 5, 7, 1, 0, 7, 3];
        let population: Vec<Individual> =
            fitness.iter().map(|&f| individual_with_fitness(f)).collect();

        let expected = best_of(&population, 0);
        assert_eq!(expected.index, 1);

        for chunk_size in 1..=population.len() {
            let merged = chunk_ranges(0, population.len(), chunk_size)
                .into_iter()
                .map(|(start, end)| best_of(&population[start..end], start))
                .reduce(BestIndex::better)
                .unwrap();
            assert_eq!(merged, expected, "chunk_size {}", chunk_size);
        }

        // Merge order must not matter either.
        let partials: Vec<BestIndex> = chunk_ranges(0, population.len(), 2)
            .into_iter()
            .map(|(start, end)| best_of(&population[start..end], start))
            .collect();
        let reversed = partials
            .iter()
            .rev()
            .copied()
            .reduce(BestIndex::better)
            .unwrap();
        assert_eq!(reversed, expected);
    }

    #[test]
    fn chunk_ranges_cover_the_span_exactly() {
        let ranges = chunk_ranges(1, 10, 4);
        assert_eq!(ranges, vec![(1, 5), (5, 9), (9, 10)]);

        assert!(chunk_ranges(5, 5, 4).is_empty());
    }

    #[test]
    fn into_chunks_preserves_order_and_length() {
        let items: Vec<usize> = (0..10).collect();
        let chunks = into_chunks(items, 3);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], vec![0, 1, 2]);
        assert_eq!(chunks[3], vec![9]);

        let flat: Vec<usize> = chunks.into_iter().flatten().collect();
        assert_eq!(flat, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn initial_population_is_partition_independent_by_construction() {
        let catalog = ItemCatalog::random(32, 300, 1);
        let config = GaConfig {
            population_size: 50,
            silent: true,
            ..GaConfig::default()
        };
        let stream = RngStream::new(config.seed);

        let whole = initial_population(&catalog, &config, &stream);
        assert_eq!(whole.len(), 50);

        // Rebuilding any single element from its key reproduces it.
        let rebuilt = Individual::random(&catalog, &mut stream.at(0, RngPhase::Init, 17));
        assert_eq!(rebuilt, whole[17]);
    }
}
