//! Divide-and-conquer engine on the rayon fork/join pool.
//!
//! Each phase recursively bisects its index range until a span is at or
//! under the configured threshold, runs the leaf sequentially, and joins the
//! two halves. Best-of results merge at the join points, so the leftmost
//! tie-break survives any recursion shape.

use std::sync::Arc;

use log::info;

use super::individual::Individual;
use super::population::{BestIndex, best_of, breed, initial_population, mutate_slot};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// Fork/join engine with a tunable sequential-leaf threshold.
pub struct ForkJoinSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
    threshold: usize,
}

impl ForkJoinSolver {
    /// Create the engine and its random initial population.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        config: GaConfig,
        threshold: usize,
    ) -> Result<Self, EngineError> {
        catalog.validate()?;
        config.validate()?;
        if threshold == 0 {
            return Err(ConfigError::ZeroThreshold.into());
        }

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
            threshold,
        })
    }

    fn measure_range(&self, slice: &mut [Individual]) {
        if slice.len() <= self.threshold {
            for individual in slice {
                individual.measure_fitness(&self.catalog);
            }
        } else {
            let (left, right) = slice.split_at_mut(slice.len() / 2);
            rayon::join(|| self.measure_range(left), || self.measure_range(right));
        }
    }

    fn best_range(&self, slice: &[Individual], offset: usize) -> BestIndex {
        if slice.len() <= self.threshold {
            best_of(slice, offset)
        } else {
            let mid = slice.len() / 2;
            let (left, right) = slice.split_at(mid);
            let (a, b) = rayon::join(
                || self.best_range(left, offset),
                || self.best_range(right, offset + mid),
            );
            a.better(b)
        }
    }

    fn breed_range(&self, generation: usize, lo: usize, hi: usize) -> Vec<Individual> {
        if hi - lo <= self.threshold {
            (lo..hi)
                .map(|i| breed(&self.config, &self.stream, &self.population, generation, i))
                .collect()
        } else {
            let mid = lo + (hi - lo) / 2;
            let (mut left, right) = rayon::join(
                || self.breed_range(generation, lo, mid),
                || self.breed_range(generation, mid, hi),
            );
            left.extend(right);
            left
        }
    }

    fn mutate_range(&self, generation: usize, slice: &mut [Individual], base: usize) {
        if slice.len() <= self.threshold {
            for (i, individual) in slice.iter_mut().enumerate() {
                mutate_slot(&self.config, &self.stream, generation, base + i, individual);
            }
        } else {
            let mid = slice.len() / 2;
            let (left, right) = slice.split_at_mut(mid);
            rayon::join(
                || self.mutate_range(generation, left, base),
                || self.mutate_range(generation, right, base + mid),
            );
        }
    }
}

impl Solver for ForkJoinSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness.
            let mut population = std::mem::take(&mut self.population);
            self.measure_range(&mut population);
            self.population = population;

            // Step 2 - find the best individual so far.
            let best = self.best_range(&self.population, 0);
            if !self.config.silent {
                info!(
                    "forkjoin: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - elite at slot 0, bred children behind it.
            let mut next = Vec::with_capacity(pop_size);
            next.push(self.population[best.index].clone());
            next.extend(self.breed_range(generation, 1, pop_size));

            // Step 4 - mutate everything but the elite slot.
            self.mutate_range(generation, &mut next[1..], 1);

            self.population = next;
        }

        self.population[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SequentialSolver;

    fn config() -> GaConfig {
        GaConfig {
            generations: 6,
            population_size: 300,
            prob_mutation: 0.5,
            tournament_size: 3,
            seed: 42,
            silent: true,
        }
    }

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(ItemCatalog::random(64, 300, 1))
    }

    #[test]
    fn matches_the_sequential_oracle() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        let actual = ForkJoinSolver::new(catalog(), config(), 32).unwrap().run();
        assert_eq!(actual, expected);
    }

    #[test]
    fn threshold_does_not_change_the_result() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        for threshold in [1, 7, 64, 1000] {
            let actual = ForkJoinSolver::new(catalog(), config(), threshold)
                .unwrap()
                .run();
            assert_eq!(actual, expected, "threshold {}", threshold);
        }
    }

    #[test]
    fn zero_threshold_is_rejected() {
        assert!(matches!(
            ForkJoinSolver::new(catalog(), config(), 0),
            Err(EngineError::Config(ConfigError::ZeroThreshold))
        ));
    }
}
