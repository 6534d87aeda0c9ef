//! Scatter/gather engine on a dedicated fixed thread pool.
//!
//! The pool is built once per solver; every phase scatters
//! `ceil(range / chunk_size)` range-tasks into a scope and gathers before
//! moving on. Unlike the master/worker engine there is no persistent task
//! queue: tasks are submitted fresh each phase and the scope exit is the
//! gather barrier.

use std::sync::{Arc, Mutex, mpsc};

use log::info;

use super::individual::Individual;
use super::population::{BestIndex, best_of, breed, chunk_ranges, initial_population, mutate_slot};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// Fixed-pool engine: chunked range-tasks, re-submitted every phase.
pub struct ScatterGatherSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
    pool: rayon::ThreadPool,
    chunk_size: usize,
}

impl ScatterGatherSolver {
    /// Create the engine, its thread pool and its random initial population.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        config: GaConfig,
        num_threads: usize,
        chunk_size: usize,
    ) -> Result<Self, EngineError> {
        catalog.validate()?;
        config.validate()?;
        if num_threads == 0 {
            return Err(ConfigError::ZeroWorkers.into());
        }
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize.into());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("ga-scatter-{i}"))
            .build()?;

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
            pool,
            chunk_size,
        })
    }
}

impl Solver for ScatterGatherSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;
        let chunk_size = self.chunk_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness, in place over disjoint chunks.
            let catalog = &self.catalog;
            let population = &mut self.population;
            self.pool.in_place_scope(|scope| {
                for chunk in population.chunks_mut(chunk_size) {
                    scope.spawn(move |_| {
                        for individual in chunk {
                            individual.measure_fitness(catalog);
                        }
                    });
                }
            });

            // Step 2 - find the best individual so far. Each task folds its
            // chunk locally, then merges into the shared accumulator.
            let population = &self.population;
            let best_acc = Mutex::new(BestIndex {
                index: 0,
                fitness: population[0].fitness,
            });
            self.pool.in_place_scope(|scope| {
                for (start, end) in chunk_ranges(0, pop_size, chunk_size) {
                    let best_acc = &best_acc;
                    scope.spawn(move |_| {
                        let local = best_of(&population[start..end], start);
                        let mut merged = best_acc.lock().unwrap();
                        *merged = merged.better(local);
                    });
                }
            });
            let best = *best_acc.lock().unwrap();
            if !self.config.silent {
                info!(
                    "scatter: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - breed chunks of the next generation; each task sends
            // its slice back tagged with its start index.
            let config = &self.config;
            let stream = &self.stream;
            let (part_tx, part_rx) = mpsc::channel();
            self.pool.in_place_scope(|scope| {
                for (start, end) in chunk_ranges(1, pop_size, chunk_size) {
                    let part_tx = part_tx.clone();
                    scope.spawn(move |_| {
                        let part: Vec<Individual> = (start..end)
                            .map(|i| breed(config, stream, population, generation, i))
                            .collect();
                        let _ = part_tx.send((start, part));
                    });
                }
            });
            drop(part_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = part_rx.iter().collect();
            parts.sort_unstable_by_key(|&(start, _)| start);

            let mut next = Vec::with_capacity(pop_size);
            next.push(self.population[best.index].clone());
            for (_, part) in parts {
                next.extend(part);
            }

            // Step 4 - mutate everything but the elite slot.
            let tail = &mut next[1..];
            self.pool.in_place_scope(|scope| {
                for (chunk_index, chunk) in tail.chunks_mut(chunk_size).enumerate() {
                    let base = 1 + chunk_index * chunk_size;
                    scope.spawn(move |_| {
                        for (i, individual) in chunk.iter_mut().enumerate() {
                            mutate_slot(config, stream, generation, base + i, individual);
                        }
                    });
                }
            });

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
        let actual = ScatterGatherSolver::new(catalog(), config(), 4, 32)
            .unwrap()
            .run();
        assert_eq!(actual, expected);
    }

    #[test]
    fn thread_count_and_chunk_size_do_not_change_the_result() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        for num_threads in [1, 2, 5] {
            for chunk_size in [17, 101, 1000] {
                let actual = ScatterGatherSolver::new(catalog(), config(), num_threads, chunk_size)
                    .unwrap()
                    .run();
                assert_eq!(
                    actual, expected,
                    "threads {} chunk {}",
                    num_threads, chunk_size
                );
            }
        }
    }

    #[test]
    fn invalid_knobs_are_rejected() {
        assert!(ScatterGatherSolver::new(catalog(), config(), 0, 32).is_err());
        assert!(ScatterGatherSolver::new(catalog(), config(), 4, 0).is_err());
    }
}
