//! Lightweight-task engine on a small async runtime.
//!
//! A multi-threaded runtime with a bounded worker set is built once per
//! solver. Each phase spawns one task per chunk and joins them all before
//! the next phase; a task runs its whole chunk without suspension, so
//! scheduling points exist only at chunk boundaries.

use std::sync::Arc;

use log::info;
use tokio::runtime::Runtime;

use super::individual::Individual;
use super::population::{
    BestIndex, best_of, breed, chunk_ranges, initial_population, into_chunks, mutate_slot,
};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// Cooperative-task engine: many chunked tasks, few OS threads.
pub struct TaskSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
    runtime: Runtime,
    chunk_size: usize,
}

impl TaskSolver {
    /// Create the engine, its runtime and its random initial population.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        config: GaConfig,
        num_workers: usize,
        chunk_size: usize,
    ) -> Result<Self, EngineError> {
        catalog.validate()?;
        config.validate()?;
        if num_workers == 0 {
            return Err(ConfigError::ZeroWorkers.into());
        }
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize.into());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_workers)
            .thread_name("ga-task")
            .build()?;

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
            runtime,
            chunk_size,
        })
    }
}

impl Solver for TaskSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;
        let chunk_size = self.chunk_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness, one task per owned chunk.
            let chunks = into_chunks(std::mem::take(&mut self.population), chunk_size);
            let measured = self.runtime.block_on(async {
                let mut handles = Vec::with_capacity(chunks.len());
                for (chunk_index, mut chunk) in chunks.into_iter().enumerate() {
                    let catalog = Arc::clone(&self.catalog);
                    handles.push(tokio::spawn(async move {
                        for individual in &mut chunk {
                            individual.measure_fitness(&catalog);
                        }
                        (chunk_index, chunk)
                    }));
                }

                let mut parts = Vec::with_capacity(handles.len());
                for handle in handles {
                    parts.push(handle.await.expect("fitness task panicked"));
                }
                parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);

                let mut measured = Vec::with_capacity(pop_size);
                for (_, part) in parts {
                    measured.extend(part);
                }
                measured
            });

            // Step 2 - find the best individual so far; per-range winners
            // merge in task order, which the associative merge makes
            // equivalent to any other order.
            let current = Arc::new(measured);
            let best = self.runtime.block_on(async {
                let mut handles = Vec::new();
                for (start, end) in chunk_ranges(0, pop_size, chunk_size) {
                    let current = Arc::clone(&current);
                    handles.push(tokio::spawn(async move {
                        best_of(&current[start..end], start)
                    }));
                }

                let mut best = BestIndex {
                    index: 0,
                    fitness: current[0].fitness,
                };
                for handle in handles {
                    best = best.better(handle.await.expect("best-of task panicked"));
                }
                best
            });
            if !self.config.silent {
                info!(
                    "tasks: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - breed against the shared snapshot.
            let mut next = self.runtime.block_on(async {
                let mut handles = Vec::new();
                for (start, end) in chunk_ranges(1, pop_size, chunk_size) {
                    let current = Arc::clone(&current);
                    let config = self.config.clone();
                    let stream = self.stream;
                    handles.push(tokio::spawn(async move {
                        let part: Vec<Individual> = (start..end)
                            .map(|i| breed(&config, &stream, &current, generation, i))
                            .collect();
                        (start, part)
                    }));
                }

                let mut parts = Vec::with_capacity(handles.len());
                for handle in handles {
                    parts.push(handle.await.expect("breeding task panicked"));
                }
                parts.sort_unstable_by_key(|&(start, _)| start);

                let mut next = Vec::with_capacity(pop_size);
                next.push(current[best.index].clone());
                for (_, part) in parts {
                    next.extend(part);
                }
                next
            });

            // Step 4 - mutate everything but the elite slot.
            let chunks = into_chunks(next.split_off(1), chunk_size);
            let tail = self.runtime.block_on(async {
                let mut handles = Vec::with_capacity(chunks.len());
                for (chunk_index, mut chunk) in chunks.into_iter().enumerate() {
                    let base = 1 + chunk_index * chunk_size;
                    let config = self.config.clone();
                    let stream = self.stream;
                    handles.push(tokio::spawn(async move {
                        for (i, individual) in chunk.iter_mut().enumerate() {
                            mutate_slot(&config, &stream, generation, base + i, individual);
                        }
                        (chunk_index, chunk)
                    }));
                }

                let mut parts = Vec::with_capacity(handles.len());
                for handle in handles {
                    parts.push(handle.await.expect("mutation task panicked"));
                }
                parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);

                let mut tail = Vec::with_capacity(pop_size.saturating_sub(1));
                for (_, part) in parts {
                    tail.extend(part);
                }
                tail
            });
            next.extend(tail);

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
        let actual = TaskSolver::new(catalog(), config(), 4, 32).unwrap().run();
        assert_eq!(actual, expected);
    }

    #[test]
    fn worker_count_and_chunk_size_do_not_change_the_result() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        for num_workers in [1, 3] {
            for chunk_size in [17, 150] {
                let actual = TaskSolver::new(catalog(), config(), num_workers, chunk_size)
                    .unwrap()
                    .run();
                assert_eq!(
                    actual, expected,
                    "workers {} chunk {}",
                    num_workers, chunk_size
                );
            }
        }
    }

    #[test]
    fn invalid_knobs_are_rejected() {
        assert!(TaskSolver::new(catalog(), config(), 0, 32).is_err());
        assert!(TaskSolver::new(catalog(), config(), 2, 0).is_err());
    }
}
