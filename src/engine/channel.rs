//! Message-passing engine: bounded work/result channels per phase.
//!
//! Work items flow through a bounded channel to a set of receivers spawned
//! for the phase; results flow back through a second bounded channel.
//! Dropping the work sender closes the producer side, which is what lets a
//! receiver's pull loop terminate; the master collects results until every
//! worker has dropped its result sender. Both channels are sized to the
//! number of work items so the producer never blocks behind a slow worker.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use log::info;

use super::individual::Individual;
use super::population::{
    BestIndex, best_of, breed, chunk_ranges, initial_population, into_chunks, mutate_slot,
};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// Channel engine: fresh receivers per phase, channel close as the sentinel.
pub struct ChannelSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
    num_workers: usize,
    chunk_size: usize,
}

/// Spawn one named phase worker. Worker creation failure is resource
/// exhaustion and aborts the run.
fn spawn_worker(index: usize, body: impl FnOnce() + Send + 'static) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name(format!("ga-channel-{index}"))
        .spawn(body)
        .expect("failed to spawn channel worker")
}

impl ChannelSolver {
    /// Create the engine and its random initial population.
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

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
            num_workers,
            chunk_size,
        })
    }
}

impl Solver for ChannelSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;
        let chunk_size = self.chunk_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness: chunks flow out, measured chunks
            // flow back.
            let chunks = into_chunks(std::mem::take(&mut self.population), chunk_size);
            let n_chunks = chunks.len();
            let (work_tx, work_rx) = bounded::<(usize, Vec<Individual>)>(n_chunks);
            let (result_tx, result_rx) = bounded::<(usize, Vec<Individual>)>(n_chunks);

            let mut handles = Vec::with_capacity(self.num_workers);
            for w in 0..self.num_workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let catalog = Arc::clone(&self.catalog);
                handles.push(spawn_worker(w, move || {
                    for (chunk_index, mut chunk) in work_rx.iter() {
                        for individual in &mut chunk {
                            individual.measure_fitness(&catalog);
                        }
                        if result_tx.send((chunk_index, chunk)).is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(work_rx);
            drop(result_tx);

            for item in chunks.into_iter().enumerate() {
                work_tx.send(item).expect("all fitness workers exited early");
            }
            drop(work_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = result_rx.iter().collect();
            for handle in handles {
                let _ = handle.join();
            }
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            let mut measured = Vec::with_capacity(pop_size);
            for (_, part) in parts {
                measured.extend(part);
            }

            // Step 2 - find the best individual so far: ranges flow out,
            // per-range winners flow back and merge on the master.
            let current = Arc::new(measured);
            let ranges = chunk_ranges(0, pop_size, chunk_size);
            let (work_tx, work_rx) = bounded::<(usize, usize)>(ranges.len());
            let (result_tx, result_rx) = bounded::<BestIndex>(ranges.len());

            let mut handles = Vec::with_capacity(self.num_workers);
            for w in 0..self.num_workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let current = Arc::clone(&current);
                handles.push(spawn_worker(w, move || {
                    for (start, end) in work_rx.iter() {
                        let local = best_of(&current[start..end], start);
                        if result_tx.send(local).is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(work_rx);
            drop(result_tx);

            for range in ranges {
                work_tx.send(range).expect("all best-of workers exited early");
            }
            drop(work_tx);

            let best = result_rx
                .iter()
                .fold(
                    BestIndex {
                        index: 0,
                        fitness: current[0].fitness,
                    },
                    BestIndex::better,
                );
            for handle in handles {
                let _ = handle.join();
            }
            if !self.config.silent {
                info!(
                    "channel: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - breed: ranges flow out, bred slices flow back.
            let ranges = chunk_ranges(1, pop_size, chunk_size);
            let (work_tx, work_rx) = bounded::<(usize, usize)>(ranges.len());
            let (result_tx, result_rx) = bounded::<(usize, Vec<Individual>)>(ranges.len());

            let mut handles = Vec::with_capacity(self.num_workers);
            for w in 0..self.num_workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let current = Arc::clone(&current);
                let config = self.config.clone();
                let stream = self.stream;
                handles.push(spawn_worker(w, move || {
                    for (start, end) in work_rx.iter() {
                        let part: Vec<Individual> = (start..end)
                            .map(|i| breed(&config, &stream, &current, generation, i))
                            .collect();
                        if result_tx.send((start, part)).is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(work_rx);
            drop(result_tx);

            for range in ranges {
                work_tx.send(range).expect("all breeding workers exited early");
            }
            drop(work_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = result_rx.iter().collect();
            for handle in handles {
                let _ = handle.join();
            }
            parts.sort_unstable_by_key(|&(start, _)| start);
            let mut next = Vec::with_capacity(pop_size);
            next.push(current[best.index].clone());
            for (_, part) in parts {
                next.extend(part);
            }

            // Step 4 - mutate everything but the elite slot.
            let chunks = into_chunks(next.split_off(1), chunk_size);
            let n_chunks = chunks.len();
            let (work_tx, work_rx) = bounded::<(usize, Vec<Individual>)>(n_chunks);
            let (result_tx, result_rx) = bounded::<(usize, Vec<Individual>)>(n_chunks);

            let mut handles = Vec::with_capacity(self.num_workers);
            for w in 0..self.num_workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let config = self.config.clone();
                let stream = self.stream;
                handles.push(spawn_worker(w, move || {
                    for (chunk_index, mut chunk) in work_rx.iter() {
                        let base = 1 + chunk_index * chunk_size;
                        for (i, individual) in chunk.iter_mut().enumerate() {
                            mutate_slot(&config, &stream, generation, base + i, individual);
                        }
                        if result_tx.send((chunk_index, chunk)).is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(work_rx);
            drop(result_tx);

            for item in chunks.into_iter().enumerate() {
                work_tx.send(item).expect("all mutation workers exited early");
            }
            drop(work_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = result_rx.iter().collect();
            for handle in handles {
                let _ = handle.join();
            }
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            for (_, part) in parts {
                next.extend(part);
            }

            self.population = next;
        }

        self.population[0].clone()
    }
}
