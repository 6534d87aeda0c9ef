//! Master/worker engine with a persistent task queue.
//!
//! A fixed set of worker threads is started at construction and reused for
//! every phase of every generation. The master feeds boxed range-tasks into
//! a shared queue; workers pull until they see the shutdown sentinel at run
//! end. Phase completion is an acknowledgement countdown: the master drains
//! one reply per submitted task before moving on.
//!
//! Chunks of the population are moved into tasks and handed back through the
//! reply channel, so workers never share mutable state; the only shared
//! accumulator is the best-of cell, merged under a mutex.

use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use log::{debug, info};

use super::individual::Individual;
use super::population::{
    BestIndex, best_of, breed, chunk_ranges, initial_population, into_chunks, mutate_slot,
};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// A unit of work for the shared queue.
enum Task {
    /// Run a boxed range-job.
    Run(Box<dyn FnOnce() + Send>),
    /// Sentinel: the receiving worker exits its pull loop.
    Shutdown,
}

/// Master/worker engine: long-lived workers, one shared task queue.
pub struct MasterWorkerSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
    chunk_size: usize,
    task_tx: Sender<Task>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl MasterWorkerSolver {
    /// Create the engine, start its workers and build the initial population.
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

        let (task_tx, task_rx) = unbounded::<Task>();
        let mut workers = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let task_rx: Receiver<Task> = task_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("ga-worker-{i}"))
                .spawn(move || {
                    for task in task_rx.iter() {
                        match task {
                            Task::Run(job) => job(),
                            Task::Shutdown => break,
                        }
                    }
                })?;
            workers.push(handle);
        }
        debug!("master-worker: started {} workers", num_workers);

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
            chunk_size,
            task_tx,
            workers,
        })
    }

    fn submit(&self, job: Box<dyn FnOnce() + Send>) {
        self.task_tx
            .send(Task::Run(job))
            .expect("task queue closed while the run is active");
    }

    /// Send one sentinel per worker and join them.
    fn stop_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for _ in 0..self.workers.len() {
            let _ = self.task_tx.send(Task::Shutdown);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("master-worker: workers stopped");
    }
}

impl Solver for MasterWorkerSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;
        let chunk_size = self.chunk_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness. Chunks move into tasks and come back
            // measured through the reply channel.
            let chunks = into_chunks(std::mem::take(&mut self.population), chunk_size);
            let (reply_tx, reply_rx) = bounded(chunks.len());
            for (chunk_index, mut chunk) in chunks.into_iter().enumerate() {
                let catalog = Arc::clone(&self.catalog);
                let reply_tx = reply_tx.clone();
                self.submit(Box::new(move || {
                    for individual in &mut chunk {
                        individual.measure_fitness(&catalog);
                    }
                    let _ = reply_tx.send((chunk_index, chunk));
                }));
            }
            drop(reply_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = reply_rx.iter().collect();
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            let mut measured = Vec::with_capacity(pop_size);
            for (_, part) in parts {
                measured.extend(part);
            }

            // Step 2 - find the best individual so far. Workers fold their
            // range locally and merge into the shared cell under the mutex.
            let current = Arc::new(measured);
            let best_acc = Arc::new(Mutex::new(BestIndex {
                index: 0,
                fitness: current[0].fitness,
            }));
            let ranges = chunk_ranges(0, pop_size, chunk_size);
            let (ack_tx, ack_rx) = bounded(ranges.len());
            for (start, end) in ranges {
                let current = Arc::clone(&current);
                let best_acc = Arc::clone(&best_acc);
                let ack_tx = ack_tx.clone();
                self.submit(Box::new(move || {
                    let local = best_of(&current[start..end], start);
                    let mut merged = best_acc.lock().unwrap();
                    *merged = merged.better(local);
                    drop(merged);
                    let _ = ack_tx.send(());
                }));
            }
            drop(ack_tx);
            for _ in ack_rx.iter() {}

            let best = *best_acc.lock().unwrap();
            if !self.config.silent {
                info!(
                    "master-worker: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - breed chunks of the next generation against a shared
            // snapshot of the current population.
            let breed_ranges = chunk_ranges(1, pop_size, chunk_size);
            let (part_tx, part_rx) = bounded(breed_ranges.len());
            for (start, end) in breed_ranges {
                let current = Arc::clone(&current);
                let config = self.config.clone();
                let stream = self.stream;
                let part_tx = part_tx.clone();
                self.submit(Box::new(move || {
                    let part: Vec<Individual> = (start..end)
                        .map(|i| breed(&config, &stream, &current, generation, i))
                        .collect();
                    let _ = part_tx.send((start, part));
                }));
            }
            drop(part_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = part_rx.iter().collect();
            parts.sort_unstable_by_key(|&(start, _)| start);
            let mut next = Vec::with_capacity(pop_size);
            next.push(current[best.index].clone());
            for (_, part) in parts {
                next.extend(part);
            }

            // Step 4 - mutate everything but the elite slot, chunks moving
            // through the queue again.
            let tail = next.split_off(1);
            let chunks = into_chunks(tail, chunk_size);
            let (reply_tx, reply_rx) = bounded(chunks.len());
            for (chunk_index, mut chunk) in chunks.into_iter().enumerate() {
                let base = 1 + chunk_index * chunk_size;
                let config = self.config.clone();
                let stream = self.stream;
                let reply_tx = reply_tx.clone();
                self.submit(Box::new(move || {
                    for (i, individual) in chunk.iter_mut().enumerate() {
                        mutate_slot(&config, &stream, generation, base + i, individual);
                    }
                    let _ = reply_tx.send((chunk_index, chunk));
                }));
            }
            drop(reply_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = reply_rx.iter().collect();
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            for (_, part) in parts {
                next.extend(part);
            }

            self.population = next;
        }

        self.stop_workers();
        self.population[0].clone()
    }
}

impl Drop for MasterWorkerSolver {
    fn drop(&mut self) {
        self.stop_workers();
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
        let actual = MasterWorkerSolver::new(catalog(), config(), 4, 32)
            .unwrap()
            .run();
        assert_eq!(actual, expected);
    }

    #[test]
    fn worker_count_and_chunk_size_do_not_change_the_result() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        for num_workers in [1, 2, 5] {
            for chunk_size in [17, 101, 1000] {
                let actual = MasterWorkerSolver::new(catalog(), config(), num_workers, chunk_size)
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
    fn dropping_an_unused_solver_stops_its_workers() {
        // Must not hang: Drop sends the shutdown sentinels.
        let solver = MasterWorkerSolver::new(catalog(), config(), 2, 32).unwrap();
        drop(solver);
    }

    #[test]
    fn invalid_knobs_are_rejected() {
        assert!(MasterWorkerSolver::new(catalog(), config(), 0, 32).is_err());
        assert!(MasterWorkerSolver::new(catalog(), config(), 2, 0).is_err());
    }
}
