//! Actor engine: long-lived typed-message workers, one mailbox each.
//!
//! Four kinds of actor are spawned at construction and live for the whole
//! run: fitness, best-of, crossover and mutation. Each actor owns a private
//! mailbox and processes one typed message at a time; the master dispatches
//! chunk messages round-robin over the pool of a kind, then drains the reply
//! channel carried inside the messages. Closing an actor's mailbox is its
//! shutdown signal, so stopping the system is dropping the senders and
//! joining the threads.
//!
//! This differs from the master/worker engine in that work is a typed
//! protocol routed to a specific actor's mailbox rather than boxed closures
//! pulled from one shared queue, and from the channel engine in that the
//! actors persist across phases and generations.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, bounded, unbounded};
use log::{debug, info};

use super::individual::Individual;
use super::population::{
    BestIndex, best_of, breed, chunk_ranges, initial_population, into_chunks, mutate_slot,
};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{ConfigError, GaConfig, ItemCatalog};

/// Measure one owned chunk and send it back with its position.
struct MeasureChunk {
    chunk_index: usize,
    chunk: Vec<Individual>,
    reply: Sender<(usize, Vec<Individual>)>,
}

/// Scan `current[start..end]` for its best individual.
struct ScanRange {
    start: usize,
    end: usize,
    current: Arc<Vec<Individual>>,
    reply: Sender<BestIndex>,
}

/// Breed next-generation children for `start..end` from a shared snapshot.
struct BreedRange {
    generation: usize,
    start: usize,
    end: usize,
    current: Arc<Vec<Individual>>,
    reply: Sender<(usize, Vec<Individual>)>,
}

/// Mutate one owned chunk of the next generation and send it back.
struct MutateChunk {
    generation: usize,
    chunk_index: usize,
    chunk: Vec<Individual>,
    reply: Sender<(usize, Vec<Individual>)>,
}

/// A fixed set of identical actors and a round-robin cursor over their
/// mailboxes.
struct ActorPool<M> {
    mailboxes: Vec<Sender<M>>,
    handles: Vec<thread::JoinHandle<()>>,
    cursor: usize,
}

impl<M: Send + 'static> ActorPool<M> {
    /// Spawn `count` actors of one kind. `make` builds each actor's
    /// behavior, which runs once per received message until the mailbox
    /// closes.
    fn spawn<F>(kind: &str, count: usize, make: impl Fn() -> F) -> Result<Self, EngineError>
    where
        F: FnMut(M) + Send + 'static,
    {
        let mut mailboxes = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let (tx, rx) = unbounded::<M>();
            let mut behavior = make();
            let handle = thread::Builder::new()
                .name(format!("ga-{kind}-{i}"))
                .spawn(move || {
                    for message in rx.iter() {
                        behavior(message);
                    }
                })?;
            mailboxes.push(tx);
            handles.push(handle);
        }
        Ok(Self {
            mailboxes,
            handles,
            cursor: 0,
        })
    }

    /// Deliver a message to the next actor in round-robin order.
    fn tell(&mut self, message: M) {
        let target = self.cursor;
        self.cursor = (self.cursor + 1) % self.mailboxes.len();
        self.mailboxes[target]
            .send(message)
            .expect("actor mailbox closed while the run is active");
    }

    /// Close every mailbox and join the actors.
    fn stop(&mut self) {
        self.mailboxes.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Actor engine: per-phase actor pools with typed mailboxes.
pub struct ActorSolver {
    config: GaConfig,
    population: Vec<Individual>,
    chunk_size: usize,
    fitness: ActorPool<MeasureChunk>,
    best_of: ActorPool<ScanRange>,
    crossover: ActorPool<BreedRange>,
    mutate: ActorPool<MutateChunk>,
}

impl ActorSolver {
    /// Create the engine, spawn its actors and build the initial population.
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

        let fitness = ActorPool::spawn("fitness", num_workers, || {
            let catalog = Arc::clone(&catalog);
            move |message: MeasureChunk| {
                let mut chunk = message.chunk;
                for individual in &mut chunk {
                    individual.measure_fitness(&catalog);
                }
                let _ = message.reply.send((message.chunk_index, chunk));
            }
        })?;

        // One scanner; per-range winners merge on the master.
        let best_of_pool = ActorPool::spawn("best-of", 1, || {
            move |message: ScanRange| {
                let local = best_of(&message.current[message.start..message.end], message.start);
                let _ = message.reply.send(local);
            }
        })?;

        let crossover = ActorPool::spawn("crossover", num_workers, || {
            let config = config.clone();
            move |message: BreedRange| {
                let part: Vec<Individual> = (message.start..message.end)
                    .map(|i| {
                        breed(&config, &stream, &message.current, message.generation, i)
                    })
                    .collect();
                let _ = message.reply.send((message.start, part));
            }
        })?;

        let mutate = ActorPool::spawn("mutate", num_workers, || {
            let config = config.clone();
            move |message: MutateChunk| {
                let mut chunk = message.chunk;
                let base = 1 + message.chunk_index * chunk_size;
                for (i, individual) in chunk.iter_mut().enumerate() {
                    mutate_slot(&config, &stream, message.generation, base + i, individual);
                }
                let _ = message.reply.send((message.chunk_index, chunk));
            }
        })?;
        debug!("actor: spawned {} actors per phase pool", num_workers);

        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            config,
            population,
            chunk_size,
            fitness,
            best_of: best_of_pool,
            crossover,
            mutate,
        })
    }

    /// Close every pool's mailboxes and join the actors.
    fn stop_actors(&mut self) {
        if self.fitness.handles.is_empty() {
            return;
        }
        self.fitness.stop();
        self.best_of.stop();
        self.crossover.stop();
        self.mutate.stop();
        debug!("actor: pools stopped");
    }
}

impl Solver for ActorSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;
        let chunk_size = self.chunk_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness: chunks round-robin over the fitness
            // pool, measured chunks come back tagged with their position.
            let chunks = into_chunks(std::mem::take(&mut self.population), chunk_size);
            let (reply_tx, reply_rx) = bounded(chunks.len());
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                self.fitness.tell(MeasureChunk {
                    chunk_index,
                    chunk,
                    reply: reply_tx.clone(),
                });
            }
            drop(reply_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = reply_rx.iter().collect();
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            let mut measured = Vec::with_capacity(pop_size);
            for (_, part) in parts {
                measured.extend(part);
            }

            // Step 2 - find the best individual so far: the scanner replies
            // one winner per range, merged on the master.
            let current = Arc::new(measured);
            let ranges = chunk_ranges(0, pop_size, chunk_size);
            let (reply_tx, reply_rx) = bounded(ranges.len());
            for (start, end) in ranges {
                self.best_of.tell(ScanRange {
                    start,
                    end,
                    current: Arc::clone(&current),
                    reply: reply_tx.clone(),
                });
            }
            drop(reply_tx);

            let best = reply_rx.iter().fold(
                BestIndex {
                    index: 0,
                    fitness: current[0].fitness,
                },
                BestIndex::better,
            );
            if !self.config.silent {
                info!(
                    "actor: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - breed against the shared snapshot.
            let ranges = chunk_ranges(1, pop_size, chunk_size);
            let (reply_tx, reply_rx) = bounded(ranges.len());
            for (start, end) in ranges {
                self.crossover.tell(BreedRange {
                    generation,
                    start,
                    end,
                    current: Arc::clone(&current),
                    reply: reply_tx.clone(),
                });
            }
            drop(reply_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = reply_rx.iter().collect();
            parts.sort_unstable_by_key(|&(start, _)| start);
            let mut next = Vec::with_capacity(pop_size);
            next.push(current[best.index].clone());
            for (_, part) in parts {
                next.extend(part);
            }

            // Step 4 - mutate everything but the elite slot.
            let chunks = into_chunks(next.split_off(1), chunk_size);
            let (reply_tx, reply_rx) = bounded(chunks.len());
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                self.mutate.tell(MutateChunk {
                    generation,
                    chunk_index,
                    chunk,
                    reply: reply_tx.clone(),
                });
            }
            drop(reply_tx);

            let mut parts: Vec<(usize, Vec<Individual>)> = reply_rx.iter().collect();
            parts.sort_unstable_by_key(|&(chunk_index, _)| chunk_index);
            for (_, part) in parts {
                next.extend(part);
            }

            self.population = next;
        }

        self.stop_actors();
        self.population[0].clone()
    }
}

impl Drop for ActorSolver {
    fn drop(&mut self) {
        self.stop_actors();
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
        let actual = ActorSolver::new(catalog(), config(), 4, 32).unwrap().run();
        assert_eq!(actual, expected);
    }

    #[test]
    fn worker_count_and_chunk_size_do_not_change_the_result() {
        let expected = SequentialSolver::new(catalog(), config()).unwrap().run();
        for num_workers in [1, 2, 5] {
            for chunk_size in [17, 101, 1000] {
                let actual = ActorSolver::new(catalog(), config(), num_workers, chunk_size)
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
    fn dropping_an_unused_solver_stops_its_actors() {
        // Must not hang: Drop closes every mailbox.
        let solver = ActorSolver::new(catalog(), config(), 2, 32).unwrap();
        drop(solver);
    }

    #[test]
    fn invalid_knobs_are_rejected() {
        assert!(ActorSolver::new(catalog(), config(), 0, 32).is_err());
        assert!(ActorSolver::new(catalog(), config(), 2, 0).is_err());
    }
}
