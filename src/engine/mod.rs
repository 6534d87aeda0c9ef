//! Engine module - the generational loop over every concurrency strategy.
//!
//! All engines evolve the same algorithm: per generation, measure fitness,
//! reserve the best individual in the elitism slot, breed the rest of the
//! next generation by tournament crossover, mutate everything but the elite,
//! then swap the population wholesale. Generations are strictly sequential
//! and each phase is a barrier; only within-phase work is distributed.
//!
//! The strategies:
//!
//! - [`SequentialSolver`]: straight loop, the correctness oracle
//! - [`ForkJoinSolver`]: recursive range bisection on the rayon pool
//! - [`StreamSolver`]: flat data-parallel iterators
//! - [`ScatterGatherSolver`]: fixed thread pool, tasks submitted per phase
//! - [`MasterWorkerSolver`]: long-lived workers pulling from a task queue
//! - [`ChannelSolver`]: per-phase work/result channels, close-to-terminate
//! - [`ActorSolver`]: long-lived typed-message actors, one mailbox each
//! - [`TaskSolver`]: lightweight async tasks on a small runtime
//!
//! Randomness is drawn from index-keyed streams ([`RngStream`]), so for a
//! fixed seed every strategy returns the same individual regardless of how
//! the work was partitioned.

mod actor;
mod channel;
mod forkjoin;
mod individual;
mod master_worker;
mod population;
mod rng;
mod scatter;
mod sequential;
mod streams;
mod tasks;

pub use actor::ActorSolver;
pub use channel::ChannelSolver;
pub use forkjoin::ForkJoinSolver;
pub use individual::Individual;
pub use master_worker::MasterWorkerSolver;
pub use population::{
    BestIndex, best_of, breed, chunk_ranges, initial_population, into_chunks, mutate_slot,
    tournament,
};
pub use rng::{RngPhase, RngStream};
pub use scatter::ScatterGatherSolver;
pub use sequential::SequentialSolver;
pub use streams::StreamSolver;
pub use tasks::TaskSolver;

use std::sync::Arc;

use crate::schema::{ConfigError, GaConfig, ItemCatalog, Strategy};

/// A fully-configured engine for one run.
///
/// Strategy selection happens at construction; `run` drives the fixed
/// generational loop and returns the best individual of the final
/// generation. A solver value drives a single run.
pub trait Solver {
    /// Execute the full generational loop.
    fn run(&mut self) -> Individual;
}

/// Engine construction errors.
///
/// Configuration problems are rejected here, eagerly; once a solver is
/// built, a run has no recoverable in-domain failures (a worker crash mid-run
/// is fatal and aborts the process).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to build thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Build the solver for a strategy.
pub fn build(
    strategy: &Strategy,
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
) -> Result<Box<dyn Solver>, EngineError> {
    Ok(match *strategy {
        Strategy::Sequential => Box::new(SequentialSolver::new(catalog, config)?),
        Strategy::ForkJoin { threshold } => {
            Box::new(ForkJoinSolver::new(catalog, config, threshold)?)
        }
        Strategy::Streams => Box::new(StreamSolver::new(catalog, config)?),
        Strategy::ScatterGather {
            num_threads,
            chunk_size,
        } => Box::new(ScatterGatherSolver::new(
            catalog,
            config,
            num_threads,
            chunk_size,
        )?),
        Strategy::MasterWorker {
            num_workers,
            chunk_size,
        } => Box::new(MasterWorkerSolver::new(
            catalog,
            config,
            num_workers,
            chunk_size,
        )?),
        Strategy::Channel {
            num_workers,
            chunk_size,
        } => Box::new(ChannelSolver::new(catalog, config, num_workers, chunk_size)?),
        Strategy::Actor {
            num_workers,
            chunk_size,
        } => Box::new(ActorSolver::new(catalog, config, num_workers, chunk_size)?),
        Strategy::Tasks {
            num_workers,
            chunk_size,
        } => Box::new(TaskSolver::new(catalog, config, num_workers, chunk_size)?),
    })
}
