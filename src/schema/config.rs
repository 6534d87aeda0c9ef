//! Run parameters and concurrency strategy selection.

use serde::{Deserialize, Serialize};

/// Default worker/thread count: one per available core.
fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_chunk_size() -> usize {
    1000
}

fn default_threshold() -> usize {
    1000
}

/// Parameters of one genetic-algorithm run.
///
/// These are configuration, not mutable state: an engine takes a `GaConfig`
/// at construction and never changes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaConfig {
    /// Number of generations to evolve.
    pub generations: usize,
    /// Fixed population size, constant across the whole run.
    pub population_size: usize,
    /// Per-individual probability of mutation each generation.
    pub prob_mutation: f64,
    /// Number of uniformly-random draws per tournament.
    pub tournament_size: usize,
    /// Master seed for all random draws. Two runs with the same seed and
    /// catalog produce the same result on every backend.
    pub seed: u64,
    /// Suppress per-generation progress logging.
    #[serde(default)]
    pub silent: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            generations: 500,
            population_size: 100_000,
            prob_mutation: 0.5,
            tournament_size: 3,
            seed: 1,
            silent: false,
        }
    }
}

impl GaConfig {
    /// Validate run parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generations == 0 {
            return Err(ConfigError::ZeroGenerations);
        }
        if self.population_size == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        if !(0.0..=1.0).contains(&self.prob_mutation) {
            return Err(ConfigError::InvalidMutationProbability(self.prob_mutation));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroTournament);
        }
        Ok(())
    }
}

/// Concurrency strategy for one run.
///
/// Every strategy evolves the same algorithm and, for a fixed seed, returns
/// the same result; they differ only in how within-generation work is
/// distributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Strategy {
    /// Single-threaded baseline; the correctness oracle.
    Sequential,
    /// Recursive range bisection down to `threshold`, halves run in parallel.
    ForkJoin {
        #[serde(default = "default_threshold")]
        threshold: usize,
    },
    /// Flat data-parallel iterators over the population.
    Streams,
    /// Fixed thread pool; range-tasks submitted fresh each phase.
    ScatterGather {
        #[serde(default = "default_parallelism")]
        num_threads: usize,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },
    /// Long-lived workers pulling chunks from a shared task queue.
    MasterWorker {
        #[serde(default = "default_parallelism")]
        num_workers: usize,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },
    /// Per-phase bounded work/result channels with close-to-terminate.
    Channel {
        #[serde(default = "default_parallelism")]
        num_workers: usize,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },
    /// Long-lived typed-message actors, one mailbox per actor.
    Actor {
        #[serde(default = "default_parallelism")]
        num_workers: usize,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },
    /// Many lightweight tasks scheduled onto a small async worker set.
    Tasks {
        #[serde(default = "default_parallelism")]
        num_workers: usize,
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },
}

impl Strategy {
    /// Short name used in log lines and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::ForkJoin { .. } => "forkjoin",
            Strategy::Streams => "streams",
            Strategy::ScatterGather { .. } => "scatter",
            Strategy::MasterWorker { .. } => "master-worker",
            Strategy::Channel { .. } => "channel",
            Strategy::Actor { .. } => "actor",
            Strategy::Tasks { .. } => "tasks",
        }
    }

    /// Validate concurrency knobs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Strategy::Sequential | Strategy::Streams => Ok(()),
            Strategy::ForkJoin { threshold } => {
                if threshold == 0 {
                    return Err(ConfigError::ZeroThreshold);
                }
                Ok(())
            }
            Strategy::ScatterGather {
                num_threads,
                chunk_size,
            } => {
                if num_threads == 0 {
                    return Err(ConfigError::ZeroWorkers);
                }
                if chunk_size == 0 {
                    return Err(ConfigError::ZeroChunkSize);
                }
                Ok(())
            }
            Strategy::MasterWorker {
                num_workers,
                chunk_size,
            }
            | Strategy::Channel {
                num_workers,
                chunk_size,
            }
            | Strategy::Actor {
                num_workers,
                chunk_size,
            }
            | Strategy::Tasks {
                num_workers,
                chunk_size,
            } => {
                if num_workers == 0 {
                    return Err(ConfigError::ZeroWorkers);
                }
                if chunk_size == 0 {
                    return Err(ConfigError::ZeroChunkSize);
                }
                Ok(())
            }
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Generation count must be non-zero")]
    ZeroGenerations,
    #[error("Population size must be non-zero")]
    ZeroPopulation,
    #[error("Mutation probability {0} is outside [0, 1]")]
    InvalidMutationProbability(f64),
    #[error("Tournament size must be non-zero")]
    ZeroTournament,
    #[error("Fork/join threshold must be non-zero")]
    ZeroThreshold,
    #[error("Worker/thread count must be non-zero")]
    ZeroWorkers,
    #[error("Chunk size must be non-zero")]
    ZeroChunkSize,
    #[error("Item catalog must contain at least one item")]
    EmptyCatalog,
    #[error("Item catalog has {values} values but {weights} weights")]
    MismatchedCatalog { values: usize, weights: usize },
}
