//! Parallel genetic-algorithm solver for the 0/1 knapsack problem.
//!
//! The same generational algorithm (fitness evaluation, elitism, tournament
//! crossover, mutation) is implemented over several concurrency strategies:
//! a sequential baseline, fork/join bisection, flat data-parallel streams, a
//! scatter/gather thread pool, a master/worker task queue, message-passing
//! channels, typed-mailbox actors and lightweight async tasks. All
//! strategies satisfy the same contract and, for a fixed seed, return the
//! same individual: randomness is keyed by element index rather than by
//! worker, so partitioning cannot change the outcome.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: problem catalog, run parameters and strategy selection
//! - `engine`: the generational loop and one solver per strategy
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use knapsack_ga::{
//!     engine,
//!     schema::{GaConfig, ItemCatalog, Strategy},
//! };
//!
//! // The problem instance, seeded once and shared read-only.
//! let catalog = Arc::new(ItemCatalog::random(1000, 300, 1));
//!
//! let config = GaConfig {
//!     generations: 500,
//!     population_size: 100_000,
//!     ..GaConfig::default()
//! };
//!
//! // Pick a concurrency strategy at construction time.
//! let strategy = Strategy::ForkJoin { threshold: 1000 };
//! let mut solver = engine::build(&strategy, catalog, config).unwrap();
//!
//! let best = solver.run();
//! println!("best fitness: {}", best.fitness);
//! ```

pub mod engine;
pub mod schema;

// Re-export commonly used types
pub use engine::{EngineError, Individual, Solver, build};
pub use schema::{ConfigError, GaConfig, ItemCatalog, Strategy};
