//! Single-threaded baseline engine.
//!
//! Always correct by construction; the parallel engines are validated
//! against its result.

use std::sync::Arc;

use log::info;

use super::individual::Individual;
use super::population::{best_of, breed, initial_population, mutate_slot};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{GaConfig, ItemCatalog};

/// Straight-loop engine: every phase runs on the calling thread.
pub struct SequentialSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
}

impl SequentialSolver {
    /// Create the engine and its random initial population.
    pub fn new(catalog: Arc<ItemCatalog>, config: GaConfig) -> Result<Self, EngineError> {
        catalog.validate()?;
        config.validate()?;

        let stream = RngStream::new(config.seed);
        let population = initial_population(&catalog, &config, &stream);

        Ok(Self {
            catalog,
            config,
            stream,
            population,
        })
    }
}

impl Solver for SequentialSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness.
            for individual in &mut self.population {
                individual.measure_fitness(&self.catalog);
            }

            // Step 2 - find the best individual so far.
            let best = best_of(&self.population, 0);
            if !self.config.silent {
                info!(
                    "sequential: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - the best survives verbatim; breed the rest by
            // tournament crossover from the current population.
            let mut next = Vec::with_capacity(pop_size);
            next.push(self.population[best.index].clone());
            for i in 1..pop_size {
                next.push(breed(
                    &self.config,
                    &self.stream,
                    &self.population,
                    generation,
                    i,
                ));
            }

            // Step 4 - mutate everything but the elite slot.
            for (i, individual) in next.iter_mut().enumerate().skip(1) {
                mutate_slot(&self.config, &self.stream, generation, i, individual);
            }

            self.population = next;
        }

        self.population[0].clone()
    }
}
