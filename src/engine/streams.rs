//! Flat data-parallel engine on rayon parallel iterators.
//!
//! No explicit chunking: each phase is expressed as a parallel iterator over
//! the population and rayon picks the split. Best-of is a parallel reduce
//! with the associative leftmost-wins merge.

use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use super::individual::Individual;
use super::population::{BestIndex, breed, initial_population, mutate_slot};
use super::rng::RngStream;
use super::{EngineError, Solver};
use crate::schema::{GaConfig, ItemCatalog};

/// Data-parallel engine; the whole population is one parallel stream.
pub struct StreamSolver {
    catalog: Arc<ItemCatalog>,
    config: GaConfig,
    stream: RngStream,
    population: Vec<Individual>,
}

impl StreamSolver {
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

impl Solver for StreamSolver {
    fn run(&mut self) -> Individual {
        let pop_size = self.config.population_size;

        for generation in 0..self.config.generations {
            // Step 1 - measure fitness.
            let catalog = &self.catalog;
            self.population
                .par_iter_mut()
                .for_each(|individual| individual.measure_fitness(catalog));

            // Step 2 - find the best individual so far. The merge is
            // associative and commutative, so rayon's reduction shape does
            // not affect the winner.
            let best = self
                .population
                .par_iter()
                .enumerate()
                .map(|(index, individual)| BestIndex {
                    index,
                    fitness: individual.fitness,
                })
                .reduce_with(BestIndex::better)
                .expect("population is never empty");
            if !self.config.silent {
                info!(
                    "streams: best at generation {} has fitness {}",
                    generation, best.fitness
                );
            }

            // Step 3 - elite at slot 0, bred children for every other index.
            let elite = self.population[best.index].clone();
            let config = &self.config;
            let stream = &self.stream;
            let current = &self.population;
            let mut next: Vec<Individual> = (0..pop_size)
                .into_par_iter()
                .map(|i| {
                    if i == 0 {
                        elite.clone()
                    } else {
                        breed(config, stream, current, generation, i)
                    }
                })
                .collect();

            // Step 4 - mutate everything but the elite slot.
            next.par_iter_mut()
                .enumerate()
                .skip(1)
                .for_each(|(i, individual)| {
                    mutate_slot(config, stream, generation, i, individual)
                });

            self.population = next;
        }

        self.population[0].clone()
    }
}
