//! Candidate solutions and the pure genetic operators over them.

use rand::Rng;

use crate::schema::ItemCatalog;

/// One candidate solution: a selection vector over the item catalog plus its
/// measured fitness.
///
/// `fitness` is only meaningful after [`Individual::measure_fitness`] has run
/// since the last structural change to `genes`; freshly created or crossed
/// individuals carry a fitness of 0 until the next evaluation phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    /// Whether the item at each catalog index is packed.
    pub genes: Vec<bool>,
    /// Total value of the selection, or the negative excess weight when the
    /// selection is over the limit.
    pub fitness: i64,
}

impl Individual {
    /// Create an individual with each gene drawn independently at even odds.
    pub fn random(catalog: &ItemCatalog, rng: &mut impl Rng) -> Self {
        let genes = (0..catalog.gene_size()).map(|_| rng.gen_bool(0.5)).collect();
        Self { genes, fitness: 0 }
    }

    /// Measure this individual against the catalog.
    ///
    /// Within the weight limit the fitness is the total value of the packed
    /// items. Over the limit it is the negative excess weight: a penalty
    /// rather than a rejection, so over-limit individuals stay orderable and
    /// selection can anneal them back under the limit.
    pub fn measure_fitness(&mut self, catalog: &ItemCatalog) {
        let mut total_value: u64 = 0;
        let mut total_weight: u64 = 0;

        for (i, &selected) in self.genes.iter().enumerate() {
            if selected {
                total_value += u64::from(catalog.values[i]);
                total_weight += u64::from(catalog.weights[i]);
            }
        }

        self.fitness = if total_weight > catalog.weight_limit {
            -((total_weight - catalog.weight_limit) as i64)
        } else {
            total_value as i64
        };
    }

    /// Single-point crossover: one point is drawn per call, the child takes
    /// this individual's genes before it and the mate's genes from it on.
    pub fn crossover_with(&self, mate: &Individual, rng: &mut impl Rng) -> Individual {
        let crossover_point = rng.gen_range(0..self.genes.len());
        let genes = (0..self.genes.len())
            .map(|i| {
                if i < crossover_point {
                    self.genes[i]
                } else {
                    mate.genes[i]
                }
            })
            .collect();

        Individual { genes, fitness: 0 }
    }

    /// Flip exactly one uniformly-random gene in place.
    pub fn mutate(&mut self, rng: &mut impl Rng) {
        let mutation_point = rng.gen_range(0..self.genes.len());
        self.genes[mutation_point] = !self.genes[mutation_point];
    }
}
