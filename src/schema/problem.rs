//! Problem catalog: the fixed item set a run optimizes over.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// The 0/1 knapsack instance: item values, item weights and the weight limit.
///
/// Built once at process start and shared read-only by every engine. Gene `i`
/// of an individual selects item `i` of this catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCatalog {
    /// Value of each item.
    pub values: Vec<u32>,
    /// Weight of each item.
    pub weights: Vec<u32>,
    /// Total weight the knapsack can carry.
    pub weight_limit: u64,
}

impl ItemCatalog {
    /// Generate a random instance with `gene_size` items.
    ///
    /// Values and weights are drawn uniformly from `0..100`, interleaved
    /// (value then weight per item) so a fixed seed pins the whole instance.
    pub fn random(gene_size: usize, weight_limit: u64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = vec![0u32; gene_size];
        let mut weights = vec![0u32; gene_size];

        for i in 0..gene_size {
            values[i] = rng.gen_range(0..100);
            weights[i] = rng.gen_range(0..100);
        }

        Self {
            values,
            weights,
            weight_limit,
        }
    }

    /// Number of items, which is also the gene count of every individual.
    #[inline]
    pub fn gene_size(&self) -> usize {
        self.values.len()
    }

    /// Validate catalog shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if self.values.len() != self.weights.len() {
            return Err(ConfigError::MismatchedCatalog {
                values: self.values.len(),
                weights: self.weights.len(),
            });
        }
        Ok(())
    }
}
