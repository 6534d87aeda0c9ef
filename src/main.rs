//! Knapsack GA CLI - run one strategy from a JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use knapsack_ga::{
    engine,
    schema::{GaConfig, ItemCatalog, Strategy},
};

/// Catalog generation parameters for the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogConfig {
    gene_size: usize,
    weight_limit: u64,
    seed: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            gene_size: 1000,
            weight_limit: 300,
            seed: 1,
        }
    }
}

/// Full harness configuration: problem instance, run parameters, strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunConfig {
    catalog: CatalogConfig,
    ga: GaConfig,
    strategy: Strategy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            ga: GaConfig::default(),
            strategy: Strategy::Sequential,
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run the knapsack GA with the strategy named in the configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let run_config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let catalog = Arc::new(ItemCatalog::random(
        run_config.catalog.gene_size,
        run_config.catalog.weight_limit,
        run_config.catalog.seed,
    ));

    println!("Knapsack GA");
    println!("===========");
    println!(
        "Catalog: {} items, weight limit {}",
        catalog.gene_size(),
        catalog.weight_limit
    );
    println!(
        "Run: {} generations, population {}, mutation {:.2}, tournament {}",
        run_config.ga.generations,
        run_config.ga.population_size,
        run_config.ga.prob_mutation,
        run_config.ga.tournament_size
    );
    println!("Strategy: {}", run_config.strategy.name());
    println!();

    let mut solver =
        engine::build(&run_config.strategy, catalog, run_config.ga.clone()).unwrap_or_else(|e| {
            eprintln!("Error building solver: {}", e);
            std::process::exit(1);
        });

    println!("Running...");
    let start = Instant::now();
    let best = solver.run();
    let elapsed = start.elapsed();

    println!();
    println!("Best fitness: {}", best.fitness);
    println!(
        "Items packed: {}",
        best.genes.iter().filter(|&&g| g).count()
    );
    println!(
        "Time: {:.2}s ({:.1} generations/s)",
        elapsed.as_secs_f32(),
        run_config.ga.generations as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    let config = RunConfig {
        strategy: Strategy::ForkJoin { threshold: 1000 },
        ..RunConfig::default()
    };

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
