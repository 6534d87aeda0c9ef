//! Schema module - Problem catalog and run configuration types.

mod config;
mod problem;

pub use config::*;
pub use problem::*;
