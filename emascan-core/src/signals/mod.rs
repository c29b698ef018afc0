//! Signal classification over precomputed indicator series.

pub mod crossover;

pub use crossover::{classify, CrossoverParams};
