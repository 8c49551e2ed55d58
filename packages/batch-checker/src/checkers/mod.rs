//! `GroupChecker` implementations.

pub mod graph;
pub mod wire;

pub use graph::GraphBatchClient;
