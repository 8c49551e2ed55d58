//! Data types shared by the batcher, the checkers, and the scheduler.

pub mod config;
pub mod group;
pub mod progress;
pub mod result;
