//! Core trait abstractions.

pub mod checker;
