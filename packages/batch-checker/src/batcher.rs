//! Partitioning of the identifier list into remote-request-sized groups.

use std::num::NonZeroUsize;

use crate::types::group::{Group, Identifier};

/// Split `identifiers` into groups of `batch_size`, preserving order.
///
/// Every group holds exactly `batch_size` identifiers except the last, which
/// holds the remainder. An empty input yields no groups.
pub fn partition(identifiers: &[Identifier], batch_size: NonZeroUsize) -> Vec<Group> {
    identifiers
        .chunks(batch_size.get())
        .enumerate()
        .map(|(index, chunk)| Group::new(index, chunk.to_vec()))
        .collect()
}
