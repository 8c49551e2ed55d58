//! Batch-sized slices of the identifier list.

/// An opaque token supplied by the caller. Duplicates are checked independently.
pub type Identifier = String;

/// An ordered, non-empty run of identifiers sent to the remote API in one request.
///
/// Groups are produced by [`crate::batcher::partition`] and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    index: usize,
    identifiers: Vec<Identifier>,
}

impl Group {
    pub(crate) fn new(index: usize, identifiers: Vec<Identifier>) -> Self {
        debug_assert!(!identifiers.is_empty(), "groups are never empty");
        Self { index, identifiers }
    }

    /// Position of this group in partition order (0-based).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}
