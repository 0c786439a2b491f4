pub mod format;

use std::iter::FusedIterator;

use crate::tagged::TaggedError;
use crate::tagged::failure::Failure;

/// Iterator over a tagged error and its tagged causes, outermost first.
///
/// Stops at a leaf, or before a cause that is not itself a tagged error.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a TaggedError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a TaggedError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

impl FusedIterator for Chain<'_> {}

impl TaggedError {
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Innermost tagged error of the chain.
    pub fn root_cause(&self) -> &TaggedError {
        self.chain().last().unwrap_or(self)
    }

    pub fn depth(&self) -> usize {
        self.chain().count()
    }
}

/// Tagged errors reachable from `failure`, outermost first. Empty when
/// `failure` is not a tagged error.
pub fn get_error_chain(failure: &Failure) -> Vec<&TaggedError> {
    failure
        .as_tagged()
        .map(|err| err.chain().collect())
        .unwrap_or_default()
}
