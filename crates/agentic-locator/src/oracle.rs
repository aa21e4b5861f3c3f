//! Uniqueness oracle — does an expression resolve to exactly one node?

use crate::document::{DocumentQuery, NodeId};
use crate::xpath::{self, ExprResult};

/// Whether `expression` resolves to exactly one element of `doc`.
///
/// Malformed or unevaluatable expressions are never unique.
pub fn is_unique<D: DocumentQuery + ?Sized>(doc: &D, expression: &str) -> bool {
    match xpath::evaluate(doc, expression) {
        Ok(nodes) => nodes.len() == 1,
        Err(e) => {
            tracing::trace!("Rejected candidate {expression}: {e}");
            false
        }
    }
}

/// Resolve an expression against the current document.
///
/// Documents change under a stored locator; callers holding one long-term
/// should re-resolve it and check that it still yields a single node.
pub fn resolve<D: DocumentQuery + ?Sized>(doc: &D, expression: &str) -> ExprResult<Vec<NodeId>> {
    xpath::evaluate(doc, expression)
}

/// The single node an expression resolves to, if it is unique.
pub fn resolve_unique<D: DocumentQuery + ?Sized>(doc: &D, expression: &str) -> Option<NodeId> {
    match resolve(doc, expression) {
        Ok(nodes) if nodes.len() == 1 => nodes.first().copied(),
        _ => None,
    }
}
