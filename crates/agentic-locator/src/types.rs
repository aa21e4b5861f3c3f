//! Core data types for locator synthesis.

use serde::{Deserialize, Serialize};

/// One ancestor element's extracted, filtered feature set.
///
/// A segment list is ordered root-to-target: index 0 is the outermost element
/// (`<html>`), the last entry is the clicked target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub tag_name: String,
    pub identifier: Option<String>,
    pub sibling_index: Option<usize>,
    pub input_name: Option<String>,
    pub class_names: Option<Vec<String>>,
}

impl Segment {
    /// A segment carrying only its tag name.
    pub fn bare(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            identifier: None,
            sibling_index: None,
            input_name: None,
            class_names: None,
        }
    }

    /// Number of class-name options this segment offers to the search.
    pub fn class_count(&self) -> usize {
        self.class_names.as_ref().map_or(0, Vec::len)
    }

    /// Class names as a slice, empty when the element has none.
    pub fn classes(&self) -> &[String] {
        self.class_names.as_deref().unwrap_or(&[])
    }
}

/// How class predicates are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Substring containment on the class attribute. Cheap, may over-match.
    Loose,
    /// Exact class-list membership.
    Strict,
}

/// A synthesized locator and the cost it was ranked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub expression: String,
    pub cost: u32,
}

/// Errors surfaced to callers of the locator library.
///
/// Search-internal failures (malformed candidate expressions, exhausted
/// budgets) never appear here; they resolve to "no better candidate".
#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid expression: {0}")]
    Expression(#[from] crate::xpath::ExprError),
}

/// Convenience result type.
pub type LocatorResult<T> = Result<T, LocatorError>;
