//! One-call locator synthesis: extraction, budgeting and search.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::budget::estimate_budget;
use crate::compiler::full_expression;
use crate::document::{DocumentQuery, NodeId};
use crate::scheduler::{ClockScheduler, SearchClock, DEFAULT_YIELD_EVERY};
use crate::search::{SearchEngine, SearchOutcome};
use crate::segment::{compute_noise_ban, extract_segments};
use crate::types::Segment;

/// Knobs for a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Replaces the estimated search budget.
    pub budget_override: Option<Duration>,
    /// Dequeues between deadline checks.
    pub yield_every: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            budget_override: None,
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }
}

/// Everything known about a target before the search starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub target: NodeId,
    pub segments: Vec<Segment>,
    pub noise_ban: Option<usize>,
    /// Strict expression with every available feature asserted.
    pub full_expression: String,
    pub budget: Duration,
}

impl Selection {
    /// Extract segments and size the budget for `target`.
    pub fn prepare<D: DocumentQuery + ?Sized>(
        doc: &D,
        target: NodeId,
        options: &SynthesisOptions,
    ) -> Self {
        let noise_ban = compute_noise_ban(doc);
        let segments = extract_segments(doc, target, noise_ban);
        let budget = options
            .budget_override
            .unwrap_or_else(|| estimate_budget(&segments, doc.element_count()));
        let full_expression = full_expression(&segments);
        Self {
            target,
            segments,
            noise_ban,
            full_expression,
            budget,
        }
    }

    pub fn budget_ms(&self) -> u64 {
        self.budget.as_millis() as u64
    }

    /// Run the search for this selection on the current thread.
    pub fn search<D: DocumentQuery + ?Sized>(
        &self,
        doc: &D,
        options: &SynthesisOptions,
        cancel: CancellationToken,
    ) -> SearchOutcome {
        let mut scheduler = ClockScheduler::new(SearchClock::new(self.budget, cancel))
            .with_yield_every(options.yield_every);
        SearchEngine::new(doc, &self.segments).run(&mut scheduler)
    }
}

/// A prepared selection and the outcome of its search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub selection: Selection,
    pub outcome: SearchOutcome,
}

/// Synthesize a locator for `target`, blocking until the search stops.
pub fn synthesize<D: DocumentQuery + ?Sized>(
    doc: &D,
    target: NodeId,
    options: &SynthesisOptions,
) -> Synthesis {
    synthesize_with_cancel(doc, target, options, CancellationToken::new())
}

/// [`synthesize`] with an external cancellation token.
pub fn synthesize_with_cancel<D: DocumentQuery + ?Sized>(
    doc: &D,
    target: NodeId,
    options: &SynthesisOptions,
    cancel: CancellationToken,
) -> Synthesis {
    let selection = Selection::prepare(doc, target, options);
    tracing::debug!(
        "Searching {} segments for node {} within {}ms",
        selection.segments.len(),
        target.0,
        selection.budget_ms()
    );
    let outcome = selection.search(doc, options, cancel);
    Synthesis { selection, outcome }
}
