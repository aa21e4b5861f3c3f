//! Cooperative search driver for the tokio runtime.

use std::sync::Arc;

use agentic_locator::{
    ClockScheduler, HtmlDocument, SearchClock, SearchEngine, SearchOutcome, Selection,
};
use tokio_util::sync::CancellationToken;

/// Run the search for `selection`, yielding to the runtime every
/// `yield_every` dequeues.
///
/// Deadline and cancellation are checked at every yield point, so a
/// cancelled search stops within one batch.
pub async fn run_search(
    document: Arc<HtmlDocument>,
    selection: Selection,
    yield_every: usize,
    cancel: CancellationToken,
) -> SearchOutcome {
    let mut scheduler = ClockScheduler::new(SearchClock::new(selection.budget, cancel))
        .with_yield_every(yield_every);
    SearchEngine::new(document.as_ref(), &selection.segments)
        .run_yielding(&mut scheduler, tokio::task::yield_now)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_locator::{StopReason, SynthesisOptions};

    fn list() -> (Arc<HtmlDocument>, Selection) {
        let doc = HtmlDocument::parse(
            "<html><body><ul><li>a</li><li>b</li><li>c</li><li>d</li></ul></body></html>",
        );
        let target = doc.select("li").unwrap()[2];
        let selection = Selection::prepare(&doc, target, &SynthesisOptions::default());
        (Arc::new(doc), selection)
    }

    #[tokio::test]
    async fn test_runs_to_exhaustion() {
        let (doc, selection) = list();
        let outcome = run_search(doc, selection, 1, CancellationToken::new()).await;
        assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
        assert_eq!(outcome.locator.unwrap().expression, "//li[3]");
    }

    #[tokio::test]
    async fn test_cancelled() {
        let (doc, selection) = list();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = run_search(doc, selection, 1, token).await;
        assert_eq!(outcome.stats.stop_reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn test_runs_on_spawned_task() {
        let (doc, selection) = list();
        let handle = tokio::spawn(run_search(doc, selection, 100, CancellationToken::new()));
        let outcome = handle.await.unwrap();
        assert!(outcome.locator.is_some());
    }
}
