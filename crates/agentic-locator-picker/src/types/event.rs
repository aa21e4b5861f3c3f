//! Events emitted on the picker channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentic_locator::{SearchOutcome, Selection, StopReason};

use super::error::PickerError;

/// One outbound event, tagged by its `event` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    DocumentLoaded {
        elements: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        loaded_at: DateTime<Utc>,
    },

    PickingStarted,

    PickingCancelled,

    /// Emitted as soon as a target is picked, before the search runs.
    #[serde(rename_all = "camelCase")]
    SelectionMade {
        selection_id: String,
        full_expression: String,
        search_budget_ms: u64,
    },

    /// Emitted when a search stops on its own. Cancelled searches stay
    /// silent.
    #[serde(rename_all = "camelCase")]
    SelectionFinished {
        selection_id: String,
        minimized_expression: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<u32>,
        explored: usize,
        elapsed_ms: u64,
        stop_reason: StopReason,
    },

    Error {
        code: i32,
        message: String,
    },
}

impl Event {
    /// Wire names of every event.
    pub const NAMES: &'static [&'static str] = &[
        "document-loaded",
        "picking-started",
        "picking-cancelled",
        "selection-made",
        "selection-finished",
        "error",
    ];

    pub fn selection_made(selection_id: &str, selection: &Selection) -> Self {
        Event::SelectionMade {
            selection_id: selection_id.to_string(),
            full_expression: selection.full_expression.clone(),
            search_budget_ms: selection.budget_ms(),
        }
    }

    pub fn selection_finished(selection_id: &str, outcome: SearchOutcome) -> Self {
        let (minimized_expression, cost) = match outcome.locator {
            Some(locator) => (Some(locator.expression), Some(locator.cost)),
            None => (None, None),
        };
        Event::SelectionFinished {
            selection_id: selection_id.to_string(),
            minimized_expression,
            cost,
            explored: outcome.stats.explored,
            elapsed_ms: outcome.stats.elapsed_ms,
            stop_reason: outcome.stats.stop_reason,
        }
    }

    pub fn error(err: &PickerError) -> Self {
        Event::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_locator::{Locator, SearchStats};

    #[test]
    fn test_selection_made_wire_format() {
        let event = Event::SelectionMade {
            selection_id: "s1".to_string(),
            full_expression: "/html/body".to_string(),
            search_budget_ms: 4000,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "selection-made");
        assert_eq!(value["selectionId"], "s1");
        assert_eq!(value["fullExpression"], "/html/body");
        assert_eq!(value["searchBudgetMs"], 4000);
    }

    #[test]
    fn test_selection_finished_null_expression() {
        let outcome = SearchOutcome {
            locator: None,
            stats: SearchStats {
                explored: 7,
                checked: 3,
                finished: 0,
                pruned: 0,
                elapsed_ms: 12,
                stop_reason: StopReason::Deadline,
            },
        };
        let value = serde_json::to_value(Event::selection_finished("s2", outcome)).unwrap();
        assert_eq!(value["event"], "selection-finished");
        assert!(value["minimizedExpression"].is_null());
        assert!(value.get("cost").is_none());
        assert_eq!(value["stopReason"], "deadline");
        assert_eq!(value["explored"], 7);
    }

    #[test]
    fn test_selection_finished_with_locator() {
        let outcome = SearchOutcome {
            locator: Some(Locator {
                expression: r#"id("a")"#.to_string(),
                cost: 3,
            }),
            stats: SearchStats {
                explored: 2,
                checked: 2,
                finished: 1,
                pruned: 1,
                elapsed_ms: 0,
                stop_reason: StopReason::Exhausted,
            },
        };
        match Event::selection_finished("s3", outcome) {
            Event::SelectionFinished {
                minimized_expression,
                cost,
                ..
            } => {
                assert_eq!(minimized_expression.as_deref(), Some(r#"id("a")"#));
                assert_eq!(cost, Some(3));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unit_events() {
        let value = serde_json::to_value(Event::PickingStarted).unwrap();
        assert_eq!(value, serde_json::json!({"event": "picking-started"}));
    }
}
