//! Picker session: loaded document, picking mode and the in-flight search.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use agentic_locator::{DocumentQuery, HtmlDocument, Selection, SynthesisOptions};

use crate::types::{PickerError, PickerResult};

/// A search that has been prepared but not yet run.
pub struct PendingSearch {
    pub selection_id: String,
    pub document: Arc<HtmlDocument>,
    pub selection: Selection,
    pub cancel: CancellationToken,
}

struct InFlight {
    selection_id: String,
    cancel: CancellationToken,
}

/// State of one picker connection.
///
/// At most one search is in flight; starting another or leaving picking mode
/// cancels it.
pub struct PickerSession {
    document: Option<Arc<HtmlDocument>>,
    loaded_at: Option<DateTime<Utc>>,
    picking: bool,
    in_flight: Option<InFlight>,
    options: SynthesisOptions,
}

impl PickerSession {
    pub fn new(options: SynthesisOptions) -> Self {
        Self {
            document: None,
            loaded_at: None,
            picking: false,
            in_flight: None,
            options,
        }
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    pub fn document(&self) -> Option<&Arc<HtmlDocument>> {
        self.document.as_ref()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_picking(&self) -> bool {
        self.picking
    }

    /// Selection id of the running search.
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.selection_id.as_str())
    }

    /// Replace the page-visit context. Exactly one of `html` and `path` must
    /// be given. A running search is cancelled.
    pub fn load(
        &mut self,
        html: Option<String>,
        path: Option<String>,
        url: Option<String>,
    ) -> PickerResult<Arc<HtmlDocument>> {
        let document = match (html, path) {
            (Some(html), None) => HtmlDocument::parse(&html),
            (None, Some(path)) => {
                HtmlDocument::from_path(&path).map_err(|e| PickerError::DocumentUnreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            _ => {
                return Err(PickerError::InvalidParams(
                    "load-document needs exactly one of 'html' or 'path'".to_string(),
                ))
            }
        };
        let document = match url {
            Some(url) => document.with_url(url),
            None => document,
        };

        self.cancel_in_flight();
        let document = Arc::new(document);
        tracing::info!(
            "Loaded document with {} elements{}",
            document.element_count(),
            document.url().map(|u| format!(" from {u}")).unwrap_or_default()
        );
        self.document = Some(document.clone());
        self.loaded_at = Some(Utc::now());
        Ok(document)
    }

    pub fn start_picking(&mut self) {
        self.picking = true;
    }

    /// Leave picking mode. Returns whether picking was active.
    pub fn cancel_picking(&mut self) -> bool {
        self.cancel_in_flight();
        std::mem::replace(&mut self.picking, false)
    }

    /// Turn a pointer selection into a pending search.
    ///
    /// Returns `Ok(None)` when not picking. The previous search, if any, is
    /// cancelled.
    pub fn begin_selection(&mut self, target: &str) -> PickerResult<Option<PendingSearch>> {
        if !self.picking {
            tracing::debug!("Ignoring selection of {target}: not picking");
            return Ok(None);
        }
        let document = self.document.clone().ok_or(PickerError::NoDocument)?;
        let node = document.select_first(target)?;

        self.cancel_in_flight();
        let selection = Selection::prepare(document.as_ref(), node, &self.options);
        let selection_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            selection_id: selection_id.clone(),
            cancel: cancel.clone(),
        });

        tracing::info!(
            "Selection {selection_id}: {target} ({} segments, {}ms budget)",
            selection.segments.len(),
            selection.budget_ms()
        );

        Ok(Some(PendingSearch {
            selection_id,
            document,
            selection,
            cancel,
        }))
    }

    /// Mark a search as done. Returns `true` when it is still the current
    /// search and its result should be reported.
    pub fn complete(&mut self, selection_id: &str) -> bool {
        match &self.in_flight {
            Some(f) if f.selection_id == selection_id && !f.cancel.is_cancelled() => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the running search. Returns its selection id.
    pub fn cancel_in_flight(&mut self) -> Option<String> {
        let flight = self.in_flight.take()?;
        flight.cancel.cancel();
        tracing::debug!("Cancelled search {}", flight.selection_id);
        Some(flight.selection_id)
    }
}

impl Default for PickerSession {
    fn default() -> Self {
        Self::new(SynthesisOptions::default())
    }
}
