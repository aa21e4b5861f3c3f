//! Command dispatcher — receives picker commands, drives the session and
//! emits events.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use agentic_locator::DocumentQuery;

use crate::session::{run_search, PendingSearch, PickerSession};
use crate::transport::framing;
use crate::types::*;

/// Outbound event channel.
pub type EventSink = mpsc::UnboundedSender<Event>;

/// Dispatches commands against one picker session.
pub struct CommandHandler {
    session: Arc<Mutex<PickerSession>>,
    events: EventSink,
}

impl CommandHandler {
    pub fn new(session: Arc<Mutex<PickerSession>>, events: EventSink) -> Self {
        Self { session, events }
    }

    /// Parse and handle one input line. Bad lines produce an `error` event.
    pub async fn handle_line(&self, line: &str) {
        match framing::parse_command(line) {
            Ok(command) => self.handle_command(command).await,
            Err(e) => {
                tracing::warn!("Parse error: {e}");
                self.emit(Event::error(&e));
            }
        }
    }

    /// Handle one command. Failures are reported as `error` events.
    pub async fn handle_command(&self, command: Command) {
        let name = command.name();
        if let Err(e) = self.dispatch(command).await {
            tracing::warn!("{name} failed: {e}");
            self.emit(Event::error(&e));
        }
    }

    async fn dispatch(&self, command: Command) -> PickerResult<()> {
        match command {
            Command::StartPicking => {
                self.session.lock().await.start_picking();
                tracing::info!("Picking started");
                self.emit(Event::PickingStarted);
            }
            Command::CancelPicking => {
                let mut session = self.session.lock().await;
                session.cancel_picking();
                tracing::info!("Picking cancelled");
                self.emit(Event::PickingCancelled);
            }
            Command::LoadDocument { html, path, url } => {
                let mut session = self.session.lock().await;
                let document = session.load(html, path, url)?;
                self.emit(Event::DocumentLoaded {
                    elements: document.element_count(),
                    url: document.url().map(str::to_string),
                    loaded_at: session.loaded_at().unwrap_or_else(chrono::Utc::now),
                });
            }
            Command::Select { target } => {
                let (pending, yield_every) = {
                    let mut session = self.session.lock().await;
                    let pending = session.begin_selection(&target)?;
                    (pending, session.options().yield_every)
                };
                if let Some(pending) = pending {
                    self.spawn_search(pending, yield_every);
                }
            }
        }
        Ok(())
    }

    /// Emit `selection-made` now and `selection-finished` once the search
    /// stops, unless it was cancelled in the meantime.
    fn spawn_search(&self, pending: PendingSearch, yield_every: usize) {
        let PendingSearch {
            selection_id,
            document,
            selection,
            cancel,
        } = pending;

        self.emit(Event::selection_made(&selection_id, &selection));

        let session = self.session.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = run_search(document, selection, yield_every, cancel).await;
            let mut session = session.lock().await;
            if session.complete(&selection_id) {
                tracing::info!(
                    "Selection {selection_id} finished: {:?}",
                    outcome.locator.as_ref().map(|l| l.expression.as_str())
                );
                let _ = events.send(Event::selection_finished(&selection_id, outcome));
            } else {
                tracing::debug!("Dropping result of cancelled selection {selection_id}");
            }
        });
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("Event channel closed");
        }
    }
}
