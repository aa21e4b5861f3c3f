//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit flag, then environment variable, then
//! default.

use std::time::Duration;

use agentic_locator::{SynthesisOptions, DEFAULT_YIELD_EVERY};

/// Search budget in milliseconds, replacing the estimate.
pub const BUDGET_ENV: &str = "AGENTIC_LOCATOR_BUDGET_MS";
/// Dequeues between deadline checks.
pub const YIELD_EVERY_ENV: &str = "AGENTIC_LOCATOR_YIELD_EVERY";
/// Document loaded at startup by `serve` and `repl`.
pub const DOCUMENT_ENV: &str = "AGENTIC_LOCATOR_DOCUMENT";

/// Resolve the budget override.
pub fn resolve_budget(explicit: Option<u64>) -> Option<Duration> {
    resolve_number(explicit, BUDGET_ENV, std::env::var(BUDGET_ENV).ok()).map(Duration::from_millis)
}

/// Resolve the checkpoint cadence.
pub fn resolve_yield_every(explicit: Option<usize>) -> usize {
    resolve_number(explicit, YIELD_EVERY_ENV, std::env::var(YIELD_EVERY_ENV).ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_YIELD_EVERY)
}

/// Resolve the startup document path, if any.
pub fn resolve_document_path(explicit: Option<&str>) -> Option<String> {
    if let Some(path) = explicit {
        return Some(path.to_string());
    }
    std::env::var(DOCUMENT_ENV).ok().filter(|p| !p.is_empty())
}

/// Synthesis options from flags and environment.
pub fn resolve_options(budget_ms: Option<u64>, yield_every: Option<usize>) -> SynthesisOptions {
    SynthesisOptions {
        budget_override: resolve_budget(budget_ms),
        yield_every: resolve_yield_every(yield_every),
    }
}

fn resolve_number<T: std::str::FromStr>(
    explicit: Option<T>,
    var: &str,
    env_value: Option<String>,
) -> Option<T> {
    if explicit.is_some() {
        return explicit;
    }
    let raw = env_value?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {var}={raw}: not a number");
            None
        }
    }
}
