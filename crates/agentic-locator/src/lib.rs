//! AgenticLocator — core library for robust element locator synthesis over live documents.

pub mod bitset;
pub mod budget;
pub mod compiler;
pub mod document;
pub mod oracle;
pub mod scheduler;
pub mod search;
pub mod segment;
pub mod synth;
pub mod types;
pub mod xpath;

pub use bitset::BitSet;
pub use budget::{estimate_budget, estimate_budget_ms, options_per_segment};
pub use compiler::{compile, full_expression, literal, BitLayout};
pub use document::{DocumentQuery, HtmlDocument, NodeId};
pub use oracle::{is_unique, resolve, resolve_unique};
pub use scheduler::{ClockScheduler, Scheduler, SearchClock, StopReason, DEFAULT_YIELD_EVERY};
pub use search::{SearchEngine, SearchOutcome, SearchStats};
pub use segment::{compute_noise_ban, extract_segments, is_stable_identifier};
pub use synth::{synthesize, synthesize_with_cancel, Selection, Synthesis, SynthesisOptions};
pub use types::*;
pub use xpath::{ExprError, ExprResult};
