//! Picker protocol handling — command dispatch and event emission.

pub mod handler;

pub use handler::{CommandHandler, EventSink};
