//! Command, event and error types of the picker channel.

pub mod command;
pub mod error;
pub mod event;

pub use command::*;
pub use error::*;
pub use event::*;
