//! AgenticLocator Picker — headless element picker speaking newline-delimited JSON.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod session;
pub mod transport;
pub mod types;

pub use config::resolve_options;
pub use protocol::CommandHandler;
pub use session::PickerSession;
pub use transport::StdioTransport;
