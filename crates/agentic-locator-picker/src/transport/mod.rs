//! Transport layer for the picker channel.

pub mod framing;
pub mod stdio;

pub use stdio::StdioTransport;
