//! Message framing for newline-delimited JSON.

use crate::types::{Command, Event, PickerError, PickerResult};

/// Parse a single line of text as a command.
pub fn parse_command(line: &str) -> PickerResult<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(PickerError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| PickerError::ParseError(e.to_string()))
}

/// Serialize an event to a JSON line (with trailing newline).
pub fn frame_event(event: &Event) -> PickerResult<String> {
    let mut json = serde_json::to_string(event).map_err(PickerError::Json)?;
    json.push('\n');
    Ok(json)
}
