//! Commands accepted on the picker channel.

use serde::{Deserialize, Serialize};

/// One inbound command, tagged by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Begin accepting selections.
    StartPicking,

    /// Stop accepting selections and abandon the in-flight search.
    CancelPicking,

    /// Replace the page-visit context. Exactly one of `html` and `path` is
    /// required.
    LoadDocument {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// A pointer selection: the first element matching the CSS selector
    /// `target`.
    Select { target: String },
}

impl Command {
    /// Wire names of every command.
    pub const NAMES: &'static [&'static str] =
        &["start-picking", "cancel-picking", "load-document", "select"];

    pub fn name(&self) -> &'static str {
        match self {
            Command::StartPicking => "start-picking",
            Command::CancelPicking => "cancel-picking",
            Command::LoadDocument { .. } => "load-document",
            Command::Select { .. } => "select",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd: Command = serde_json::from_str(r#"{"command":"start-picking"}"#).unwrap();
        assert_eq!(cmd, Command::StartPicking);

        let cmd: Command =
            serde_json::from_str(r#"{"command":"select","target":"button.buy"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Select {
                target: "button.buy".to_string()
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"command":"load-document","html":"<p>x</p>"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::LoadDocument {
                html: Some("<p>x</p>".to_string()),
                path: None,
                url: None
            }
        );
    }

    #[test]
    fn test_names_match_wire_tags() {
        let all = [
            Command::StartPicking,
            Command::CancelPicking,
            Command::LoadDocument {
                html: None,
                path: None,
                url: None,
            },
            Command::Select {
                target: "a".to_string(),
            },
        ];
        for (cmd, name) in all.iter().zip(Command::NAMES) {
            assert_eq!(cmd.name(), *name);
            let value = serde_json::to_value(cmd).unwrap();
            assert_eq!(value["command"], *name);
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"command":"explode"}"#).is_err());
        assert!(serde_json::from_str::<Command>(r#"{"command":"select"}"#).is_err());
    }
}
