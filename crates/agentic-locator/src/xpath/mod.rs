//! Path expressions — the XPath 1.0 subset emitted by the candidate compiler.
//!
//! Supported: `id()` anchors, `/` and `//` joins, name tests and `*`,
//! positional and boolean predicates, `@attr`, `=`/`!=`, `and`/`or`,
//! parentheses, and the functions `contains`, `starts-with`, `concat`,
//! `normalize-space`, `string-length`, `name`, `local-name`, `not`,
//! `position`, `last`, `true`, `false`.

pub mod eval;
pub mod parser;

pub use eval::evaluate;
pub use parser::{parse, Axis, Expr, PathExpr, Start, Step};

/// Errors raised while parsing or evaluating a path expression.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal at position {0}")]
    UnterminatedLiteral(usize),

    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
}

pub type ExprResult<T> = Result<T, ExprError>;

/// The characters `normalize-space` treats as whitespace.
pub const XML_WHITESPACE: [char; 4] = [' ', '\t', '\r', '\n'];

/// `normalize-space`: trim and collapse runs of [`XML_WHITESPACE`]. Other
/// Unicode spaces, and the form feed HTML splits class lists on, are kept.
pub fn normalize_space(s: &str) -> String {
    s.split(XML_WHITESPACE)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `name` can appear as a name test in a path expression.
pub fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_space_only_strips_xml_whitespace() {
        assert_eq!(normalize_space("  a\t\r\nb  "), "a b");
        assert_eq!(normalize_space("btn\u{a0}primary"), "btn\u{a0}primary");
        assert_eq!(normalize_space("a\x0cb"), "a\x0cb");
        assert_eq!(normalize_space(" \n "), "");
    }

    #[test]
    fn test_is_name() {
        assert!(is_name("div"));
        assert!(is_name("my-widget"));
        assert!(is_name("_x.y"));
        assert!(!is_name("o:p"));
        assert!(!is_name("1abc"));
        assert!(!is_name(""));
    }
}
