//! Recursive descent parser for path expressions.
//!
//! Grammar:
//! ```text
//! path      := start step (sep step)*
//! start     := 'id' '(' expr ')' sep | '/' | '//' | ε
//! sep       := '/' | '//'
//! step      := (NAME | '*') ('[' expr ']')*
//! expr      := and_expr ('or' and_expr)*
//! and_expr  := eq_expr ('and' eq_expr)*
//! eq_expr   := primary (('=' | '!=') primary)?
//! primary   := LITERAL | NUMBER | '@' NAME | NAME '(' (expr (',' expr)*)? ')' | '(' expr ')'
//! ```
//!
//! A path made of a lone `id(...)` call is valid and selects the anchored
//! elements themselves.

use serde::{Deserialize, Serialize};

use super::{ExprError, ExprResult};

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExpr {
    pub start: Start,
    pub steps: Vec<Step>,
}

/// Where evaluation begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Start {
    /// The document node.
    Document,
    /// Elements returned by `id(expr)`.
    Id(Expr),
}

/// How a step relates to the previous context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// `/name`: children of the context.
    Child,
    /// `//name`: children of the context or any of its descendants.
    Descendant,
}

/// One location step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub axis: Axis,
    /// `None` for `*`.
    pub name: Option<String>,
    pub predicates: Vec<Expr>,
}

/// Predicate and argument expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(String),
    Number(f64),
    Attribute(String),
    Call { name: String, args: Vec<Expr> },
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    At,
    Star,
    Eq,
    Ne,
    Literal(String),
    Number(f64),
    Name(String),
    Eof,
}

fn describe(token: Option<&Token>) -> String {
    match token {
        None | Some(Token::Eof) => "end of expression".to_string(),
        Some(Token::Literal(s)) => format!("literal \"{s}\""),
        Some(Token::Number(n)) => format!("number {n}"),
        Some(Token::Name(n)) => format!("name '{n}'"),
        Some(other) => format!("{other:?}"),
    }
}

/// Parse an expression string into a [`PathExpr`].
pub fn parse(input: &str) -> ExprResult<PathExpr> {
    let tokens = tokenize(input)?;
    if tokens.len() == 1 {
        return Err(ExprError::Empty);
    }
    let mut pos = 0;

    let (start, first_axis) = match (tokens.get(pos), tokens.get(pos + 1)) {
        (Some(Token::Name(name)), Some(Token::LParen)) if name == "id" => {
            pos += 2;
            let arg = parse_or(&tokens, &mut pos)?;
            expect(&tokens, &mut pos, &Token::RParen, "')'")?;
            match tokens.get(pos) {
                Some(Token::Eof) => {
                    return Ok(PathExpr {
                        start: Start::Id(arg),
                        steps: Vec::new(),
                    })
                }
                _ => (Start::Id(arg), parse_separator(&tokens, &mut pos)?),
            }
        }
        (Some(Token::Slash), _) => {
            pos += 1;
            (Start::Document, Axis::Child)
        }
        (Some(Token::DoubleSlash), _) => {
            pos += 1;
            (Start::Document, Axis::Descendant)
        }
        _ => (Start::Document, Axis::Child),
    };

    let mut steps = vec![parse_step(&tokens, &mut pos, first_axis)?];
    loop {
        match tokens.get(pos) {
            Some(Token::Eof) | None => break,
            _ => {
                let axis = parse_separator(&tokens, &mut pos)?;
                steps.push(parse_step(&tokens, &mut pos, axis)?);
            }
        }
    }

    Ok(PathExpr { start, steps })
}

// ── Tokenizer ──

fn tokenize(input: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // String literal, either quote style
        if c == '"' || c == '\'' {
            let start = i;
            i += 1;
            let body_start = i;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            if i >= chars.len() {
                return Err(ExprError::UnterminatedLiteral(start));
            }
            tokens.push(Token::Literal(chars[body_start..i].iter().collect()));
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedChar { ch: c, pos: start })?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || matches!(chars[i], '-' | '_' | '.'))
            {
                i += 1;
            }
            tokens.push(Token::Name(chars[start..i].iter().collect()));
            continue;
        }

        let token = match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                i += 1;
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '@' => Token::At,
            '*' => Token::Star,
            '=' => Token::Eq,
            '!' if chars.get(i + 1) == Some(&'=') => {
                i += 1;
                Token::Ne
            }
            _ => return Err(ExprError::UnexpectedChar { ch: c, pos: i }),
        };
        tokens.push(token);
        i += 1;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

// ── Parser helpers ──

fn expect(tokens: &[Token], pos: &mut usize, token: &Token, label: &str) -> ExprResult<()> {
    if tokens.get(*pos) == Some(token) {
        *pos += 1;
        Ok(())
    } else {
        Err(ExprError::Unexpected {
            expected: label.to_string(),
            found: describe(tokens.get(*pos)),
        })
    }
}

fn parse_separator(tokens: &[Token], pos: &mut usize) -> ExprResult<Axis> {
    match tokens.get(*pos) {
        Some(Token::Slash) => {
            *pos += 1;
            Ok(Axis::Child)
        }
        Some(Token::DoubleSlash) => {
            *pos += 1;
            Ok(Axis::Descendant)
        }
        other => Err(ExprError::Unexpected {
            expected: "'/' or '//'".to_string(),
            found: describe(other),
        }),
    }
}

fn parse_step(tokens: &[Token], pos: &mut usize, axis: Axis) -> ExprResult<Step> {
    let name = match tokens.get(*pos) {
        Some(Token::Name(name)) => Some(name.to_ascii_lowercase()),
        Some(Token::Star) => None,
        other => {
            return Err(ExprError::Unexpected {
                expected: "element name or '*'".to_string(),
                found: describe(other),
            })
        }
    };
    *pos += 1;

    let mut predicates = Vec::new();
    while tokens.get(*pos) == Some(&Token::LBracket) {
        *pos += 1;
        predicates.push(parse_or(tokens, pos)?);
        expect(tokens, pos, &Token::RBracket, "']'")?;
    }

    Ok(Step {
        axis,
        name,
        predicates,
    })
}

fn peek_name(tokens: &[Token], pos: usize, word: &str) -> bool {
    matches!(tokens.get(pos), Some(Token::Name(n)) if n == word)
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> ExprResult<Expr> {
    let mut left = parse_and(tokens, pos)?;
    while peek_name(tokens, *pos, "or") {
        *pos += 1;
        let right = parse_and(tokens, pos)?;
        left = Expr::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> ExprResult<Expr> {
    let mut left = parse_equality(tokens, pos)?;
    while peek_name(tokens, *pos, "and") {
        *pos += 1;
        let right = parse_equality(tokens, pos)?;
        left = Expr::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_equality(tokens: &[Token], pos: &mut usize) -> ExprResult<Expr> {
    let left = parse_primary(tokens, pos)?;
    match tokens.get(*pos) {
        Some(Token::Eq) => {
            *pos += 1;
            let right = parse_primary(tokens, pos)?;
            Ok(Expr::Eq(Box::new(left), Box::new(right)))
        }
        Some(Token::Ne) => {
            *pos += 1;
            let right = parse_primary(tokens, pos)?;
            Ok(Expr::Ne(Box::new(left), Box::new(right)))
        }
        _ => Ok(left),
    }
}

fn parse_primary(tokens: &[Token], pos: &mut usize) -> ExprResult<Expr> {
    match tokens.get(*pos) {
        Some(Token::Literal(s)) => {
            *pos += 1;
            Ok(Expr::Literal(s.clone()))
        }
        Some(Token::Number(n)) => {
            *pos += 1;
            Ok(Expr::Number(*n))
        }
        Some(Token::At) => {
            *pos += 1;
            match tokens.get(*pos) {
                Some(Token::Name(name)) => {
                    *pos += 1;
                    Ok(Expr::Attribute(name.clone()))
                }
                other => Err(ExprError::Unexpected {
                    expected: "attribute name".to_string(),
                    found: describe(other),
                }),
            }
        }
        Some(Token::LParen) => {
            *pos += 1;
            let inner = parse_or(tokens, pos)?;
            expect(tokens, pos, &Token::RParen, "')'")?;
            Ok(inner)
        }
        Some(Token::Name(name)) if tokens.get(*pos + 1) == Some(&Token::LParen) => {
            let name = name.clone();
            *pos += 2;
            let mut args = Vec::new();
            if tokens.get(*pos) != Some(&Token::RParen) {
                loop {
                    args.push(parse_or(tokens, pos)?);
                    if tokens.get(*pos) == Some(&Token::Comma) {
                        *pos += 1;
                    } else {
                        break;
                    }
                }
            }
            expect(tokens, pos, &Token::RParen, "')'")?;
            Ok(Expr::Call { name, args })
        }
        other => Err(ExprError::Unexpected {
            expected: "literal, number, attribute or function call".to_string(),
            found: describe(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_path() {
        let p = parse("/html/body//span").unwrap();
        assert_eq!(p.start, Start::Document);
        assert_eq!(p.steps.len(), 3);
        assert_eq!(p.steps[0].axis, Axis::Child);
        assert_eq!(p.steps[0].name.as_deref(), Some("html"));
        assert_eq!(p.steps[2].axis, Axis::Descendant);
        assert_eq!(p.steps[2].name.as_deref(), Some("span"));
    }

    #[test]
    fn test_parse_descendant_start() {
        let p = parse("//li[3]").unwrap();
        assert_eq!(p.steps[0].axis, Axis::Descendant);
        assert_eq!(p.steps[0].predicates, vec![Expr::Number(3.0)]);
    }

    #[test]
    fn test_parse_id_anchor() {
        let p = parse(r#"id("checkout42")"#).unwrap();
        assert_eq!(p.start, Start::Id(Expr::Literal("checkout42".to_string())));
        assert!(p.steps.is_empty());

        let p = parse(r#"id('main')//a[@name="q"]"#).unwrap();
        assert_eq!(p.start, Start::Id(Expr::Literal("main".to_string())));
        assert_eq!(p.steps[0].axis, Axis::Descendant);
        assert!(matches!(&p.steps[0].predicates[0], Expr::Eq(..)));
    }

    #[test]
    fn test_parse_strict_class_predicate() {
        let p = parse(
            r#"//span[contains(concat(" ",normalize-space(@class)," ")," submit ")]"#,
        )
        .unwrap();
        match &p.steps[0].predicates[0] {
            Expr::Call { name, args } => {
                assert_eq!(name, "contains");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], Expr::Call { name, .. } if name == "concat"));
            }
            other => panic!("unexpected predicate {other:?}"),
        }
    }

    #[test]
    fn test_parse_boolean_operators() {
        let p = parse(r#"//a[@x="1" and @y!="2" or not(@z)]"#).unwrap();
        assert!(matches!(&p.steps[0].predicates[0], Expr::Or(..)));
    }

    #[test]
    fn test_parse_wildcard() {
        let p = parse("/*/body").unwrap();
        assert_eq!(p.steps[0].name, None);
    }

    #[test]
    fn test_parse_malformed_gracefully() {
        let bad = [
            "",
            "   ",
            "/",
            "//",
            "/div[",
            "/div[1",
            r#"/div[@class="x]"#,
            "/div]",
            "id(",
            r#"id("x")span"#,
            "/div/@class",
            "/div[@]",
            "/div#x",
            "/div[contains(@class,]",
        ];
        for input in bad {
            assert!(parse(input).is_err(), "should reject: {input:?}");
        }
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let p = parse("/HTML/Body").unwrap();
        assert_eq!(p.steps[0].name.as_deref(), Some("html"));
        assert_eq!(p.steps[1].name.as_deref(), Some("body"));
    }
}
