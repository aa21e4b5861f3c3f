//! Path expression evaluator over any [`DocumentQuery`].

use std::collections::BTreeSet;

use crate::document::{DocumentQuery, NodeId};

use super::parser::{parse, Axis, Expr, PathExpr, Start, Step};
use super::{ExprError, ExprResult};

/// A context node: the document itself or one of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Context {
    Document,
    Element(NodeId),
}

/// Evaluation focus for predicates.
#[derive(Debug, Clone, Copy)]
struct Focus {
    node: Option<NodeId>,
    position: usize,
    size: usize,
}

impl Focus {
    const NONE: Focus = Focus {
        node: None,
        position: 0,
        size: 0,
    };
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    /// An attribute reference; `None` is the empty node-set.
    Attr(Option<String>),
}

impl Value {
    fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Num(n) => format_number(n),
            Value::Bool(b) => b.to_string(),
            Value::Attr(a) => a.unwrap_or_default(),
        }
    }

    fn to_bool(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::Attr(a) => a.is_some(),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Attr(a) => a
                .as_deref()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(f64::NAN),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parse and evaluate an expression, returning matching elements in
/// ascending [`NodeId`] order.
pub fn evaluate<D: DocumentQuery + ?Sized>(doc: &D, expression: &str) -> ExprResult<Vec<NodeId>> {
    let path = parse(expression)?;
    evaluate_path(doc, &path)
}

/// Evaluate an already parsed expression.
pub fn evaluate_path<D: DocumentQuery + ?Sized>(
    doc: &D,
    path: &PathExpr,
) -> ExprResult<Vec<NodeId>> {
    let mut contexts: BTreeSet<Context> = match &path.start {
        Start::Document => BTreeSet::from([Context::Document]),
        Start::Id(arg) => {
            let ids = eval_expr(doc, arg, Focus::NONE)?.into_string();
            ids.split_ascii_whitespace()
                .flat_map(|id| doc.elements_by_id(id))
                .map(Context::Element)
                .collect()
        }
    };

    for step in &path.steps {
        contexts = apply_step(doc, &contexts, step)?;
        if contexts.is_empty() {
            break;
        }
    }

    Ok(contexts
        .into_iter()
        .filter_map(|c| match c {
            Context::Element(n) => Some(n),
            Context::Document => None,
        })
        .collect())
}

fn apply_step<D: DocumentQuery + ?Sized>(
    doc: &D,
    contexts: &BTreeSet<Context>,
    step: &Step,
) -> ExprResult<BTreeSet<Context>> {
    let parents: BTreeSet<Context> = match step.axis {
        Axis::Child => contexts.clone(),
        Axis::Descendant => descendants_or_self(doc, contexts),
    };

    let mut out = BTreeSet::new();
    for parent in parents {
        for node in child_step(doc, parent, step)? {
            out.insert(Context::Element(node));
        }
    }
    Ok(out)
}

fn children_of<D: DocumentQuery + ?Sized>(doc: &D, ctx: Context) -> Vec<NodeId> {
    match ctx {
        Context::Document => doc.document_element().into_iter().collect(),
        Context::Element(n) => doc.children(n).to_vec(),
    }
}

fn descendants_or_self<D: DocumentQuery + ?Sized>(
    doc: &D,
    contexts: &BTreeSet<Context>,
) -> BTreeSet<Context> {
    if contexts.contains(&Context::Document) {
        let mut all: BTreeSet<Context> = doc.elements().map(Context::Element).collect();
        all.insert(Context::Document);
        return all;
    }

    let mut out = BTreeSet::new();
    let mut stack: Vec<Context> = contexts.iter().copied().collect();
    while let Some(ctx) = stack.pop() {
        if !out.insert(ctx) {
            continue;
        }
        stack.extend(children_of(doc, ctx).into_iter().map(Context::Element));
    }
    out
}

/// Children of one parent passing the name test, filtered by each predicate
/// in turn. Positions are relative to this parent's candidate list.
fn child_step<D: DocumentQuery + ?Sized>(
    doc: &D,
    parent: Context,
    step: &Step,
) -> ExprResult<Vec<NodeId>> {
    let mut candidates: Vec<NodeId> = children_of(doc, parent)
        .into_iter()
        .filter(|&n| match &step.name {
            Some(name) => doc.tag_name(n) == name,
            None => true,
        })
        .collect();

    for predicate in &step.predicates {
        let size = candidates.len();
        let mut kept = Vec::with_capacity(size);
        for (i, &node) in candidates.iter().enumerate() {
            let focus = Focus {
                node: Some(node),
                position: i + 1,
                size,
            };
            let keep = match eval_expr(doc, predicate, focus)? {
                Value::Num(n) => n == focus.position as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        candidates = kept;
    }

    Ok(candidates)
}

fn compare(left: Value, right: Value, equal: bool) -> bool {
    if matches!(left, Value::Attr(None)) || matches!(right, Value::Attr(None)) {
        return false;
    }
    let result = match (&left, &right) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => left.to_bool() == right.to_bool(),
        (Value::Num(_), _) | (_, Value::Num(_)) => left.to_number() == right.to_number(),
        _ => left.into_string() == right.into_string(),
    };
    result == equal
}

fn eval_expr<D: DocumentQuery + ?Sized>(doc: &D, expr: &Expr, focus: Focus) -> ExprResult<Value> {
    match expr {
        Expr::Literal(s) => Ok(Value::Str(s.clone())),
        Expr::Number(n) => Ok(Value::Num(*n)),
        Expr::Attribute(name) => Ok(Value::Attr(
            focus
                .node
                .and_then(|n| doc.attribute(n, name))
                .map(str::to_string),
        )),
        Expr::Eq(a, b) => Ok(Value::Bool(compare(
            eval_expr(doc, a, focus)?,
            eval_expr(doc, b, focus)?,
            true,
        ))),
        Expr::Ne(a, b) => Ok(Value::Bool(compare(
            eval_expr(doc, a, focus)?,
            eval_expr(doc, b, focus)?,
            false,
        ))),
        Expr::And(a, b) => Ok(Value::Bool(
            eval_expr(doc, a, focus)?.to_bool() && eval_expr(doc, b, focus)?.to_bool(),
        )),
        Expr::Or(a, b) => Ok(Value::Bool(
            eval_expr(doc, a, focus)?.to_bool() || eval_expr(doc, b, focus)?.to_bool(),
        )),
        Expr::Call { name, args } => call(doc, name, args, focus),
    }
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> ExprResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {min}")
        } else {
            format!("{min}..={max}")
        };
        return Err(ExprError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn call<D: DocumentQuery + ?Sized>(
    doc: &D,
    name: &str,
    args: &[Expr],
    focus: Focus,
) -> ExprResult<Value> {
    let string_arg = |i: usize| -> ExprResult<String> {
        Ok(eval_expr(doc, &args[i], focus)?.into_string())
    };

    match name {
        "contains" => {
            arity(name, args, 2, 2)?;
            Ok(Value::Bool(string_arg(0)?.contains(&string_arg(1)?)))
        }
        "starts-with" => {
            arity(name, args, 2, 2)?;
            Ok(Value::Bool(string_arg(0)?.starts_with(&string_arg(1)?)))
        }
        "concat" => {
            arity(name, args, 2, usize::MAX)?;
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(&string_arg(i)?);
            }
            Ok(Value::Str(out))
        }
        "normalize-space" => {
            arity(name, args, 1, 1)?;
            let s = string_arg(0)?;
            Ok(Value::Str(super::normalize_space(&s)))
        }
        "string-length" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Num(string_arg(0)?.chars().count() as f64))
        }
        "name" | "local-name" => {
            arity(name, args, 0, 0)?;
            let tag = focus.node.map(|n| doc.tag_name(n).to_string());
            Ok(Value::Str(tag.unwrap_or_default()))
        }
        "not" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Bool(!eval_expr(doc, &args[0], focus)?.to_bool()))
        }
        "position" => {
            arity(name, args, 0, 0)?;
            Ok(Value::Num(focus.position as f64))
        }
        "last" => {
            arity(name, args, 0, 0)?;
            Ok(Value::Num(focus.size as f64))
        }
        "true" => {
            arity(name, args, 0, 0)?;
            Ok(Value::Bool(true))
        }
        "false" => {
            arity(name, args, 0, 0)?;
            Ok(Value::Bool(false))
        }
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;

    const PAGE: &str = r#"
        <html><body>
        <ul id="menu">
            <li class="item">a</li>
            <li class="item active">b</li>
            <li class="item-wide">c</li>
        </ul>
        <div class="box"><span name="n1">x</span><span>y</span></div>
        <div class="box"><span>z</span></div>
        <form><input name="q"><input name="q2"></form>
        </body></html>
    "#;

    fn tags(doc: &HtmlDocument, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|&n| doc.tag_name(n).to_string()).collect()
    }

    #[test]
    fn test_absolute_child_path() {
        let doc = HtmlDocument::parse(PAGE);
        let hits = evaluate(&doc, "/html/body/ul/li").unwrap();
        assert_eq!(hits.len(), 3);
        assert!(evaluate(&doc, "/body").unwrap().is_empty());
    }

    #[test]
    fn test_descendant_path() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(evaluate(&doc, "//span").unwrap().len(), 3);
        assert_eq!(evaluate(&doc, "/html//div//span").unwrap().len(), 3);
        assert_eq!(evaluate(&doc, "//html").unwrap().len(), 1);
    }

    #[test]
    fn test_positional_predicate_binds_to_parent() {
        let doc = HtmlDocument::parse(PAGE);
        // First span child of each div: two of them.
        assert_eq!(evaluate(&doc, "//div/span[1]").unwrap().len(), 2);
        assert_eq!(evaluate(&doc, "//span[2]").unwrap().len(), 1);
        assert_eq!(evaluate(&doc, "//li[last()]").unwrap().len(), 1);
        assert_eq!(evaluate(&doc, "//li[position()=2]").unwrap().len(), 1);
    }

    #[test]
    fn test_predicate_order_matters() {
        let doc = HtmlDocument::parse(PAGE);
        // Second li that is also class "item": li[2] is "item active".
        let hits = evaluate(&doc, r#"//li[2][contains(@class,"item")]"#).unwrap();
        assert_eq!(hits.len(), 1);
        // Among li carrying " item ", the third does not exist.
        let hits = evaluate(
            &doc,
            r#"//li[contains(concat(" ",normalize-space(@class)," ")," item ")][3]"#,
        )
        .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_loose_vs_strict_class() {
        let doc = HtmlDocument::parse(PAGE);
        let loose = evaluate(&doc, r#"//li[contains(@class,"item")]"#).unwrap();
        assert_eq!(loose.len(), 3);
        let strict = evaluate(
            &doc,
            r#"//li[contains(concat(" ",normalize-space(@class)," ")," item ")]"#,
        )
        .unwrap();
        assert_eq!(strict.len(), 2);
    }

    #[test]
    fn test_id_anchor() {
        let doc = HtmlDocument::parse(PAGE);
        let hits = evaluate(&doc, r#"id("menu")"#).unwrap();
        assert_eq!(tags(&doc, &hits), vec!["ul"]);
        assert_eq!(evaluate(&doc, r#"id("menu")/li"#).unwrap().len(), 3);
        assert_eq!(evaluate(&doc, r#"id("menu")//li[3]"#).unwrap().len(), 1);
        assert!(evaluate(&doc, r#"id("nope")/li"#).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_equality() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(evaluate(&doc, r#"//input[@name="q"]"#).unwrap().len(), 1);
        assert_eq!(evaluate(&doc, r#"//input[@name!="q"]"#).unwrap().len(), 1);
        // Missing attribute compares false both ways.
        assert!(evaluate(&doc, r#"//li[@name!="q"]"#).unwrap().is_empty());
        assert_eq!(evaluate(&doc, "//span[@name]").unwrap().len(), 1);
        assert_eq!(evaluate(&doc, "//span[not(@name)]").unwrap().len(), 2);
    }

    #[test]
    fn test_concat_literal_with_both_quotes() {
        let html = r#"<html><body><p id='a"b&apos;c'>x</p></body></html>"#;
        let doc = HtmlDocument::parse(html);
        let hits = evaluate(&doc, r#"id(concat("a",'"',"b'c"))"#).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_unknown_function_errors() {
        let doc = HtmlDocument::parse(PAGE);
        assert!(matches!(
            evaluate(&doc, "//li[frobnicate(@class)]"),
            Err(ExprError::UnknownFunction(_))
        ));
        assert!(matches!(
            evaluate(&doc, "//li[contains(@class)]"),
            Err(ExprError::Arity { .. })
        ));
    }

    #[test]
    fn test_wildcard() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(evaluate(&doc, "/*").unwrap().len(), 1);
        assert_eq!(evaluate(&doc, "/html/body/*").unwrap().len(), 4);
    }

    #[test]
    fn test_name_functions() {
        let doc = HtmlDocument::parse(
            "<html><body><p>a<o:p>1</o:p></p><p>b<o:p>2</o:p><o:p>3</o:p></p></body></html>",
        );
        assert_eq!(evaluate(&doc, r#"//*[name()="o:p"]"#).unwrap().len(), 3);
        assert_eq!(evaluate(&doc, r#"//p/*[local-name()="o:p"][2]"#).unwrap().len(), 1);
        assert_eq!(evaluate(&doc, r#"/*[name()="html"]"#).unwrap().len(), 1);
    }

    #[test]
    fn test_normalize_space_keeps_non_breaking_space() {
        let doc = HtmlDocument::parse(
            "<html><body><span class=\"btn\u{a0}primary\">a</span><span class=\"btn primary\">b</span></body></html>",
        );
        let strict = |class: &str| {
            format!(r#"//span[contains(concat(" ",normalize-space(@class)," ")," {class} ")]"#)
        };
        assert_eq!(evaluate(&doc, &strict("btn\u{a0}primary")).unwrap().len(), 1);
        assert_eq!(evaluate(&doc, &strict("btn")).unwrap().len(), 1);
    }
}
