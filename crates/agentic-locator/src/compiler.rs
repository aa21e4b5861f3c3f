//! Candidate compiler — renders a segment list and an inclusion bit-set into a
//! path expression.

use std::fmt::Write;

use crate::bitset::BitSet;
use crate::budget::{options_per_segment, FIXED_OPTIONS};
use crate::types::{CompileMode, Segment};
use crate::xpath;

/// Maps (segment, feature) pairs onto inclusion bits.
///
/// Every segment owns `stride` consecutive bits: use-segment, identifier,
/// sibling index, input name, then one bit per class-name option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLayout {
    stride: usize,
    segments: usize,
}

impl BitLayout {
    pub fn for_segments(segments: &[Segment]) -> Self {
        Self {
            stride: options_per_segment(segments),
            segments: segments.len(),
        }
    }

    /// Total bits needed.
    pub fn capacity(&self) -> usize {
        self.stride * self.segments
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn use_bit(&self, segment: usize) -> usize {
        segment * self.stride
    }

    pub fn identifier_bit(&self, segment: usize) -> usize {
        segment * self.stride + 1
    }

    pub fn sibling_bit(&self, segment: usize) -> usize {
        segment * self.stride + 2
    }

    pub fn input_bit(&self, segment: usize) -> usize {
        segment * self.stride + 3
    }

    pub fn class_bit(&self, segment: usize, class: usize) -> usize {
        segment * self.stride + FIXED_OPTIONS + class
    }

    /// An empty inclusion record sized for this layout.
    pub fn empty(&self) -> BitSet {
        BitSet::new(self.capacity())
    }
}

/// Quote a string as an expression literal.
///
/// Values containing both quote characters are assembled with `concat()`.
pub fn literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let mut args: Vec<String> = Vec::new();
    for (i, piece) in value.split('"').enumerate() {
        if i > 0 {
            args.push("'\"'".to_string());
        }
        if !piece.is_empty() {
            args.push(format!("\"{piece}\""));
        }
    }
    format!("concat({})", args.join(","))
}

fn class_predicate(class: &str, mode: CompileMode) -> String {
    match mode {
        CompileMode::Loose => format!("[contains(@class,{})]", literal(class)),
        CompileMode::Strict => format!(
            "[contains(concat(\" \",normalize-space(@class),\" \"),{})]",
            literal(&format!(" {class} "))
        ),
    }
}

/// Step for `tag`. Tags that are not valid names, such as the prefixed
/// `o:p` of exported office documents, match by `name()` instead.
fn name_test(tag: &str) -> String {
    if xpath::is_name(tag) {
        tag.to_string()
    } else {
        format!("*[name()={}]", literal(tag))
    }
}

/// Render one asserted segment. Returns the part and whether it is an
/// identifier anchor.
fn compile_segment(
    segment: &Segment,
    index: usize,
    layout: &BitLayout,
    includes: &BitSet,
    mode: CompileMode,
) -> (String, bool) {
    if includes.get(layout.identifier_bit(index)) {
        if let Some(id) = &segment.identifier {
            return (format!("id({})", literal(id)), true);
        }
    }

    let mut part = name_test(&segment.tag_name);
    if includes.get(layout.sibling_bit(index)) {
        if let Some(n) = segment.sibling_index {
            let _ = write!(part, "[{n}]");
        }
    }
    if includes.get(layout.input_bit(index)) {
        if let Some(name) = &segment.input_name {
            let _ = write!(part, "[@name={}]", literal(name));
        }
    }
    for (j, class) in segment.classes().iter().enumerate() {
        if includes.get(layout.class_bit(index, j)) {
            part.push_str(&class_predicate(class, mode));
        }
    }
    (part, false)
}

/// Compile `segments` under `includes` into a path expression.
///
/// Unused segments contribute nothing; a run of them collapses into a single
/// `//` join between the surviving neighbours. The last identifier anchor
/// discards every segment before it; without one, evaluation starts at the
/// document root.
pub fn compile(segments: &[Segment], includes: &BitSet, mode: CompileMode) -> String {
    let layout = BitLayout::for_segments(segments);
    let mut parts: Vec<String> = Vec::with_capacity(segments.len());
    let mut anchor = None;

    for (i, segment) in segments.iter().enumerate() {
        if !includes.get(layout.use_bit(i)) {
            parts.push(String::new());
            continue;
        }
        let (part, is_anchor) = compile_segment(segment, i, &layout, includes, mode);
        if is_anchor {
            anchor = Some(i);
        }
        parts.push(part);
    }

    let (mut out, rest) = match anchor {
        Some(a) => (parts[a].clone(), &parts[a + 1..]),
        None => (String::new(), &parts[..]),
    };

    let mut skipped = false;
    for part in rest {
        if part.is_empty() {
            skipped = true;
            continue;
        }
        out.push_str(if skipped { "//" } else { "/" });
        out.push_str(part);
        skipped = false;
    }
    out
}

/// Inclusion record asserting every feature the segments offer.
pub fn all_features(segments: &[Segment]) -> BitSet {
    let layout = BitLayout::for_segments(segments);
    let mut includes = layout.empty();
    for (i, segment) in segments.iter().enumerate() {
        includes.set(layout.use_bit(i), true);
        if segment.identifier.is_some() {
            includes.set(layout.identifier_bit(i), true);
        }
        if segment.sibling_index.is_some() {
            includes.set(layout.sibling_bit(i), true);
        }
        if segment.input_name.is_some() {
            includes.set(layout.input_bit(i), true);
        }
        for j in 0..segment.class_count() {
            includes.set(layout.class_bit(i, j), true);
        }
    }
    includes
}

/// The maximally specific strict expression for a segment list.
pub fn full_expression(segments: &[Segment]) -> String {
    compile(segments, &all_features(segments), CompileMode::Strict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(tag: &str) -> Segment {
        Segment::bare(tag)
    }

    fn chain() -> Vec<Segment> {
        let mut body = seg("body");
        body.sibling_index = Some(1);
        let mut div = seg("div");
        div.identifier = Some("main".to_string());
        let mut input = seg("input");
        input.sibling_index = Some(2);
        input.input_name = Some("email".to_string());
        input.class_names = Some(vec!["field".to_string(), "wide".to_string()]);
        vec![seg("html"), body, div, input]
    }

    fn with_bits(segments: &[Segment], bits: &[usize]) -> BitSet {
        let mut set = BitLayout::for_segments(segments).empty();
        for &b in bits {
            set.set(b, true);
        }
        set
    }

    #[test]
    fn test_layout() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        assert_eq!(layout.stride(), 6);
        assert_eq!(layout.capacity(), 24);
        assert_eq!(layout.use_bit(3), 18);
        assert_eq!(layout.identifier_bit(3), 19);
        assert_eq!(layout.sibling_bit(3), 20);
        assert_eq!(layout.input_bit(3), 21);
        assert_eq!(layout.class_bit(3, 1), 23);
    }

    #[test]
    fn test_only_target() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(&segs, &[layout.use_bit(3)]);
        assert_eq!(compile(&segs, &bits, CompileMode::Loose), "//input");
    }

    #[test]
    fn test_root_and_target_collapse_gap() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(&segs, &[layout.use_bit(0), layout.use_bit(3)]);
        assert_eq!(compile(&segs, &bits, CompileMode::Loose), "/html//input");
    }

    #[test]
    fn test_contiguous_from_root() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(
            &segs,
            &[layout.use_bit(0), layout.use_bit(1), layout.sibling_bit(1), layout.use_bit(2), layout.use_bit(3)],
        );
        assert_eq!(
            compile(&segs, &bits, CompileMode::Loose),
            "/html/body[1]/div/input"
        );
    }

    #[test]
    fn test_predicate_order_and_modes() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(
            &segs,
            &[
                layout.use_bit(3),
                layout.class_bit(3, 1),
                layout.input_bit(3),
                layout.sibling_bit(3),
            ],
        );
        assert_eq!(
            compile(&segs, &bits, CompileMode::Loose),
            r#"//input[2][@name="email"][contains(@class,"wide")]"#
        );
        assert_eq!(
            compile(&segs, &bits, CompileMode::Strict),
            r#"//input[2][@name="email"][contains(concat(" ",normalize-space(@class)," ")," wide ")]"#
        );
    }

    #[test]
    fn test_identifier_anchor_discards_ancestors() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(
            &segs,
            &[
                layout.use_bit(0),
                layout.use_bit(2),
                layout.identifier_bit(2),
                layout.use_bit(3),
            ],
        );
        assert_eq!(compile(&segs, &bits, CompileMode::Loose), r#"id("main")/input"#);
    }

    #[test]
    fn test_identifier_anchor_with_gap() {
        let mut segs = chain();
        segs.insert(3, seg("fieldset"));
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(
            &segs,
            &[layout.use_bit(2), layout.identifier_bit(2), layout.use_bit(4)],
        );
        assert_eq!(compile(&segs, &bits, CompileMode::Loose), r#"id("main")//input"#);
    }

    #[test]
    fn test_identifier_bit_without_identifier_is_ignored() {
        let segs = chain();
        let layout = BitLayout::for_segments(&segs);
        let bits = with_bits(&segs, &[layout.use_bit(3), layout.identifier_bit(3)]);
        assert_eq!(compile(&segs, &bits, CompileMode::Loose), "//input");
    }

    #[test]
    fn test_full_expression() {
        let segs = chain();
        assert_eq!(
            full_expression(&segs),
            concat!(
                r#"id("main")/input[2][@name="email"]"#,
                r#"[contains(concat(" ",normalize-space(@class)," ")," field ")]"#,
                r#"[contains(concat(" ",normalize-space(@class)," ")," wide ")]"#
            )
        );
    }

    #[test]
    fn test_full_expression_without_identifier() {
        let segs = vec![seg("html"), seg("body"), seg("p")];
        assert_eq!(full_expression(&segs), "/html/body/p");
    }

    #[test]
    fn test_literal_quoting() {
        assert_eq!(literal("plain"), r#""plain""#);
        assert_eq!(literal(r#"say "hi""#), r#"'say "hi"'"#);
        assert_eq!(literal(r#"a"b'c"#), r#"concat("a",'"',"b'c")"#);
        assert_eq!(literal(r#""'"#), r#"concat('"',"'")"#);
    }

    #[test]
    fn test_prefixed_tag_matches_by_name() {
        let mut office = seg("o:p");
        office.sibling_index = Some(2);
        let segs = vec![seg("html"), seg("body"), office];
        assert_eq!(
            full_expression(&segs),
            r#"/html/body/*[name()="o:p"][2]"#
        );
    }
}
