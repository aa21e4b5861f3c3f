//! Segment extraction — one filtered feature set per ancestor of the target.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::document::{DocumentQuery, NodeId};
use crate::types::Segment;
use crate::xpath;

/// Documents with this many class usages or fewer never ban a length.
pub const NOISE_BAN_MIN_USAGES: usize = 100;

/// Share of usages one length must exceed to be banned.
pub const NOISE_BAN_SHARE: f64 = 0.9;

/// Tags whose `name` attribute is extracted.
const FORM_CONTROLS: &[&str] = &["input", "textarea", "select"];

/// Shapes of framework-assigned identifiers.
fn generated_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^\d+$
            | ^ember\d+$
            | ^ext-(gen|comp-?)\d+$
            | ^ui-id-\d+$
            | ^yui_
            | ^gwt-uid-\d+$
            | ^j_id
            | ^:r[0-9a-z]*:$
            | ^radix-
            | ^headlessui-
            | ^mui-\d+$
            | ^react-select-\d+-
            | ^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$
            | \d{5,}
            ",
        )
        .expect("generated id regex is valid")
    })
}

/// Whether an identifier looks stable enough to anchor a locator on.
pub fn is_stable_identifier(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace) && !generated_id_pattern().is_match(id)
}

/// Compute the class-name length banned across the whole document, if any.
///
/// When more than [`NOISE_BAN_MIN_USAGES`] class usages exist and more than
/// [`NOISE_BAN_SHARE`] of them share one character length, that length is
/// returned. Hashed and content-generated class names cluster this way.
pub fn compute_noise_ban<D: DocumentQuery + ?Sized>(doc: &D) -> Option<usize> {
    let mut by_length: HashMap<usize, usize> = HashMap::new();
    let mut total = 0usize;

    for node in doc.elements() {
        for class in doc.class_list(node) {
            *by_length.entry(class.chars().count()).or_default() += 1;
            total += 1;
        }
    }

    if total <= NOISE_BAN_MIN_USAGES {
        return None;
    }

    let (length, count) = by_length
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    if count as f64 > total as f64 * NOISE_BAN_SHARE {
        tracing::debug!("Banning class names of length {length} ({count}/{total} usages)");
        Some(length)
    } else {
        None
    }
}

/// Walk from `target` to the document element and extract one segment per
/// element, ordered root-to-target.
///
/// Never fails; an unknown target yields an empty list.
pub fn extract_segments<D: DocumentQuery + ?Sized>(
    doc: &D,
    target: NodeId,
    noise_ban: Option<usize>,
) -> Vec<Segment> {
    if !doc.contains(target) {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = Some(target);
    while let Some(node) = current {
        segments.push(extract_one(doc, node, noise_ban));
        current = doc.parent(node);
    }
    segments.reverse();
    segments
}

fn extract_one<D: DocumentQuery + ?Sized>(
    doc: &D,
    node: NodeId,
    noise_ban: Option<usize>,
) -> Segment {
    let tag_name = doc.tag_name(node).to_ascii_lowercase();

    let identifier = doc
        .attribute(node, "id")
        .filter(|id| is_stable_identifier(id))
        .filter(|id| doc.elements_by_id(id).len() == 1)
        .map(str::to_string);

    let sibling_index = if identifier.is_none() {
        Some(sibling_index(doc, node, &tag_name))
    } else {
        None
    };

    let input_name = if FORM_CONTROLS.contains(&tag_name.as_str()) {
        doc.attribute(node, "name")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    // A class is kept only if its strict predicate matches this element.
    // HTML also splits on form feed, which `normalize-space` leaves alone.
    let class_names = doc.attribute(node, "class").map(|raw| {
        let padded = format!(" {} ", xpath::normalize_space(raw));
        raw.split_ascii_whitespace()
            .filter(|class| Some(class.chars().count()) != noise_ban)
            .filter(|class| padded.contains(&format!(" {class} ")))
            .map(str::to_string)
            .collect()
    });

    Segment {
        tag_name,
        identifier,
        sibling_index,
        input_name,
        class_names,
    }
}

/// 1 + number of preceding element siblings with the same tag.
fn sibling_index<D: DocumentQuery + ?Sized>(doc: &D, node: NodeId, tag: &str) -> usize {
    let mut index = 1;
    let mut current = doc.previous_sibling(node);
    while let Some(sibling) = current {
        if doc.tag_name(sibling).eq_ignore_ascii_case(tag) {
            index += 1;
        }
        current = doc.previous_sibling(sibling);
    }
    index
}
