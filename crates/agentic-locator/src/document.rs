//! Document access for the locator engine.
//!
//! The engine never touches an ambient document. Everything it reads goes
//! through [`DocumentQuery`], so extraction, compilation checks and the
//! uniqueness oracle are a pure function of `(target, document)`.
//!
//! [`HtmlDocument`] is the bundled implementation: raw HTML is parsed with the
//! `scraper` crate and flattened into an owned arena of elements in document
//! order. The arena is `Send + Sync`, unlike `scraper::Html`, so it can be
//! shared with a search task running on the async runtime.

use std::collections::HashMap;
use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::types::{LocatorError, LocatorResult};

/// Handle to an element. For [`HtmlDocument`] it is the element's position in
/// document order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

/// Read-only capability over a live document.
///
/// Only elements are visible; text, comments and the document node itself are
/// not addressable.
pub trait DocumentQuery {
    /// The outermost element (`<html>` for HTML documents).
    fn document_element(&self) -> Option<NodeId>;

    /// Total number of elements in the document.
    fn element_count(&self) -> usize;

    /// All elements in document order.
    fn elements(&self) -> Box<dyn Iterator<Item = NodeId> + '_>;

    /// Element parent, `None` for the document element.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Element children in document order.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Lower-cased local name.
    fn tag_name(&self, node: NodeId) -> &str;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn contains(&self, node: NodeId) -> bool;

    /// Preceding element sibling.
    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = match self.parent(node) {
            Some(parent) => self.children(parent),
            None => return None,
        };
        let pos = siblings.iter().position(|&n| n == node)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Elements whose `id` attribute equals `id`, in document order.
    fn elements_by_id(&self, id: &str) -> Vec<NodeId> {
        self.elements()
            .filter(|&n| self.attribute(n, "id") == Some(id))
            .collect()
    }

    /// Whitespace-separated tokens of the `class` attribute.
    fn class_list(&self, node: NodeId) -> Vec<&str> {
        self.attribute(node, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An HTML document flattened into an element arena.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    source: String,
    url: Option<String>,
    nodes: Vec<ElementData>,
    ids: HashMap<String, Vec<NodeId>>,
}

impl HtmlDocument {
    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut nodes: Vec<ElementData> = Vec::new();
        let mut index = HashMap::new();
        let mut ids: HashMap<String, Vec<NodeId>> = HashMap::new();

        for el in document_order(&parsed) {
            let node = NodeId(nodes.len());
            index.insert(el.id(), node);

            let parent = el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| index.get(&p.id()).copied());
            if let Some(parent) = parent {
                nodes[parent.0].children.push(node);
            }

            let attrs: Vec<(String, String)> = el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            if let Some(id) = el.value().attr("id") {
                ids.entry(id.to_string()).or_default().push(node);
            }

            nodes.push(ElementData {
                tag: el.value().name().to_ascii_lowercase(),
                attrs,
                parent,
                children: Vec::new(),
            });
        }

        tracing::trace!("Parsed document with {} elements", nodes.len());

        Self {
            source: html.to_string(),
            url: None,
            nodes,
            ids,
        }
    }

    /// Read and parse an HTML file.
    pub fn from_path(path: impl AsRef<Path>) -> LocatorResult<Self> {
        let html = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&html))
    }

    /// Attach the page-visit URL this document was captured from.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Elements matching a CSS selector, in document order.
    ///
    /// This is how a host turns a pointer selection into a target handle.
    pub fn select(&self, css: &str) -> LocatorResult<Vec<NodeId>> {
        let selector =
            Selector::parse(css).map_err(|e| LocatorError::InvalidSelector(format!("{css}: {e}")))?;
        let parsed = Html::parse_document(&self.source);
        Ok(document_order(&parsed)
            .into_iter()
            .enumerate()
            .filter(|(_, el)| selector.matches(el))
            .map(|(i, _)| NodeId(i))
            .collect())
    }

    /// First element matching a CSS selector.
    pub fn select_first(&self, css: &str) -> LocatorResult<NodeId> {
        self.select(css)?
            .into_iter()
            .next()
            .ok_or_else(|| LocatorError::TargetNotFound(css.to_string()))
    }

    fn node(&self, node: NodeId) -> Option<&ElementData> {
        self.nodes.get(node.0)
    }
}

/// Elements of a parsed document in pre-order.
fn document_order(parsed: &Html) -> Vec<ElementRef<'_>> {
    parsed
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

impl DocumentQuery for HtmlDocument {
    fn document_element(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    fn element_count(&self) -> usize {
        self.nodes.len()
    }

    fn elements(&self) -> Box<dyn Iterator<Item = NodeId> + '_> {
        Box::new((0..self.nodes.len()).map(NodeId))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    fn tag_name(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn elements_by_id(&self, id: &str) -> Vec<NodeId> {
        self.ids.get(id).cloned().unwrap_or_default()
    }
}
