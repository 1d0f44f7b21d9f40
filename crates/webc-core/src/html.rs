#![forbid(unsafe_code)]

//! Render tree produced by element templates.
//!
//! Elements render into a small, owned [`Node`] tree instead of writing to a
//! live document. The same tree serves two purposes:
//!
//! 1. **Server rendering**: [`Node::to_html`] serialises it to markup.
//! 2. **Client queries**: the element looks up its own parts (scroll
//!    container, buttons) with [`Node::find`] and friends.
//!
//! # Invariants
//!
//! - Attribute order is insertion order; serialisation is deterministic.
//! - Setting an attribute twice replaces the earlier value in place.
//! - `Node::Fragment(vec![])` is "nothing" and serialises to the empty string.
//!
//! # Example
//!
//! ```
//! use webc_core::html::{Element, Node};
//!
//! let node: Node = Element::new("button")
//!     .attr("type", "submit")
//!     .flag("disabled", true)
//!     .text("Save")
//!     .into();
//! assert_eq!(node.to_html(), r#"<button type="submit" disabled>Save</button>"#);
//! ```

use std::fmt::Write as _;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// `name="value"`
    Text(String),
    /// Boolean attribute, present with no value.
    Present,
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, AttrValue)>,
    children: Vec<Node>,
}

/// A node in the render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Fragment(Vec<Node>),
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set a text attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name.into(), AttrValue::Text(value.into()));
        self
    }

    /// Set a text attribute only when `value` is `Some`.
    #[must_use]
    pub fn attr_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Set a boolean attribute when `present` is true.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>, present: bool) -> Self {
        if present {
            self.set(name.into(), AttrValue::Present);
        }
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append several child nodes.
    #[must_use]
    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Append a text child.
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    fn set(&mut self, name: String, value: AttrValue) {
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    /// Value of a text attribute. Boolean attributes yield `Some("")`.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| match v {
            AttrValue::Text(s) => s.as_str(),
            AttrValue::Present => "",
        })
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(n, _)| n == name)
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_owned())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map_or_else(Node::nothing, Into::into)
    }
}

impl Node {
    /// The empty node.
    pub const fn nothing() -> Self {
        Node::Fragment(Vec::new())
    }

    /// Whether this node renders nothing at all.
    pub fn is_nothing(&self) -> bool {
        match self {
            Node::Fragment(nodes) => nodes.iter().all(Node::is_nothing),
            _ => false,
        }
    }

    /// Depth-first search for the first element matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        match self {
            Node::Element(el) => {
                if pred(el) {
                    return Some(el);
                }
                el.children.iter().find_map(|c| c.find(pred))
            }
            Node::Fragment(nodes) => nodes.iter().find_map(|c| c.find(pred)),
            Node::Text(_) => None,
        }
    }

    /// All elements matching `pred`, in document order.
    pub fn find_all(&self, pred: &dyn Fn(&Element) -> bool) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_matching(pred, &mut out);
        out
    }

    /// First element carrying `class`.
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.find(&|el: &Element| el.has_class(class))
    }

    fn collect_matching<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        match self {
            Node::Element(el) => {
                if pred(el) {
                    out.push(el);
                }
                for child in &el.children {
                    child.collect_matching(pred, out);
                }
            }
            Node::Fragment(nodes) => {
                for child in nodes {
                    child.collect_matching(pred, out);
                }
            }
            Node::Text(_) => {}
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            Node::Fragment(nodes) => {
                for child in nodes {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Serialise to HTML markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => escape_into(text, false, out),
            Node::Fragment(nodes) => {
                for node in nodes {
                    node.write_html(out);
                }
            }
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    if let AttrValue::Text(v) = value {
                        out.push_str("=\"");
                        escape_into(v, true, out);
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in &el.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

fn escape_into(raw: &str, attribute: bool, out: &mut String) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_serialises_to_empty() {
        assert_eq!(Node::nothing().to_html(), "");
        assert!(Node::nothing().is_nothing());
        assert!(Node::Fragment(vec![Node::nothing()]).is_nothing());
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let el = Element::new("div").attr("b", "2").attr("a", "1").attr("b", "3");
        assert_eq!(Node::from(el).to_html(), r#"<div b="3" a="1"></div>"#);
    }

    #[test]
    fn false_flag_is_omitted() {
        let el = Element::new("dialog").flag("open", false).flag("inert", true);
        assert_eq!(Node::from(el).to_html(), "<dialog inert></dialog>");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let el = Element::new("p")
            .attr("title", r#"say "hi" & <go>"#)
            .text("<script>&");
        assert_eq!(
            Node::from(el).to_html(),
            r#"<p title="say &quot;hi&quot; &amp; &lt;go&gt;">&lt;script&gt;&amp;</p>"#
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let el = Element::new("div").child(Element::new("br")).text("x");
        assert_eq!(Node::from(el).to_html(), "<div><br>x</div>");
    }

    #[test]
    fn find_by_class_searches_depth_first() {
        let tree: Node = Element::new("section")
            .child(Element::new("div").attr("class", "a b").attr("id", "first"))
            .child(Element::new("div").attr("class", "b").attr("id", "second"))
            .into();
        let found = tree.find_by_class("b").map(|el| el.get_attr("id"));
        assert_eq!(found, Some(Some("first")));
        assert_eq!(tree.find_all(&|el: &Element| el.has_class("b")).len(), 2);
        assert!(tree.find_by_class("c").is_none());
    }

    #[test]
    fn optional_child_renders_nothing() {
        let missing: Option<Element> = None;
        let el = Element::new("footer").child(missing);
        assert_eq!(Node::from(el).to_html(), "<footer></footer>");
    }

    #[test]
    fn text_content_concatenates() {
        let el = Element::new("h2").text("Hello ").child(Element::new("b").text("world"));
        assert_eq!(el.text_content(), "Hello world");
    }
}
