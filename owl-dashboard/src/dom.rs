//! Document model the renderer writes into
//!
//! The renderer only ever addresses anchors by DOM id through [`Document`].
//! [`HtmlDocument`] is the in-memory implementation: an element tree that
//! serialises to escaped HTML for the page served by the binary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// DOM ids of the anchors the dashboard page provides
pub mod anchors {
    pub const OVERVIEW: &str = "owlPositions";
    pub const GRID: &str = "owlGrid";
    pub const DETECTION_BUTTON: &str = "detectionButton";
    pub const RECORD_BUTTON: &str = "recordButton";
    pub const VIDEO_PANEL: &str = "videoFeed";
    pub const VIDEO_TITLE: &str = "videoTitle";
    pub const VIDEO_CLOSE: &str = "videoClose";
}

/// `data-action` values carried by interactive elements
pub mod actions {
    pub const SELECT_UNIT: &str = "select-unit";
    pub const TOGGLE_DETECTION: &str = "toggle-detection";
    pub const TOGGLE_RECORDING: &str = "toggle-recording";
    pub const CLEAR_SELECTION: &str = "clear-selection";
}

pub const ATTR_ACTION: &str = "data-action";
pub const ATTR_UNIT: &str = "data-unit";

pub trait Document: Send {
    fn element(&self, id: &str) -> Option<&Element>;
    fn element_mut(&mut self, id: &str) -> Option<&mut Element>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_style(property, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Ignores empty tokens and never duplicates a class
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !class.is_empty() && !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn set_class(&mut self, class: &str, enabled: bool) {
        if enabled {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Own text followed by the text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.styles.insert(property.into(), value.into());
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Drops every previous child before installing the new ones
    pub fn replace_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }

    /// Swaps the direct child carrying `id`; hands `child` back when there is none
    pub fn replace_child(&mut self, id: &str, child: Element) -> Result<Element, Element> {
        match self.children.iter_mut().find(|c| c.id.as_deref() == Some(id)) {
            Some(slot) => Ok(std::mem::replace(slot, child)),
            None => Err(child),
        }
    }

    /// Inserts at `index`, or appends when `index` is past the end
    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Depth-first, document order
    pub fn find_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_by_class(class, found);
        }
    }

    /// Number of elements in this subtree, itself included
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Element::subtree_len).sum::<usize>()
    }

    pub fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if let Some(id) = &self.id {
            let _ = write!(out, " id=\"{}\"", escape(id));
        }
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&self.classes.join(" ")));
        }
        if !self.styles.is_empty() {
            let style = self
                .styles
                .iter()
                .map(|(property, value)| format!("{property}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            let _ = write!(out, " style=\"{}\"", escape(&style));
        }
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text));
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    root: Element,
}

impl HtmlDocument {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Page skeleton holding every anchor the renderer writes to
    pub fn dashboard() -> Self {
        let controls = Element::new("div")
            .with_class("controls")
            .with_child(
                Element::new("button")
                    .with_id(anchors::DETECTION_BUTTON)
                    .with_class("control-button")
                    .with_attr(ATTR_ACTION, actions::TOGGLE_DETECTION),
            )
            .with_child(
                Element::new("button")
                    .with_id(anchors::RECORD_BUTTON)
                    .with_class("control-button")
                    .with_attr(ATTR_ACTION, actions::TOGGLE_RECORDING),
            );

        let video = Element::new("div")
            .with_id(anchors::VIDEO_PANEL)
            .with_class("video-feed")
            .with_class("hidden")
            .with_child(Element::new("h2").with_id(anchors::VIDEO_TITLE))
            .with_child(
                Element::new("button")
                    .with_id(anchors::VIDEO_CLOSE)
                    .with_class("close-button")
                    .with_attr(ATTR_ACTION, actions::CLEAR_SELECTION)
                    .with_text("×"),
            );

        let body = Element::new("body")
            .with_child(Element::new("header").with_child(Element::new("h1").with_text("OWL Dashboard")))
            .with_child(controls)
            .with_child(
                Element::new("section")
                    .with_class("boom")
                    .with_child(Element::new("div").with_id(anchors::OVERVIEW).with_class("owl-positions")),
            )
            .with_child(Element::new("section").with_id(anchors::GRID).with_class("owl-grid"))
            .with_child(video);

        Self::new(body)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        self.root.write_html(&mut out);
        out
    }
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self::dashboard()
    }
}

impl Document for HtmlDocument {
    fn element(&self, id: &str) -> Option<&Element> {
        self.root.find(id)
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.root.find_mut(id)
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_has_every_anchor() {
        let doc = HtmlDocument::dashboard();
        for id in [
            anchors::OVERVIEW,
            anchors::GRID,
            anchors::DETECTION_BUTTON,
            anchors::RECORD_BUTTON,
            anchors::VIDEO_PANEL,
            anchors::VIDEO_TITLE,
            anchors::VIDEO_CLOSE,
        ] {
            assert!(doc.element(id).is_some(), "missing anchor {id}");
        }
        assert!(doc.element(anchors::VIDEO_PANEL).unwrap().has_class("hidden"));
    }

    #[test]
    fn test_class_list_has_no_duplicates() {
        let mut el = Element::new("div").with_class("a");
        el.add_class("a");
        el.add_class("");
        el.set_class("b", true);
        assert_eq!(el.classes(), &["a".to_string(), "b".to_string()]);
        el.set_class("a", false);
        assert_eq!(el.classes(), &["b".to_string()]);
    }

    #[test]
    fn test_replace_children_drops_previous() {
        let mut el = Element::new("div").with_child(Element::new("span"));
        el.replace_children(vec![Element::new("p"), Element::new("p")]);
        assert_eq!(el.children().len(), 2);
        assert!(el.children().iter().all(|c| c.tag() == "p"));
        assert_eq!(el.subtree_len(), 3);
    }

    #[test]
    fn test_replace_and_insert_child() {
        let mut list = Element::new("ul")
            .with_child(Element::new("li").with_id("a").with_text("1"))
            .with_child(Element::new("li").with_id("c").with_text("3"));

        let old = list.replace_child("a", Element::new("li").with_id("a").with_text("one"));
        assert_eq!(old.unwrap().text(), Some("1"));
        assert!(list.replace_child("b", Element::new("li").with_id("b")).is_err());

        list.insert_child(1, Element::new("li").with_id("b").with_text("2"));
        list.insert_child(99, Element::new("li").with_id("d").with_text("4"));
        assert_eq!(list.text_content(), "one234");
    }

    #[test]
    fn test_html_is_escaped() {
        let el = Element::new("div")
            .with_id("x")
            .with_attr("data-unit", "a\"b")
            .with_style("color", "hsl(0, 70%, 50%)")
            .with_text("<script>&");
        assert_eq!(
            el.to_html(),
            "<div id=\"x\" style=\"color: hsl(0, 70%, 50%)\" data-unit=\"a&quot;b\">&lt;script&gt;&amp;</div>"
        );
    }

    #[test]
    fn test_find_by_class_and_text_content() {
        let el = Element::new("div")
            .with_text("a")
            .with_child(Element::new("span").with_class("k").with_text("b"))
            .with_child(Element::new("span").with_child(Element::new("i").with_class("k").with_text("c")));
        assert_eq!(el.find_by_class("k").len(), 2);
        assert_eq!(el.text_content(), "abc");
    }
}
