//! Minimal WordprocessingML DOM.
//!
//! DOCX parts are small enough to hold as trees, and the refit pipeline
//! rewrites elements in place (paragraph styles, section properties, run
//! text), so a read-only pull parser is not enough. This module builds a
//! plain element tree with `quick_xml`'s reader and serializes it back with
//! its writer. Namespace prefixes are kept verbatim (`w:p`, `r:embed`);
//! no namespace resolution is attempted.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

/// A node in the tree: an element or a text span.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

impl XmlNode {
    /// The element inside this node, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// Mutable element access.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }
}

/// An XML element: qualified name, attributes in document order, children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Qualified name, prefix included (e.g. `w:pStyle`).
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text appender.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Get an attribute value by qualified name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.attrs.push((key, value));
        }
    }

    /// First child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .filter_map(XmlNode::as_element)
            .find(|e| e.name == name)
    }

    /// Mutable variant of [`Element::child`].
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|e| e.name == name)
    }

    /// All child elements with the given qualified name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter_map(XmlNode::as_element)
            .filter(move |e| e.name == name)
    }

    /// All child elements, regardless of name.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Append a child element.
    pub fn push_element(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    /// Remove all children with the given qualified name.
    pub fn remove_children(&mut self, name: &str) {
        self.children
            .retain(|n| n.as_element().map_or(true, |e| e.name != name));
    }

    /// Ensure a child element exists, creating it (appended last) if absent,
    /// and return a mutable reference to it.
    pub fn ensure_child(&mut self, name: &str) -> &mut Element {
        if self.child(name).is_none() {
            self.push_element(Element::new(name));
        }
        self.child_mut(name).unwrap()
    }

    /// Concatenated text content of this element's direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Depth-first iterator over this element and every descendant element.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Visit every descendant element mutably, depth-first.
    pub fn visit_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        f(self);
        for node in &mut self.children {
            if let XmlNode::Element(child) = node {
                child.visit_mut(f);
            }
        }
    }

    /// Parse an XML document, returning its root element.
    pub fn parse(data: &[u8]) -> Result<Element> {
        let mut reader = Reader::from_reader(data);
        // Word emits xml:space="preserve" on runs; never trim text.
        reader.trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    stack.push(element_from_start(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let elem = element_from_start(&e)?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Ok(Event::End(_)) => {
                    let elem = stack.pop().ok_or_else(|| {
                        Error::Package("unbalanced closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Ok(Event::Text(t)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| Error::Package(format!("bad text content: {e}")))?;
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Package(format!(
                        "XML parse error at byte {}: {e}",
                        reader.buffer_position()
                    )))
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Package("unexpected end of XML document".to_string()));
        }
        root.ok_or_else(|| Error::Package("empty XML document".to_string()))
    }

    /// Serialize this element as a standalone XML document
    /// (declaration included, UTF-8).
    pub fn to_document_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write_element(&mut writer, self)?;
        Ok(writer.into_inner().into_inner())
    }
}

/// Iterator for [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        // Reverse keeps document order for the depth-first walk.
        for node in next.children.iter().rev() {
            if let XmlNode::Element(child) = node {
                self.stack.push(child);
            }
        }
        Some(next)
    }
}

fn element_from_start(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Package(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Package(format!("bad attribute value: {e}")))?
            .into_owned();
        elem.attrs.push((key, value));
    }
    Ok(elem)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, elem: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(elem));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(Error::Package("multiple root elements".to_string()));
            }
            *root = Some(elem);
            Ok(())
        }
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, elem: &Element) -> Result<()> {
    let mut start = BytesStart::new(elem.name.as_str());
    for (key, value) in &elem.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &elem.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(elem.name.as_str())))?;
    Ok(())
}
