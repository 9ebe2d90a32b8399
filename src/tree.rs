//! Element tree for the scanner.
//!
//! [`LenientParser`] builds the tree from the segment tokenizer with the same
//! recovery rule as the fix pipeline: a close tag truncates to its nearest
//! open ancestor, an unmatched close is ignored, and anything still open at
//! the end of input is closed implicitly.

use regex::Captures;
use thiserror::Error;

use crate::text::content_line;
use crate::tokenize::{is_void, tokenize, TagKind, Token};

/* ================================ Tree model ============================= */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text { text: String, line: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased local name, namespace prefix dropped.
    pub name: String,
    /// Line of the opening tag.
    pub line: usize,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: &str, line: usize) -> Self {
        let local = name.rsplit(':').next().unwrap_or(name);
        Self { name: local.to_ascii_lowercase(), line, children: Vec::new() }
    }

    /// Concatenated descendant text, leaving out subtrees rooted at an
    /// element for which `skip` holds.
    pub fn text_excluding(&self, skip: impl Fn(&str) -> bool + Copy) -> String {
        let mut out = String::new();
        collect_text(&self.children, skip, &mut out);
        out
    }

    pub fn full_text(&self) -> String {
        self.text_excluding(|_| false)
    }

    /// Direct element children, text skipped.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text { .. } => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.name == name)
    }
}

fn collect_text(nodes: &[Node], skip: impl Fn(&str) -> bool + Copy, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text { text, .. } => out.push_str(text),
            Node::Element(el) if !skip(&el.name) => collect_text(&el.children, skip, out),
            Node::Element(_) => {}
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    /// Every element in document order.
    pub fn elements(&self) -> Elements<'_> {
        let mut stack = Vec::new();
        push_elements(&mut stack, &self.children);
        Elements { stack }
    }

    pub fn root(&self) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text { .. } => None,
        })
    }
}

fn push_elements<'a>(stack: &mut Vec<&'a Element>, nodes: &'a [Node]) {
    for node in nodes.iter().rev() {
        if let Node::Element(el) = node {
            stack.push(el);
        }
    }
}

/// Pre-order element iterator.
pub struct Elements<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        push_elements(&mut self.stack, &el.children);
        Some(el)
    }
}

/* ================================= Parsing =============================== */

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

pub trait MarkupParser {
    fn parse(&self, source: &str) -> Result<Document, ParseFailure>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LenientParser;

impl MarkupParser for LenientParser {
    fn parse(&self, source: &str) -> Result<Document, ParseFailure> {
        let mut builder = TreeBuilder::default();
        for token in tokenize(source) {
            match token {
                Token::Text { content, line } => builder.text(&content, line),
                Token::Markup { tag: Some(tag), line, .. } => match tag.kind {
                    TagKind::Open if !is_void(&tag.name) => builder.open(&tag.name, line),
                    TagKind::Open | TagKind::SelfClosing => builder.empty(&tag.name, line),
                    TagKind::Close => builder.close(&tag.name),
                },
                Token::Markup { tag: None, .. } => {}
            }
        }
        let doc = builder.finish();
        if doc.root().is_none() {
            return Err(ParseFailure { reason: "no element found".into() });
        }
        Ok(doc)
    }
}

/// Open elements, each paired with its raw (prefixed) tag name.
#[derive(Default)]
struct TreeBuilder {
    top: Vec<Node>,
    open: Vec<(String, Element)>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) {
        match self.open.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => self.top.push(node),
        }
    }

    fn text(&mut self, raw: &str, line: usize) {
        if raw.is_empty() {
            return;
        }
        let text = decode_entities(raw);
        self.attach(Node::Text { line: content_line(line, &text), text });
    }

    fn open(&mut self, name: &str, line: usize) {
        self.open.push((name.to_string(), Element::new(name, line)));
    }

    fn empty(&mut self, name: &str, line: usize) {
        self.attach(Node::Element(Element::new(name, line)));
    }

    fn close(&mut self, name: &str) {
        let Some(at) = self.open.iter().rposition(|(raw, _)| raw == name) else {
            return;
        };
        while self.open.len() > at {
            self.close_innermost();
        }
    }

    fn close_innermost(&mut self) {
        if let Some((_, el)) = self.open.pop() {
            self.attach(Node::Element(el));
        }
    }

    fn finish(mut self) -> Document {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        Document { children: self.top }
    }
}

/// Decode the predefined XML entities and numeric character references.
/// Unknown named entities are kept as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    regex!(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);")
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => numeric_reference(body),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_reference(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
