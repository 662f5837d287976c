//! Parsed page markup: reference discovery, attribute rewriting and
//! serialization on top of an html5ever `RcDom`.

use encoding_rs::{Encoding, UTF_8};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use mime::Mime;
use regex::bytes::Regex;
use std::fmt;
use std::io;
use std::rc::Rc;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::ResourceRules;

/// How far into the body a `<meta charset>` declaration is looked for.
const PRESCAN_LEN: usize = 1024;

const UTF8_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("content is binary, found a NUL byte at offset {offset}")]
    Binary { offset: usize },
}

/// An element attribute pointing at an external resource.
#[derive(Clone)]
pub struct ResourceReference {
    element: Handle,
    pub tag: String,
    pub attribute: String,
    pub raw: String,
}

impl ResourceReference {
    /// Replaces the attribute's value on the owning element.
    pub fn set_value(&self, value: &str) {
        if let NodeData::Element { ref attrs, .. } = self.element.data {
            for attr in attrs.borrow_mut().iter_mut() {
                if &*attr.name.local == self.attribute {
                    attr.value = StrTendril::from_slice(value);
                }
            }
        }
    }

    /// The attribute's current value on the owning element.
    pub fn current_value(&self) -> Option<String> {
        element_attr(&self.element, &self.attribute)
    }
}

impl fmt::Debug for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceReference")
            .field("tag", &self.tag)
            .field("attribute", &self.attribute)
            .field("raw", &self.raw)
            .finish()
    }
}

pub struct Document {
    dom: RcDom,
    encoding: &'static Encoding,
}

impl Document {
    /// Builds a document tree from the raw body.
    ///
    /// The character encoding comes from a byte order mark, then the
    /// `charset` of `content_type`, then a `<meta>` declaration near the
    /// top of the body, falling back to UTF-8. Malformed markup is
    /// recovered the way browsers do and undecodable bytes are replaced.
    /// The tree is always serialized as UTF-8, so charset declarations are
    /// rewritten to say so.
    pub fn parse(bytes: &[u8], content_type: Option<&str>) -> Result<Self, ParseError> {
        let declared = declared_encoding(content_type).or_else(|| prescan_meta_charset(bytes));
        let (text, encoding, _) = declared.unwrap_or(UTF_8).decode(bytes);

        if let Some(offset) = text.chars().take(PRESCAN_LEN).position(|c| c == '\0') {
            return Err(ParseError::Binary { offset });
        }

        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .one(StrTendril::from_slice(&text));
        let document = Self { dom, encoding };
        document.inline_templates();
        document.declare_utf8();
        Ok(document)
    }

    /// The encoding the body was decoded from.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Resource references in document order, at most one per element.
    pub fn references(&self, rules: &ResourceRules) -> Vec<ResourceReference> {
        let mut found = Vec::new();

        for node in self.elements() {
            if let NodeData::Element { ref name, .. } = node.data {
                let tag = name.local.to_string();
                let matched = rules
                    .attributes_for(&tag)
                    .find_map(|attr| element_attr(&node, attr).map(|raw| (attr.to_string(), raw)));
                if let Some((attribute, raw)) = matched {
                    found.push(ResourceReference {
                        element: node.clone(),
                        tag,
                        attribute,
                        raw,
                    });
                }
            }
        }

        found
    }

    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let document: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut out, &document, SerializeOpts::default())?;
        Ok(out)
    }

    /// Element nodes in document order.
    fn elements(&self) -> Vec<Handle> {
        let mut elements = Vec::new();
        let mut stack = vec![self.dom.document.clone()];

        while let Some(node) = stack.pop() {
            if let NodeData::Element { .. } = node.data {
                elements.push(node.clone());
            }
            // reversed so the first child is popped first
            stack.extend(node.children.borrow().iter().rev().cloned());
        }

        elements
    }

    /// Moves every `<template>`'s content fragment back under the element.
    ///
    /// html5ever parks template contents in a separate fragment that neither
    /// tree walks nor the serializer visit. As ordinary children they are
    /// discovered, rewritten and written out like the rest of the page.
    fn inline_templates(&self) {
        let mut stack = vec![self.dom.document.clone()];

        while let Some(node) = stack.pop() {
            if let NodeData::Element { ref template_contents, .. } = node.data {
                if let Some(fragment) = template_contents.borrow_mut().take() {
                    let moved: Vec<Handle> = fragment.children.borrow_mut().drain(..).collect();
                    for child in &moved {
                        child.parent.set(Some(Rc::downgrade(&node)));
                    }
                    node.children.borrow_mut().extend(moved);
                }
            }
            stack.extend(node.children.borrow().iter().cloned());
        }
    }

    fn declare_utf8(&self) {
        for node in self.elements() {
            let NodeData::Element { ref name, ref attrs, .. } = node.data else {
                continue;
            };
            if &*name.local != "meta" {
                continue;
            }

            let mut attrs = attrs.borrow_mut();
            let is_content_type = attrs.iter().any(|attr| {
                &*attr.name.local == "http-equiv" && attr.value.eq_ignore_ascii_case("content-type")
            });
            for attr in attrs.iter_mut() {
                match &*attr.name.local {
                    "charset" => attr.value = StrTendril::from_slice("utf-8"),
                    "content" if is_content_type => {
                        attr.value = StrTendril::from_slice(UTF8_CONTENT_TYPE)
                    }
                    _ => {}
                }
            }
        }
    }
}

fn declared_encoding(content_type: Option<&str>) -> Option<&'static Encoding> {
    let mime: Mime = content_type?.parse().ok()?;
    let charset = mime.get_param(mime::CHARSET)?;
    Encoding::for_label(charset.as_str().as_bytes())
}

fn prescan_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    static META_CHARSET: OnceLock<Regex> = OnceLock::new();
    let pattern = META_CHARSET.get_or_init(|| {
        Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
            .expect("valid meta charset pattern")
    });

    let head = &bytes[..bytes.len().min(PRESCAN_LEN)];
    let label = pattern.captures(head)?.get(1)?;
    // a page can't really be UTF-16 if ASCII markup was just read from it
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

fn element_attr(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}
