//! Owned XML element tree with namespace-tolerant lookups.

use crate::types::StorageError;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

/// One element of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, prefix included
    pub name: String,
    /// Resolved namespace URI, if the element is bound to one
    pub namespace: Option<String>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>, namespace: Option<String>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            namespace,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Name with any namespace prefix stripped
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Written without a prefix and not bound to any namespace
    pub fn is_unqualified(&self) -> bool {
        self.namespace.is_none() && !self.name.contains(':')
    }

    /// All elements below this one, in document order
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut pending: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(el) = pending.pop() {
            out.push(el);
            pending.extend(el.children.iter().rev());
        }
        out
    }

    /// First direct child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// Text of the first direct child with the given local name, if non-blank
    pub fn child_text(&self, local_name: &str) -> Option<&str> {
        self.child(local_name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Parse a whole document into its root element
///
/// Fails only when the input is not well-formed: syntax errors, mismatched
/// or unclosed tags, undeclared prefixes, unknown entities, stray content
/// outside the root, or no root at all.
pub fn parse_document(raw: &str) -> Result<Element, StorageError> {
    let mut reader = NsReader::from_str(raw);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| StorageError::parse(format!("malformed XML: {}", e), raw))?;

        match event {
            Event::Start(e) => {
                let namespace = namespace_of(resolved, raw)?;
                stack.push(Element::open(&e, namespace));
            }
            Event::Empty(e) => {
                let namespace = namespace_of(resolved, raw)?;
                attach(&mut stack, &mut root, Element::open(&e, namespace), raw)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| StorageError::parse("unexpected closing tag", raw))?;
                attach(&mut stack, &mut root, el, raw)?;
            }
            Event::Text(e) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e), raw)?;
            }
            Event::CData(e) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e), raw)?;
            }
            Event::GeneralRef(e) => {
                let reference = format!("&{};", String::from_utf8_lossy(&e));
                let resolved = quick_xml::escape::unescape(&reference).map_err(|err| {
                    StorageError::parse(format!("unresolvable entity {}: {}", reference, err), raw)
                })?;
                push_text(&mut stack, &resolved, raw)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(StorageError::parse(
            format!("unclosed element <{}>", open.name),
            raw,
        ));
    }

    root.ok_or_else(|| StorageError::parse("document has no root element", raw))
}

fn namespace_of(resolved: ResolveResult<'_>, raw: &str) -> Result<Option<String>, StorageError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(StorageError::parse(
            format!(
                "undeclared namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
            raw,
        )),
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
    raw: &str,
) -> Result<(), StorageError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
        return Ok(());
    }
    if root.is_some() {
        return Err(StorageError::parse("more than one root element", raw));
    }
    *root = Some(el);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str, raw: &str) -> Result<(), StorageError> {
    match stack.last_mut() {
        Some(top) => {
            top.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(StorageError::parse("text outside the root element", raw)),
    }
}
