//! XML data model

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::Result;
use crate::path::Path;
use crate::xml::namespace::NamespaceMap;

/// Qualified name as written in the source
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    /// Split `prefix:local` at the first colon
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => Self {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// `<?xml ...?>` declaration of the input, if it had one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub standalone: Option<String>,
}

/// XML element
///
/// Text follows the element-tree convention: `text` is the character data
/// before the first child and `tail` is the character data after this
/// element's end tag, up to the next sibling. Moving an element therefore
/// moves the text that trails it.
#[derive(Clone, Debug)]
pub struct Element {
    pub name: QName,
    /// Namespace URI the element's prefix resolved to where it was declared
    pub namespace: Option<String>,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<Self>,
    namespaces: Weak<NamespaceMap>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.text == other.text
            && self.tail == other.tail
            && self.children == other.children
    }
}

impl Element {
    /// Create a detached element with no namespace map
    pub fn new(name: &str) -> Self {
        Self {
            name: QName::parse(name),
            namespace: None,
            attributes: IndexMap::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            namespaces: Weak::new(),
        }
    }

    /// Attribute value by its name as written. Namespace declarations are
    /// not attributes and are never returned.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == "xmlns" || name.starts_with("xmlns:") {
            return None;
        }
        self.attributes.get(name).map(String::as_str)
    }

    /// The shared namespace map of the owning document. `None` once the
    /// document has been dropped or for detached elements.
    pub fn namespaces(&self) -> Option<Rc<NamespaceMap>> {
        self.namespaces.upgrade()
    }

    /// All elements matched by `path`, resolved with the document's prefixes
    pub fn find_all(&self, path: &str) -> Result<Vec<&Self>> {
        let compiled = Path::compile(path)?;
        let namespaces = self.namespaces().unwrap_or_default();
        let ids = compiled.select(self, &namespaces);
        Ok(ids.iter().filter_map(|id| self.descendant(id)).collect())
    }

    /// First element matched by `path`
    pub fn find(&self, path: &str) -> Result<Option<&Self>> {
        Ok(self.find_all(path)?.into_iter().next())
    }

    /// Text of the first element matched by `path`. A match without text
    /// yields an empty string.
    pub fn find_text(&self, path: &str) -> Result<Option<&str>> {
        Ok(self
            .find(path)?
            .map(|element| element.text.as_deref().unwrap_or_default()))
    }

    /// Concatenated text of this element and all its descendants, not
    /// including this element's own tail
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
            if let Some(tail) = &child.tail {
                out.push_str(tail);
            }
        }
    }

    /// Pre-order iterator over this element and its descendants
    pub fn iter(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Element reached by following child indexes from `self`
    pub(crate) fn descendant(&self, id: &[usize]) -> Option<&Self> {
        id.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    pub(crate) fn descendant_mut(&mut self, id: &[usize]) -> Option<&mut Self> {
        id.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    fn stamp(&mut self, namespaces: &Weak<NamespaceMap>) {
        self.namespaces = namespaces.clone();
        for child in &mut self.children {
            child.stamp(namespaces);
        }
    }
}

/// XML document
#[derive(Debug)]
pub struct Document {
    pub declaration: Option<Declaration>,
    pub root: Element,
    namespaces: Rc<NamespaceMap>,
}

impl Document {
    /// Assemble a document, pointing every element at `namespaces`
    pub fn new(root: Element, namespaces: NamespaceMap) -> Self {
        let namespaces = Rc::new(namespaces);
        let mut root = root;
        root.stamp(&Rc::downgrade(&namespaces));
        Self {
            declaration: None,
            root,
            namespaces,
        }
    }

    pub fn with_declaration(mut self, declaration: Option<Declaration>) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    /// Elements matched by `path`, evaluated from the root element
    pub fn find_all(&self, path: &str) -> Result<Vec<&Element>> {
        self.root.find_all(path)
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self::new(self.root.clone(), NamespaceMap::clone(&self.namespaces))
            .with_declaration(self.declaration.clone())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.declaration == other.declaration
            && self.root == other.root
            && self.namespaces == other.namespaces
    }
}
