//! Namespace bookkeeping
//!
//! Two views of the same declarations are kept while parsing:
//!
//! * [`NamespaceMap`] is flat and document-global. Every `xmlns`/`xmlns:p`
//!   declaration found anywhere lands here and the last one wins. Path
//!   expressions resolve their prefixes against it, so a prefix declared on
//!   any element can be used from any node.
//! * [`ScopeStack`] follows the usual nesting rules and is only used by the
//!   parser to resolve element names and reject unbound prefixes.

use indexmap::IndexMap;

/// URI permanently bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix-to-URI bindings collected from a whole document.
///
/// The default namespace is stored under the empty prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    bindings: IndexMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding, replacing any earlier URI for the same prefix
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Look up the URI bound to `prefix`. An empty URI counts as unbound.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .get(prefix)
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// URI of the default namespace. `None` if no element declared one or
    /// the last declaration was `xmlns=""`.
    pub fn default_namespace(&self) -> Option<&str> {
        self.resolve("")
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate bindings in the order they were first declared
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceMap {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (prefix, uri) in iter {
            map.insert(prefix, uri);
        }
        map
    }
}

#[derive(Clone, Debug)]
struct Binding {
    prefix: String,
    uri: String,
    depth: usize,
}

/// Lexically scoped bindings for the element currently being parsed
#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    bindings: Vec<Binding>,
    depth: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping the bindings it declared
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bind `prefix` in the current scope. An empty URI undeclares the
    /// default namespace.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.push(Binding {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Innermost URI for `prefix`. `None` means unbound; the default
    /// namespace resolves to `None` once it has been undeclared.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|binding| binding.prefix == prefix)
            .map(|binding| binding.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}
