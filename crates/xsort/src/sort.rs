//! Selective child sorter
//!
//! Sorting runs in two phases. The first one only reads the tree: it
//! selects the parents, extracts and converts every key and computes one
//! permutation per parent. The second phase applies the permutations. A
//! conversion failure anywhere therefore leaves the document untouched.

pub mod datetime;
pub mod key;

use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::path::{NodeId, Path};
use crate::xml::model::{Document, Element};

pub use key::{KeyType, SortKey};

/// How children are compared
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Read the key from a child element's text instead of an attribute
    pub use_text: bool,
    pub key_type: KeyType,
    pub descending: bool,
}

impl SortOptions {
    /// Ascending plain attribute sort
    pub const fn new() -> Self {
        Self {
            use_text: false,
            key_type: KeyType::Plain,
            descending: false,
        }
    }

    pub const fn with_text(mut self, use_text: bool) -> Self {
        self.use_text = use_text;
        self
    }

    pub const fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub const fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }
}

/// What a successful sort did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Parents whose children were reordered
    pub parents: usize,
    /// Children across all those parents
    pub children: usize,
}

/// Check the shape of a sort key name and return it trimmed
pub fn validate_key(sort_key: &str) -> Result<&str> {
    let key = sort_key.trim();
    let mut chars = key.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(key)
    } else {
        Err(Error::without_span(ErrorKind::InvalidSortKey {
            key: sort_key.to_string(),
        }))
    }
}

/// Sort the children of every element `node_path` selects.
///
/// Prefixes in `node_path` resolve through the document's own namespace
/// map. Selecting nothing is not an error.
pub fn sort(
    doc: &mut Document,
    node_path: &str,
    sort_key: &str,
    options: &SortOptions,
) -> Result<SortReport> {
    let key = validate_key(sort_key)?;
    let path = Path::compile(node_path)?;

    let parents = path.select(&doc.root, doc.namespaces());
    debug!(
        path = path.as_str(),
        key,
        key_type = %options.key_type,
        parents = parents.len(),
        bindings = doc.namespaces().len(),
        "selected parents"
    );

    let mut plans: Vec<(NodeId, Vec<usize>)> = Vec::with_capacity(parents.len());
    for id in parents {
        let Some(parent) = doc.root.descendant(&id) else {
            continue;
        };
        let keys = key::extract_keys(
            parent,
            key,
            options.use_text,
            options.key_type,
            doc.namespaces(),
        )
        .map_err(|failure| {
            Error::without_span(ErrorKind::KeyConversion {
                parent: describe(&doc.root, &id),
                position: failure.position,
                value: failure.value,
                target: options.key_type.as_str(),
                reason: failure.reason,
            })
        })?;
        trace!(parent = %describe(&doc.root, &id), children = keys.len(), "computed keys");
        plans.push((id, key::stable_order(&keys, options.descending)));
    }

    // Deepest parents first: reordering a parent renumbers its descendants,
    // never its ancestors. Each permutation only touches its own parent's
    // children, so the result matches applying them in selection order.
    plans.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

    let mut report = SortReport::default();
    for (id, order) in plans {
        if let Some(parent) = doc.root.descendant_mut(&id) {
            reorder(parent, &order);
            report.parents += 1;
            report.children += order.len();
        }
    }
    debug!(parents = report.parents, children = report.children, "sorted");
    Ok(report)
}

/// Move children into `order` without cloning any subtree
fn reorder(parent: &mut Element, order: &[usize]) {
    let mut slots: Vec<Option<Element>> = std::mem::take(&mut parent.children)
        .into_iter()
        .map(Some)
        .collect();
    parent.children = order
        .iter()
        .filter_map(|&index| slots.get_mut(index).and_then(Option::take))
        .collect();
}

/// Human-readable location such as `/root/group[2]/items`
fn describe(root: &Element, id: &[usize]) -> String {
    let mut out = format!("/{}", root.name);
    let mut node = root;
    for &index in id {
        let Some(child) = node.children.get(index) else {
            break;
        };
        let same_name: Vec<usize> = node
            .children
            .iter()
            .enumerate()
            .filter(|(_, sibling)| sibling.name == child.name)
            .map(|(i, _)| i)
            .collect();
        out.push('/');
        out.push_str(&child.name.to_string());
        if same_name.len() > 1 {
            let nth = same_name.iter().position(|&i| i == index).unwrap_or(0) + 1;
            out.push_str(&format!("[{nth}]"));
        }
        node = child;
    }
    out
}
