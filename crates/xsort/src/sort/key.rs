//! Sort key extraction, conversion and ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use time::OffsetDateTime;

use crate::path::eval::element_matches;
use crate::path::{NameTest, NamespaceTest};
use crate::sort::datetime;
use crate::xml::model::Element;
use crate::xml::namespace::NamespaceMap;

/// How raw key strings are compared
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Codepoint-wise string comparison
    #[default]
    Plain,
    /// Arbitrary-precision decimal numbers
    Decimal,
    /// Calendar dates and times
    DateTime,
}

impl KeyType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-child sort key.
///
/// `Absent` orders before every present key, which the derived ordering
/// gives for free because it is the first variant. Within one sort call
/// all present keys share a variant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Absent,
    Plain(String),
    Decimal(BigDecimal),
    DateTime(OffsetDateTime),
}

/// A key that failed to convert
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionFailure {
    /// 1-based position of the child under its parent
    pub position: usize,
    pub value: String,
    pub reason: Option<String>,
}

/// Raw key string of `child`: the attribute `name`, or with `use_text` the
/// text of its first child element called `name`
pub fn raw_key<'e>(
    child: &'e Element,
    name: &str,
    use_text: bool,
    namespaces: &NamespaceMap,
) -> Option<&'e str> {
    if !use_text {
        return child.get(name);
    }
    let test = NameTest::Name {
        namespace: NamespaceTest::Unqualified,
        local: name.to_string(),
    };
    child
        .children
        .iter()
        .find(|sub| element_matches(&test, sub, namespaces))
        .map(|sub| sub.text.as_deref().unwrap_or_default())
}

/// Convert a raw key string to a comparable key
pub fn convert(raw: Option<&str>, key_type: KeyType) -> Option<SortKey> {
    let Some(raw) = raw else {
        return Some(SortKey::Absent);
    };
    match key_type {
        KeyType::Plain => Some(SortKey::Plain(raw.to_string())),
        KeyType::Decimal => parse_decimal(raw).map(SortKey::Decimal),
        KeyType::DateTime => datetime::parse(raw).ok().map(SortKey::DateTime),
    }
}

fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigDecimal::from_str(trimmed).ok()
}

fn rejection_reason(raw: Option<&str>, key_type: KeyType) -> Option<String> {
    match key_type {
        KeyType::DateTime => datetime::parse(raw?).err().map(|err| err.to_string()),
        KeyType::Plain | KeyType::Decimal => None,
    }
}

/// Keys for every child of `parent`, in document order
pub fn extract_keys(
    parent: &Element,
    name: &str,
    use_text: bool,
    key_type: KeyType,
    namespaces: &NamespaceMap,
) -> Result<Vec<SortKey>, ConversionFailure> {
    parent
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let raw = raw_key(child, name, use_text, namespaces);
            convert(raw, key_type).ok_or_else(|| ConversionFailure {
                position: index + 1,
                value: raw.unwrap_or_default().to_string(),
                reason: rejection_reason(raw, key_type),
            })
        })
        .collect()
}

/// Stable permutation ordering `keys`; equal keys keep their relative order
/// in both directions
pub fn stable_order(keys: &[SortKey], descending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        let (Some(left), Some(right)) = (keys.get(a), keys.get(b)) else {
            return Ordering::Equal;
        };
        if descending {
            right.cmp(left)
        } else {
            left.cmp(right)
        }
    });
    order
}
