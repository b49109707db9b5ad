//! Node path mini-language
//!
//! The dialect is the small element-path language of element-tree style
//! XML libraries: child steps, `.`, `..`, `//`, `*`, and bracketed
//! predicates on attributes, child elements, text and position. Prefixes
//! are resolved against the document's [`NamespaceMap`], so callers never
//! pass bindings themselves.

pub mod ast;
pub mod eval;
pub mod parser;

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::xml::model::Element;
use crate::xml::namespace::NamespaceMap;

pub use ast::{NameTest, NamespaceTest, Position, Predicate, Step};

/// Address of a node: the child indexes leading to it from the context
pub type NodeId = Vec<usize>;

/// A compiled node path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    source: String,
    steps: Vec<Step>,
}

impl Path {
    /// Compile `path`, rejecting malformed expressions
    pub fn compile(path: &str) -> Result<Self> {
        let steps = parser::parse_steps(path)?;
        Ok(Self {
            source: path.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Evaluate against `context`, returning the address of every match
    pub fn select(&self, context: &Element, namespaces: &NamespaceMap) -> Vec<NodeId> {
        eval::select(&self.steps, context, namespaces)
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}
