//! XML tree: model, namespace-tracking parser and serializer

pub mod model;
pub mod namespace;
pub mod parser;
pub mod serialize;

pub use model::{Declaration, Document, Element, QName};
pub use namespace::NamespaceMap;
pub use parser::{Config, Parser};
pub use serialize::serialize;
