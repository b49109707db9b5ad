//! xsort - namespace-aware XML child element sorter
//!
//! # Quick Start
//!
//! ```
//! use xsort::{parse, serialize, sort, KeyType, SortOptions};
//! # fn main() -> Result<(), xsort::Error> {
//! let mut doc = parse(r#"<list><i n="10"/><i n="2"/><i n="1"/></list>"#)?;
//! let options = SortOptions::new().with_key_type(KeyType::Decimal);
//! sort(&mut doc, ".", "n", &options)?;
//! assert_eq!(serialize(&doc), r#"<list><i n="1"/><i n="2"/><i n="10"/></list>"#);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorCategory, ErrorKind, Pos, Result, Span};

pub mod lexer;

pub mod xml;
pub use xml::{Config, Document, Element, NamespaceMap, QName};

pub mod path;
pub use path::Path;

pub mod sort;
pub use sort::{sort, KeyType, SortKey, SortOptions, SortReport};

pub use xml::serialize;

/// Parse XML text into a document with default limits
pub fn parse(text: &str) -> Result<Document> {
    xml::Parser::new(text.as_bytes()).parse()
}

/// Parse XML text with custom limits
pub fn parse_with_config(text: &str, config: Config) -> Result<Document> {
    xml::Parser::with_config(text.as_bytes(), config).parse()
}

/// Parse, sort and serialize in one go
pub fn sort_str(
    text: &str,
    node_path: &str,
    sort_key: &str,
    options: &SortOptions,
) -> Result<String> {
    let mut doc = parse(text)?;
    sort(&mut doc, node_path, sort_key, options)?;
    Ok(serialize(&doc))
}
