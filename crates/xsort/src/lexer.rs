//! Low-level input navigation shared by the XML and path parsers

pub mod cursor;

pub use cursor::Cursor;
