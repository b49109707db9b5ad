//! XML parser implementation

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::lexer::Cursor;
use crate::xml::model::{Declaration, Document, Element, QName};
use crate::xml::namespace::{NamespaceMap, ScopeStack};

/// Configuration for the XML parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_size: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML parser that records every namespace declaration it meets
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
    depth: u16,
    scopes: ScopeStack,
    namespaces: NamespaceMap,
}

impl<'a> Parser<'a> {
    /// Create a new XML parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new XML parser with custom limits
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
            depth: 0,
            scopes: ScopeStack::new(),
            namespaces: NamespaceMap::new(),
        }
    }

    /// Parse an XML document
    pub fn parse(mut self) -> Result<Document> {
        if self.config.max_size > 0 && self.cursor.remaining().len() > self.config.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                self.cursor.position(),
            ));
        }

        let declaration = if self.cursor.starts_with(b"<?xml")
            && self.cursor.peek(5).is_some_and(is_whitespace)
        {
            Some(self.parse_declaration()?)
        } else {
            None
        };

        self.skip_misc()?;
        match self.cursor.current() {
            Some(b'<') if self.cursor.peek(1).is_some_and(is_name_start) => {}
            Some(_) => return Err(self.error_here(ErrorKind::InvalidToken, "expected root element")),
            None => return Err(Error::at(ErrorKind::MissingRoot, self.cursor.position())),
        }

        let root = self.parse_element()?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::TrailingContent, self.cursor.position()));
        }

        Ok(Document::new(root, self.namespaces).with_declaration(declaration))
    }

    fn parse_declaration(&mut self) -> Result<Declaration> {
        self.cursor.advance_by(5);
        let attributes = self.parse_attributes()?;
        self.cursor.skip_whitespace();
        if !self.cursor.eat(b"?>") {
            return Err(self.error_here(ErrorKind::InvalidToken, "malformed xml declaration"));
        }

        let Some(version) = attributes.get("version") else {
            return Err(self.error_here(
                ErrorKind::InvalidToken,
                "xml declaration without version",
            ));
        };
        Ok(Declaration {
            version: version.clone(),
            standalone: attributes.get("standalone").cloned(),
        })
    }

    /// Skip whitespace, comments, processing instructions and doctype
    /// declarations outside the root element
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self) -> Result<Element> {
        let start = self.cursor.position();
        self.expect_byte(b'<')?;

        self.depth = self.depth.saturating_add(1);
        if self.config.max_depth > 0 && self.depth > self.config.max_depth {
            return Err(Error::at(
                ErrorKind::MaxDepthExceeded {
                    max: self.config.max_depth,
                },
                start,
            ));
        }

        let raw_name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        self.scopes.push_scope();
        self.declare_namespaces(&attributes);

        let mut element = Element::new(&raw_name);
        element.namespace = self.resolve_element(&element.name, start)?;
        self.check_attribute_prefixes(&attributes, start)?;
        element.attributes = attributes;

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            self.leave_element();
            return Ok(element);
        }
        self.expect_byte(b'>')?;

        loop {
            if self.cursor.eat(b"</") {
                let close_name = self.parse_name()?;
                if close_name != raw_name {
                    return Err(Error::at(
                        ErrorKind::MismatchedTag {
                            expected: raw_name,
                            found: close_name,
                        },
                        start,
                    ));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<![CDATA[") {
                let text = self.parse_cdata()?;
                append_text(&mut element, &text);
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.current() == Some(b'<') {
                let child = self.parse_element()?;
                element.children.push(child);
            } else if self.cursor.is_eof() {
                return Err(Error::with_message(
                    ErrorKind::UnexpectedEof,
                    Span::at(start),
                    format!("unclosed element <{raw_name}>"),
                ));
            } else {
                let text = self.parse_text()?;
                append_text(&mut element, &text);
            }
        }

        self.leave_element();
        Ok(element)
    }

    fn leave_element(&mut self) {
        self.scopes.pop_scope();
        self.depth = self.depth.saturating_sub(1);
    }

    fn declare_namespaces(&mut self, attributes: &IndexMap<String, String>) {
        for (name, uri) in attributes {
            let prefix = if name == "xmlns" {
                ""
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                prefix
            } else {
                continue;
            };
            self.scopes.bind(prefix, uri);
            // `xmlns=""` overrides an earlier default
            if prefix.is_empty() || !uri.is_empty() {
                self.namespaces.insert(prefix, uri.as_str());
            }
        }
    }

    fn resolve_element(&self, name: &QName, at: Pos) -> Result<Option<String>> {
        match &name.prefix {
            Some(prefix) => match self.scopes.resolve(prefix) {
                Some(uri) => Ok(Some(uri.to_string())),
                None => Err(Error::at(
                    ErrorKind::UnboundPrefix {
                        prefix: prefix.clone(),
                    },
                    at,
                )),
            },
            None => Ok(self.scopes.resolve("").map(str::to_string)),
        }
    }

    fn check_attribute_prefixes(&self, attributes: &IndexMap<String, String>, at: Pos) -> Result<()> {
        for name in attributes.keys() {
            let Some((prefix, _)) = name.split_once(':') else {
                continue;
            };
            if prefix != "xmlns" && self.scopes.resolve(prefix).is_none() {
                return Err(Error::at(
                    ErrorKind::UnboundPrefix {
                        prefix: prefix.to_string(),
                    },
                    at,
                ));
            }
        }
        Ok(())
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            let had_space = self.cursor.current().is_some_and(is_whitespace);
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>' | b'?') => break,
                Some(_) if !had_space => {
                    return Err(self.error_here(ErrorKind::InvalidToken, "expected whitespace"));
                }
                Some(_) => {}
                None => return Err(self.error_here(ErrorKind::UnexpectedEof, "unclosed tag")),
            }

            let start = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(Error::at(ErrorKind::DuplicateAttribute { name }, start));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => {
                return Err(self.error_here(
                    ErrorKind::InvalidToken,
                    "expected quoted attribute value",
                ))
            }
        };
        self.cursor.advance();

        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = checked_text(raw, start_pos)?;
                let text = normalize_newlines(&text).replace(['\t', '\n'], " ");
                return decode_entities(&text, start_pos);
            }
            if b == b'<' {
                return Err(self.error_here(
                    ErrorKind::InvalidToken,
                    "'<' not allowed in attribute value",
                ));
            }
            self.cursor.advance();
        }

        Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = checked_text(raw, start_pos)?;
        decode_entities(&normalize_newlines(&text), start_pos)
    }

    fn parse_cdata(&mut self) -> Result<String> {
        self.cursor.advance_by(b"<![CDATA[".len());
        let start_pos = self.cursor.position();
        match self.cursor.take_until(b"]]>") {
            Some(raw) => Ok(normalize_newlines(&checked_text(raw, start_pos)?)),
            None => Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated CDATA section")),
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();

        let Some(first) = self.cursor.current() else {
            return Err(self.error_here(ErrorKind::UnexpectedEof, "expected name"));
        };
        if !is_name_start(first) {
            return Err(Error::with_message(
                ErrorKind::InvalidToken,
                Span::at(start_pos),
                "expected name",
            ));
        }

        self.cursor.advance();
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        let name = checked_text(self.cursor.slice_from(start), start_pos)?;
        if let Some((prefix, local)) = name.split_once(':') {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(Error::with_message(
                    ErrorKind::InvalidToken,
                    Span::at(start_pos),
                    format!("invalid qualified name {name:?}"),
                ));
            }
        }
        Ok(name)
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.cursor.advance_by(4);
        self.skip_until(b"-->")
    }

    fn skip_processing_instruction(&mut self) -> Result<()> {
        if self.cursor.starts_with(b"<?xml")
            && self.cursor.peek(5).is_some_and(|b| is_whitespace(b) || b == b'?')
        {
            return Err(self.error_here(
                ErrorKind::InvalidToken,
                "xml declaration not at start of document",
            ));
        }
        self.cursor.advance_by(2);
        self.skip_until(b"?>")
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let mut brackets = 0usize;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'>' if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated doctype"))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        match self.cursor.take_until(pattern) {
            Some(_) => Ok(()),
            None => Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated markup")),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else if self.cursor.is_eof() {
            Err(self.error_here(ErrorKind::UnexpectedEof, "unexpected end of input"))
        } else {
            Err(self.error_here(
                ErrorKind::InvalidToken,
                &format!("expected '{}'", char::from(expected)),
            ))
        }
    }

    fn error_here(&self, kind: ErrorKind, message: &str) -> Error {
        Error::with_message(kind, Span::at(self.cursor.position()), message)
    }
}

fn append_text(element: &mut Element, text: &str) {
    if text.is_empty() {
        return;
    }
    let target = match element.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut element.text,
    };
    target.get_or_insert_with(String::new).push_str(text);
}

/// Validate UTF-8 and reject characters XML does not allow
fn checked_text(bytes: &[u8], at: Pos) -> Result<String> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::at(ErrorKind::InvalidUtf8, at))?;
    if text.chars().any(|ch| !is_xml_char(ch)) {
        return Err(Error::at(ErrorKind::InvalidCharacter, at));
    }
    Ok(text.to_string())
}

fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn normalize_newlines(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str, at: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);

        let Some(end) = after.find(';') else {
            return Err(Error::at(ErrorKind::InvalidEntity, at));
        };
        let entity = after.get(1..end).unwrap_or_default();
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::with_message(
                    ErrorKind::InvalidEntity,
                    Span::at(at),
                    format!("undefined entity &{entity};"),
                ));
            }
        }
        rest = after.get(end + 1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code).filter(|ch| is_xml_char(*ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Document> {
        Parser::new(input.as_bytes()).parse()
    }

    fn ensure_eq<T: PartialEq + std::fmt::Debug>(left: T, right: T) -> Result<()> {
        if left == right {
            Ok(())
        } else {
            Err(Error::with_message(
                ErrorKind::InvalidToken,
                Span::empty(),
                format!("assertion failed: left={left:?} right={right:?}"),
            ))
        }
    }

    #[test]
    fn test_parse_simple_element() -> Result<()> {
        let doc = parse("<root></root>")?;
        ensure_eq(doc.root.name.local.as_str(), "root")?;
        ensure_eq(doc.root.children.len(), 0)?;
        ensure_eq(doc.root.text, None)?;
        Ok(())
    }

    #[test]
    fn test_parse_attributes_keep_order() -> Result<()> {
        let doc = parse("<root z=\"1\" a='two' m=\"&lt;3\"/>")?;
        let keys: Vec<&str> = doc.root.attributes.keys().map(String::as_str).collect();
        ensure_eq(keys, vec!["z", "a", "m"])?;
        ensure_eq(doc.root.get("m"), Some("<3"))?;
        Ok(())
    }

    #[test]
    fn test_parse_text_and_tail() -> Result<()> {
        let doc = parse("<root>lead<a>inner</a>after a<b/>after b</root>")?;
        ensure_eq(doc.root.text.as_deref(), Some("lead"))?;
        let a = doc.root.children.first();
        ensure_eq(a.and_then(|a| a.text.as_deref()), Some("inner"))?;
        ensure_eq(a.and_then(|a| a.tail.as_deref()), Some("after a"))?;
        let b = doc.root.children.get(1);
        ensure_eq(b.and_then(|b| b.tail.as_deref()), Some("after b"))?;
        Ok(())
    }

    #[test]
    fn test_whitespace_text_is_kept() -> Result<()> {
        let doc = parse("<root>\n  <a/>\n</root>")?;
        ensure_eq(doc.root.text.as_deref(), Some("\n  "))?;
        ensure_eq(
            doc.root.children.first().and_then(|a| a.tail.as_deref()),
            Some("\n"),
        )?;
        Ok(())
    }

    #[test]
    fn test_comments_and_pis_are_dropped() -> Result<()> {
        let doc = parse("<?xml version=\"1.0\"?><!-- c --><root>a<!-- x -->b<?pi data?>c</root><!-- end -->")?;
        ensure_eq(doc.root.text.as_deref(), Some("abc"))?;
        ensure_eq(
            doc.declaration.map(|d| d.version),
            Some("1.0".to_string()),
        )?;
        Ok(())
    }

    #[test]
    fn test_cdata_becomes_text() -> Result<()> {
        let doc = parse("<root><![CDATA[<b>&amp;</b>]]></root>")?;
        ensure_eq(doc.root.text.as_deref(), Some("<b>&amp;</b>"))?;
        Ok(())
    }

    #[test]
    fn test_doctype_with_internal_subset() -> Result<()> {
        let doc = parse("<!DOCTYPE root [<!ELEMENT root (#PCDATA)>]><root/>")?;
        ensure_eq(doc.root.name.local.as_str(), "root")?;
        Ok(())
    }

    #[test]
    fn test_newline_normalization() -> Result<()> {
        let doc = parse("<root a=\"x\r\ny\">1\r\n2\r3</root>")?;
        ensure_eq(doc.root.text.as_deref(), Some("1\n2\n3"))?;
        ensure_eq(doc.root.get("a"), Some("x y"))?;
        Ok(())
    }

    #[test]
    fn test_numeric_entities() -> Result<()> {
        let doc = parse("<root>&#65;&#x42;&#10;</root>")?;
        ensure_eq(doc.root.text.as_deref(), Some("AB\n"))?;
        Ok(())
    }

    #[test]
    fn test_namespaces_are_recorded_globally() -> Result<()> {
        let doc = parse(
            "<r xmlns=\"urn:d\" xmlns:a=\"urn:a\"><x><b:y xmlns:b=\"urn:b\"/></x></r>",
        )?;
        let map = doc.namespaces();
        ensure_eq(map.resolve("a"), Some("urn:a"))?;
        ensure_eq(map.resolve("b"), Some("urn:b"))?;
        ensure_eq(map.default_namespace(), Some("urn:d"))?;
        ensure_eq(doc.root.namespace.as_deref(), Some("urn:d"))?;
        let y = doc.root.descendant(&[0, 0]);
        ensure_eq(y.and_then(|y| y.namespace.as_deref()), Some("urn:b"))?;
        Ok(())
    }

    #[test]
    fn test_unbound_prefix_is_rejected() {
        let err = parse("<root><p:a/></root>").err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::UnboundPrefix {
                prefix: "p".to_string()
            })
        );
    }

    #[test]
    fn test_prefix_out_of_scope_is_rejected() {
        let err = parse("<r><a xmlns:p=\"urn:p\"/><p:b/></r>").err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::UnboundPrefix { .. })
        ));
    }

    #[test]
    fn test_mismatched_tag_reports_position() {
        let err = parse("<root>\n  <a></b>\n</root>").err();
        let Some(err) = err else {
            panic!("expected mismatched tag error");
        };
        assert_eq!(
            err.kind(),
            &ErrorKind::MismatchedTag {
                expected: "a".to_string(),
                found: "b".to_string()
            }
        );
        assert_eq!(err.span().start.line, 2);
        assert_eq!(err.span().start.col, 3);
    }

    #[test]
    fn test_unclosed_element() {
        let err = parse("<root><a>").err();
        assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse("<root a=\"1\" a=\"2\"/>").err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_invalid_character() {
        let err = parse("<root>\u{1}</root>").err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::InvalidCharacter)
        );
    }

    #[test]
    fn test_undefined_entity() {
        let err = parse("<root>&nbsp;</root>").err();
        assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::InvalidEntity));
    }

    #[test]
    fn test_trailing_content_and_missing_root() {
        let err = parse("<a/><b/>").err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::TrailingContent)
        );
        let err = parse("  <!-- nothing -->  ").err();
        assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::MissingRoot));
    }

    #[test]
    fn test_max_depth() {
        let parser = Parser::with_config(b"<a><b><c/></b></a>", Config::new(2, 0));
        let err = parser.parse().err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::MaxDepthExceeded { max: 2 })
        );
    }

    #[test]
    fn test_max_size() {
        let parser = Parser::with_config(b"<abc/>", Config::new(0, 3));
        let err = parser.parse().err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::MaxSizeExceeded { max: 3 })
        );
    }

    #[test]
    fn test_unlimited_config() -> Result<()> {
        let doc = Parser::with_config(b"<a><b/></a>", Config::unlimited()).parse()?;
        ensure_eq(doc.root.children.len(), 1)?;
        Ok(())
    }
}
