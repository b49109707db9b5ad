//! XML serializer
//!
//! Names are written exactly as they were parsed and namespace
//! declarations stay where they were declared, so every prefix of the input
//! comes back unchanged.

use crate::xml::model::{Document, Element};

/// Serialize a document to text
pub fn serialize(doc: &Document) -> String {
    let mut output = String::new();
    if let Some(declaration) = &doc.declaration {
        output.push_str("<?xml version=\"");
        output.push_str(&escape_attribute(&declaration.version));
        output.push_str("\" encoding=\"UTF-8\"");
        if let Some(standalone) = &declaration.standalone {
            output.push_str(" standalone=\"");
            output.push_str(&escape_attribute(standalone));
            output.push('"');
        }
        output.push_str("?>\n");
    }
    serialize_element(&doc.root, &mut output);
    output
}

/// Serialize one element and its subtree, without its tail
pub fn serialize_element(element: &Element, output: &mut String) {
    output.push('<');
    output.push_str(&element.name.to_string());

    for (key, value) in &element.attributes {
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        output.push_str(&escape_attribute(value));
        output.push('"');
    }

    let text = element.text.as_deref().unwrap_or_default();
    if element.children.is_empty() && text.is_empty() {
        output.push_str("/>");
        return;
    }

    output.push('>');
    output.push_str(&escape_text(text));
    for child in &element.children {
        serialize_element(child, output);
        if let Some(tail) = &child.tail {
            output.push_str(&escape_text(tail));
        }
    }
    output.push_str("</");
    output.push_str(&element.name.to_string());
    output.push('>');
}

/// CR goes out as `&#13;` so that it reparses as CR
fn escape_text(input: &str) -> String {
    if !input.contains(['&', '<', '>', '\r']) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#09;"),
            other => out.push(other),
        }
    }
    out
}
