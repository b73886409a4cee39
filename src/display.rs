//! Output Rendering
//!
//! Renders lists and mappings as Python literals, the format existing
//! consumers of the report parse: `['a', 'b']` for lists, `None` for absent
//! values and `{'k': 'v'}` for mappings.

use std::collections::BTreeMap;
use std::fmt;

/// A list of strings rendered as `['a', 'b']`.
pub struct PyList<'a>(pub &'a [String]);

/// An optional list of strings; absent renders as `None`.
pub struct PyOptList<'a>(pub Option<&'a [String]>);

/// A string mapping rendered as `{'k': 'v'}`.
pub struct PyDict<'a>(pub &'a BTreeMap<String, String>);

impl fmt::Display for PyList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, item)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for PyOptList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(items) => PyList(items).fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for PyDict<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, key)?;
            f.write_str(": ")?;
            write_quoted(f, value)?;
        }
        f.write_str("}")
    }
}

/// Writes a string literal with single quotes, switching to double quotes
/// when the text contains a single quote but no double quote.
fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    write!(f, "{}", quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if c.is_control() || c == '\u{a0}' || c == '\u{ad}' => {
                write!(f, "\\x{:02x}", c as u32)?
            }
            '\u{2028}' | '\u{2029}' => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}
