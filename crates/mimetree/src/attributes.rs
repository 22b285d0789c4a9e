//! Header attribute grammar.
//!
//! Structured header values such as `Content-Type` carry a primary token
//! followed by `name=value` attributes:
//!
//! ```text
//! multipart/mixed; boundary="----=_Part_1"; charset=us-ascii
//! ```
//!
//! The grammar here is deliberately small: quoted values cannot contain
//! quotes or escapes, and RFC 2231 continuations are not recognized. Text
//! that does not match is skipped without complaint.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;

/// A primary token plus ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderAttributes {
    /// Text before the first `;`, trimmed (e.g. `text/plain`).
    pub primary: String,
    /// Attributes in the order they were first seen.
    attributes: Vec<(String, String)>,
}

impl HeaderAttributes {
    /// Creates a value with no attributes.
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            attributes: Vec::new(),
        }
    }

    /// Splits a header value into its primary token and attributes.
    ///
    /// Duplicate attribute names keep their first value; later ones are
    /// dropped and logged.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::parse_with_diagnostics(value, &mut Vec::new())
    }

    /// Like [`parse`](Self::parse), also recording dropped duplicates.
    pub fn parse_with_diagnostics(value: &str, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let (primary, rest) = value.find(';').map_or((value, ""), |i| value.split_at(i));
        let mut parsed = Self::new(primary.trim());

        for (name, value) in AttributeScanner::new(rest) {
            if parsed.get(name).is_some() {
                tracing::warn!(attribute = name, "Ignoring duplicate header attribute");
                diagnostics.push(Diagnostic::DuplicateAttribute {
                    name: name.to_string(),
                });
            } else {
                parsed.attributes.push((name.to_string(), value.to_string()));
            }
        }

        parsed
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, overwriting in place or appending a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Removes an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Iterates over attributes in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The token before `/` in the primary value (e.g. `text`).
    #[must_use]
    pub fn top_level(&self) -> &str {
        top_level(&self.primary)
    }

    /// Checks if the primary token is a `multipart/*` type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.top_level().eq_ignore_ascii_case("multipart")
    }

    /// Checks if the primary token is a `text/*` type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.top_level().eq_ignore_ascii_case("text")
    }

    /// Returns the boundary attribute if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.get("boundary")
    }

    /// Returns the charset attribute if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.get("charset")
    }
}

fn top_level(primary: &str) -> &str {
    primary.split('/').next().unwrap_or_default().trim()
}

/// Joins the value back as `primary; k1="v1"; k2="v2"`.
impl fmt::Display for HeaderAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)?;
        for (name, value) in &self.attributes {
            write!(f, "; {name}=\"{value}\"")?;
        }
        Ok(())
    }
}

/// Scans for `[;] key = value` pairs, left to right.
///
/// The leading `;` is optional, so `a=1 b=2` yields two attributes. Text
/// that does not form a pair is skipped.
struct AttributeScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> AttributeScanner<'a> {
    const fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn skip_whitespace(&self, mut i: usize) -> usize {
        let bytes = self.text.as_bytes();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    }

    fn take_while(&self, start: usize, pred: impl Fn(u8) -> bool) -> usize {
        let bytes = self.text.as_bytes();
        let mut i = start;
        while i < bytes.len() && pred(bytes[i]) {
            i += 1;
        }
        i
    }

    /// Matches one attribute at `start`.
    ///
    /// On failure returns the next offset worth trying: every start up to
    /// the end of the failed key fails the same way, except a later `;`.
    fn match_at(&self, start: usize) -> Result<(&'a str, &'a str, usize), usize> {
        let bytes = self.text.as_bytes();
        let is_key_byte = |b: u8| !b.is_ascii_whitespace() && b != b'=';

        let after_semicolon = start + usize::from(bytes.get(start) == Some(&b';'));
        let mut key_start = self.skip_whitespace(after_semicolon);
        let mut key_end = self.take_while(key_start, is_key_byte);
        if key_end == key_start && after_semicolon > start {
            // A lone `;` before `=` is itself the key.
            key_start = start;
            key_end = self.take_while(start, is_key_byte);
        }
        if key_end == key_start {
            return Err(start + 1);
        }

        let eq = self.skip_whitespace(key_end);
        if bytes.get(eq) != Some(&b'=') {
            let retry = bytes[start + 1..key_end]
                .iter()
                .position(|&b| b == b';')
                .map_or(key_end, |i| start + 1 + i);
            return Err(retry);
        }

        let value_start = self.skip_whitespace(eq + 1);
        let quoted_end = (bytes.get(value_start) == Some(&b'"'))
            .then(|| self.text[value_start + 1..].find('"'))
            .flatten();

        let (value, value_end) = if let Some(close) = quoted_end {
            let close = value_start + 1 + close;
            (&self.text[value_start + 1..close], close + 1)
        } else {
            let end = self.take_while(value_start, |b| !b.is_ascii_whitespace() && b != b';');
            let raw = &self.text[value_start..end];
            (raw.strip_prefix('"').unwrap_or(raw), end)
        };

        Ok((
            &self.text[key_start..key_end],
            value,
            self.skip_whitespace(value_end),
        ))
    }
}

impl<'a> Iterator for AttributeScanner<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            match self.match_at(self.pos) {
                Ok((key, value, end)) => {
                    self.pos = end;
                    return Some((key, value));
                }
                Err(retry) => self.pos = retry,
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect
)]
mod tests {
    use super::*;

    fn pairs(attrs: &HeaderAttributes) -> Vec<(&str, &str)> {
        attrs.iter().collect()
    }

    #[test]
    fn test_parse_quoted_and_bare() {
        let attrs = HeaderAttributes::parse("text/plain; charset=\"utf-8\"; name=foo.txt");
        assert_eq!(attrs.primary, "text/plain");
        assert_eq!(pairs(&attrs), [("charset", "utf-8"), ("name", "foo.txt")]);
    }

    #[test]
    fn test_parse_no_attributes() {
        let attrs = HeaderAttributes::parse("  text/html  ");
        assert_eq!(attrs.primary, "text/html");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_parse_spaces_around_equals() {
        let attrs = HeaderAttributes::parse("multipart/mixed ;  boundary = \"a b;c\" ;x=1");
        assert_eq!(attrs.primary, "multipart/mixed");
        assert_eq!(attrs.boundary(), Some("a b;c"));
        assert_eq!(attrs.get("x"), Some("1"));
    }

    #[test]
    fn test_parse_folded_value() {
        let attrs = HeaderAttributes::parse("multipart/alternative; boundary=\"----=_Part_123\"");
        assert!(attrs.is_multipart());
        assert_eq!(attrs.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_parse_skips_garbage() {
        let attrs = HeaderAttributes::parse("text/plain; junk ;; charset=us-ascii");
        assert_eq!(pairs(&attrs), [("charset", "us-ascii")]);
    }

    #[test]
    fn test_parse_without_separating_semicolon() {
        let attrs = HeaderAttributes::parse("text/plain; charset=utf-8 name=foo.txt");
        assert_eq!(pairs(&attrs), [("charset", "utf-8"), ("name", "foo.txt")]);

        let attrs = HeaderAttributes::parse("text/plain; a=1 junk b=\"x y\"c=3");
        assert_eq!(pairs(&attrs), [("a", "1"), ("b", "x y"), ("c", "3")]);
    }

    #[test]
    fn test_parse_ignores_pairs_in_primary() {
        let attrs = HeaderAttributes::parse("key=value");
        assert_eq!(attrs.primary, "key=value");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_parse_empty_bare_value() {
        let attrs = HeaderAttributes::parse("text/plain; name=; other=x");
        assert_eq!(pairs(&attrs), [("name", ""), ("other", "x")]);
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let attrs = HeaderAttributes::parse("text/plain; name=\"abc");
        assert_eq!(attrs.get("name"), Some("abc"));
    }

    #[test]
    fn test_parse_leading_semicolon() {
        let attrs = HeaderAttributes::parse("; charset=utf-8");
        assert_eq!(attrs.primary, "");
        assert_eq!(attrs.charset(), Some("utf-8"));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut diagnostics = Vec::new();
        let attrs = HeaderAttributes::parse_with_diagnostics(
            "text/plain; charset=a; charset=b; name=n",
            &mut diagnostics,
        );
        assert_eq!(pairs(&attrs), [("charset", "a"), ("name", "n")]);
        assert_eq!(
            diagnostics,
            [Diagnostic::DuplicateAttribute {
                name: "charset".to_string()
            }]
        );
    }

    #[test]
    fn test_join() {
        let attrs = HeaderAttributes::parse("multipart/mixed; boundary=abc; foo=\"bar\"");
        assert_eq!(
            attrs.to_string(),
            "multipart/mixed; boundary=\"abc\"; foo=\"bar\""
        );
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut attrs = HeaderAttributes::parse("text/plain; charset=latin1; format=flowed");
        attrs.set("charset", "UTF-8");
        attrs.set("delsp", "yes");
        assert_eq!(
            attrs.to_string(),
            "text/plain; charset=\"UTF-8\"; format=\"flowed\"; delsp=\"yes\""
        );
    }

    #[test]
    fn test_remove() {
        let mut attrs = HeaderAttributes::new("text/plain").with_attribute("charset", "utf-8");
        assert_eq!(attrs.remove("charset"), Some("utf-8".to_string()));
        assert_eq!(attrs.remove("charset"), None);
        assert_eq!(attrs.to_string(), "text/plain");
    }

    #[test]
    fn test_top_level() {
        assert_eq!(HeaderAttributes::new("Multipart/Mixed").top_level(), "Multipart");
        assert!(HeaderAttributes::new("MULTIPART/related").is_multipart());
        assert!(HeaderAttributes::new("Text/Plain").is_text());
        assert!(!HeaderAttributes::new("multipartx/mixed").is_multipart());
        assert!(!HeaderAttributes::new("application/pdf").is_text());
    }
}
