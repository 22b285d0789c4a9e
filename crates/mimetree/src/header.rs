//! MIME header handling.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collection of message headers.
///
/// A keyed multimap: each header name maps to every value seen for it, in
/// encounter order. Names are case-sensitive and kept as written. Distinct
/// names are iterated in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping any existing values for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(values) = self.headers.get_mut(&name) {
            values.push(value);
        } else {
            self.order.push(name.clone());
            self.headers.insert(name, vec![value]);
        }
    }

    /// Sets a header value, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_all(name, vec![value.into()]);
    }

    /// Replaces every value of a header at once.
    pub fn set_all(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        if !self.headers.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.headers.insert(name, values);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Gets all values for a header; empty for unknown names.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.headers.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns true if at least one value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Removes all values for a header, returning them.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        self.order.retain(|n| n != name);
        self.headers.remove(name).unwrap_or_default()
    }

    /// Header names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no header is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs.
    ///
    /// Values of one name are yielded together, in their original order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().flat_map(move |name| {
            self.get_all(name)
                .iter()
                .map(move |v| (name.as_str(), v.as_str()))
        })
    }

    /// Parses a raw header block.
    ///
    /// A field is a line starting with a non-whitespace token that contains a
    /// colon, followed by zero or more continuation lines starting with a
    /// tab. The value is folded: every run of whitespace (including the
    /// line breaks) becomes one space and the result is trimmed. Lines that
    /// match neither form are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(&str, String)> = None;

        for line in text.split('\n') {
            if line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line);
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, fold(&value));
            }
            current = split_field(line).map(|(name, value)| (name, value.to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, fold(&value));
        }

        headers
    }
}

/// Splits `Name: value` at the last colon of the leading token.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let token_end = line.find(char::is_whitespace).unwrap_or(line.len());
    let colon = line[..token_end].rfind(':')?;
    if colon == 0 {
        return None;
    }
    Some((&line[..colon], &line[colon + 1..]))
}

fn fold(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), None); // Case sensitive
    }

    #[test]
    fn test_headers_unknown_name_is_empty() {
        let headers = Headers::new();
        assert!(headers.get_all("X-Missing").is_empty());
        assert!(!headers.contains("X-Missing"));
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), ["charlie@example.com"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.add("From", "a@example.com");

        assert_eq!(headers.remove("Subject"), vec!["Test".to_string()]);
        assert!(headers.get("Subject").is_none());
        assert_eq!(headers.names().collect::<Vec<_>>(), ["From"]);
        assert!(headers.remove("Subject").is_empty());
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            "\tcharset=utf-8\r\n",
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_headers_parse_folding() {
        let headers = Headers::parse("Subject: hello\r\n\tworld\r\n");
        assert_eq!(headers.get("Subject"), Some("hello world"));

        let headers = Headers::parse("Subject:   lots \t of\r\n\t\t  space  ");
        assert_eq!(headers.get("Subject"), Some("lots of space"));
    }

    #[test]
    fn test_headers_parse_multiplicity() {
        let headers = Headers::parse("X-Foo: a\nSubject: s\nX-Foo: b\n");
        assert_eq!(headers.get_all("X-Foo"), ["a", "b"]);
        assert_eq!(headers.names().collect::<Vec<_>>(), ["X-Foo", "Subject"]);
    }

    #[test]
    fn test_headers_parse_skips_non_fields() {
        // Space-indented lines are not continuations, and they break the
        // tab-continuation chain of the field before them.
        let headers = Headers::parse("A: 1\n not a field\n\tdangling\nnocolon\nB:2");
        assert_eq!(headers.get("A"), Some("1"));
        assert_eq!(headers.get("B"), Some("2"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_headers_parse_empty_value() {
        let headers = Headers::parse("X-Empty:\r\n");
        assert_eq!(headers.get_all("X-Empty"), [""]);
    }

    #[test]
    fn test_split_field_last_colon_of_token() {
        assert_eq!(split_field("Date: Mon, 12:00"), Some(("Date", " Mon, 12:00")));
        assert_eq!(split_field("Subject:hello"), Some(("Subject", "hello")));
        assert_eq!(split_field("a:b:c value"), Some(("a:b", "c value")));
        assert_eq!(split_field(":nothing"), None);
        assert_eq!(split_field(""), None);
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "a@example.com");
        headers.add("To", "b@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: a@example.com\r\nTo: b@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_iter() {
        let headers: Headers = [("From", "sender@example.com"), ("To", "recipient@example.com")]
            .into_iter()
            .collect();

        let mut count = 0;
        for (name, value) in headers.iter() {
            assert!(!name.is_empty());
            assert!(!value.is_empty());
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
