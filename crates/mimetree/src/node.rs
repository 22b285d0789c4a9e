//! MIME node structure and parsing.

use std::borrow::Cow;

use memchr::memmem;

use crate::attributes::HeaderAttributes;
use crate::config::ParseConfig;
use crate::error::{Diagnostic, Error, Result};
use crate::header::Headers;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of the header that drives content-type resolution.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Body of a multipart node, split around its boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Multipart {
    /// Text before the first boundary.
    pub preamble: Vec<u8>,
    /// Child nodes, in order.
    pub parts: Vec<MimeNode>,
    /// Text after the closing boundary.
    pub epilogue: Vec<u8>,
}

/// A MIME entity: headers, raw body, and for multipart content, its parts.
///
/// Children are owned exclusively, so a node and its subtree live and die
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MimeNode {
    /// Node headers.
    pub headers: Headers,
    /// Raw, undecoded body.
    ///
    /// For parsed multipart nodes this still holds the unsplit body; the
    /// serializer rebuilds it from [`Multipart`].
    pub body: Vec<u8>,
    /// Character encoding override for the body.
    ///
    /// `None` unless set by the caller. When set it wins over the `charset`
    /// attribute of the `Content-Type` header at serialization time.
    pub charset: Option<String>,
    content_type: Option<HeaderAttributes>,
    multipart: Option<Multipart>,
}

impl MimeNode {
    /// Creates a leaf node from headers and a raw body.
    #[must_use]
    pub fn new(headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        let content_type = headers.get(CONTENT_TYPE).map(HeaderAttributes::parse);

        Self {
            headers,
            body: body.into(),
            charset: None,
            content_type,
            multipart: None,
        }
    }

    /// Creates a multipart node.
    ///
    /// A `multipart/mixed` content type is added when `headers` has none.
    #[must_use]
    pub fn multipart(
        mut headers: Headers,
        preamble: impl Into<Vec<u8>>,
        parts: Vec<Self>,
        epilogue: impl Into<Vec<u8>>,
    ) -> Self {
        if !headers.contains(CONTENT_TYPE) {
            headers.set(CONTENT_TYPE, "multipart/mixed");
        }
        let mut node = Self::new(headers, Vec::new());
        node.multipart = Some(Multipart {
            preamble: preamble.into(),
            parts,
            epilogue: epilogue.into(),
        });
        node
    }

    /// Parses a raw message with the default configuration.
    ///
    /// Header bytes that are not valid UTF-8 are replaced with U+FFFD, so
    /// such a header fails later serialization with
    /// [`Error::NonAsciiHeader`] unless it is rewritten first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBoundary`] if a non-empty multipart body has
    /// no boundary, or [`Error::NestingTooDeep`] for runaway nesting.
    pub fn parse(raw: impl AsRef<[u8]>) -> Result<Self> {
        Parser::default().parse(raw.as_ref())
    }

    /// Parses headers only, leaving the body raw and unsplit.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches [`parse`](Self::parse).
    pub fn parse_headers(raw: impl AsRef<[u8]>) -> Result<Self> {
        Self::parse_with(raw, ParseConfig::builder().ignore_body(true).build())
    }

    /// Parses a raw message with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_with(raw: impl AsRef<[u8]>, config: ParseConfig) -> Result<Self> {
        Parser::new(config).parse(raw.as_ref())
    }

    /// Primary content-type token as written (e.g. `text/plain`).
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_ref().map(|ct| ct.primary.as_str())
    }

    /// Content type with its attributes, as resolved when the node was built.
    #[must_use]
    pub const fn content_type_attributes(&self) -> Option<&HeaderAttributes> {
        self.content_type.as_ref()
    }

    /// Checks if the content type's top-level token is `multipart`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(HeaderAttributes::is_multipart)
    }

    /// Split multipart body; `None` for leaves and header-only parses.
    #[must_use]
    pub const fn multipart_body(&self) -> Option<&Multipart> {
        self.multipart.as_ref()
    }

    /// Mutable access to the split multipart body.
    pub const fn multipart_body_mut(&mut self) -> Option<&mut Multipart> {
        self.multipart.as_mut()
    }

    /// Child nodes; empty unless this is a parsed multipart node.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        self.multipart.as_ref().map_or(&[], |m| m.parts.as_slice())
    }

    /// Multipart preamble; empty if there is none.
    #[must_use]
    pub fn preamble(&self) -> &[u8] {
        self.multipart.as_ref().map_or(&[], |m| m.preamble.as_slice())
    }

    /// Multipart epilogue; empty if there is none.
    #[must_use]
    pub fn epilogue(&self) -> &[u8] {
        self.multipart.as_ref().map_or(&[], |m| m.epilogue.as_slice())
    }

    /// Character encoding the body is declared or inferred to be in.
    ///
    /// Resolved in order from the [`charset`](Self::charset) override, the
    /// `charset` attribute of the current `Content-Type` header, and finally
    /// [`inferred_charset`](Self::inferred_charset).
    #[must_use]
    pub fn declared_charset(&self) -> Option<Cow<'_, str>> {
        if let Some(charset) = self.charset.as_deref() {
            return Some(Cow::Borrowed(charset));
        }
        let declared = self
            .headers
            .get(CONTENT_TYPE)
            .map(HeaderAttributes::parse)
            .and_then(|ct| ct.charset().map(str::to_string));
        declared
            .map(Cow::Owned)
            .or_else(|| self.inferred_charset().map(Cow::Borrowed))
    }

    /// Charset guessed from the body bytes: `US-ASCII` for 7-bit bodies,
    /// `UTF-8` for valid UTF-8.
    #[must_use]
    pub fn inferred_charset(&self) -> Option<&'static str> {
        if self.body.is_ascii() {
            Some("US-ASCII")
        } else if std::str::from_utf8(&self.body).is_ok() {
            Some("UTF-8")
        } else {
            None
        }
    }

    /// Iterates over this node and all descendants, depth first, with the
    /// depth of each node (this node is depth 0).
    pub fn walk(&self) -> impl Iterator<Item = (usize, &Self)> {
        let mut stack = vec![(0, self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.parts().iter().rev().map(|part| (depth + 1, part)));
            Some((depth, node))
        })
    }
}

/// Recursive MIME parser.
///
/// Collects the recoverable [`Diagnostic`]s met along the way; they are
/// also logged at `warn` level.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParseConfig,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    /// Creates a parser.
    #[must_use]
    pub const fn new(config: ParseConfig) -> Self {
        Self {
            config,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Takes the collected diagnostics, leaving none behind.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Parses a raw message into a node tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBoundary`] if a non-empty multipart body has
    /// no boundary, or [`Error::NestingTooDeep`] when parts nest deeper than
    /// the configured limit.
    pub fn parse(&mut self, raw: &[u8]) -> Result<MimeNode> {
        self.parse_node(raw, 0)
    }

    fn parse_node(&mut self, raw: &[u8], depth: usize) -> Result<MimeNode> {
        if depth > self.config.max_depth {
            return Err(Error::NestingTooDeep {
                limit: self.config.max_depth,
            });
        }

        let (head, body) = split_message(raw);
        let head = String::from_utf8_lossy(head);
        if matches!(head, Cow::Owned(_)) {
            tracing::debug!(depth, "Replaced invalid UTF-8 in header block");
        }
        let headers = Headers::parse(&head);
        let content_type = headers
            .get(CONTENT_TYPE)
            .map(|value| HeaderAttributes::parse_with_diagnostics(value, &mut self.diagnostics));

        let mut node = MimeNode {
            headers,
            body: body.to_vec(),
            charset: None,
            content_type,
            multipart: None,
        };
        tracing::trace!(depth, content_type = ?node.content_type(), "Parsed MIME headers");

        if self.config.ignore_body || !node.is_multipart() {
            return Ok(node);
        }

        let boundary = node.content_type.as_ref().and_then(HeaderAttributes::boundary);
        node.multipart = Some(self.parse_multipart(body, boundary, depth)?);
        Ok(node)
    }

    fn parse_multipart(
        &mut self,
        body: &[u8],
        boundary: Option<&str>,
        depth: usize,
    ) -> Result<Multipart> {
        if body.is_empty() {
            return Ok(Multipart::default());
        }

        let boundary = boundary.ok_or(Error::MissingBoundary)?;
        let delimiter = format!("--{boundary}");
        let mut fragments = split_on(body, delimiter.as_bytes());

        if let Some(last) = fragments.last_mut() {
            if let Some(rest) = last.strip_prefix(b"--") {
                *last = rest;
            } else {
                tracing::warn!(boundary, "Bad multipart boundary (missing trailing --)");
                self.diagnostics.push(Diagnostic::TruncatedMultipart);
            }
        }

        let count = fragments.len();
        let mut stripped = Vec::with_capacity(count);
        for (i, fragment) in fragments.into_iter().enumerate() {
            let (inner, bounded) = strip_line_breaks(fragment);
            if i > 0 && i + 1 < count && !bounded {
                tracing::warn!(boundary, part = i - 1, "Bad multipart boundary");
                self.diagnostics
                    .push(Diagnostic::MalformedPartDelimiter { index: i - 1 });
            }
            stripped.push(inner);
        }

        let preamble = stripped.first().copied().unwrap_or_default().to_vec();
        let epilogue = if count > 1 {
            stripped[count - 1].to_vec()
        } else {
            Vec::new()
        };

        let interior = stripped.get(1..count - 1).unwrap_or_default();
        let parts = interior
            .iter()
            .map(|fragment| self.parse_node(fragment, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(depth, boundary, parts = parts.len(), "Parsed multipart body");
        Ok(Multipart {
            preamble,
            parts,
            epilogue,
        })
    }
}

/// Splits a raw message at the first blank line.
///
/// The header block keeps its final line break. Without a blank line the
/// whole input is the header block and the body is empty.
fn split_message(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = strip_line_break(raw) {
        return (&[], body);
    }

    for (i, &byte) in raw.iter().enumerate() {
        if byte == b'\n' {
            if let Some(body) = strip_line_break(&raw[i + 1..]) {
                return (&raw[..=i], body);
            }
        }
    }

    (raw, &[])
}

/// Strips one leading `\r\n` or `\n`.
fn strip_line_break(data: &[u8]) -> Option<&[u8]> {
    data.strip_prefix(b"\r\n")
        .or_else(|| data.strip_prefix(b"\n"))
}

/// Strips at most one line break from each end of a fragment.
///
/// The flag reports whether both were present.
fn strip_line_breaks(fragment: &[u8]) -> (&[u8], bool) {
    let (rest, leading) = match strip_line_break(fragment) {
        Some(rest) => (rest, true),
        None => (fragment, false),
    };
    let trailing = rest
        .strip_suffix(b"\r\n")
        .or_else(|| rest.strip_suffix(b"\n"));
    match trailing {
        Some(inner) => (inner, leading),
        None => (rest, false),
    }
}

/// Splits on every non-overlapping occurrence of a literal delimiter.
fn split_on<'a>(haystack: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(haystack, delimiter) {
        fragments.push(&haystack[start..pos]);
        start = pos + delimiter.len();
    }
    fragments.push(&haystack[start..]);
    fragments
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    use super::*;

    const MULTIPART: &str = concat!(
        "From: sender@example.com\r\n",
        "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
        "\r\n",
        "This is the preamble.\r\n",
        "--XYZ\r\n",
        "Content-Type: text/plain; charset=us-ascii\r\n",
        "\r\n",
        "Part one.\r\n",
        "--XYZ\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<p>Part two.</p>\r\n",
        "--XYZ--\r\n",
        "The epilogue.\r\n",
    );

    #[test]
    fn test_split_message() {
        assert_eq!(
            split_message(b"A: 1\r\nB: 2\r\n\r\nbody\r\n\r\nmore"),
            (&b"A: 1\r\nB: 2\r\n"[..], &b"body\r\n\r\nmore"[..])
        );
        assert_eq!(split_message(b"A: 1\n\nbody"), (&b"A: 1\n"[..], &b"body"[..]));
        assert_eq!(split_message(b"A: 1\r\n"), (&b"A: 1\r\n"[..], &b""[..]));
        assert_eq!(split_message(b"A: 1"), (&b"A: 1"[..], &b""[..]));
        assert_eq!(split_message(b"\r\nbody"), (&b""[..], &b"body"[..]));
        assert_eq!(split_message(b""), (&b""[..], &b""[..]));
    }

    #[test]
    fn test_strip_line_breaks() {
        assert_eq!(strip_line_breaks(b"\r\nabc\r\n"), (&b"abc"[..], true));
        assert_eq!(strip_line_breaks(b"\nabc\n"), (&b"abc"[..], true));
        assert_eq!(strip_line_breaks(b"abc\r\n"), (&b"abc"[..], false));
        assert_eq!(strip_line_breaks(b"\r\nabc"), (&b"abc"[..], false));
        assert_eq!(strip_line_breaks(b"\r\n\r\nabc\r\n\r\n"), (&b"\r\nabc\r\n"[..], true));
    }

    #[test]
    fn test_split_on_literal() {
        assert_eq!(
            split_on(b"a--(.*)b--(.*)c", b"--(.*)"),
            vec![&b"a"[..], &b"b"[..], &b"c"[..]]
        );
        assert_eq!(split_on(b"abc", b"--x"), vec![&b"abc"[..]]);
        assert_eq!(split_on(b"--x", b"--x"), vec![&b""[..], &b""[..]]);
        assert_eq!(
            split_on(b"--x--x\r\n--x--", b"--x"),
            vec![&b""[..], &b""[..], &b"\r\n"[..], &b"--"[..]]
        );
    }

    #[test]
    fn test_parse_single_part() {
        let node = MimeNode::parse("Subject: Hi\r\nContent-Type: text/plain\r\n\r\nHello!").unwrap();
        assert_eq!(node.headers.get("Subject"), Some("Hi"));
        assert_eq!(node.content_type(), Some("text/plain"));
        assert_eq!(node.body, b"Hello!");
        assert!(!node.is_multipart());
        assert!(node.parts().is_empty());
        assert!(node.multipart_body().is_none());
    }

    #[test]
    fn test_parse_without_content_type() {
        let node = MimeNode::parse("Subject: Hi\r\n\r\nbody").unwrap();
        assert_eq!(node.content_type(), None);
        assert!(!node.is_multipart());
    }

    #[test]
    fn test_parse_without_body() {
        let node = MimeNode::parse("Subject: Hi").unwrap();
        assert_eq!(node.headers.get("Subject"), Some("Hi"));
        assert!(node.body.is_empty());
    }

    #[test]
    fn test_parse_multipart() {
        let mut parser = Parser::default();
        let node = parser.parse(MULTIPART.as_bytes()).unwrap();

        assert!(node.is_multipart());
        assert_eq!(node.preamble(), b"This is the preamble.");
        assert_eq!(node.epilogue(), b"The epilogue.");
        assert_eq!(node.parts().len(), 2);

        let first = &node.parts()[0];
        assert_eq!(first.content_type(), Some("text/plain"));
        assert!(first.charset.is_none());
        assert_eq!(first.declared_charset().as_deref(), Some("us-ascii"));
        assert_eq!(first.body, b"Part one.");

        let second = &node.parts()[1];
        assert_eq!(second.content_type(), Some("text/html"));
        assert_eq!(second.body, b"<p>Part two.</p>");

        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_parse_multipart_lf_only() {
        let raw = MULTIPART.replace("\r\n", "\n");
        let node = MimeNode::parse(raw).unwrap();
        assert_eq!(node.parts().len(), 2);
        assert_eq!(node.parts()[0].body, b"Part one.");
        assert_eq!(node.epilogue(), b"The epilogue.");
    }

    #[test]
    fn test_parse_multipart_case_insensitive() {
        let raw = "Content-Type: Multipart/Alternative; boundary=b\r\n\r\n--b\r\n\r\nx\r\n--b--";
        let node = MimeNode::parse(raw).unwrap();
        assert!(node.is_multipart());
        assert_eq!(node.content_type(), Some("Multipart/Alternative"));
        assert_eq!(node.parts().len(), 1);
        assert_eq!(node.parts()[0].body, b"x");
        assert!(node.epilogue().is_empty());
    }

    #[test]
    fn test_parse_empty_multipart() {
        let node = MimeNode::parse("Content-Type: multipart/mixed\r\n\r\n").unwrap();
        assert!(node.is_multipart());
        assert!(node.parts().is_empty());
        assert!(node.preamble().is_empty());
        assert!(node.epilogue().is_empty());
        assert!(node.multipart_body().is_some());
    }

    #[test]
    fn test_parse_missing_boundary() {
        let result = MimeNode::parse("Content-Type: multipart/mixed\r\n\r\nsome body");
        assert_eq!(result.unwrap_err(), Error::MissingBoundary);
    }

    #[test]
    fn test_parse_nested_missing_boundary_fails_whole_parse() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative\r\n\r\n",
            "inner body\r\n",
            "--outer--\r\n",
        );
        assert_eq!(MimeNode::parse(raw).unwrap_err(), Error::MissingBoundary);
    }

    #[test]
    fn test_parse_truncated_multipart() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\npre\r\n--b\r\n\r\none\r\n--b\r\n\r\ntwo";
        let mut parser = Parser::default();
        let node = parser.parse(raw.as_bytes()).unwrap();

        // The final fragment is taken as the epilogue anyway.
        assert_eq!(node.parts().len(), 1);
        assert_eq!(node.parts()[0].body, b"one");
        assert_eq!(node.epilogue(), b"\r\ntwo");
        assert_eq!(parser.diagnostics(), [Diagnostic::TruncatedMultipart]);
    }

    #[test]
    fn test_parse_malformed_part_delimiter() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\none--b\r\n\r\ntwo\r\n--b--";
        let mut parser = Parser::default();
        let node = parser.parse(raw.as_bytes()).unwrap();

        assert_eq!(node.parts().len(), 2);
        assert_eq!(node.parts()[0].body, b"one");
        assert_eq!(
            parser.take_diagnostics(),
            [Diagnostic::MalformedPartDelimiter { index: 0 }]
        );
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_parse_boundary_with_pattern_characters() {
        let raw = "Content-Type: multipart/mixed; boundary=\"a.*+?(b)\"\r\n\r\n--a.*+?(b)\r\n\r\nx\r\n--a.*+?(b)--\r\n";
        let node = MimeNode::parse(raw).unwrap();
        assert_eq!(node.parts().len(), 1);
        assert_eq!(node.parts()[0].body, b"x");
    }

    #[test]
    fn test_parse_nested() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "plain\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n\r\n",
            "<b>html</b>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/octet-stream\r\n\r\n",
            "\x00\x01\x02\r\n",
            "--outer--\r\n",
        );
        let node = MimeNode::parse(raw).unwrap();
        assert_eq!(node.parts().len(), 2);

        let alternative = &node.parts()[0];
        assert!(alternative.is_multipart());
        assert_eq!(alternative.parts().len(), 2);
        assert_eq!(alternative.parts()[1].body, b"<b>html</b>");

        assert_eq!(node.parts()[1].body, b"\x00\x01\x02");

        let depths: Vec<_> = node.walk().map(|(depth, n)| (depth, n.content_type())).collect();
        assert_eq!(
            depths,
            [
                (0, Some("multipart/mixed")),
                (1, Some("multipart/alternative")),
                (2, Some("text/plain")),
                (2, Some("text/html")),
                (1, Some("application/octet-stream")),
            ]
        );
    }

    #[test]
    fn test_parse_depth_limit() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
            "--a\r\n",
            "Content-Type: multipart/mixed; boundary=b\r\n\r\n",
            "--b\r\n\r\nleaf\r\n--b--\r\n",
            "--a--\r\n",
        );

        let shallow = ParseConfig::builder().max_depth(1).build();
        assert_eq!(
            MimeNode::parse_with(raw, shallow).unwrap_err(),
            Error::NestingTooDeep { limit: 1 }
        );

        let deep_enough = ParseConfig::builder().max_depth(2).build();
        assert!(MimeNode::parse_with(raw, deep_enough).is_ok());
    }

    #[test]
    fn test_parse_headers_only() {
        let node = MimeNode::parse_headers(MULTIPART).unwrap();
        assert!(node.is_multipart());
        assert!(node.multipart_body().is_none());
        assert!(node.parts().is_empty());
        assert!(node.body.starts_with(b"This is the preamble.\r\n--XYZ"));
    }

    #[test]
    fn test_parse_headers_only_skips_boundary_check() {
        let node = MimeNode::parse_headers("Content-Type: multipart/mixed\r\n\r\nbody").unwrap();
        assert_eq!(node.body, b"body");
    }

    #[test]
    fn test_first_content_type_wins() {
        let raw = "Content-Type: text/plain\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n--b";
        let node = MimeNode::parse(raw).unwrap();
        assert_eq!(node.content_type(), Some("text/plain"));
        assert!(!node.is_multipart());
    }

    #[test]
    fn test_duplicate_attribute_diagnostic() {
        let mut parser = Parser::default();
        let node = parser
            .parse(b"Content-Type: text/plain; charset=a; charset=b\r\n\r\nx")
            .unwrap();
        assert_eq!(node.declared_charset().as_deref(), Some("a"));
        assert_eq!(
            parser.diagnostics(),
            [Diagnostic::DuplicateAttribute {
                name: "charset".to_string()
            }]
        );
    }

    #[test]
    fn test_declared_charset() {
        let mut node = MimeNode::new(Headers::new(), "plain");
        assert_eq!(node.declared_charset().as_deref(), Some("US-ASCII"));

        node.body = "héllo".as_bytes().to_vec();
        assert_eq!(node.declared_charset().as_deref(), Some("UTF-8"));

        node.body = b"\xff\xfe".to_vec();
        assert_eq!(node.declared_charset(), None);
        assert_eq!(node.inferred_charset(), None);

        node.headers.set(CONTENT_TYPE, "text/plain; charset=koi8-r");
        assert_eq!(node.declared_charset().as_deref(), Some("koi8-r"));

        node.charset = Some("ISO-8859-1".to_string());
        assert_eq!(node.declared_charset().as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_declared_charset_follows_header_edits() {
        let raw = "Content-Type: text/plain; charset=us-ascii\r\n\r\nhi";
        let mut node = MimeNode::parse(raw).unwrap();
        node.headers.set(CONTENT_TYPE, "text/plain; charset=iso-8859-1");
        assert_eq!(node.declared_charset().as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn test_parse_non_utf8_header_bytes() {
        let node = MimeNode::parse(b"Subject: caf\xe9\r\n\r\nbody").unwrap();
        assert_eq!(node.headers.get("Subject"), Some("caf\u{fffd}"));
        assert_eq!(node.body, b"body");
        assert_eq!(
            node.to_bytes().unwrap_err(),
            Error::NonAsciiHeader {
                name: "Subject".to_string()
            }
        );
    }

    #[test]
    fn test_multipart_constructor_adds_content_type() {
        let node = MimeNode::multipart(Headers::new(), "", Vec::new(), "");
        assert_eq!(node.content_type(), Some("multipart/mixed"));
        assert!(node.is_multipart());
    }
}
