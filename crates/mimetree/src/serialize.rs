//! Wire-format serialization of MIME nodes.
//!
//! Serialization does not touch the node being written. Multipart nodes get
//! a fresh boundary on every run, written into a copy of their
//! `Content-Type` header; text leaves get their `charset` attribute set the
//! same way. Serializing the same node twice therefore yields the same
//! structure each time, with only the boundaries differing.
//!
//! The parser drops one line break at the start of a preamble and one at
//! the end of an epilogue. A preamble that starts with a line break, or an
//! epilogue that ends with one, is padded with an extra CRLF on that side
//! so that it reads back unchanged.

use std::borrow::Cow;

use crate::attributes::HeaderAttributes;
use crate::boundary::{Clock, SystemClock, identity_of, make_boundary};
use crate::config::SerializeConfig;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::node::{CONTENT_TYPE, MimeNode, Multipart};

const CRLF: &[u8] = b"\r\n";

/// Recursive MIME serializer.
///
/// The boundary counter lives here rather than in global state, so
/// independent trees can be serialized concurrently, each with its own
/// serializer.
#[derive(Debug, Clone)]
pub struct Serializer<C = SystemClock> {
    counter: u32,
    discriminator: Option<u32>,
    clock: C,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializeConfig::default())
    }
}

impl Serializer {
    /// Creates a serializer using the system clock.
    #[must_use]
    pub const fn new(config: SerializeConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Serializer<C> {
    /// Creates a serializer with an explicit clock.
    #[must_use]
    pub const fn with_clock(config: SerializeConfig, clock: C) -> Self {
        Self {
            counter: config.boundary_counter,
            discriminator: config.discriminator,
            clock,
        }
    }

    /// Current boundary counter: the number used by the latest boundary.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Serializes a node and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonAsciiHeader`] if a header name or value is not
    /// plain ASCII. Encode such values with
    /// [`to_encoded_word`](crate::encoding::to_encoded_word) first.
    pub fn serialize(&mut self, node: &MimeNode) -> Result<Vec<u8>> {
        let (headers, body) = match node.multipart_body() {
            Some(multipart) => self.render_multipart(node, multipart)?,
            None => (render_leaf_headers(node), Cow::Borrowed(node.body.as_slice())),
        };

        let mut out = Vec::with_capacity(body.len() + 256);
        write_headers(&headers, &mut out)?;
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn render_multipart<'n>(
        &mut self,
        node: &'n MimeNode,
        multipart: &Multipart,
    ) -> Result<(Cow<'n, Headers>, Cow<'n, [u8]>)> {
        self.counter = self.counter.wrapping_add(1);
        let discriminator = self.discriminator.unwrap_or_else(|| identity_of(node));
        let boundary = make_boundary(self.counter, discriminator, self.clock.unix_seconds());
        tracing::trace!(counter = self.counter, boundary = %boundary, "Generated boundary");

        let delimiter = format!("\r\n--{boundary}");
        let mut body = Vec::new();
        if starts_with_line_break(&multipart.preamble) {
            body.extend_from_slice(CRLF);
        }
        body.extend_from_slice(&multipart.preamble);
        for part in &multipart.parts {
            body.extend_from_slice(delimiter.as_bytes());
            body.extend_from_slice(CRLF);
            body.extend_from_slice(&self.serialize(part)?);
        }
        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(b"--\r\n");
        body.extend_from_slice(&multipart.epilogue);
        if multipart.epilogue.ends_with(b"\n") {
            body.extend_from_slice(CRLF);
        }

        let mut content_type = node.headers.get(CONTENT_TYPE).map_or_else(
            || {
                node.content_type_attributes()
                    .cloned()
                    .unwrap_or_else(|| HeaderAttributes::new("multipart/mixed"))
            },
            HeaderAttributes::parse,
        );
        content_type.set("boundary", boundary);

        let mut headers = node.headers.clone();
        headers.set(CONTENT_TYPE, content_type.to_string());
        Ok((Cow::Owned(headers), Cow::Owned(body)))
    }
}

fn render_leaf_headers(node: &MimeNode) -> Cow<'_, Headers> {
    let Some(raw) = node.headers.get(CONTENT_TYPE) else {
        return Cow::Borrowed(&node.headers);
    };

    let mut content_type = HeaderAttributes::parse(raw);
    if !content_type.is_text() {
        return Cow::Borrowed(&node.headers);
    }

    let charset = node
        .charset
        .as_deref()
        .or_else(|| content_type.charset())
        .or_else(|| node.inferred_charset())
        .map(str::to_string);
    let Some(charset) = charset else {
        tracing::debug!("Body charset unknown; leaving Content-Type as is");
        return Cow::Borrowed(&node.headers);
    };

    content_type.set("charset", charset);
    let mut headers = node.headers.clone();
    headers.set(CONTENT_TYPE, content_type.to_string());
    Cow::Owned(headers)
}

fn starts_with_line_break(data: &[u8]) -> bool {
    data.starts_with(b"\n") || data.starts_with(b"\r\n")
}

fn write_headers(headers: &Headers, out: &mut Vec<u8>) -> Result<()> {
    for (name, value) in headers.iter() {
        if !name.is_ascii() || !value.is_ascii() {
            return Err(Error::NonAsciiHeader {
                name: name.to_string(),
            });
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(CRLF);
    }
    Ok(())
}

impl MimeNode {
    /// Serializes with the default configuration and the system clock.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Serializer::default().serialize(self)
    }

    /// Serializes with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn to_bytes_with(&self, config: SerializeConfig) -> Result<Vec<u8>> {
        Serializer::new(config).serialize(self)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::unreadable_literal
)]
mod tests {
    use super::*;
    use crate::boundary::FixedClock;

    fn serializer(counter: u32) -> Serializer<FixedClock> {
        let config = SerializeConfig::builder()
            .boundary_counter(counter)
            .discriminator(0xabcd)
            .build();
        Serializer::with_clock(config, FixedClock(0x1234))
    }

    fn text(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_leaf_without_content_type() {
        let node = MimeNode::parse("Subject: Hi\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nbody").unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(text(&out), "Subject: Hi\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nbody");
    }

    #[test]
    fn test_leaf_text_gets_charset() {
        let node = MimeNode::parse("Content-Type: text/plain; format=flowed\r\n\r\nhello").unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(
            text(&out),
            "Content-Type: text/plain; format=\"flowed\"; charset=\"US-ASCII\"\r\n\r\nhello"
        );
    }

    #[test]
    fn test_leaf_text_keeps_declared_charset() {
        let mut node =
            MimeNode::parse(b"Content-Type: text/html; charset=iso-8859-1\r\n\r\ncaf\xe9")
                .unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        assert!(out.starts_with(b"Content-Type: text/html; charset=\"iso-8859-1\"\r\n"));
        assert!(out.ends_with(b"\r\n\r\ncaf\xe9"));

        node.charset = Some("windows-1252".to_string());
        let out = serializer(0).serialize(&node).unwrap();
        assert!(out.starts_with(b"Content-Type: text/html; charset=\"windows-1252\"\r\n"));
    }

    #[test]
    fn test_leaf_text_follows_edited_header() {
        let raw = "Content-Type: text/plain; charset=us-ascii\r\n\r\nhi";
        let mut node = MimeNode::parse(raw).unwrap();
        node.headers.set(CONTENT_TYPE, "text/plain; charset=iso-8859-1");

        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(
            text(&out),
            "Content-Type: text/plain; charset=\"iso-8859-1\"\r\n\r\nhi"
        );
    }

    #[test]
    fn test_preamble_and_epilogue_line_breaks_survive() {
        let part = MimeNode::new(Headers::new(), "x");
        let node = MimeNode::multipart(Headers::new(), "\r\n\r\npre", vec![part], "epi\r\n\n");

        let out = serializer(0).serialize(&node).unwrap();
        let boundary = "----_=_NextPart_001_0000abcd.00001234";
        assert_eq!(
            text(&out),
            format!(
                "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n\
                 \r\n\r\n\r\npre\
                 \r\n--{boundary}\r\n\r\nx\
                 \r\n--{boundary}--\r\nepi\r\n\n\r\n"
            )
        );

        let mut current = node;
        for _ in 0..3 {
            current = MimeNode::parse(serializer(0).serialize(&current).unwrap()).unwrap();
            assert_eq!(current.preamble(), b"\r\n\r\npre");
            assert_eq!(current.epilogue(), b"epi\r\n\n");
            assert_eq!(current.parts()[0].body, b"x");
        }
    }

    #[test]
    fn test_leaf_non_text_untouched() {
        let node = MimeNode::parse(b"Content-Type: image/png; name=a.png\r\n\r\n\x89PNG").unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(out, b"Content-Type: image/png; name=a.png\r\n\r\n\x89PNG".to_vec());
    }

    #[test]
    fn test_multipart_layout() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=old\r\n\r\n",
            "pre\r\n",
            "--old\r\n",
            "X-Part: 1\r\n\r\none\r\n",
            "--old\r\n",
            "X-Part: 2\r\n\r\ntwo\r\n",
            "--old--\r\n",
            "epi",
        );
        let node = MimeNode::parse(raw).unwrap();
        let mut serializer = serializer(0);
        let out = serializer.serialize(&node).unwrap();

        let boundary = "----_=_NextPart_001_0000abcd.00001234";
        let expected = format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n\
             pre\r\n--{boundary}\r\nX-Part: 1\r\n\r\none\
             \r\n--{boundary}\r\nX-Part: 2\r\n\r\ntwo\
             \r\n--{boundary}--\r\nepi"
        );
        assert_eq!(text(&out), expected);
        assert_eq!(serializer.counter(), 1);
    }

    #[test]
    fn test_nested_boundaries_are_distinct() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
            "--a\r\n",
            "Content-Type: multipart/alternative; boundary=b\r\n\r\n",
            "--b\r\n\r\nx\r\n--b--\r\n",
            "--a\r\n",
            "Content-Type: multipart/related; boundary=c\r\n\r\n",
            "--c\r\n\r\ny\r\n--c--\r\n",
            "--a--\r\n",
        );
        let node = MimeNode::parse(raw).unwrap();
        let mut serializer = serializer(5);
        let out = text(&serializer.serialize(&node).unwrap()).to_string();

        // Parent first, then children in order.
        assert!(out.starts_with(
            "Content-Type: multipart/mixed; boundary=\"----_=_NextPart_006_0000abcd.00001234\""
        ));
        assert!(out.contains("boundary=\"----_=_NextPart_007_0000abcd.00001234\""));
        assert!(out.contains("boundary=\"----_=_NextPart_008_0000abcd.00001234\""));
        assert_eq!(serializer.counter(), 8);

        let reparsed = MimeNode::parse(&out).unwrap();
        assert_eq!(reparsed.parts().len(), 2);
        assert_eq!(reparsed.parts()[0].parts()[0].body, b"x");
        assert_eq!(reparsed.parts()[1].parts()[0].body, b"y");
    }

    #[test]
    fn test_empty_multipart() {
        let node = MimeNode::parse("Content-Type: multipart/mixed\r\n\r\n").unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        let boundary = "----_=_NextPart_001_0000abcd.00001234";
        assert_eq!(
            text(&out),
            format!(
                "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n\r\n--{boundary}--\r\n"
            )
        );

        let reparsed = MimeNode::parse(&out).unwrap();
        assert!(reparsed.parts().is_empty());
        assert!(reparsed.preamble().is_empty());
        assert!(reparsed.epilogue().is_empty());
    }

    #[test]
    fn test_serialize_leaves_node_untouched() {
        let raw = "Content-Type: multipart/mixed; boundary=keep\r\n\r\n--keep\r\nContent-Type: text/plain\r\n\r\nx\r\n--keep--\r\n";
        let node = MimeNode::parse(raw).unwrap();
        let before = node.clone();

        let first = serializer(0).serialize(&node).unwrap();
        let second = serializer(0).serialize(&node).unwrap();

        assert_eq!(node, before);
        assert_eq!(node.headers.get(CONTENT_TYPE), Some("multipart/mixed; boundary=keep"));
        assert_eq!(node.parts()[0].headers.get(CONTENT_TYPE), Some("text/plain"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_only_parse_keeps_raw_body() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nx\r\n--b--\r\n";
        let node = MimeNode::parse_headers(raw).unwrap();
        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(text(&out), raw);
    }

    #[test]
    fn test_non_ascii_header_rejected() {
        let mut headers = Headers::new();
        headers.add("Subject", "Grüße");
        let node = MimeNode::new(headers, "body");
        assert_eq!(
            serializer(0).serialize(&node).unwrap_err(),
            Error::NonAsciiHeader {
                name: "Subject".to_string()
            }
        );
    }

    #[test]
    fn test_encoded_word_header_accepted() {
        let mut headers = Headers::new();
        let subject = crate::encoding::to_encoded_word(Some("Grüße")).unwrap();
        headers.add("Subject", subject);
        let node = MimeNode::new(headers, "body");
        let out = serializer(0).serialize(&node).unwrap();
        assert_eq!(text(&out), "Subject: =?UTF-8?B?R3LDvMOfZQ==?=\r\n\r\nbody");
    }

    #[test]
    fn test_constructed_multipart() {
        let mut part_headers = Headers::new();
        part_headers.add(CONTENT_TYPE, "text/plain");
        let part = MimeNode::new(part_headers, "hi");

        let mut headers = Headers::new();
        headers.add("Subject", "built");
        let node = MimeNode::multipart(headers, "", vec![part], "");

        let out = serializer(0).serialize(&node).unwrap();
        let boundary = "----_=_NextPart_001_0000abcd.00001234";
        assert_eq!(
            text(&out),
            format!(
                "Subject: built\r\n\
                 Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n\
                 \r\n--{boundary}\r\n\
                 Content-Type: text/plain; charset=\"US-ASCII\"\r\n\r\nhi\
                 \r\n--{boundary}--\r\n"
            )
        );
    }

    #[test]
    fn test_default_discriminator_uses_node_identity() {
        let node = MimeNode::parse("Content-Type: multipart/mixed\r\n\r\n").unwrap();
        let mut serializer = Serializer::with_clock(SerializeConfig::default(), FixedClock(0));
        let out = text(&serializer.serialize(&node).unwrap()).to_string();
        let expected = format!("----_=_NextPart_001_{:08x}.00000000", identity_of(&node));
        assert!(out.contains(&expected));
    }
}
