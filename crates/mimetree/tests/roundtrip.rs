//! Integration tests for parsing and re-serializing MIME trees.
//!
//! Serialization uses a fixed clock and discriminator where exact output
//! matters.

use mimetree::{
    CONTENT_TYPE, Diagnostic, Error, FixedClock, Headers, MimeNode, ParseConfig, Parser,
    SerializeConfig, Serializer, split_header, to_encoded_word,
};
use proptest::prelude::*;

const MESSAGE: &str = concat!(
    "Received: from a.example.com\r\n",
    "\tby b.example.com; Tue, 1 Oct 2024 10:00:00 +0000\r\n",
    "From: Alice <alice@example.com>\r\n",
    "To: Bob <bob@example.com>\r\n",
    "Subject: Quarterly report\r\n",
    "X-Tag: first\r\n",
    "X-Tag: second\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/mixed;\r\n",
    "\tboundary=\"----=_Part_0_1\"\r\n",
    "\r\n",
    "This is a multi-part message in MIME format.\r\n",
    "------=_Part_0_1\r\n",
    "Content-Type: multipart/alternative; boundary=alt\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: text/plain; charset=us-ascii\r\n",
    "\r\n",
    "See attached.\r\n",
    "--alt\r\n",
    "Content-Type: text/html; charset=us-ascii\r\n",
    "\r\n",
    "<p>See attached.</p>\r\n",
    "--alt--\r\n",
    "------=_Part_0_1\r\n",
    "Content-Type: application/pdf; name=\"report.pdf\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "JVBERi0xLjQK\r\n",
    "------=_Part_0_1--\r\n",
);

fn fixed_serializer() -> Serializer<FixedClock> {
    let config = SerializeConfig::builder().discriminator(0x5eed).build();
    Serializer::with_clock(config, FixedClock(1_700_000_000))
}

/// Compares two trees ignoring `Content-Type`, which serialization rewrites.
fn assert_same_tree(a: &MimeNode, b: &MimeNode) {
    assert_eq!(a.content_type(), b.content_type());
    for name in a.headers.names().filter(|n| *n != CONTENT_TYPE) {
        assert_eq!(a.headers.get_all(name), b.headers.get_all(name), "header {name}");
    }
    assert_eq!(a.preamble(), b.preamble());
    assert_eq!(a.epilogue(), b.epilogue());
    assert_eq!(a.parts().len(), b.parts().len());
    if a.parts().is_empty() {
        assert_eq!(a.body, b.body);
    }
    for (x, y) in a.parts().iter().zip(b.parts()) {
        assert_same_tree(x, y);
    }
}

#[test]
fn test_parse_realistic_message() {
    let mut parser = Parser::default();
    let message = parser.parse(MESSAGE.as_bytes()).unwrap();

    assert!(parser.diagnostics().is_empty());
    assert_eq!(
        message.headers.get("Received"),
        Some("from a.example.com by b.example.com; Tue, 1 Oct 2024 10:00:00 +0000")
    );
    assert_eq!(message.headers.get_all("X-Tag"), ["first", "second"]);
    assert_eq!(message.content_type(), Some("multipart/mixed"));
    assert_eq!(
        message.content_type_attributes().unwrap().boundary(),
        Some("----=_Part_0_1")
    );
    assert_eq!(
        message.preamble(),
        b"This is a multi-part message in MIME format."
    );
    assert!(message.epilogue().is_empty());

    let [alternative, attachment] = message.parts() else {
        panic!("expected two parts");
    };
    assert_eq!(alternative.parts().len(), 2);
    assert_eq!(alternative.parts()[0].body, b"See attached.");
    assert_eq!(alternative.parts()[1].body, b"<p>See attached.</p>");
    assert_eq!(attachment.headers.get("Content-Transfer-Encoding"), Some("base64"));
    assert_eq!(attachment.body, b"JVBERi0xLjQK");
    assert_eq!(
        split_header(attachment.headers.get(CONTENT_TYPE).unwrap()).get("name"),
        Some("report.pdf")
    );
}

#[test]
fn test_multipart_round_trip() {
    let original = MimeNode::parse(MESSAGE).unwrap();
    let bytes = fixed_serializer().serialize(&original).unwrap();
    let reparsed = MimeNode::parse(&bytes).unwrap();

    assert_same_tree(&original, &reparsed);
    assert_ne!(
        reparsed.content_type_attributes().unwrap().boundary(),
        Some("----=_Part_0_1")
    );

    // A second pass is stable.
    let again = MimeNode::parse(fixed_serializer().serialize(&reparsed).unwrap()).unwrap();
    assert_same_tree(&reparsed, &again);
}

#[test]
fn test_single_part_round_trip() {
    let raw = "Subject: hello\r\n\tworld\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nBody line 1\r\nBody line 2\r\n";
    let node = MimeNode::parse(raw).unwrap();
    assert_eq!(node.headers.get("Subject"), Some("hello world"));

    let bytes = node.to_bytes().unwrap();
    assert_eq!(
        bytes,
        b"Subject: hello world\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nBody line 1\r\nBody line 2\r\n"
    );
}

#[test]
fn test_missing_boundary_is_fatal() {
    let raw = "Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nbody\r\n--x--\r\n";
    assert_eq!(MimeNode::parse(raw).unwrap_err(), Error::MissingBoundary);
}

#[test]
fn test_empty_multipart_body() {
    let node = MimeNode::parse("Content-Type: multipart/mixed; boundary=x\r\n\r\n").unwrap();
    assert!(node.parts().is_empty());
    assert_eq!(node.preamble(), b"");
    assert_eq!(node.epilogue(), b"");
}

#[test]
fn test_diagnostics_do_not_stop_parse() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b; boundary=c\r\n\r\n",
        "--b\r\nX: 1\r\n\r\none",
        "--b\r\nX: 2\r\n\r\ntwo\r\n",
        "--b\r\n",
    );
    let mut parser = Parser::new(ParseConfig::default());
    let node = parser.parse(raw.as_bytes()).unwrap();

    assert_eq!(node.parts().len(), 2);
    assert_eq!(node.parts()[0].body, b"one");
    assert_eq!(node.parts()[1].body, b"two");
    assert_eq!(
        parser.diagnostics(),
        [
            Diagnostic::DuplicateAttribute {
                name: "boundary".to_string()
            },
            Diagnostic::TruncatedMultipart,
            Diagnostic::MalformedPartDelimiter { index: 0 },
        ]
    );
}

#[test]
fn test_edit_then_serialize() {
    let mut node = MimeNode::parse(MESSAGE).unwrap();
    node.headers
        .set("Subject", to_encoded_word(Some("Rapport trimestriel – Q3")).unwrap());
    node.headers.remove("X-Tag");

    let bytes = fixed_serializer().serialize(&node).unwrap();
    let reparsed = MimeNode::parse(&bytes).unwrap();

    assert!(reparsed.headers.get("Subject").unwrap().starts_with("=?UTF-8?B?"));
    assert!(reparsed.headers.get_all("X-Tag").is_empty());
    assert_eq!(reparsed.parts().len(), 2);
}

#[test]
fn test_boundary_counter_option() {
    let node = MimeNode::parse(MESSAGE).unwrap();
    let config = SerializeConfig::builder()
        .boundary_counter(41)
        .discriminator(1)
        .build();
    let mut serializer = Serializer::with_clock(config, FixedClock(2));
    let text = String::from_utf8(serializer.serialize(&node).unwrap()).unwrap();

    assert!(text.contains("----_=_NextPart_042_00000001.00000002"));
    assert!(text.contains("----_=_NextPart_043_00000001.00000002"));
    assert_eq!(serializer.counter(), 43);
}

#[test]
fn test_headers_only_parse() {
    let node = MimeNode::parse_headers(MESSAGE).unwrap();
    assert_eq!(node.headers.get("Subject"), Some("Quarterly report"));
    assert!(node.is_multipart());
    assert!(node.parts().is_empty());
    assert!(node.body.ends_with(b"------=_Part_0_1--\r\n"));
}

#[test]
fn test_constructed_tree() {
    let text_part = MimeNode::new(
        [(CONTENT_TYPE, "text/plain")].into_iter().collect::<Headers>(),
        "Hi Bob",
    );
    let image = MimeNode::new(
        [(CONTENT_TYPE, "image/png"), ("Content-Transfer-Encoding", "base64")]
            .into_iter()
            .collect::<Headers>(),
        "iVBORw0KGgo=",
    );
    let message = MimeNode::multipart(
        [("Subject", "Photo")].into_iter().collect(),
        "",
        vec![text_part, image],
        "",
    );

    let reparsed = MimeNode::parse(fixed_serializer().serialize(&message).unwrap()).unwrap();
    assert_eq!(reparsed.headers.get("Subject"), Some("Photo"));
    assert_eq!(reparsed.parts().len(), 2);
    assert_eq!(reparsed.parts()[0].body, b"Hi Bob");
    assert_eq!(reparsed.parts()[0].declared_charset().as_deref(), Some("US-ASCII"));
    assert_eq!(reparsed.parts()[1].body, b"iVBORw0KGgo=");
    assert!(reparsed.to_tree().contains("image/png"));
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_round_trip() {
    let node = MimeNode::parse(MESSAGE).unwrap();
    let json = serde_json::to_string(&node).unwrap();
    let back: MimeNode = serde_json::from_str(&json).unwrap();
    assert_eq!(node, back);
}

fn header_line() -> impl Strategy<Value = (String, String)> {
    (
        "X-[A-Za-z]{1,8}",
        "[A-Za-z0-9]{1,8}( [A-Za-z0-9.@]{1,8}){0,3}",
    )
}

proptest! {
    #[test]
    fn prop_split_header_never_panics(value in any::<String>()) {
        let attrs = split_header(&value);
        prop_assert!(!attrs.primary.contains(';'));
    }

    #[test]
    fn prop_single_part_round_trip(
        headers in prop::collection::vec(header_line(), 0..6),
        body in prop::collection::vec(any::<u8>(), 0..200),
    ) {
        let mut raw = Vec::new();
        for (name, value) in &headers {
            raw.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(&body);

        let node = MimeNode::parse(&raw).unwrap();
        let reparsed = MimeNode::parse(node.to_bytes().unwrap()).unwrap();

        prop_assert_eq!(&reparsed.headers, &node.headers);
        prop_assert_eq!(&reparsed.body, &body);
    }

    #[test]
    fn prop_multipart_round_trip(
        preamble in "[a-z ]{0,12}",
        bodies in prop::collection::vec("[a-z ]{0,20}", 0..4),
        epilogue in "[a-z ]{0,12}",
    ) {
        let mut raw = String::from("Content-Type: multipart/mixed; boundary=\"=_b\"\r\n\r\n");
        raw.push_str(&preamble);
        raw.push_str("\r\n");
        for body in &bodies {
            raw.push_str("--=_b\r\nContent-Type: text/plain\r\n\r\n");
            raw.push_str(body);
            raw.push_str("\r\n");
        }
        raw.push_str("--=_b--\r\n");
        raw.push_str(&epilogue);

        let node = MimeNode::parse(&raw).unwrap();
        prop_assert_eq!(node.parts().len(), bodies.len());

        let reparsed = MimeNode::parse(fixed_serializer().serialize(&node).unwrap()).unwrap();
        prop_assert_eq!(reparsed.preamble(), preamble.as_bytes());
        prop_assert_eq!(reparsed.epilogue(), epilogue.as_bytes());
        let reparsed_bodies: Vec<_> = reparsed.parts().iter().map(|p| p.body.clone()).collect();
        let expected: Vec<_> = bodies.iter().map(|b| b.as_bytes().to_vec()).collect();
        prop_assert_eq!(reparsed_bodies, expected);
    }

    #[test]
    fn prop_preamble_and_epilogue_stable_across_passes(
        preamble in "(\r\n|\n|[a-z ]){0,12}",
        epilogue in "(\r\n|\n|[a-z ]){0,12}",
    ) {
        let part = MimeNode::new(Headers::new(), "body");
        let mut node = MimeNode::multipart(Headers::new(), preamble.as_str(), vec![part], epilogue.as_str());

        for _ in 0..3 {
            node = MimeNode::parse(fixed_serializer().serialize(&node).unwrap()).unwrap();
            prop_assert_eq!(node.preamble(), preamble.as_bytes());
            prop_assert_eq!(node.epilogue(), epilogue.as_bytes());
            prop_assert_eq!(&node.parts()[0].body, b"body");
        }
    }
}

#[test]
fn test_parsed_preamble_keeps_remaining_line_breaks() {
    // Parsing drops one line break at the outer edge of each; the rest
    // survive any number of later passes.
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n\r\n",
        "\r\n\r\npre\r\n",
        "--b\r\n\r\nx\r\n",
        "--b--\r\nepi\r\n\r\n",
    );
    let mut node = MimeNode::parse(raw).unwrap();
    assert_eq!(node.preamble(), b"\r\npre");
    assert_eq!(node.epilogue(), b"epi\r\n");

    for _ in 0..3 {
        node = MimeNode::parse(fixed_serializer().serialize(&node).unwrap()).unwrap();
        assert_eq!(node.preamble(), b"\r\npre");
        assert_eq!(node.epilogue(), b"epi\r\n");
        assert_eq!(node.parts()[0].body, b"x");
    }
}
