//! # mimetree
//!
//! Parsing and re-serialization of MIME-structured messages.
//!
//! ## Features
//!
//! - **Recursive parsing**: headers, content type and, for `multipart/*`
//!   content, a tree of child parts with preamble and epilogue
//! - **Serialization**: CRLF wire format with freshly generated boundaries
//! - **Header attributes**: `primary; key="value"` splitting and joining
//! - **Encoded-words**: `=?UTF-8?B?...?=` production for non-ASCII headers
//! - **Diagnostics**: recoverable problems are logged through `tracing` and
//!   collected on the [`Parser`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use mimetree::MimeNode;
//!
//! let raw = b"Content-Type: multipart/mixed; boundary=XYZ\r\n\
//!             \r\n\
//!             --XYZ\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!\r\n\
//!             --XYZ--\r\n";
//!
//! let mut message = MimeNode::parse(raw)?;
//! println!("{}", message.to_tree());
//!
//! message.headers.set("Subject", "Rewritten");
//! let bytes = message.to_bytes()?;
//! ```
//!
//! ### Deterministic boundaries
//!
//! ```ignore
//! use mimetree::{FixedClock, SerializeConfig, Serializer};
//!
//! let config = SerializeConfig::builder().discriminator(1).build();
//! let mut serializer = Serializer::with_clock(config, FixedClock(0));
//! let bytes = serializer.serialize(&message)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attributes;
mod config;
mod error;
mod header;
mod node;
mod serialize;
mod tree;

pub mod boundary;
pub mod encoding;

pub use attributes::HeaderAttributes;
pub use boundary::{Clock, FixedClock, SystemClock, make_boundary};
pub use config::{ParseConfig, ParseConfigBuilder, SerializeConfig, SerializeConfigBuilder};
pub use encoding::to_encoded_word;
pub use error::{Diagnostic, Error, Result};
pub use header::Headers;
pub use node::{CONTENT_TYPE, MimeNode, Multipart, Parser};
pub use serialize::Serializer;

/// Splits a header value into its primary token and attributes.
///
/// Shorthand for [`HeaderAttributes::parse`].
#[must_use]
pub fn split_header(value: &str) -> HeaderAttributes {
    HeaderAttributes::parse(value)
}
