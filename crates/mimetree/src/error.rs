//! Error and diagnostic types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal MIME errors.
///
/// These abort the parse or serialization of the node they occur in; no
/// partial tree is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Multipart node with a non-empty body but no `boundary` attribute.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// Multipart nesting exceeded the configured depth.
    #[error("Multipart nesting exceeds the limit of {limit} levels")]
    NestingTooDeep {
        /// Configured maximum depth.
        limit: usize,
    },

    /// Header value cannot be emitted as plain ASCII.
    #[error("Header {name:?} contains non-ASCII text; encode it before serializing")]
    NonAsciiHeader {
        /// Name of the offending header.
        name: String,
    },
}

/// Recoverable problems found while parsing.
///
/// Diagnostics never interrupt a parse. They are logged at `warn` level and
/// collected by the [`Parser`](crate::Parser) so callers can decide whether
/// they matter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// Header attribute appeared more than once; the first value was kept.
    #[error("Ignoring duplicate header attribute {name:?}")]
    DuplicateAttribute {
        /// Attribute name.
        name: String,
    },

    /// Multipart body did not end with the `--` close delimiter.
    #[error("Bad multipart boundary (missing trailing --)")]
    TruncatedMultipart,

    /// Interior part was not CRLF-bounded on both sides.
    #[error("Bad multipart boundary around part {index}")]
    MalformedPartDelimiter {
        /// Zero-based index of the part within its parent.
        index: usize,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::MissingBoundary.to_string(),
            "Missing boundary in multipart message"
        );
        assert_eq!(
            Error::NonAsciiHeader {
                name: "Subject".to_string()
            }
            .to_string(),
            "Header \"Subject\" contains non-ASCII text; encode it before serializing"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::DuplicateAttribute {
            name: "charset".to_string(),
        };
        assert_eq!(d.to_string(), "Ignoring duplicate header attribute \"charset\"");
        assert_eq!(
            Diagnostic::MalformedPartDelimiter { index: 2 }.to_string(),
            "Bad multipart boundary around part 2"
        );
    }
}
