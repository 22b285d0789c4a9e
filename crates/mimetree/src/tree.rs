//! Indented tree rendering for diagnostics.

use crate::node::MimeNode;

impl MimeNode {
    /// One-line description of this node.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.content_type() {
            Some(content_type) => format!("#<Mime content_type={content_type:?}>"),
            None => "#<Mime content_type=nil>".to_string(),
        }
    }

    /// Renders the node tree, one line per node.
    ///
    /// ```text
    /// - #<Mime content_type="multipart/mixed">
    ///   |- #<Mime content_type="multipart/alternative">
    ///   |  |- #<Mime content_type="text/plain">
    ///   |  \- #<Mime content_type="text/html">
    ///   \- #<Mime content_type="image/png">
    /// ```
    #[must_use]
    pub fn to_tree(&self) -> String {
        let mut out = format!("- {}\n", self.summary());
        let parts = self.parts();
        for (i, part) in parts.iter().enumerate() {
            let last = i + 1 == parts.len();
            for (j, line) in part.to_tree().lines().enumerate() {
                let marker = match (last, j) {
                    (false, _) => '|',
                    (true, 0) => '\\',
                    (true, _) => ' ',
                };
                out.push_str("  ");
                out.push(marker);
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::node::MimeNode;

    #[test]
    fn test_leaf_tree() {
        let node = MimeNode::parse("Content-Type: text/plain\r\n\r\nx").unwrap();
        assert_eq!(node.to_tree(), "- #<Mime content_type=\"text/plain\">\n");

        let bare = MimeNode::parse("Subject: s\r\n\r\nx").unwrap();
        assert_eq!(bare.summary(), "#<Mime content_type=nil>");
    }

    #[test]
    fn test_nested_tree() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
            "--a\r\n",
            "Content-Type: multipart/alternative; boundary=b\r\n\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nx\r\n",
            "--b\r\nContent-Type: text/html\r\n\r\ny\r\n",
            "--b--\r\n",
            "--a\r\n",
            "Content-Type: image/png\r\n\r\nz\r\n",
            "--a--\r\n",
        );
        let node = MimeNode::parse(raw).unwrap();
        let expected = concat!(
            "- #<Mime content_type=\"multipart/mixed\">\n",
            "  |- #<Mime content_type=\"multipart/alternative\">\n",
            "  |  |- #<Mime content_type=\"text/plain\">\n",
            "  |  \\- #<Mime content_type=\"text/html\">\n",
            "  \\- #<Mime content_type=\"image/png\">\n",
        );
        assert_eq!(node.to_tree(), expected);
    }

    #[test]
    fn test_last_child_subtree_is_indented_with_spaces() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
            "--a\r\n",
            "Content-Type: multipart/related; boundary=b\r\n\r\n",
            "--b\r\nContent-Type: text/html\r\n\r\ny\r\n",
            "--b--\r\n",
            "--a--\r\n",
        );
        let node = MimeNode::parse(raw).unwrap();
        let expected = concat!(
            "- #<Mime content_type=\"multipart/mixed\">\n",
            "  \\- #<Mime content_type=\"multipart/related\">\n",
            "     \\- #<Mime content_type=\"text/html\">\n",
        );
        assert_eq!(node.to_tree(), expected);
    }
}
