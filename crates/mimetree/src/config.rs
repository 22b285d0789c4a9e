//! Parser and serializer configuration.

/// Default limit on multipart nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Resolve headers only; keep the body raw and do not split parts.
    pub ignore_body: bool,
    /// Maximum multipart nesting depth. The top-level node is depth 0.
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            ignore_body: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ParseConfigBuilder {
        ParseConfigBuilder::default()
    }
}

/// Builder for [`ParseConfig`].
#[derive(Debug, Clone, Default)]
pub struct ParseConfigBuilder {
    config: ParseConfig,
}

impl ParseConfigBuilder {
    /// Sets whether the body is left unparsed.
    #[must_use]
    pub const fn ignore_body(mut self, ignore_body: bool) -> Self {
        self.config.ignore_body = ignore_body;
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> ParseConfig {
        self.config
    }
}

/// Serializer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeConfig {
    /// Starting value for boundary numbering. The first boundary uses this
    /// value plus one.
    pub boundary_counter: u32,
    /// Fixed identity folded into boundaries. When unset, each multipart
    /// node's own address is used.
    pub discriminator: Option<u32>,
}

impl SerializeConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> SerializeConfigBuilder {
        SerializeConfigBuilder::default()
    }
}

/// Builder for [`SerializeConfig`].
#[derive(Debug, Clone, Default)]
pub struct SerializeConfigBuilder {
    config: SerializeConfig,
}

impl SerializeConfigBuilder {
    /// Sets the starting boundary counter.
    #[must_use]
    pub const fn boundary_counter(mut self, counter: u32) -> Self {
        self.config.boundary_counter = counter;
        self
    }

    /// Sets a fixed discriminator.
    #[must_use]
    pub const fn discriminator(mut self, discriminator: u32) -> Self {
        self.config.discriminator = Some(discriminator);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> SerializeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = ParseConfig::default();
        assert!(!config.ignore_body);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(ParseConfig::builder().build(), config);
    }

    #[test]
    fn test_parse_builder() {
        let config = ParseConfig::builder().ignore_body(true).max_depth(3).build();
        assert!(config.ignore_body);
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn test_serialize_defaults() {
        let config = SerializeConfig::default();
        assert_eq!(config.boundary_counter, 0);
        assert_eq!(config.discriminator, None);
    }

    #[test]
    fn test_serialize_builder() {
        let config = SerializeConfig::builder()
            .boundary_counter(10)
            .discriminator(0xabc)
            .build();
        assert_eq!(config.boundary_counter, 10);
        assert_eq!(config.discriminator, Some(0xabc));
    }
}
