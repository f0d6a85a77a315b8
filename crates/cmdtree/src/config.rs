//! Run configuration

/// Version shown when the embedding program does not set one
pub const DEFAULT_VERSION: &str = "<dev>";

/// Settings supplied by the embedding program for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    version: String,
    program_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            program_name: None,
        }
    }

    /// Version printed by `--version` and in the root's help
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Root display name. Overrides the name taken from `argv[0]`.
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.version(), "<dev>");
        assert_eq!(config.program_name(), None);
    }

    #[test]
    fn test_builder() {
        let config = Config::new().with_version("2.0.1").with_program_name("tool");
        assert_eq!(config.version(), "2.0.1");
        assert_eq!(config.program_name(), Some("tool"));
    }
}
