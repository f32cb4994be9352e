//! Host configuration.

use std::time::Duration;

use crate::hir::BuildOptions;

/// Default delay between the last edit and re-analysis.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// File extensions the workspace loader picks up by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["services", "operation", "data"];

/// Settings fixed at [`AnalysisHost`](super::AnalysisHost) construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// Quiet period after an edit before it is analyzed.
    pub debounce: Duration,
    /// Emit naming-convention warnings.
    pub naming_lints: bool,
    /// Capacity of the diagnostics event channel. Slow subscribers lag.
    pub event_capacity: usize,
    /// Extensions (without the dot) loaded from a workspace directory.
    pub extensions: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            naming_lints: true,
            event_capacity: 256,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_naming_lints(mut self, enabled: bool) -> Self {
        self.naming_lints = enabled;
        self
    }

    /// Clamped to at least 1; tokio's broadcast channel rejects 0.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            naming_lints: self.naming_lints,
        }
    }

    /// Whether `extension` (without the dot) is one the loader picks up.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert!(config.naming_lints);
        assert!(config.accepts_extension("services"));
        assert!(config.accepts_extension("data"));
        assert!(!config.accepts_extension("txt"));
    }

    #[test]
    fn test_builders() {
        let config = HostConfig::new()
            .with_debounce(Duration::ZERO)
            .with_naming_lints(false)
            .with_event_capacity(0)
            .with_extensions(["svc"]);
        assert_eq!(config.debounce, Duration::ZERO);
        assert!(!config.build_options().naming_lints);
        assert_eq!(config.event_capacity, 1);
        assert!(config.accepts_extension("svc"));
        assert!(!config.accepts_extension("services"));
    }
}
