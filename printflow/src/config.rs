//! Operation configuration

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_JOB_NAME: &str = "document";

/// Per-operation behaviour
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | PRINTFLOW_JOB_NAME | document | Job name shown by the spooler |
/// | PRINTFLOW_REQUIRE_PRINTER | false | Missing printer is an error instead of a cancel |
/// | PRINTFLOW_WAIT | true | Wait for the backend to finish sending |
/// | PRINTFLOW_DISCOVERY_TIMEOUT_MS | unset | Stop waiting on slow backends |
/// | PRINTFLOW_PREVIEW_DIR | system temp dir | Where preview documents are written |
#[derive(Debug, Clone, PartialEq)]
pub struct OperationConfig {
    pub job_name: String,
    /// No printer ends in an error rather than a cancellation
    pub require_printer: bool,
    /// Block the operation until the send completed
    pub wait_for_completion: bool,
    /// `None` waits for every backend to finish listing
    pub discovery_timeout: Option<Duration>,
    pub preview_dir: Option<PathBuf>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.into(),
            require_printer: false,
            wait_for_completion: true,
            discovery_timeout: None,
            preview_dir: None,
        }
    }
}

impl OperationConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            job_name: lookup("PRINTFLOW_JOB_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.job_name),
            require_printer: lookup("PRINTFLOW_REQUIRE_PRINTER")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.require_printer),
            wait_for_completion: lookup("PRINTFLOW_WAIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.wait_for_completion),
            discovery_timeout: lookup("PRINTFLOW_DISCOVERY_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            preview_dir: lookup("PRINTFLOW_PREVIEW_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    pub fn with_require_printer(mut self, require: bool) -> Self {
        self.require_printer = require;
        self
    }

    pub fn with_wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = OperationConfig::from_lookup(lookup(&[]));
        assert_eq!(config, OperationConfig::default());
        assert!(config.wait_for_completion);
        assert!(config.discovery_timeout.is_none());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = OperationConfig::from_lookup(lookup(&[
            ("PRINTFLOW_JOB_NAME", "invoice"),
            ("PRINTFLOW_REQUIRE_PRINTER", "true"),
            ("PRINTFLOW_WAIT", "false"),
            ("PRINTFLOW_DISCOVERY_TIMEOUT_MS", "250"),
            ("PRINTFLOW_PREVIEW_DIR", "/var/tmp/previews"),
        ]));
        assert_eq!(config.job_name, "invoice");
        assert!(config.require_printer);
        assert!(!config.wait_for_completion);
        assert_eq!(config.discovery_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.preview_dir, Some(PathBuf::from("/var/tmp/previews")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = OperationConfig::from_lookup(lookup(&[
            ("PRINTFLOW_WAIT", "sometimes"),
            ("PRINTFLOW_DISCOVERY_TIMEOUT_MS", "soon"),
            ("PRINTFLOW_JOB_NAME", "  "),
        ]));
        assert!(config.wait_for_completion);
        assert!(config.discovery_timeout.is_none());
        assert_eq!(config.job_name, "document");
    }
}
