//! Client configuration.
//!
//! Everything except the credential lives here. Values come from code or,
//! through `from_env`, from `FORMSTACK_*` environment variables.

use std::time::Duration;

/// Production Formstack v2 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.formstack.com/api/v2/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Non-2xx responses become `ApiError::RequestFailed` when set; otherwise
    /// they are reported as a `Diagnostic` next to the body.
    pub strict: bool,
    /// Whole-request deadline applied by `UreqTransport`. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            strict: true,
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `FORMSTACK_API_URL`, `FORMSTACK_STRICT` and
    /// `FORMSTACK_TIMEOUT_SECS`; unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("FORMSTACK_API_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(strict) = lookup("FORMSTACK_STRICT") {
            config.strict = !matches!(strict.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(secs) = lookup("FORMSTACK_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            config.timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}
