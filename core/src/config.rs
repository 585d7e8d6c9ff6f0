//! Client configuration.
//!
//! TLS certificate verification is on unless explicitly disabled with
//! `danger_skip_tls_verify` or `SSHCX_INSECURE`.

use std::env;
use std::time::Duration;

use crate::error::ApiError;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.ssh.cx/v1/";

/// Upper bound for a single round trip unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub verify_tls: bool,
    /// `None` disables the timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_tls: true,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `SSHCX_BASE_URL`, `SSHCX_INSECURE` and
    /// `SSHCX_TIMEOUT_SECS` (`0` disables the timeout).
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("SSHCX_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(base_url.trim());
        }

        if let Some(raw) = lookup("SSHCX_INSECURE") {
            if parse_flag(&raw)? {
                config = config.danger_skip_tls_verify();
            }
        }

        if let Some(raw) = lookup("SSHCX_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("SSHCX_TIMEOUT_SECS must be a whole number, got {raw:?}"))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept any server certificate. Only for self-signed test deployments.
    pub fn danger_skip_tls_verify(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

fn parse_flag(raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(ApiError::Config(format!("SSHCX_INSECURE: unrecognized value {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_verify_tls() {
        let config = ClientConfig::default();
        assert!(config.verify_tls);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SSHCX_BASE_URL", "http://127.0.0.1:3000/v1/"),
            ("SSHCX_INSECURE", "yes"),
            ("SSHCX_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:3000/v1/");
        assert!(!config.verify_tls);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = ClientConfig::from_lookup(lookup(&[("SSHCX_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("SSHCX_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[("SSHCX_INSECURE", "maybe")])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn insecure_flag_off_values_keep_verification() {
        let config = ClientConfig::from_lookup(lookup(&[("SSHCX_INSECURE", "0")])).unwrap();
        assert!(config.verify_tls);
    }
}
