//! HTTP transport settings shared by the chat and infill clients.

use std::time::Duration;

use qogito_core::error::ProviderError;

/// How HTTP clients are built. Certificate validation is a per-client
/// setting, never a process-wide toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Accept self-signed or otherwise invalid TLS certificates.
    pub allow_self_signed: bool,

    /// Longest silence allowed between reads. A generation may stream for
    /// as long as the server keeps sending.
    pub read_timeout: Duration,

    pub connect_timeout: Duration,

    /// Total time allowed for the `/v1/models` and `/props` lookups.
    pub discovery_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            allow_self_signed: false,
            read_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            discovery_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .read_timeout(self.read_timeout)
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(self.allow_self_signed)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

/// Strip trailing slashes from a user-supplied base URL.
pub(crate) fn trim_base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Map a reqwest failure, keeping timeouts and connection errors apart from
/// protocol problems.
pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    // A timed-out body read also reports itself as a decode error.
    if e.is_timeout() {
        ProviderError::Network(format!("timed out: {e}"))
    } else if e.is_decode() {
        ProviderError::Protocol(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates_certificates() {
        let config = TransportConfig::default();
        assert!(!config.allow_self_signed);
        assert_eq!(config.read_timeout, Duration::from_secs(300));
        assert!(config.discovery_timeout < config.read_timeout);
    }

    #[test]
    fn builds_with_self_signed_allowed() {
        let config = TransportConfig {
            allow_self_signed: true,
            ..Default::default()
        };
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn trims_trailing_slashes() {
        assert_eq!(trim_base_url("http://host:8080///"), "http://host:8080");
        assert_eq!(trim_base_url("http://host"), "http://host");
    }
}
