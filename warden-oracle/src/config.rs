//! Configuration for the policy oracle client.

use std::time::Duration;

use hyper::Uri;

use crate::error::{OracleError, OracleResult};

/// Configuration for [`OracleClient`](crate::OracleClient).
#[derive(Clone, Debug)]
pub struct OracleConfig {
    base_url: String,
    policy_path: String,
    health_path: String,
    timeout: Duration,
}

impl OracleConfig {
    /// Creates a configuration targeting the supplied oracle base URL.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Configuration`] if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> OracleResult<Self> {
        let base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(Self {
            base_url,
            policy_path: "v1/data/gateway/authz/allow".to_owned(),
            health_path: "health".to_owned(),
            timeout: Duration::from_secs(5),
        })
    }

    /// Overrides the policy document path queried for decisions.
    #[must_use]
    pub fn with_policy_path(mut self, path: impl AsRef<str>) -> Self {
        self.policy_path = path.as_ref().trim_start_matches('/').to_owned();
        self
    }

    /// Overrides the path probed by health checks.
    #[must_use]
    pub fn with_health_path(mut self, path: impl AsRef<str>) -> Self {
        self.health_path = path.as_ref().trim_start_matches('/').to_owned();
        self
    }

    /// Sets the bounded timeout applied to every oracle call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the sanitized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn decision_endpoint(&self) -> OracleResult<Uri> {
        parse_endpoint(&self.base_url, &self.policy_path)
    }

    pub(crate) fn health_endpoint(&self) -> OracleResult<Uri> {
        parse_endpoint(&self.base_url, &self.health_path)
    }
}

fn parse_endpoint(base: &str, path: &str) -> OracleResult<Uri> {
    format!("{base}{path}")
        .parse::<Uri>()
        .map_err(|err| OracleError::configuration(format!("invalid oracle endpoint: {err}")))
}

fn sanitize_base_url(input: &str) -> OracleResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(OracleError::configuration(
            "oracle base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| OracleError::configuration(format!("invalid oracle base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = OracleConfig::new("localhost:8181").expect_err("missing scheme should error");
        assert!(matches!(err, OracleError::Configuration { .. }));
    }

    #[test]
    fn sanitize_adds_trailing_slash() {
        let config = OracleConfig::new("http://localhost:8181").expect("valid url");
        assert_eq!(config.base_url(), "http://localhost:8181/");
    }

    #[test]
    fn endpoint_joins_path_without_double_slash() {
        let config = OracleConfig::new("http://localhost:8181/")
            .unwrap()
            .with_policy_path("/v1/data/custom/allow");

        let endpoint = config.decision_endpoint().unwrap();
        assert_eq!(
            endpoint.to_string(),
            "http://localhost:8181/v1/data/custom/allow"
        );
    }
}
