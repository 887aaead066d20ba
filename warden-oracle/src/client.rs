//! HTTP client for the remote policy oracle.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, warn};

use warden_primitives::{AuthorizationDecision, AuthorizationInput};

use crate::config::OracleConfig;
use crate::error::{OracleError, OracleResult};

type Transport = Client<HttpsConnector<HttpConnector>, Body>;

/// Reason attached when the oracle result omits an explicit verdict.
const DEFAULT_REASON: &str = "policy evaluation completed";

/// Seam between the engine and the remote oracle.
///
/// `query` surfaces transport and response errors so the engine can keep
/// error-path decisions out of the cache; `evaluate` is the infallible
/// wrapper that collapses every failure into a fail-closed deny.
#[async_trait]
pub trait PolicyOracle: Send + Sync {
    /// Evaluates the input against the remote oracle.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on any transport, timeout, or response fault.
    async fn query(&self, input: &AuthorizationInput) -> OracleResult<AuthorizationDecision>;

    /// Lightweight reachability probe; every failure is reported as `false`.
    async fn health_check(&self) -> bool;

    /// Evaluates the input, converting every error into a deny decision with
    /// a zero cache TTL. This method never fails.
    async fn evaluate(&self, input: &AuthorizationInput) -> AuthorizationDecision {
        match self.query(input).await {
            Ok(decision) => decision,
            Err(err) => {
                warn!(error = %err, action = %input.action(), "oracle evaluation failed; denying");
                AuthorizationDecision::fail_closed(format!("policy evaluation failed: {err}"))
            }
        }
    }
}

/// HTTP implementation of [`PolicyOracle`] speaking the OPA data API.
pub struct OracleClient {
    client: Transport,
    decision_endpoint: Uri,
    health_endpoint: Uri,
    timeout: Duration,
}

impl fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleClient")
            .field("decision_endpoint", &self.decision_endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OracleClient {
    /// Constructs a new client from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Configuration`] if an endpoint is invalid.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        let decision_endpoint = config.decision_endpoint()?;
        let health_endpoint = config.health_endpoint()?;

        Ok(Self {
            client: Self::build_transport(),
            decision_endpoint,
            health_endpoint,
            timeout: config.timeout(),
        })
    }

    // Plain-http endpoints are allowed so a sidecar oracle on localhost works
    // without certificates; anything remote should be https.
    fn build_transport() -> Transport {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Client::builder().build(connector)
    }

    async fn post_decision(&self, input: &AuthorizationInput) -> OracleResult<RawResult> {
        let body = serde_json::to_vec(&Envelope { input })
            .map_err(|err| OracleError::response(format!("failed to encode oracle input: {err}")))?;

        let request = Request::post(self.decision_endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| OracleError::transport(format!("failed to build oracle request: {err}")))?;

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| OracleError::Timeout {
                timeout: self.timeout,
            })?
            .map_err(|err| OracleError::transport(format!("oracle request failed: {err}")))?;

        let status = response.status();
        let bytes = to_bytes(response.into_body())
            .await
            .map_err(|err| OracleError::transport(format!("failed to read oracle response: {err}")))?;

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes).to_string();
            return Err(OracleError::response(format!(
                "oracle returned {status}: {reason}"
            )));
        }

        let envelope: ResultEnvelope = serde_json::from_slice(&bytes)
            .map_err(|err| OracleError::response(format!("failed to decode oracle response: {err}")))?;

        // An absent result document means the policy produced no verdict.
        Ok(envelope.result.unwrap_or_default())
    }
}

#[async_trait]
impl PolicyOracle for OracleClient {
    async fn query(&self, input: &AuthorizationInput) -> OracleResult<AuthorizationDecision> {
        let raw = self.post_decision(input).await?;
        let decision = raw.into_decision();
        debug!(
            allow = decision.is_allowed(),
            principal = input.principal().id(),
            action = %input.action(),
            "oracle evaluated"
        );
        Ok(decision)
    }

    async fn health_check(&self) -> bool {
        let request = match Request::get(self.health_endpoint.clone()).body(Body::empty()) {
            Ok(request) => request,
            Err(_) => return false,
        };

        match timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(err)) => {
                warn!(error = %err, "oracle health check failed");
                false
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "oracle health check timed out");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    input: &'a AuthorizationInput,
}

#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    result: Option<RawResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResult {
    #[serde(default)]
    allow: Option<bool>,
    #[serde(default)]
    audit_reason: Option<String>,
    #[serde(default)]
    filtered_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    audit_id: Option<String>,
}

impl RawResult {
    fn into_decision(self) -> AuthorizationDecision {
        // Missing `allow` is a deny, never an implicit allow.
        let allow = self.allow.unwrap_or(false);
        let reason = self.audit_reason.unwrap_or_else(|| DEFAULT_REASON.to_owned());

        let mut decision = if allow {
            AuthorizationDecision::allow(reason)
        } else {
            AuthorizationDecision::deny(reason)
        };

        if let Some(parameters) = self.filtered_parameters {
            decision = decision.with_filtered_parameters(parameters);
        }
        if let Some(audit_id) = self.audit_id {
            decision = decision.with_audit_id(audit_id);
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_primitives::{Action, Principal};

    fn input() -> AuthorizationInput {
        let principal = Principal::new("user-123", "user@example.com", "developer").unwrap();
        AuthorizationInput::new(principal, Action::ServerList)
    }

    #[test]
    fn missing_result_denies() {
        let envelope: ResultEnvelope = serde_json::from_str("{}").unwrap();
        let decision = envelope.result.unwrap_or_default().into_decision();
        assert!(!decision.is_allowed());
        assert_eq!(decision.reason(), DEFAULT_REASON);
    }

    #[test]
    fn missing_allow_key_denies() {
        let envelope: ResultEnvelope =
            serde_json::from_str(r#"{"result": {"audit_reason": "no verdict"}}"#).unwrap();
        let decision = envelope.result.unwrap_or_default().into_decision();
        assert!(!decision.is_allowed());
        assert_eq!(decision.reason(), "no verdict");
    }

    #[test]
    fn full_result_parses() {
        let body = r#"{
            "result": {
                "allow": true,
                "audit_reason": "role permits invocation",
                "filtered_parameters": {"query": "[redacted]"},
                "audit_id": "audit-42"
            }
        }"#;

        let envelope: ResultEnvelope = serde_json::from_str(body).unwrap();
        let decision = envelope.result.unwrap_or_default().into_decision();
        assert!(decision.is_allowed());
        assert_eq!(decision.audit_id(), Some("audit-42"));
        assert!(decision.filtered_parameters().is_some());
    }

    #[tokio::test]
    async fn evaluate_converts_errors_to_fail_closed() {
        struct FailingOracle;

        #[async_trait]
        impl PolicyOracle for FailingOracle {
            async fn query(
                &self,
                _input: &AuthorizationInput,
            ) -> OracleResult<AuthorizationDecision> {
                Err(OracleError::transport("connection refused"))
            }

            async fn health_check(&self) -> bool {
                false
            }
        }

        let decision = FailingOracle.evaluate(&input()).await;
        assert!(!decision.is_allowed());
        assert_eq!(decision.cache_ttl(), 0);
        assert!(decision.reason().contains("policy evaluation failed"));
    }

    #[test]
    fn envelope_wraps_input() {
        let json = serde_json::to_value(Envelope { input: &input() }).unwrap();
        assert!(json.get("input").is_some());
        assert_eq!(json["input"]["action"], "gateway:server:list");
    }
}
