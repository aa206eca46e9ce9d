use autorec_core::config::AuthConfig;
use autorec_core::errors::InterfaceError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;
use uuid::Uuid;

use crate::api::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret check for the recommendation routes.
#[derive(Clone, Debug)]
pub struct ApiKeyGate {
    enabled: bool,
    api_key: Option<SecretString>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    NotConfigured,
    Rejected,
}

impl ApiKeyGate {
    pub fn from_config(config: &AuthConfig) -> Self {
        let api_key = config
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .cloned();
        Self { enabled: config.enabled, api_key }
    }

    pub fn check(&self, provided: Option<&str>) -> GateDecision {
        if !self.enabled {
            return GateDecision::Allow;
        }
        let Some(expected) = &self.api_key else {
            return GateDecision::NotConfigured;
        };
        let expected = expected.expose_secret().as_bytes();
        match provided {
            Some(provided) if constant_time_eq(provided.as_bytes(), expected) => GateDecision::Allow,
            _ => GateDecision::Rejected,
        }
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

pub async fn require_api_key(
    State(gate): State<ApiKeyGate>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request.headers().get(API_KEY_HEADER).and_then(|value| value.to_str().ok());
    let key_present = provided.is_some();

    match gate.check(provided) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::NotConfigured => {
            let correlation_id = Uuid::new_v4().to_string();
            warn!(
                event_name = "http.auth.not_configured",
                correlation_id = %correlation_id,
                path = %request.uri().path(),
                "auth is enabled but no API key is configured"
            );
            ApiError::from(
                InterfaceError::Internal {
                    message: "API key is not configured on the server".to_owned(),
                    correlation_id: String::new(),
                }
                .with_correlation_id(correlation_id),
            )
            .into_response()
        }
        GateDecision::Rejected => {
            let correlation_id = Uuid::new_v4().to_string();
            warn!(
                event_name = "http.auth.rejected",
                correlation_id = %correlation_id,
                path = %request.uri().path(),
                key_present = key_present,
                "request rejected by API key gate"
            );
            ApiError::from(
                InterfaceError::Unauthorized {
                    message: "Invalid or missing API key".to_owned(),
                    correlation_id: String::new(),
                }
                .with_correlation_id(correlation_id),
            )
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use autorec_core::config::AuthConfig;

    use super::{ApiKeyGate, GateDecision};

    fn gate(enabled: bool, key: Option<&str>) -> ApiKeyGate {
        ApiKeyGate::from_config(&AuthConfig {
            enabled,
            api_key: key.map(|key| key.to_owned().into()),
        })
    }

    #[test]
    fn disabled_gate_allows_everything() {
        assert_eq!(gate(false, None).check(None), GateDecision::Allow);
        assert_eq!(gate(false, Some("secret")).check(Some("anything")), GateDecision::Allow);
    }

    #[test]
    fn enabled_gate_without_key_is_not_configured() {
        assert_eq!(gate(true, None).check(Some("secret")), GateDecision::NotConfigured);
        assert_eq!(gate(true, Some("  ")).check(Some("  ")), GateDecision::NotConfigured);
    }

    #[test]
    fn enabled_gate_compares_the_header() {
        let gate = gate(true, Some("secret"));

        assert_eq!(gate.check(Some("secret")), GateDecision::Allow);
        assert_eq!(gate.check(Some("secreT")), GateDecision::Rejected);
        assert_eq!(gate.check(Some("secret-longer")), GateDecision::Rejected);
        assert_eq!(gate.check(None), GateDecision::Rejected);
    }
}
