//! OAuth 2.0 device authorization grant (RFC 8628).
//!
//! The user is shown a verification URL and a short code to enter on any
//! device with a browser while this process polls the token endpoint.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::{Authorizer, TokenEndpoint, TokenResponse};
use super::tokens::TokenInfo;

const GOOGLE_DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Polling interval when the server does not suggest one.
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Added to the interval on every `slow_down` answer.
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Response from the device authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    /// RFC 8628 name; Google sends `verification_url`.
    #[serde(alias = "verification_url")]
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// What one poll of the token endpoint means for the flow.
#[derive(Debug)]
enum PollOutcome {
    Granted(TokenResponse),
    Pending,
    SlowDown,
    Failed(ProviderError),
}

fn classify_poll(status: u16, body: &str) -> PollOutcome {
    if (200..300).contains(&status) {
        return match TokenResponse::parse(body) {
            Ok(response) => PollOutcome::Granted(response),
            Err(e) => PollOutcome::Failed(e),
        };
    }

    let Ok(error) = serde_json::from_str::<ErrorResponse>(body) else {
        return PollOutcome::Failed(ProviderError::from_status(status, body));
    };

    match error.error.as_str() {
        "authorization_pending" => PollOutcome::Pending,
        "slow_down" => PollOutcome::SlowDown,
        "access_denied" => PollOutcome::Failed(ProviderError::authentication(
            "authorization was denied by the user",
        )),
        "expired_token" => PollOutcome::Failed(ProviderError::authentication(
            "device code expired before authorization completed",
        )),
        other => PollOutcome::Failed(ProviderError::authentication(format!(
            "device authorization failed: {}{}",
            other,
            error
                .error_description
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        ))),
    }
}

/// Device authorization flow.
#[derive(Debug)]
pub struct DeviceFlow {
    http_client: reqwest::Client,
    endpoint: TokenEndpoint,
}

impl DeviceFlow {
    /// Creates the flow from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            endpoint: TokenEndpoint::new(http_client.clone()),
            http_client,
        })
    }

    async fn request_device_code(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
    ) -> ProviderResult<DeviceCodeResponse> {
        let scope = scopes.join(" ");
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(GOOGLE_DEVICE_CODE_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("device code request failed: {}", e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "device code request failed ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid device code response: {}", e))
        })
    }

    async fn run(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let device = self.request_device_code(credentials, scopes).await?;

        println!(
            "To authorize, visit {} and enter the code: {}",
            device.verification_uri, device.user_code
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_INTERVAL_SECS));

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("device_code", device.device_code.as_str()),
            ("grant_type", DEVICE_GRANT_TYPE),
        ];

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(ProviderError::authentication(
                    "device code expired before authorization completed",
                ));
            }

            let (status, body) = self.endpoint.post_form(&params, "device token").await?;
            match classify_poll(status, &body) {
                PollOutcome::Granted(response) => {
                    info!("device authorization granted");
                    return Ok(response.into_token(scopes));
                }
                PollOutcome::Pending => debug!("authorization pending"),
                PollOutcome::SlowDown => {
                    interval += Duration::from_secs(SLOW_DOWN_STEP_SECS);
                    debug!("server asked to slow down, polling every {:?}", interval);
                }
                PollOutcome::Failed(e) => return Err(e),
            }
        }
    }
}

impl Authorizer for DeviceFlow {
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.run(credentials, scopes))
    }

    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        token: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.endpoint.refresh(credentials, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_device_code_response() {
        let body = r#"{
            "device_code": "AH-1Ng",
            "user_code": "GQVQ-JKEC",
            "verification_url": "https://www.google.com/device",
            "expires_in": 1800,
            "interval": 5
        }"#;
        let device: DeviceCodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(device.verification_uri, "https://www.google.com/device");
        assert_eq!(device.user_code, "GQVQ-JKEC");
        assert_eq!(device.interval, Some(5));
    }

    #[test]
    fn rfc_device_code_response_without_interval() {
        let body = r#"{
            "device_code": "d",
            "user_code": "u",
            "verification_uri": "https://example.com/device",
            "expires_in": 600
        }"#;
        let device: DeviceCodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(device.verification_uri, "https://example.com/device");
        assert!(device.interval.is_none());
    }

    #[test]
    fn poll_granted() {
        let outcome = classify_poll(200, r#"{"access_token": "a", "expires_in": 3599}"#);
        assert!(matches!(outcome, PollOutcome::Granted(r) if r.access_token == "a"));
    }

    #[test]
    fn poll_pending_and_slow_down() {
        assert!(matches!(
            classify_poll(428, r#"{"error": "authorization_pending"}"#),
            PollOutcome::Pending
        ));
        assert!(matches!(
            classify_poll(403, r#"{"error": "slow_down"}"#),
            PollOutcome::SlowDown
        ));
    }

    #[test]
    fn poll_terminal_errors() {
        for error in ["access_denied", "expired_token", "invalid_client"] {
            let body = format!(r#"{{"error": "{}"}}"#, error);
            match classify_poll(400, &body) {
                PollOutcome::Failed(e) => assert!(e.is_authentication(), "{}", error),
                other => panic!("unexpected outcome for {}: {:?}", error, other),
            }
        }
    }

    #[test]
    fn poll_error_description_is_kept() {
        let body = r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#;
        let PollOutcome::Failed(e) = classify_poll(400, body) else {
            panic!("expected failure");
        };
        assert!(e.message().contains("invalid_grant (Bad Request)"));
    }

    #[test]
    fn poll_unparseable_error_maps_status() {
        let PollOutcome::Failed(e) = classify_poll(503, "<html>unavailable</html>") else {
            panic!("expected failure");
        };
        assert_eq!(e.code(), crate::ProviderErrorCode::ServerError);
    }
}
