//! OAuth 2.0 authorization for Google APIs.
//!
//! The session manager obtains tokens through an [`Authorizer`]. Two flows
//! are provided:
//!
//! - [`LoopbackFlow`]: the Authorization Code flow with PKCE (Proof Key for
//!   Code Exchange), using a loopback redirect for desktop applications.
//! - [`DeviceFlow`](super::device::DeviceFlow): RFC 8628 device
//!   authorization, for machines without a usable browser.
//!
//! Both share the token endpoint for code exchange and refresh grants.
//!
//! # Loopback flow
//!
//! 1. Generate a cryptographic code verifier and its SHA-256 challenge
//! 2. Start a local HTTP server on a port from the configured range
//! 3. Build the authorization URL with the challenge
//! 4. Open the user's browser to Google's consent page
//! 5. User grants permission; Google redirects to our local server
//! 6. Extract the authorization code from the redirect
//! 7. Exchange the code (with verifier) for access and refresh tokens
//!
//! # Security
//!
//! - PKCE prevents authorization code interception attacks
//! - The loopback server only accepts connections from localhost
//! - State parameter prevents CSRF attacks

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::api::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub(crate) const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes

/// Obtains and renews tokens for a set of client credentials.
pub trait Authorizer: Send + Sync {
    /// Runs the interactive flow and returns a fresh token.
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Renews an expired token with its refresh token, without the user.
    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        token: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;
}

impl<A: Authorizer + ?Sized> Authorizer for Arc<A> {
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        (**self).authorize(credentials, scopes)
    }

    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        token: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        (**self).refresh(credentials, token)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for Box<A> {
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        (**self).authorize(credentials, scopes)
    }

    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        token: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        (**self).refresh(credentials, token)
    }
}

/// Client for Google's token endpoint.
#[derive(Debug, Clone)]
pub(crate) struct TokenEndpoint {
    http_client: reqwest::Client,
    url: String,
}

impl TokenEndpoint {
    pub(crate) fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Posts a form to the endpoint and returns the status and body.
    pub(crate) async fn post_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<(u16, String)> {
        let response = self
            .http_client
            .post(&self.url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", what, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        Ok((status.as_u16(), body))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        credentials: &OAuthCredentials,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let (status, body) = self.post_form(&params, "token exchange").await?;
        if !(200..300).contains(&status) {
            return Err(ProviderError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token = TokenResponse::parse(&body)?.into_token(scopes);
        info!("successfully obtained tokens");
        Ok(token)
    }

    /// Runs a refresh-token grant and returns the renewed token.
    pub(crate) async fn refresh(
        &self,
        credentials: &OAuthCredentials,
        token: &TokenInfo,
    ) -> ProviderResult<TokenInfo> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::authentication("no refresh token available"))?;

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let (status, body) = self.post_form(&params, "token refresh").await?;
        if !(200..300).contains(&status) {
            return Err(ProviderError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let response = TokenResponse::parse(&body)?;
        let mut renewed = token.clone();
        renewed.update_access_token(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        );

        info!("successfully refreshed access token");
        Ok(renewed)
    }
}

/// Authorization Code + PKCE flow with a loopback redirect.
#[derive(Debug)]
pub struct LoopbackFlow {
    endpoint: TokenEndpoint,
    port_range: (u16, u16),
}

impl LoopbackFlow {
    /// Creates the flow from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            endpoint: TokenEndpoint::new(http_client),
            port_range: config.loopback_port_range,
        })
    }

    /// Runs the browser flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No port is available in the configured range
    /// - The user denies authorization or never completes it
    /// - Token exchange fails
    async fn run(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url = pkce.build_auth_url(&credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            println!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) = wait_for_callback(listener)?;

        if received_state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens...");

        self.endpoint
            .exchange_code(credentials, &code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }
}

impl Authorizer for LoopbackFlow {
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

/// Tries to bind a TCP listener on an available port in the given range.
fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Waits for the OAuth callback and extracts the authorization code and state.
fn wait_for_callback(listener: TcpListener) -> ProviderResult<(String, String)> {
    listener
        .set_nonblocking(false)
        .map_err(|e| ProviderError::internal(format!("failed to set blocking: {}", e)))?;

    let (tx, rx) = mpsc::channel();

    // Accept on a separate thread so the wait can time out.
    let _handle = thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(ProviderError::authentication("OAuth callback timeout"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback channel disconnected"))
        }
    }
}

/// Answers one request on the callback server.
///
/// Returns `None` for requests that are not the OAuth redirect (favicon
/// fetches and the like), so the server keeps listening.
fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
    let mut request_line = String::new();
    if BufReader::new(&stream).read_line(&mut request_line).is_err() {
        return None;
    }

    let result = parse_callback(&request_line)?;

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Parses the request line of the OAuth redirect:
/// `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<(String, String)>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let path = parts.next()?;
    if !path.starts_with("/callback") {
        return None;
    }

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or_default();

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(value).unwrap_or_default().into_owned();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    match code {
        Some(code) => Some(Ok((code, state.unwrap_or_default()))),
        None => Some(Err(ProviderError::authentication(
            "missing authorization code in callback",
        ))),
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_token(16);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the Google OAuth authorization URL.
    ///
    /// `access_type=offline` and `prompt=consent` make Google issue a refresh
    /// token every time, so expired tokens can be renewed later.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Successful response from Google's token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub(crate) fn parse(body: &str) -> ProviderResult<Self> {
        serde_json::from_str(body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }

    /// Builds a token, preferring the granted scopes over the requested ones.
    pub(crate) fn into_token(self, requested: &[String]) -> TokenInfo {
        let scopes = match self.scope.as_deref() {
            Some(granted) if !granted.trim().is_empty() => {
                granted.split_whitespace().map(String::from).collect()
            }
            _ => requested.to_vec(),
        };
        TokenInfo::new(
            self.access_token,
            self.refresh_token,
            self.expires_in,
            scopes,
        )
    }
}
