//! OAuth token model.
//!
//! A [`TokenInfo`] is the access/refresh token pair the session manager
//! persists between runs, together with its expiry and a validity flag.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Safety margin subtracted from the provider's `expires_in`.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Information about an OAuth token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Cleared when the provider rejects the access token.
    #[serde(default = "default_valid")]
    pub valid: bool,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last issued or refreshed.
    pub last_refresh: DateTime<Utc>,
}

fn default_valid() -> bool {
    true
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            valid: true,
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // Tokens without an expiry are taken at face value.
            None => false,
        }
    }

    /// Returns true if the token may be offered to the API.
    pub fn is_usable(&self) -> bool {
        self.valid && !self.access_token.is_empty() && !self.is_expired()
    }

    /// Returns true if an expired token can be renewed without the user.
    pub fn can_refresh(&self) -> bool {
        self.valid && self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if the token has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Updates the access token after a refresh.
    ///
    /// Google normally omits the refresh token from refresh responses; the
    /// existing one is kept in that case.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        if let Some(refresh_token) = refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.expires_at = expiry_from(expires_in_secs);
        self.valid = true;
        self.last_refresh = Utc::now();
    }

    /// Marks the token as rejected by the provider.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}
