//! Session manager: turns stored credentials into an authenticated client.
//!
//! On every run the manager
//!
//! 1. loads the client credentials, bootstrapping them from the configured
//!    [`CredentialSource`]s on first run (a new client always gets a new
//!    token),
//! 2. loads the stored token and checks it is usable,
//! 3. renews an expired token with its refresh token when allowed,
//! 4. otherwise runs the interactive [`Authorizer`] and stores the result.
//!
//! A token that is invalid or expired is never handed to the API.

use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::client::GoogleCalendarClient;
use super::config::{GoogleConfig, OAuthCredentials};
use super::credentials::{CredentialSource, first_available};
use super::oauth::Authorizer;
use super::store::CredentialStore;
use super::tokens::TokenInfo;

/// How the session's token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// The stored token was still usable.
    Stored,
    /// The stored token was renewed with its refresh token.
    Refreshed,
    /// The user went through the interactive flow.
    Authorized,
}

/// A usable token and where it came from.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: TokenInfo,
    pub origin: TokenOrigin,
}

/// Knobs for [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Scopes requested from the interactive flow.
    pub scopes: Vec<String>,
    /// Renew expired tokens with the refresh token before asking the user.
    pub refresh_expired: bool,
    /// Ignore the stored token and always run the interactive flow.
    pub force: bool,
}

impl SessionOptions {
    /// Options derived from the provider configuration.
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self {
            scopes: config.scopes.clone(),
            refresh_expired: config.refresh_expired,
            force: false,
        }
    }

    /// Builder method to set the force flag.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&GoogleConfig::default())
    }
}

type Notices = Box<dyn Fn(&str) + Send + Sync>;

/// Owns the credential store and the authorization flow.
pub struct SessionManager {
    store: Box<dyn CredentialStore>,
    sources: Vec<Box<dyn CredentialSource>>,
    authorizer: Box<dyn Authorizer>,
    options: SessionOptions,
    notices: Notices,
}

impl SessionManager {
    /// Creates a manager with no credential sources.
    ///
    /// Status lines meant for the user are printed to stdout unless
    /// [`with_notices`](Self::with_notices) redirects them.
    pub fn new(
        store: impl CredentialStore + 'static,
        authorizer: impl Authorizer + 'static,
        options: SessionOptions,
    ) -> Self {
        Self {
            store: Box::new(store),
            sources: Vec::new(),
            authorizer: Box::new(authorizer),
            options,
            notices: Box::new(|line| println!("{}", line)),
        }
    }

    /// Appends a credential source to the bootstrap chain.
    pub fn with_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Redirects user-facing status lines.
    pub fn with_notices(mut self, notices: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notices = Box::new(notices);
        self
    }

    fn notice(&self, line: &str) {
        (self.notices)(line);
    }

    /// Returns a usable token, running whatever flow is needed.
    ///
    /// # Errors
    ///
    /// - configuration error when no client credentials are stored and no
    ///   source supplies them
    /// - authentication error when the interactive flow fails
    /// - storage error when a record cannot be read or written
    pub async fn authenticate(&self) -> ProviderResult<Session> {
        let (credentials, fresh_client) = self.client_credentials()?;

        if !fresh_client && !self.options.force {
            if let Some(session) = self.reuse_stored_token(&credentials).await? {
                return Ok(session);
            }
        } else if self.options.force {
            debug!("forced re-authorization");
        }

        self.notice("");
        self.notice("Authentication required.");

        let token = self
            .authorizer
            .authorize(&credentials, &self.options.scopes)
            .await
            .map_err(|e| {
                ProviderError::authentication(format!("authorization failed: {}", e.message()))
                    .with_source(e)
            })?;

        if !token.is_usable() {
            return Err(ProviderError::authentication(
                "authorization did not yield a valid token",
            ));
        }

        self.store.save_token(&token)?;
        self.notice("Authentication token saved.");

        Ok(Session {
            token,
            origin: TokenOrigin::Authorized,
        })
    }

    /// Authenticates and returns a calendar client bound to the token.
    pub async fn authenticated_client(
        &self,
        config: &GoogleConfig,
    ) -> ProviderResult<GoogleCalendarClient> {
        let session = self.authenticate().await?;
        GoogleCalendarClient::new(session.token.access_token, config)
    }

    /// Marks the stored token as rejected so the next run re-authorizes.
    pub fn invalidate_token(&self) -> ProviderResult<()> {
        let Some(mut token) = self.load_token() else {
            return Ok(());
        };
        token.invalidate();
        self.store.save_token(&token)?;
        info!("stored token marked invalid");
        Ok(())
    }

    /// Loads the client credentials, bootstrapping them when absent.
    ///
    /// The flag is true when the credentials were just created.
    fn client_credentials(&self) -> ProviderResult<(OAuthCredentials, bool)> {
        if let Some(credentials) = self.store.load_client_credentials()? {
            return Ok((credentials, false));
        }

        debug!("no stored client credentials");
        let credentials = first_available(&self.sources)?.ok_or_else(|| {
            ProviderError::configuration("no client credentials were provided")
        })?;

        if let Err(problem) = credentials.validate() {
            warn!("client credentials look unusual: {}", problem);
        }

        self.store.save_client_credentials(&credentials)?;
        self.notice("Client credentials saved.");
        Ok((credentials, true))
    }

    /// The stored token, if readable. An unreadable token is as good as none.
    fn load_token(&self) -> Option<TokenInfo> {
        match self.store.load_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("ignoring unreadable token: {}", e);
                None
            }
        }
    }

    async fn reuse_stored_token(
        &self,
        credentials: &OAuthCredentials,
    ) -> ProviderResult<Option<Session>> {
        let Some(token) = self.load_token() else {
            debug!("no stored token");
            return Ok(None);
        };

        if !token.scopes.is_empty() && !token.has_scopes(&self.options.scopes) {
            debug!("stored token lacks required scopes");
            return Ok(None);
        }

        if token.is_usable() {
            debug!("reusing stored token");
            return Ok(Some(Session {
                token,
                origin: TokenOrigin::Stored,
            }));
        }

        if !token.valid {
            debug!("stored token was rejected earlier");
            return Ok(None);
        }

        if !self.options.refresh_expired || !token.can_refresh() {
            debug!("stored token expired");
            return Ok(None);
        }

        match self.authorizer.refresh(credentials, &token).await {
            Ok(renewed) if renewed.is_usable() => {
                self.store.save_token(&renewed)?;
                Ok(Some(Session {
                    token: renewed,
                    origin: TokenOrigin::Refreshed,
                }))
            }
            Ok(_) => {
                warn!("refresh returned an unusable token");
                Ok(None)
            }
            Err(e) => {
                warn!("token refresh failed: {}", e);
                Ok(None)
            }
        }
    }
}
