//! Sources of OAuth client credentials for first-run bootstrap.
//!
//! When the store holds no client credentials the session manager asks each
//! [`CredentialSource`] in turn. The client crate adds an interactive prompt
//! at the end of the chain.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;

/// Environment variable holding the OAuth client ID.
pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";

/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

/// Something that may be able to supply client credentials.
pub trait CredentialSource: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Returns credentials, `Ok(None)` when this source has nothing to offer.
    ///
    /// An error aborts the bootstrap; sources should only fail when the user
    /// clearly meant to use them (a configured file that cannot be read, a
    /// prompt that was cancelled).
    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>>;
}

/// Credentials known up front, for example from the configuration file.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    name: String,
    credentials: Option<OAuthCredentials>,
}

impl StaticCredentials {
    /// Wraps optional client id and secret values; both must be present.
    pub fn new(
        name: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        let credentials = match (client_id, client_secret) {
            (Some(id), Some(secret)) => Some(OAuthCredentials::new(id, secret)),
            _ => None,
        };
        Self {
            name: name.into(),
            credentials,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn name(&self) -> &str {
        &self.name
    }

    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>> {
        Ok(self.credentials.clone())
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`.
pub struct EnvCredentials {
    lookup: Lookup,
}

impl EnvCredentials {
    /// Reads from the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Reads through a custom lookup function.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredentials").finish_non_exhaustive()
    }
}

impl CredentialSource for EnvCredentials {
    fn name(&self) -> &str {
        "environment"
    }

    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>> {
        let id = (self.lookup)(CLIENT_ID_ENV).filter(|v| !v.trim().is_empty());
        let secret = (self.lookup)(CLIENT_SECRET_ENV).filter(|v| !v.trim().is_empty());
        match (id, secret) {
            (Some(id), Some(secret)) => Ok(Some(OAuthCredentials::new(id, secret))),
            _ => Ok(None),
        }
    }
}

/// A client secret JSON file downloaded from the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct ClientSecretFile {
    path: PathBuf,
}

impl ClientSecretFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for ClientSecretFile {
    fn name(&self) -> &str {
        "client secret file"
    }

    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>> {
        OAuthCredentials::from_file(&self.path)
            .map(Some)
            .map_err(|e| ProviderError::configuration(format!("{}: {}", self.path.display(), e)))
    }
}

/// Asks each source in order and returns the first complete credentials.
///
/// Values are trimmed; a source yielding an empty id or secret is treated as
/// having nothing to offer.
pub fn first_available(
    sources: &[Box<dyn CredentialSource>],
) -> ProviderResult<Option<OAuthCredentials>> {
    for source in sources {
        match source.obtain()? {
            Some(credentials) => {
                let credentials = credentials.trimmed();
                if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
                    debug!("{} gave incomplete client credentials", source.name());
                    continue;
                }
                debug!("client credentials from {}", source.name());
                return Ok(Some(credentials));
            }
            None => debug!("no client credentials from {}", source.name()),
        }
    }
    Ok(None)
}
