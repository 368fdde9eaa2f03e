//! Wiring between the configuration file and the session manager.

use caldump_providers::google::{
    ClientSecretFile, CredentialSource, EnvCredentials, GoogleConfig, OAuthCredentials,
    SessionManager, SessionOptions, authorizer_for,
};
use caldump_providers::{ProviderError, ProviderResult};
use tracing::debug;

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};
use crate::prompt::PromptCredentials;

/// Credentials written inline in the `[google]` section.
///
/// Secret references are only expanded when the store has no credentials
/// yet, so `pass` is not consulted on every run.
pub struct ConfigCredentials {
    settings: GoogleSettings,
}

impl ConfigCredentials {
    pub fn new(settings: GoogleSettings) -> Self {
        Self { settings }
    }
}

impl CredentialSource for ConfigCredentials {
    fn name(&self) -> &str {
        "config file"
    }

    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>> {
        self.settings.resolve_credentials().map_err(|e| match e {
            ClientError::Provider(e) => e,
            ClientError::Config(msg) => ProviderError::configuration(msg),
            other => ProviderError::configuration(other.to_string()),
        })
    }
}

/// Builds the session manager for this configuration.
///
/// Credential sources are tried in order: the config file, a client secret
/// JSON file, the environment, then the terminal prompt.
pub fn build_manager(
    config: &ClientConfig,
    google: &GoogleConfig,
    force: bool,
) -> ClientResult<SessionManager> {
    let store = config.google.store()?;
    debug!(
        credentials = %store.credentials_path().display(),
        token = %store.token_path().display(),
        "credential store"
    );

    let mut manager = SessionManager::new(
        store,
        authorizer_for(google)?,
        SessionOptions::from_config(google).with_force(force),
    )
    .with_source(ConfigCredentials::new(config.google.clone()));

    if let Some(path) = &config.google.client_secret_file {
        manager = manager.with_source(ClientSecretFile::new(path.clone()));
    }

    Ok(manager
        .with_source(EnvCredentials::new())
        .with_source(PromptCredentials::new()))
}
