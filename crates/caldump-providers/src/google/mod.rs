//! Google Calendar support.
//!
//! # Authentication Flow
//!
//! 1. User provides their own OAuth client ID/secret (required by Google)
//! 2. The [`SessionManager`] stores them and reuses the stored token while it
//!    is usable, renewing it with the refresh token once it expires
//! 3. Otherwise it runs an [`Authorizer`]: the browser based [`LoopbackFlow`]
//!    or the [`DeviceFlow`] for machines without a browser
//! 4. The new token is persisted by the [`CredentialStore`]
//!
//! # Example
//!
//! ```ignore
//! use caldump_providers::google::{
//!     FileCredentialStore, GoogleConfig, LoopbackFlow, SessionManager, SessionOptions,
//! };
//!
//! let config = GoogleConfig::new();
//! let manager = SessionManager::new(
//!     FileCredentialStore::in_dir("/opt/caldump"),
//!     LoopbackFlow::new(&config)?,
//!     SessionOptions::from_config(&config),
//! );
//!
//! let client = manager.authenticated_client(&config).await?;
//! let calendars = caldump_providers::list_all_calendars(&client).await?;
//! ```

mod client;
mod config;
mod credentials;
mod device;
mod oauth;
mod session;
mod store;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{AuthFlowKind, GoogleConfig, OAuthCredentials};
pub use credentials::{
    CLIENT_ID_ENV, CLIENT_SECRET_ENV, ClientSecretFile, CredentialSource, EnvCredentials,
    StaticCredentials, first_available,
};
pub use device::DeviceFlow;
pub use oauth::{Authorizer, LoopbackFlow, PkceFlow};
pub use session::{Session, SessionManager, SessionOptions, TokenOrigin};
pub use store::{
    CREDENTIALS_FILE_NAME, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    STORE_FORMAT_VERSION, TOKEN_FILE_NAME,
};
pub use tokens::TokenInfo;

/// Builds the authorizer selected by `config.flow`.
pub fn authorizer_for(config: &GoogleConfig) -> crate::ProviderResult<Box<dyn Authorizer>> {
    Ok(match config.flow {
        AuthFlowKind::Loopback => Box::new(LoopbackFlow::new(config)?),
        AuthFlowKind::Device => Box::new(DeviceFlow::new(config)?),
    })
}
