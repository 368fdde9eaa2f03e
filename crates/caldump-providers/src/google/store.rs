//! Persisted client credentials and tokens.
//!
//! Both records are stored as JSON documents carrying a `version` field so
//! later releases can add fields without breaking files written today:
//!
//! ```json
//! { "version": 1, "client_id": "...", "client_secret": "..." }
//! ```
//!
//! The [`CredentialStore`] trait hides the format from the session manager.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

/// Format version written by this build.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Default file name for the client credentials.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Default file name for the token.
pub const TOKEN_FILE_NAME: &str = "token.json";

/// Load/save access to the two persisted records.
///
/// Implementations do not validate contents; a missing record is `Ok(None)`.
pub trait CredentialStore: Send + Sync {
    /// Loads the application's client credentials.
    fn load_client_credentials(&self) -> ProviderResult<Option<OAuthCredentials>>;

    /// Persists client credentials, replacing any previous value.
    fn save_client_credentials(&self, credentials: &OAuthCredentials) -> ProviderResult<()>;

    /// Loads the user's token.
    fn load_token(&self) -> ProviderResult<Option<TokenInfo>>;

    /// Persists a token, replacing any previous value.
    fn save_token(&self, token: &TokenInfo) -> ProviderResult<()>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    fn load_client_credentials(&self) -> ProviderResult<Option<OAuthCredentials>> {
        (**self).load_client_credentials()
    }

    fn save_client_credentials(&self, credentials: &OAuthCredentials) -> ProviderResult<()> {
        (**self).save_client_credentials(credentials)
    }

    fn load_token(&self) -> ProviderResult<Option<TokenInfo>> {
        (**self).load_token()
    }

    fn save_token(&self, token: &TokenInfo) -> ProviderResult<()> {
        (**self).save_token(token)
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    #[serde(flatten)]
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn<T> {
    #[allow(dead_code)]
    version: u32,
    #[serde(flatten)]
    data: T,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

/// Serializes `data` inside a versioned envelope.
pub fn encode<T: Serialize>(data: &T) -> ProviderResult<String> {
    let envelope = EnvelopeOut {
        version: STORE_FORMAT_VERSION,
        data,
    };
    serde_json::to_string_pretty(&envelope)
        .map_err(|e| ProviderError::internal(format!("failed to serialize record: {}", e)))
}

/// Parses a versioned envelope, rejecting unknown versions.
pub fn decode<T: DeserializeOwned>(content: &str) -> ProviderResult<T> {
    let header: VersionHeader = serde_json::from_str(content)
        .map_err(|e| ProviderError::storage(format!("malformed record: {}", e)))?;

    match header.version {
        None => return Err(ProviderError::storage("record has no version field")),
        Some(v) if v > STORE_FORMAT_VERSION => {
            return Err(ProviderError::storage(format!(
                "record version {} is newer than supported version {}",
                v, STORE_FORMAT_VERSION
            )));
        }
        Some(_) => {}
    }

    let envelope: EnvelopeIn<T> = serde_json::from_str(content)
        .map_err(|e| ProviderError::storage(format!("malformed record: {}", e)))?;
    Ok(envelope.data)
}

/// File-backed store keeping each record in its own file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store using the given file paths.
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    /// Creates a store with the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(CREDENTIALS_FILE_NAME), dir.join(TOKEN_FILE_NAME))
    }

    /// Returns the client credentials path.
    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    /// Returns the token path.
    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    fn read<T: DeserializeOwned>(path: &Path) -> ProviderResult<Option<T>> {
        if !path.exists() {
            debug!("no record at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::storage(format!("failed to read {}: {}", path.display(), e))
        })?;

        let data = decode(&content).map_err(|e| {
            ProviderError::storage(format!("{}: {}", path.display(), e.message()))
        })?;
        debug!("loaded record from {:?}", path);
        Ok(Some(data))
    }

    fn write<T: Serialize>(path: &Path, data: &T) -> ProviderResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        // Write to temp file first, then rename
        let temp_path = path.with_extension("json.tmp");
        let content = encode(data)?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::storage(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&temp_path, perms);
        }

        fs::rename(&temp_path, path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {}: {}", path.display(), e))
        })?;

        debug!("saved record to {:?}", path);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_client_credentials(&self) -> ProviderResult<Option<OAuthCredentials>> {
        Self::read(&self.credentials_path)
    }

    fn save_client_credentials(&self, credentials: &OAuthCredentials) -> ProviderResult<()> {
        Self::write(&self.credentials_path, credentials)?;
        info!("saved client credentials to {:?}", self.credentials_path);
        Ok(())
    }

    fn load_token(&self) -> ProviderResult<Option<TokenInfo>> {
        Self::read(&self.token_path)
    }

    fn save_token(&self, token: &TokenInfo) -> ProviderResult<()> {
        Self::write(&self.token_path, token)?;
        info!("saved token to {:?}", self.token_path);
        Ok(())
    }
}

/// In-process store, used where nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<OAuthCredentials>>,
    token: Mutex<Option<TokenInfo>>,
    token_saves: Mutex<usize>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to preload client credentials.
    pub fn with_credentials(self, credentials: OAuthCredentials) -> Self {
        *lock(&self.credentials) = Some(credentials);
        self
    }

    /// Builder method to preload a token.
    pub fn with_token(self, token: TokenInfo) -> Self {
        *lock(&self.token) = Some(token);
        self
    }

    /// Returns the stored credentials.
    pub fn credentials(&self) -> Option<OAuthCredentials> {
        lock(&self.credentials).clone()
    }

    /// Returns the stored token.
    pub fn token(&self) -> Option<TokenInfo> {
        lock(&self.token).clone()
    }

    /// Number of times a token was saved.
    pub fn token_saves(&self) -> usize {
        *lock(&self.token_saves)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CredentialStore for MemoryCredentialStore {
    fn load_client_credentials(&self) -> ProviderResult<Option<OAuthCredentials>> {
        Ok(self.credentials())
    }

    fn save_client_credentials(&self, credentials: &OAuthCredentials) -> ProviderResult<()> {
        *lock(&self.credentials) = Some(credentials.clone());
        Ok(())
    }

    fn load_token(&self) -> ProviderResult<Option<TokenInfo>> {
        Ok(self.token())
    }

    fn save_token(&self, token: &TokenInfo) -> ProviderResult<()> {
        *lock(&self.token) = Some(token.clone());
        *lock(&self.token_saves) += 1;
        Ok(())
    }
}
