//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/caldump/config.toml` by default. Every section is optional:
//!
//! ```toml
//! [google]
//! client_id = "pass::google/caldump-id"
//! client_secret = "env::CALDUMP_SECRET"
//! token_path = "/var/lib/caldump/token.json"
//!
//! [auth]
//! flow = "device"
//!
//! [report]
//! time_zone = "Europe/Paris"
//! range = "zone"
//! ```
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use caldump_core::{RangeAnchor, ReportZone};
use caldump_providers::google::{
    AuthFlowKind, FileCredentialStore, GoogleConfig, OAuthCredentials, CREDENTIALS_FILE_NAME,
    TOKEN_FILE_NAME,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Environment variable that overrides the configuration file path.
pub const CONFIG_ENV: &str = "CALDUMP_CONFIG";

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the caldump client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google client credentials and storage locations.
    pub google: GoogleSettings,

    /// Authorization flow settings.
    pub auth: AuthSettings,

    /// Report rendering settings.
    pub report: ReportSettings,
}

impl ClientConfig {
    /// Loads configuration from `path`, or from the default path.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> ClientResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caldump")
    }

    /// Provider configuration derived from the `[auth]` section.
    pub fn google_config(&self) -> ClientResult<GoogleConfig> {
        let config = GoogleConfig::new()
            .with_flow(self.auth.flow)
            .with_timeout(Duration::from_secs(self.auth.timeout_secs))
            .with_refresh_expired(self.auth.refresh_expired)
            .with_loopback_port_range(self.auth.loopback_port_range.0, self.auth.loopback_port_range.1);
        config.validate().map_err(ClientError::Config)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings
// ---------------------------------------------------------------------------

/// Google client credentials and storage paths.
///
/// `client_id` / `client_secret` are only used to bootstrap the credential
/// store on first run; once saved, the stored copy wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Client secret JSON downloaded from the Google Cloud Console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_file: Option<PathBuf>,

    /// Where the client credentials are stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// Where the token is stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

impl GoogleSettings {
    /// Resolves the inline credentials, expanding secret references.
    ///
    /// Returns `Ok(None)` when neither value is set.
    pub fn resolve_credentials(&self) -> ClientResult<Option<OAuthCredentials>> {
        match (&self.client_id, &self.client_secret) {
            (None, None) => Ok(None),
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve(id)?;
                let secret = crate::secret::resolve(secret)?;
                Ok(Some(OAuthCredentials::new(id, secret)))
            }
            (Some(_), None) => Err(ClientError::Config(
                "client_secret is missing from the [google] section".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::Config(
                "client_id is missing from the [google] section".to_string(),
            )),
        }
    }

    /// Builds the credential store, defaulting both files to `default_dir`.
    pub fn store_in(&self, default_dir: &Path) -> FileCredentialStore {
        FileCredentialStore::new(
            self.credentials_path
                .clone()
                .unwrap_or_else(|| default_dir.join(CREDENTIALS_FILE_NAME)),
            self.token_path
                .clone()
                .unwrap_or_else(|| default_dir.join(TOKEN_FILE_NAME)),
        )
    }

    /// Builds the credential store next to the running executable unless
    /// both paths are configured.
    pub fn store(&self) -> ClientResult<FileCredentialStore> {
        let dir = match (&self.credentials_path, &self.token_path) {
            (Some(_), Some(_)) => PathBuf::new(),
            _ => executable_dir()?,
        };
        Ok(self.store_in(&dir))
    }
}

/// The directory containing the running program.
pub fn executable_dir() -> ClientResult<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ClientError::Config("cannot locate the program directory".to_string()))
}

// ---------------------------------------------------------------------------
// AuthSettings
// ---------------------------------------------------------------------------

/// Authorization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Interactive flow: `loopback` (browser) or `device` (code entry).
    pub flow: AuthFlowKind,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,

    /// Renew expired tokens with the refresh token before asking the user.
    pub refresh_expired: bool,

    /// Ports tried for the loopback redirect, inclusive.
    pub loopback_port_range: (u16, u16),
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            flow: AuthFlowKind::default(),
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            refresh_expired: true,
            loopback_port_range: (8080, 8090),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportSettings
// ---------------------------------------------------------------------------

/// Report settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// IANA zone events are reported in.
    pub time_zone: ReportZone,

    /// How the year bounds are anchored: `zone` or `utc`.
    pub range: RangeAnchor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.report.time_zone.name(), "America/New_York");
        assert_eq!(config.report.range, RangeAnchor::Zone);
        assert_eq!(config.auth.flow, AuthFlowKind::Loopback);
        assert_eq!(config.auth.loopback_port_range, (8080, 8090));
    }

    #[test]
    fn full_file() {
        let toml_content = r#"
[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
token_path = "/tmp/caldump/token.json"

[auth]
flow = "device"
timeout_secs = 10
refresh_expired = false
loopback_port_range = [9000, 9005]

[report]
time_zone = "Europe/Paris"
range = "utc"
"#;
        let config = ClientConfig::parse(toml_content).unwrap();
        assert_eq!(config.auth.flow, AuthFlowKind::Device);
        assert_eq!(config.auth.loopback_port_range, (9000, 9005));
        assert_eq!(config.report.time_zone.name(), "Europe/Paris");
        assert_eq!(config.report.range, RangeAnchor::Utc);

        let google = config.google_config().unwrap();
        assert_eq!(google.timeout, Duration::from_secs(10));
        assert!(!google.refresh_expired);
        assert_eq!(google.flow, AuthFlowKind::Device);

        let creds = config.google.resolve_credentials().unwrap().unwrap();
        assert_eq!(creds.client_id, "toml-id.apps.googleusercontent.com");
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        let err = ClientConfig::parse("[report]\ntime_zone = \"Mars/Olympus\"\n").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ClientConfig::parse("[auth]\ntimeout_secs = 0\n").unwrap();
        assert!(config.google_config().is_err());
    }

    #[test]
    fn credentials_need_both_values() {
        let only_id = GoogleSettings {
            client_id: Some("id".into()),
            ..Default::default()
        };
        assert!(only_id.resolve_credentials().is_err());
        assert!(GoogleSettings::default().resolve_credentials().unwrap().is_none());
    }

    #[test]
    fn credentials_with_env_references() {
        unsafe {
            std::env::set_var("_CALDUMP_TOML_TEST_ID", "env-toml-id.apps.googleusercontent.com");
            std::env::set_var("_CALDUMP_TOML_TEST_SECRET", "env-toml-secret");
        }

        let config = ClientConfig::parse(
            r#"
[google]
client_id = "env::_CALDUMP_TOML_TEST_ID"
client_secret = "env::_CALDUMP_TOML_TEST_SECRET"
"#,
        )
        .unwrap();
        let creds = config.google.resolve_credentials().unwrap().unwrap();
        assert_eq!(creds.client_id, "env-toml-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "env-toml-secret");

        unsafe {
            std::env::remove_var("_CALDUMP_TOML_TEST_ID");
            std::env::remove_var("_CALDUMP_TOML_TEST_SECRET");
        }
    }

    #[test]
    fn unresolvable_reference_is_an_error() {
        let settings = GoogleSettings {
            client_id: Some("env::_CALDUMP_NOT_SET_ANYWHERE".into()),
            client_secret: Some("s".into()),
            ..Default::default()
        };
        assert!(matches!(
            settings.resolve_credentials(),
            Err(ClientError::Secret(_))
        ));
    }

    #[test]
    fn store_paths() {
        let settings = GoogleSettings {
            token_path: Some(PathBuf::from("/elsewhere/token.json")),
            ..Default::default()
        };
        let store = settings.store_in(Path::new("/opt/caldump"));
        assert_eq!(store.credentials_path(), Path::new("/opt/caldump/credentials.json"));
        assert_eq!(store.token_path(), Path::new("/elsewhere/token.json"));
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(ClientConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn dump_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[report]\ntime_zone = \"Asia/Tokyo\"\n").unwrap();

        let config = ClientConfig::load(Some(&path)).unwrap();
        let dumped = config.to_toml().unwrap();
        assert_eq!(ClientConfig::parse(&dumped).unwrap(), config);
        assert!(dumped.contains("time_zone = \"Asia/Tokyo\""));
        assert!(!dumped.contains("client_id"));
    }
}
