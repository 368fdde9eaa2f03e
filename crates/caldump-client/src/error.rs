//! Client error types.

use std::fmt;

use caldump_core::TimeError;
use caldump_providers::ProviderError;

use crate::secret::SecretError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// A secret reference in the configuration could not be resolved.
    Secret(SecretError),
    /// Provider error.
    Provider(ProviderError),
    /// The requested year cannot be turned into a query range.
    Time(TimeError),
    /// IO error.
    Io(std::io::Error),
    /// No calendar matched the requested name.
    UnknownCalendar(String),
}

impl ClientError {
    /// Returns true if the provider refused our credentials or the user
    /// could not be authorized.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_authentication())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Secret(err) => write!(f, "secret reference: {}", err),
            Self::Provider(err) => write!(f, "provider error: {}", err),
            Self::Time(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::UnknownCalendar(name) => write!(f, "unknown calendar: {}", name),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Secret(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Time(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<TimeError> for ClientError {
    fn from(err: TimeError) -> Self {
        Self::Time(err)
    }
}

impl From<SecretError> for ClientError {
    fn from(err: SecretError) -> Self {
        Self::Secret(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_detection() {
        let rejected: ClientError = ProviderError::from_status(401, "").into();
        assert!(rejected.is_authentication());

        let forbidden: ClientError = ProviderError::from_status(403, "").into();
        assert!(!forbidden.is_authentication());

        assert!(!ClientError::UnknownCalendar("x".into()).is_authentication());
    }

    #[test]
    fn display() {
        assert_eq!(
            ClientError::UnknownCalendar("Work".into()).to_string(),
            "unknown calendar: Work"
        );
        assert_eq!(
            ClientError::Config("bad".into()).to_string(),
            "configuration error: bad"
        );
    }
}
