//! Authentication command.

use std::io::Write;

use caldump_providers::google::{SessionManager, TokenOrigin};
use tracing::info;

use crate::error::ClientResult;

/// Run the session manager and report where the token came from.
///
/// With `--force` the manager was built to skip the stored token, so this
/// always ends in the interactive flow.
pub async fn run(manager: &SessionManager, out: &mut impl Write) -> ClientResult<TokenOrigin> {
    let session = manager.authenticate().await?;
    info!(origin = ?session.origin, "authenticated");

    let status = match session.origin {
        TokenOrigin::Stored => "Stored token is valid.",
        TokenOrigin::Refreshed => "Stored token refreshed.",
        TokenOrigin::Authorized => "New token obtained.",
    };
    writeln!(out, "{}", status)?;
    if let Some(expires_at) = session.token.expires_at {
        writeln!(out, "Token expires at {}.", expires_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    out.flush()?;

    Ok(session.origin)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use caldump_providers::BoxFuture;
    use caldump_providers::google::{
        Authorizer, GoogleConfig, MemoryCredentialStore, OAuthCredentials, SessionOptions,
        TokenInfo,
    };
    use caldump_providers::{ProviderError, ProviderResult};

    use super::*;

    struct GrantingAuthorizer(Option<TokenInfo>);

    impl Authorizer for GrantingAuthorizer {
        fn authorize<'a>(
            &'a self,
            _credentials: &'a OAuthCredentials,
            _scopes: &'a [String],
        ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            let result = self
                .0
                .clone()
                .ok_or_else(|| ProviderError::network("connection refused"));
            Box::pin(async move { result })
        }

        fn refresh<'a>(
            &'a self,
            _credentials: &'a OAuthCredentials,
            _token: &'a TokenInfo,
        ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            Box::pin(async { Err(ProviderError::authentication("invalid_grant")) })
        }
    }

    fn token(access: &str) -> TokenInfo {
        TokenInfo::new(
            access,
            Some("refresh".into()),
            None,
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        )
    }

    fn manager(store: MemoryCredentialStore, grant: Option<TokenInfo>, force: bool) -> SessionManager {
        SessionManager::new(
            Arc::new(store),
            GrantingAuthorizer(grant),
            SessionOptions::default().with_force(force),
        )
        .with_notices(|_| {})
    }

    fn creds() -> OAuthCredentials {
        OAuthCredentials::new("id.apps.googleusercontent.com", "secret")
    }

    #[tokio::test]
    async fn reports_a_reused_token() {
        let store = MemoryCredentialStore::new()
            .with_credentials(creds())
            .with_token(token("stored"));
        let mut out = Vec::new();

        let origin = run(&manager(store, None, false), &mut out).await.unwrap();
        assert_eq!(origin, TokenOrigin::Stored);
        assert_eq!(String::from_utf8(out).unwrap(), "Stored token is valid.\n");
    }

    #[tokio::test]
    async fn force_reports_a_new_token() {
        let store = MemoryCredentialStore::new()
            .with_credentials(creds())
            .with_token(token("stored"));
        let mut out = Vec::new();

        let origin = run(&manager(store, Some(token("new")), true), &mut out)
            .await
            .unwrap();
        assert_eq!(origin, TokenOrigin::Authorized);
        assert_eq!(String::from_utf8(out).unwrap(), "New token obtained.\n");
    }

    #[tokio::test]
    async fn failed_flow_prints_nothing() {
        let store = MemoryCredentialStore::new().with_credentials(creds());
        let mut out = Vec::new();

        let err = run(&manager(store, None, false), &mut out).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(out.is_empty());
    }
}
