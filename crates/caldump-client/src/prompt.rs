//! Interactive entry of OAuth client credentials.

use caldump_providers::google::{CredentialSource, OAuthCredentials};
use caldump_providers::{ProviderError, ProviderResult};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};

/// Asks the user for the client id and secret on the terminal.
///
/// Used as the last credential source, when neither the config file nor the
/// environment provide credentials. Empty answers are returned as is and
/// rejected by the session manager, so nothing is saved.
#[derive(Debug, Default)]
pub struct PromptCredentials;

impl PromptCredentials {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialSource for PromptCredentials {
    fn name(&self) -> &str {
        "prompt"
    }

    fn obtain(&self) -> ProviderResult<Option<OAuthCredentials>> {
        println!();
        println!("No client credentials found. Please enter the following information.");

        let client_id = Text::new("Client Id:").prompt().map_err(prompt_error)?;
        let client_secret = Password::new("Client secret:")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .map_err(prompt_error)?;

        Ok(Some(OAuthCredentials::new(client_id, client_secret)))
    }
}

fn prompt_error(err: InquireError) -> ProviderError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            ProviderError::configuration("client credential entry was cancelled")
        }
        InquireError::NotTTY => ProviderError::configuration(
            "no client credentials found and no terminal to ask for them \
             (set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET)",
        ),
        other => ProviderError::configuration(format!("failed to read client credentials: {}", other)),
    }
}
