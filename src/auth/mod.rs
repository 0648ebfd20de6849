//! Token acquisition for Azure DevOps.
//!
//! Tokens are resolved through a chain of developer-tool credentials:
//! 1. Azure CLI (`az account get-access-token`)
//! 2. Azure Developer CLI (`azd auth token`)
//!
//! Nothing is cached. Every call re-authenticates.

pub mod cli;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

pub use cli::{AzureCliCredential, AzureDeveloperCliCredential};

/// Entra ID scope of the Azure DevOps resource.
pub const AZURE_DEVOPS_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/.default";

/// Environment variable selecting the credential family.
pub const TOKEN_CREDENTIALS_ENV: &str = "AZURE_TOKEN_CREDENTIALS";

/// A bearer token and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Request a token for the given scope.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// Tries each provider in order and returns the first token obtained.
pub struct ChainedTokenCredential {
    providers: Vec<Arc<dyn TokenProvider>>,
}

impl ChainedTokenCredential {
    pub fn new(providers: Vec<Arc<dyn TokenProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl TokenProvider for ChainedTokenCredential {
    fn name(&self) -> &str {
        "ChainedTokenCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.get_token(scope).await {
                Ok(token) => {
                    debug!("Acquired token from {}", provider.name());
                    return Ok(token);
                }
                Err(e) => {
                    debug!("{} failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::CredentialUnavailable(
                "no credentials configured".to_string(),
            ));
        }

        Err(Error::CredentialUnavailable(format!(
            "all credentials in the chain failed:\n{}",
            failures.join("\n")
        )))
    }
}

/// The developer credential chain: Azure CLI, then Azure Developer CLI.
pub struct DeveloperCredential {
    chain: ChainedTokenCredential,
}

impl DeveloperCredential {
    /// Build the chain, pinning `AZURE_TOKEN_CREDENTIALS` to `dev` first.
    ///
    /// Mutates the process environment, so call it before any runtime
    /// threads are started.
    pub fn new() -> Self {
        std::env::set_var(TOKEN_CREDENTIALS_ENV, "dev");

        Self {
            chain: ChainedTokenCredential::new(vec![
                Arc::new(AzureCliCredential::new()),
                Arc::new(AzureDeveloperCliCredential::new()),
            ]),
        }
    }
}

impl Default for DeveloperCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for DeveloperCredential {
    fn name(&self) -> &str {
        "DeveloperCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.chain.get_token(scope).await
    }
}

/// Fetch a token scoped to Azure DevOps.
pub async fn devops_token(provider: &dyn TokenProvider) -> Result<AccessToken> {
    provider.get_token(AZURE_DEVOPS_SCOPE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        name: String,
        token: Option<String>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(name: &str, token: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                token: Some(token.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                token: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TokenProvider for FixedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn get_token(&self, scope: &str) -> Result<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(scope, AZURE_DEVOPS_SCOPE);
            match &self.token {
                Some(token) => Ok(AccessToken::new(token, Utc::now() + Duration::hours(1))),
                None => Err(Error::Auth(format!("{} is not signed in", self.name))),
            }
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let first = FixedProvider::ok("first", "token-1");
        let second = FixedProvider::ok("second", "token-2");
        let chain = ChainedTokenCredential::new(vec![first.clone(), second.clone()]);

        let token = devops_token(&chain).await.unwrap();

        assert_eq!(token.token, "token-1");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_falls_through_failures() {
        let failing = FixedProvider::failing("cli");
        let working = FixedProvider::ok("azd", "token-azd");
        let chain = ChainedTokenCredential::new(vec![failing.clone(), working]);

        let token = devops_token(&chain).await.unwrap();

        assert_eq!(token.token, "token-azd");
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chain_all_fail_aggregates_errors() {
        let chain = ChainedTokenCredential::new(vec![
            FixedProvider::failing("cli"),
            FixedProvider::failing("azd"),
        ]);

        let err = devops_token(&chain).await.unwrap_err();

        assert!(matches!(err, Error::CredentialUnavailable(_)));
        let message = err.to_string();
        assert!(message.contains("cli is not signed in"));
        assert!(message.contains("azd is not signed in"));
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = ChainedTokenCredential::new(Vec::new());
        let err = devops_token(&chain).await.unwrap_err();
        assert!(err.to_string().contains("no credentials configured"));
    }

    #[tokio::test]
    async fn test_every_call_reauthenticates() {
        let provider = FixedProvider::ok("cli", "token");
        let chain = ChainedTokenCredential::new(vec![provider.clone()]);

        devops_token(&chain).await.unwrap();
        devops_token(&chain).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_developer_credential_pins_env() {
        let _credential = DeveloperCredential::new();
        assert_eq!(std::env::var(TOKEN_CREDENTIALS_ENV).unwrap(), "dev");
    }

    #[test]
    fn test_access_token_debug_redacts() {
        let token = AccessToken::new("secret-value", Utc::now());
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("<redacted>"));
    }
}
