// GitHub OAuth (authorization code flow) and session cookies

pub mod github_oauth;
pub mod session;

pub use github_oauth::{authorize_url, GitHubOAuth};
pub use session::CallbackOutcome;

use async_trait::async_trait;
use std::fmt;

use crate::error::ExchangeError;

/// Bearer token returned by GitHub. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Exchanges a single-use authorization code for an access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code_for_token(&self, code: &str) -> Result<AccessToken, ExchangeError>;
}

/// Leading characters of an authorization code, safe to log
pub fn code_prefix(code: &str) -> &str {
    let keep = (code.chars().count() / 2).min(6);
    match code.char_indices().nth(keep) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}
