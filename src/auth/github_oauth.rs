/// GitHub OAuth authorization code flow (web application login)
/// https://docs.github.com/en/apps/oauth-apps/building-oauth-apps/authorizing-oauth-apps
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{AccessToken, TokenExchanger};
use crate::config::GitHubConfig;
use crate::error::ExchangeError;

const BAD_VERIFICATION_CODE: &str = "bad_verification_code";

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// GitHub answers 200 for both outcomes; errors only show up in the body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Result<AccessToken, ExchangeError> {
        if let Some(token) = self.access_token.filter(|t| !t.is_empty()) {
            return Ok(AccessToken::new(token));
        }

        match self.error {
            Some(error) if error == BAD_VERIFICATION_CODE => Err(ExchangeError::BadVerificationCode),
            Some(error) => Err(ExchangeError::Provider {
                error,
                description: self.error_description,
            }),
            None => Err(ExchangeError::MissingToken),
        }
    }
}

/// Consent screen URL for the configured app
pub fn authorize_url(config: &GitHubConfig) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}",
        config.authorize_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&config.scope),
    )
}

pub struct GitHubOAuth {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubOAuth {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ghgate/", env!("CARGO_PKG_VERSION")));

        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn authorize_url(&self) -> String {
        authorize_url(&self.config)
    }
}

#[async_trait]
impl TokenExchanger for GitHubOAuth {
    async fn exchange_code_for_token(&self, code: &str) -> Result<AccessToken, ExchangeError> {
        let token_request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            code,
            redirect_uri: &self.config.redirect_uri,
        };

        let res = self
            .client
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .json(&token_request)
            .send()
            .await?;

        let status = res.status();
        debug!(status = %status, "GitHub token endpoint responded");

        let body = res.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&body)?;

        token_response.into_token()
    }
}
