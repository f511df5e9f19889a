use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fmt, fs, path::Path};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "GHGATE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    #[serde(default = "default_admin_path")]
    pub admin_path: String,
}

/// Registered GitHub OAuth application
#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Must match the callback registered with GitHub byte-for-byte
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_token_cookie")]
    pub token_cookie: String,
    /// Optional `true` flag cookie written next to the token
    #[serde(default)]
    pub authenticated_cookie: Option<String>,
    #[serde(default = "default_max_age")]
    pub max_age_secs: i64,
    #[serde(default)]
    pub secure: bool,
}

// Defaults
fn default_bind() -> String { "127.0.0.1:4321".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_callback_path() -> String { "/auth".to_string() }
fn default_admin_path() -> String { "/admin".to_string() }
fn default_redirect_uri() -> String { "http://localhost:4321/auth".to_string() }
fn default_scope() -> String { "repo".to_string() }
fn default_authorize_url() -> String { "https://github.com/login/oauth/authorize".to_string() }
fn default_token_url() -> String { "https://github.com/login/oauth/access_token".to_string() }
fn default_token_cookie() -> String { "github_token".to_string() }
fn default_max_age() -> i64 { 60 * 60 * 24 * 7 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            callback_path: default_callback_path(),
            admin_path: default_admin_path(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            request_timeout_secs: None,
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_cookie: default_token_cookie(),
            authenticated_cookie: None,
            max_age_secs: default_max_age(),
            secure: false,
        }
    }
}

impl Config {
    /// Load configuration from file (if any) and environment
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let lookup = |name: &str| env::var(name).ok();

        let mut config = match Self::locate_config_file(&lookup) {
            Some(path) => Self::from_file(&path, &lookup)?,
            None => {
                tracing::debug!("No config file found, using defaults and environment");
                Config::default()
            }
        };

        config.apply_env_overrides(&lookup);
        config.validate()?;

        Ok(config)
    }

    /// `GHGATE_CONFIG` wins; otherwise the first existing common location
    fn locate_config_file(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(path) = lookup(CONFIG_ENV) {
            return Some(path);
        }

        let home_config = format!(
            "{}/.config/ghgate/config.toml",
            lookup("HOME").unwrap_or_default()
        );
        let locations = [
            "./ghgate.toml",
            "./config.toml",
            "/etc/ghgate/config.toml",
            home_config.as_str(),
        ];

        locations
            .into_iter()
            .find(|path| Path::new(path).exists())
            .map(str::to_string)
    }

    fn from_file(path: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Validate config file permissions on Unix systems
        #[cfg(unix)]
        Self::validate_file_permissions(path)?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml_str(&content, lookup)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Parse TOML after substituting `${VAR}` references
    pub fn from_toml_str(content: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let content = Self::substitute_env_vars(content, lookup);
        Ok(toml::from_str(&content)?)
    }

    /// Substitute ${VAR_NAME} with looked-up values (missing vars become empty)
    fn substitute_env_vars(content: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            result.push_str(&rest[..start]);
            let var_name = &rest[start + 2..start + end];
            result.push_str(&lookup(var_name).unwrap_or_default());
            rest = &rest[start + end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Credentials and bind address from the process environment fill in or override the file
    pub fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(client_id) = non_empty("GITHUB_CLIENT_ID") {
            self.github.client_id = client_id;
        }
        if let Some(client_secret) = non_empty("GITHUB_CLIENT_SECRET") {
            self.github.client_secret = client_secret;
        }
        if let Some(bind) = non_empty("GHGATE_BIND") {
            self.server.bind = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.github.client_id.is_empty() {
            anyhow::bail!("GitHub client_id is not configured (set GITHUB_CLIENT_ID)");
        }
        if self.github.client_secret.is_empty() {
            anyhow::bail!("GitHub client_secret is not configured (set GITHUB_CLIENT_SECRET)");
        }

        let redirect = url::Url::parse(&self.github.redirect_uri)
            .with_context(|| format!("Invalid redirect_uri: {}", self.github.redirect_uri))?;
        url::Url::parse(&self.github.authorize_url)
            .with_context(|| format!("Invalid authorize_url: {}", self.github.authorize_url))?;
        url::Url::parse(&self.github.token_url)
            .with_context(|| format!("Invalid token_url: {}", self.github.token_url))?;

        for (name, path) in [
            ("callback_path", &self.server.callback_path),
            ("admin_path", &self.server.admin_path),
        ] {
            if !path.starts_with('/') {
                anyhow::bail!("{} must be an absolute path, got '{}'", name, path);
            }
        }

        if redirect.path() != self.server.callback_path {
            tracing::warn!(
                "redirect_uri path '{}' differs from callback_path '{}'; GitHub will call back elsewhere",
                redirect.path(),
                self.server.callback_path
            );
        }

        if self.session.token_cookie.is_empty() {
            anyhow::bail!("session.token_cookie must not be empty");
        }
        if self.session.max_age_secs < 0 {
            anyhow::bail!("session.max_age_secs must not be negative");
        }

        Ok(())
    }

    /// Validate config file permissions (Unix only)
    #[cfg(unix)]
    fn validate_file_permissions(path: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let path_obj = Path::new(path);

        if !path_obj.exists() {
            tracing::debug!("Config file does not exist: {}", path);
            return Ok(());
        }

        let metadata = fs::metadata(path_obj)
            .with_context(|| format!("Failed to read metadata for config file: {}", path))?;
        let mode = metadata.permissions().mode();

        if mode & 0o044 != 0 {
            tracing::warn!(
                "Config file {} has insecure permissions: {:o} (it holds the OAuth client secret, chmod 600 recommended)",
                path,
                mode & 0o777
            );
        }

        if mode & 0o022 != 0 {
            anyhow::bail!(
                "Config file {} is writable by group or others (mode: {:o}). Run: chmod 600 {}",
                path,
                mode & 0o777,
                path
            );
        }

        Ok(())
    }
}
