pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use auth::{AccessToken, GitHubOAuth, TokenExchanger};
pub use config::Config;
pub use error::{AuthError, ExchangeError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
