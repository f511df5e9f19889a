pub mod http;

use crate::config::Config;
use anyhow::Result;
use tracing::info;

/// Run the HTTP server until shutdown
pub async fn run(config: Config) -> Result<()> {
    info!("🌐 HTTP server starting on {}", config.server.bind);
    info!(
        "  Callback: {} → admin: {}",
        config.server.callback_path, config.server.admin_path
    );

    http::serve(config).await
}
