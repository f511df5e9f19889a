use anyhow::Result;
use ghgate::{auth::authorize_url, config::Config, logging, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Load configuration (also reads .env); warnings go to stderr until logging is configured
    let config = tracing::subscriber::with_default(
        logging::bootstrap_subscriber(std::io::stderr),
        Config::load,
    )?;

    // Check for subcommands
    if args.len() >= 2 {
        match args[1].as_str() {
            "check-config" => {
                println!("\n✅ Configuration OK");
                println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
                println!("  Bind:          {}", config.server.bind);
                println!("  Callback path: {}", config.server.callback_path);
                println!("  Admin path:    {}", config.server.admin_path);
                println!("  Client ID:     {}", config.github.client_id);
                println!("  Redirect URI:  {}", config.github.redirect_uri);
                println!("  Scope:         {}", config.github.scope);
                println!("  Token cookie:  {}", config.session.token_cookie);
                if let Some(flag) = &config.session.authenticated_cookie {
                    println!("  Flag cookie:   {}", flag);
                }
                println!();
            }
            "authorize-url" => {
                println!("{}", authorize_url(&config.github));
            }
            other => {
                eprintln!("Unknown command: {}", other);
                eprintln!("Usage: ghgate [check-config|authorize-url]");
                std::process::exit(1);
            }
        }

        return Ok(());
    }

    // Initialize logging
    logging::init(&config.server);

    info!("🚀 ghgate v{}", ghgate::VERSION);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✓ Configuration loaded");
    info!("  GitHub app: {}", config.github.client_id);
    info!("  Redirect URI: {}", config.github.redirect_uri);

    server::run(config).await?;

    Ok(())
}
