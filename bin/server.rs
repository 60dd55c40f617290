// Book Distribution - Web Server
// JSON API over the setup and distribution flows

use anyhow::{Context, Result};
use book_distribution::{api, config, logging, startup_checks, NocoClient};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    println!("🌐 Book Distribution - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = config::load_and_validate()?;
    logging::init_tracing(&config.log_level, None)?;
    startup_checks()?;

    let store = NocoClient::new(&config.store, &config.cache).context("Failed to build HTTP client")?;
    println!("✓ Remote store: {} (project {})", config.store.base_url, config.store.project_name);

    let app = api::router(Arc::new(store), &config.store.project_name);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!(bind = %config.server.bind, "server listening");
    println!("\n🚀 Server running on http://{}", config.server.bind);
    println!("   API: http://{}/api/inventory", config.server.bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
