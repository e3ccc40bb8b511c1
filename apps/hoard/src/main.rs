//! # Hoard - Home Inventory
//!
//! The main binary for the Hoard catalog.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for catalog operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             apps/hoard (THE BINARY)           │
//! │                                               │
//! │   ┌─────────────┐         ┌─────────────┐     │
//! │   │    CLI      │         │  HTTP API   │     │
//! │   │   (clap)    │         │   (axum)    │     │
//! │   └──────┬──────┘         └──────┬──────┘     │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  hoard-core   │                │
//! │              │  (THE STORE)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! hoard serve --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! hoard add-location "Garage"
//! hoard add-item --name "Drill" --parent 7KQ2MX
//! hoard export -o backup.zip
//! ```

use clap::Parser;
use hoard::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // HOARD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("HOARD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hoard=info,hoard_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Hoard startup banner.
fn print_banner() {
    println!(
        r#"
  ╻ ╻┏━┓┏━┓┏━┓╺┳┓
  ┣━┫┃ ┃┣━┫┣┳┛ ┃┃
  ╹ ╹┗━┛╹ ╹╹┗╸╺┻┛  v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
