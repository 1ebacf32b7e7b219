//! Sitemap relay CLI entry point.
//!
//! Serves an edited copy of an origin's sitemap over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use sitemap_relay::config::ORIGIN_DOMAIN_VAR;
use sitemap_relay::{server, RelayConfig, SitemapRelay};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sitemap-relay")]
#[command(
    author,
    version,
    about = "Sitemap rewriting relay for an upstream origin"
)]
struct Args {
    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (e.g., "0.0.0.0:8080").
    /// Overrides the configuration file when set.
    #[arg(long, env = "SITEMAP_RELAY_LISTEN")]
    listen: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,
}

fn print_example_config() {
    let example = r#"# Sitemap Relay Configuration Example
version: "1"

settings:
  # Bind address of the inbound HTTP server
  listen: "0.0.0.0:8080"
  # Path the transformed sitemap is served on
  serve_path: "/sitemap.xml"
  # Path appended to ORIGIN_DOMAIN to locate the upstream sitemap.
  # Set source_url instead to fetch from a fixed absolute URL.
  source_path: "/sitemap.xml"
  # Upstream request timeout (seconds)
  fetch_timeout_secs: 30
  # Upstream connect timeout (seconds)
  connect_timeout_secs: 10

edits:
  # Entries matching any pattern are removed. `*` matches within one
  # path segment, `**` across segments. Relative patterns are resolved
  # against ORIGIN_DOMAIN.
  remove:
    - "/work/project-2"
    - "/drafts/**"

  # URLs appended after removal. Relative values are resolved against
  # ORIGIN_DOMAIN.
  add:
    - "/work/project-42"

  # When non-empty, the ORIGIN_DOMAIN prefix of surviving entries is
  # replaced with this value.
  replace_domain: "https://www.example.org"
"#;
    println!("{}", example);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    // Print example config if requested
    if args.example_config {
        print_example_config();
        return Ok(());
    }

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        if config_path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        }
    } else {
        RelayConfig::default()
    };

    // Override listen address from CLI
    if let Some(listen) = args.listen {
        config.settings.listen = listen;
    }

    // Validate only if requested
    if args.validate {
        // Create relay to validate configuration
        let relay = SitemapRelay::new(config)?;
        for (pattern, error) in relay.invalid_remove_patterns() {
            warn!(
                pattern = %pattern,
                error = %error,
                "Removal pattern will be skipped at request time"
            );
        }
        info!("Configuration is valid");
        return Ok(());
    }

    // The origin domain is read per request, so a missing value is not
    // fatal here, but every sitemap request will fail until it is set.
    if std::env::var(ORIGIN_DOMAIN_VAR)
        .unwrap_or_default()
        .is_empty()
    {
        warn!("ORIGIN_DOMAIN is not set; sitemap requests will fail until it is provided");
    }

    let addr: SocketAddr = config
        .settings
        .listen
        .parse()
        .context("Invalid listen address format (expected host:port)")?;

    let relay = SitemapRelay::new(config)?;

    info!(
        config = ?args.config,
        listen = %addr,
        "Starting sitemap relay"
    );

    server::serve(addr, Arc::new(relay))
        .await
        .context("Failed to run sitemap relay server")?;

    Ok(())
}
