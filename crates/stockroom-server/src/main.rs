use std::env;

use stockroom_server::ServerBuilder;
use stockroom_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (STOCKROOM_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is fine.
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let (config_path, source) = resolve_config_path();

    // Only an explicitly named file has to exist.
    let explicit = match source {
        ConfigSource::Default => None,
        _ => Some(config_path.as_str()),
    };
    let cfg = match load_config(explicit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    stockroom_server::init_tracing_from_config(&cfg.logging);
    tracing::info!(path = %config_path, source = %source, "Configuration loaded");
    for warning in cfg.warnings() {
        tracing::warn!("{warning}");
    }

    if let Err(e) = run(cfg).await {
        tracing::error!(error = %e, "server exited with error");
        eprintln!("Server error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: stockroom_server::AppConfig) -> anyhow::Result<()> {
    let server = ServerBuilder::new().with_config(cfg).build().await?;
    server.run().await
}

fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("STOCKROOM_CONFIG") {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
}
