use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use summarizer_api::{logging, Server};
use summarizer_core::{ConfigManager, SummarizerError};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "summarizer-api", version, about = "Summarize uploaded documents with a hosted assistant")]
struct Args {
    /// Path to a TOML config file (defaults to ./.summarizer.toml or ~/.summarizer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Write a default config file to PATH and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

fn load_config(args: &Args) -> summarizer_core::Result<ConfigManager> {
    let manager = match &args.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::load()?,
    };

    let mut config = manager.config().clone();
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    Ok(ConfigManager::from_config(config)?)
}

#[tokio::main]
async fn main() -> summarizer_core::Result<()> {
    let args = Args::parse();

    // Config loading logs before the configured subscriber exists.
    let manager = tracing::subscriber::with_default(
        logging::startup_subscriber(),
        || -> summarizer_core::Result<Option<ConfigManager>> {
            if let Some(path) = &args.init_config {
                ConfigManager::create_default_config(path)?;
                info!("Wrote default configuration to {}", path.display());
                return Ok(None);
            }
            load_config(&args).map(Some)
        },
    )?;
    let Some(manager) = manager else {
        return Ok(());
    };
    let config = manager.config();

    logging::init_tracing(&config.logging);
    info!(
        model = %config.openai.model,
        cleanup = %config.cleanup.scope,
        max_attempts = config.polling.max_attempts,
        "Configuration ready"
    );

    let ip: IpAddr = config.server.host.parse().map_err(|_| {
        SummarizerError::Config(format!("Invalid server.host: {}", config.server.host))
    })?;
    let addr = SocketAddr::new(ip, config.server.port);

    let server = Server::new(addr, Arc::new(manager));
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use summarizer_core::SummarizerConfig;

    #[test]
    fn parses_init_config_flag() {
        let args = Args::try_parse_from(["summarizer-api", "--init-config", "/tmp/s.toml"]).unwrap();
        assert_eq!(args.init_config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(args.config.is_none());
    }

    #[test]
    fn cli_overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summarizer.toml");
        ConfigManager::create_default_config(&path).unwrap();

        let args = Args::try_parse_from([
            "summarizer-api",
            "--config",
            path.to_str().unwrap(),
            "--host",
            "0.0.0.0",
            "--port",
            "8089",
        ])
        .unwrap();
        let manager = load_config(&args).unwrap();
        let defaults = SummarizerConfig::default();

        assert_eq!(manager.config().server.host, "0.0.0.0");
        assert_eq!(manager.config().server.port, 8089);
        assert_eq!(manager.config().openai.model, defaults.openai.model);
    }
}
