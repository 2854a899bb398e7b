//! Demo server with graceful shutdown.
//!
//! Serves a deliberately slow `/` handler. On Ctrl+C or SIGTERM the server
//! stops accepting connections and gives in-flight requests up to the
//! configured timeout to finish.
//!
//! ```text
//! graceful-server --bind 127.0.0.1:8080 --delay-ms 5000 --timeout-ms 10000
//! curl localhost:8080 &   # then press Ctrl+C in the server terminal
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use graceful_server::config::{load_config, validate_config, ConfigError, ServerConfig};
use graceful_server::http::HttpServer;
use graceful_server::lifecycle::Coordinator;
use graceful_server::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "graceful-server")]
#[command(about = "HTTP server that drains in-flight requests on shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, e.g. 127.0.0.1:8080.
    #[arg(short, long)]
    bind: Option<String>,

    /// Drain timeout in milliseconds (0 waits indefinitely).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Simulated request processing time in milliseconds.
    #[arg(short, long)]
    delay_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.shutdown.timeout_ms = timeout_ms;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.handler.response_delay_ms = delay_ms;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server exited with error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        shutdown_timeout_ms = config.shutdown.timeout_ms,
        response_delay_ms = config.handler.response_delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let timeout = config.shutdown.timeout();
    let server = HttpServer::new(config);

    Coordinator::new(timeout).run(&server).await?;
    Ok(())
}
