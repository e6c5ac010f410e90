use std::sync::Arc;

use anyhow::{Context, Result};
use config_parser::internal::ConfigFileInternal;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod server;

const DEFAULT_CONFIG_FILE: &str = "webhook_gate.yml";

fn setup_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing()?;

    if let Err(err) = dotenv::dotenv() {
        debug!("No .env file loaded: {}", err);
    }

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    // every pipeline step is set up here, a bad secret stops us before the listener is bound
    let config = ConfigFileInternal::load(&path)
        .with_context(|| format!("Could not load the config file '{}'", path))?;

    info!(
        version = %config.version,
        path = %config.route.path,
        steps = config.route.pipeline.steps().len(),
        "config loaded"
    );

    let server_handle = tokio::spawn({
        let config = Arc::new(config);

        async move { crate::server::start(config).await }
    });

    server_handle.await??;

    Ok(())
}
