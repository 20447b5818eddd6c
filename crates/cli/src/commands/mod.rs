pub mod chat;
pub mod complete;
pub mod config_cmd;
pub mod status;
pub mod transform;

use anyhow::{Context, bail};
use qogito_config::AppConfig;
use qogito_providers::{LlamaCppClient, TransportConfig};

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

pub fn transport(config: &AppConfig) -> TransportConfig {
    TransportConfig {
        allow_self_signed: config.allow_self_signed,
        read_timeout: config.request_timeout(),
        ..TransportConfig::default()
    }
}

/// Build a chat client and connect it to the configured agentic server.
pub async fn connect_agentic(config: &AppConfig) -> anyhow::Result<LlamaCppClient> {
    if config.agentic_url.is_empty() {
        bail!(
            "No agentic server configured. Run `qogito config set agentic_url http://localhost:8080` \
             or set QOGITO_AGENTIC_URL."
        );
    }

    let client = LlamaCppClient::new(&transport(config))?;
    client
        .connect(&config.agentic_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.agentic_url))?;
    Ok(client)
}
