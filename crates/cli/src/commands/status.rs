//! `qogito status`: show configuration and the served model.

use qogito_config::AppConfig;

use super::{connect_agentic, load_config};

pub async fn run() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("Qogito Status");
    println!("=============");
    println!("  Config file:     {}", AppConfig::config_path().display());
    println!("  Agentic URL:     {}", or_unset(&config.agentic_url));
    println!("  Completion URL:  {}", or_unset(&config.completion_url));
    println!(
        "  Run command:     {}",
        if config.allow_run_command { "allowed" } else { "disabled" }
    );
    println!(
        "  Self-signed TLS: {}",
        if config.allow_self_signed { "accepted" } else { "rejected" }
    );

    if config.agentic_url.is_empty() {
        return Ok(());
    }

    match connect_agentic(&config).await {
        Ok(client) => {
            println!();
            println!("  Connected to {}", client.base_url());
            println!("  Model:           {}", client.display_model_name());
            println!("  Model id:        {}", client.model_id());
            match client.context_size() {
                0 => println!("  Context size:    unknown (compaction disabled)"),
                n => println!("  Context size:    {n} tokens"),
            }
        }
        Err(e) => {
            println!();
            println!("  Not connected: {e:#}");
        }
    }

    Ok(())
}

fn or_unset(url: &str) -> &str {
    if url.is_empty() { "(not set)" } else { url }
}
