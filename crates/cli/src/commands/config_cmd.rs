//! `qogito config`: configuration management commands.

use anyhow::Context;
use qogito_config::AppConfig;

use super::load_config;

pub fn show() -> anyhow::Result<()> {
    let config = load_config()?;
    let toml_str = toml_string(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn init(force: bool) -> anyhow::Result<()> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        println!("Config already exists at: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }
    AppConfig::default().save_to(&path)?;
    println!("Created {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. qogito config set agentic_url http://localhost:8080");
    println!("  2. qogito chat");
    Ok(())
}

/// Update one key in the file. Environment overrides are not written back.
pub fn set(key: &str, value: &str) -> anyhow::Result<()> {
    let path = AppConfig::config_path();
    let mut config = AppConfig::load_from(&path)?;
    config.set(key, value)?;
    config.save_to(&path)?;
    println!("{key} updated in {}", path.display());
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_path().display());
}

fn toml_string(config: &AppConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.system_prompt == qogito_config::DEFAULT_SYSTEM_PROMPT {
        shown.system_prompt = "(default)".into();
    }
    toml::to_string_pretty(&shown).context("Failed to render config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn default_prompt_is_abbreviated() {
        let rendered = toml_string(&AppConfig::default()).unwrap();
        assert!(rendered.contains("system_prompt = \"(default)\""));
        assert!(rendered.contains("allow_run_command = true"));
    }
}
