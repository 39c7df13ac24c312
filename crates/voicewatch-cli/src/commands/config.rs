//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use voicewatch_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "delimiter": config.delimiter.to_string(),
                    "watchers_file": config.watchers_file,
                    "contacts_file": config.contacts_file,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:      {}", config.data_dir.display());
            println!("  delimiter:     {:?}", config.delimiter);
            println!("  watchers_file: {}", config.watchers_file);
            println!("  contacts_file: {}", config.contacts_file);
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "delimiter" => {
            config.delimiter = parse_delimiter(&value)?;
        }
        "watchers_file" => {
            config.watchers_file = parse_file_name(&key, &value)?;
        }
        "contacts_file" => {
            config.contacts_file = parse_file_name(&key, &value)?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone().into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, delimiter, watchers_file, contacts_file, log_file",
                key
            );
        }
    }

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Changing the delimiter does not rewrite existing tables
fn parse_delimiter(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '\n' && c != '\r' => Ok(c),
        _ => bail!("Invalid delimiter '{}'. Use a single character.", value),
    }
}

fn parse_file_name(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} must not be empty", key);
    }
    Ok(value.to_string())
}
