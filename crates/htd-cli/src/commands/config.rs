//! Config command implementations

use std::path::Path;

use anyhow::{Context as _, Result};

use htd_core::config::{self, ClientConfig};

use crate::output::{print_error, print_info, print_success, print_warning};

const HEADER: &str = "# holdthedoor client configuration\n\
# server_url: base URL of the holdthedoor server (login, machine list, terminal proxy)\n\
# poll_interval / request_timeout: seconds\n\n";

/// Print the configuration file
pub fn config_show(path: &Path) -> Result<()> {
    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'holdthedoor config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Print one value
pub fn config_get(path: &Path, key: &str) -> Result<()> {
    let config: ClientConfig = config::load_or_default(path)?;
    let table = toml::Table::try_from(&config)?;

    match table.get(key) {
        Some(toml::Value::String(s)) => println!("{}", s),
        Some(other) => println!("{}", other),
        None => {
            print_error(&format!("Key not found: {}", key));
            anyhow::bail!("Unknown config key: {}", key);
        }
    }
    Ok(())
}

/// Set one value, creating the file when needed
pub fn config_set(path: &Path, key: &str, value: &str) -> Result<()> {
    let config: ClientConfig = config::load_or_default(path)?;
    let mut table = toml::Table::try_from(&config)?;

    if !table.contains_key(key) {
        print_error(&format!("Key not found: {}", key));
        anyhow::bail!("Unknown config key: {}", key);
    }

    let toml_value = if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(value.to_string())
    };
    table.insert(key.to_string(), toml_value);

    let updated: ClientConfig = toml::Value::Table(table)
        .try_into()
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    updated.validate()?;

    write_config(path, &updated)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Write the default configuration
pub fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_config(path, &ClientConfig::default())?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

fn write_config(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    let body = toml::to_string_pretty(config)?;
    std::fs::write(path, format!("{}{}", HEADER, body))
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}
