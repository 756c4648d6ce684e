use anyhow::Context;
use inquire::{Password, Select, Text};
use std::path::{Path, PathBuf};
use weatherflow_core::{Config, StoreBackend};

/// Prompt for the API key and store settings, then save the config file.
///
/// Existing values are offered as defaults; secrets left blank keep their
/// previous value.
pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::config_file_path()?,
    };
    let mut config = Config::load_file(&path)?;

    if let Some(key) = secret("WeatherAPI key:", config.weather.api_key.is_some())? {
        config.set_api_key(key);
    }

    let backends = StoreBackend::all();
    let cursor = backends.iter().position(|b| *b == config.store.backend).unwrap_or(0);
    let backend = Select::new("Blob store backend:", backends.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?;
    config.store.backend = backend;

    match backend {
        StoreBackend::S3 => {
            config.store.bucket = Some(
                Text::new("Bucket name:")
                    .with_default(config.store.bucket.as_deref().unwrap_or_default())
                    .prompt()?,
            );
            config.store.region =
                Text::new("Region:").with_default(&config.store.region).prompt()?;

            let endpoint = Text::new("Custom endpoint (blank for AWS):")
                .with_default(config.store.endpoint.as_deref().unwrap_or_default())
                .prompt()?;
            config.store.endpoint = Some(endpoint).filter(|e| !e.trim().is_empty());

            if let Some(v) = secret("Access key:", config.store.access_key.is_some())? {
                config.store.access_key = Some(v);
            }
            if let Some(v) = secret("Secret key:", config.store.secret_key.is_some())? {
                config.store.secret_key = Some(v);
            }
        }
        StoreBackend::Local => {
            let current = config.store.root.as_deref().map(|p| p.display().to_string());
            let root = Text::new("Root directory:")
                .with_default(current.as_deref().unwrap_or("./weather-data"))
                .prompt()?;
            config.store.root = Some(PathBuf::from(root));
        }
    }

    config.save(&path).with_context(|| format!("Failed to save {}", path.display()))?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// `None` when the user keeps an existing value by leaving the prompt blank.
fn secret(message: &str, has_existing: bool) -> anyhow::Result<Option<String>> {
    let mut prompt = Password::new(message).without_confirmation();
    if has_existing {
        prompt = prompt.with_help_message("leave blank to keep the current value");
    }

    let value = prompt.prompt()?;
    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}
