use crate::{
    Config, error::ProviderError, model::CurrentConditions,
    provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherapi;

/// Source of current-conditions readings.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a free-form location query (usually a city name).
    async fn current(&self, query: &str) -> Result<CurrentConditions, ProviderError>;
}

/// Construct the WeatherAPI.com provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;

    Ok(Box::new(WeatherApiProvider::with_base_url(
        api_key.to_owned(),
        config.weather.base_url.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No weather API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
