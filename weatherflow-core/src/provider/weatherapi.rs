use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{config::DEFAULT_WEATHER_API_URL, error::ProviderError, model::CurrentConditions};

use super::WeatherProvider;

/// Client for the WeatherAPI.com `current.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_WEATHER_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { api_key, base_url, http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: u8,
    wind_kph: f64,
    #[serde(default)]
    precip_mm: f64,
    #[serde(default)]
    cloud: u8,
    #[serde(default)]
    uv: f64,
    #[serde(default)]
    vis_km: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, query: &str) -> Result<CurrentConditions, ProviderError> {
        let url = format!("{}/current.json", self.base_url);
        tracing::debug!(%query, "requesting current conditions");

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: WaResponse = serde_json::from_str(&body)?;

        Ok(CurrentConditions {
            name: parsed.location.name,
            region: parsed.location.region,
            country: parsed.location.country,
            localtime: parsed.location.localtime,
            temperature_c: parsed.current.temp_c,
            humidity: parsed.current.humidity,
            wind_kph: parsed.current.wind_kph,
            precip_mm: parsed.current.precip_mm,
            cloud: parsed.current.cloud,
            uv: parsed.current.uv,
            vis_km: parsed.current.vis_km,
            condition: parsed.current.condition.text,
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
