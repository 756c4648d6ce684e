//! Fetching current conditions for a location list and writing raw batches.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    error::StoreError,
    keys::{self, KeyClock},
    location::Location,
    model::{CurrentConditions, WeatherRecord},
    provider::WeatherProvider,
    store::BlobStore,
};

/// Which time goes into a record's `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// The API's local time at the location.
    ApiLocalTime,
    /// The fetch instant in UTC.
    FetchTimeUtc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(WeatherRecord),
    Skipped { location: Location, reason: String },
}

/// Per-location outcomes of one fetch run, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn records(&self) -> Vec<WeatherRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FetchOutcome::Fetched(r) => Some(r.clone()),
                FetchOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&Location, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            FetchOutcome::Skipped { location, reason } => Some((location, reason.as_str())),
            FetchOutcome::Fetched(_) => None,
        })
    }

    pub fn fetched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, FetchOutcome::Fetched(_))).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.fetched_count()
    }

    pub fn summary(&self) -> String {
        format!(
            "fetched {} of {} locations ({} skipped)",
            self.fetched_count(),
            self.outcomes.len(),
            self.skipped_count()
        )
    }
}

/// Queries the provider once per location, sequentially.
#[derive(Debug, Clone)]
pub struct Fetcher {
    provider: Arc<dyn WeatherProvider>,
    timestamps: TimestampSource,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>, timestamps: TimestampSource) -> Self {
        Self { provider, timestamps }
    }

    /// Fetch every location. A failing location is recorded as skipped; the run goes on.
    pub async fn fetch_all(&self, locations: &[Location]) -> FetchReport {
        let mut report = FetchReport::default();

        for location in locations {
            let outcome = match self.provider.current(&location.city).await {
                Ok(current) => {
                    let record = self.to_record(location, current, Utc::now());
                    tracing::debug!(%location, temperature_c = record.temperature_c, "fetched");
                    FetchOutcome::Fetched(record)
                }
                Err(err) => {
                    tracing::warn!(%location, "error fetching data: {err}");
                    FetchOutcome::Skipped { location: location.clone(), reason: err.to_string() }
                }
            };
            report.outcomes.push(outcome);
        }

        tracing::info!("{}", report.summary());
        report
    }

    fn to_record(
        &self,
        location: &Location,
        current: CurrentConditions,
        fetched_at: DateTime<Utc>,
    ) -> WeatherRecord {
        let timestamp = match self.timestamps {
            TimestampSource::ApiLocalTime => current.localtime,
            TimestampSource::FetchTimeUtc => fetched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        // State-grouped queries keep the requested name; flat ones take the API's.
        let city = match location.state {
            Some(_) => location.city.clone(),
            None => current.name,
        };

        WeatherRecord {
            city,
            state: location.state.clone(),
            region: current.region,
            country: current.country,
            temperature_c: current.temperature_c,
            humidity: current.humidity,
            wind_kph: current.wind_kph,
            precipitation_mm: current.precip_mm,
            cloud_cover: current.cloud,
            uv_index: current.uv,
            visibility_km: current.vis_km,
            condition: current.condition,
            timestamp,
        }
    }
}

/// Serializes raw batches to JSON under `raw/`.
#[derive(Debug, Clone)]
pub struct RawWriter {
    store: Arc<dyn BlobStore>,
    clock: &'static KeyClock,
}

impl RawWriter {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_clock(store, KeyClock::global())
    }

    pub fn with_clock(store: Arc<dyn BlobStore>, clock: &'static KeyClock) -> Self {
        Self { store, clock }
    }

    /// Write `records` captured at `captured_at`; returns the new key.
    pub async fn write(
        &self,
        records: &[WeatherRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let key = keys::raw_key(self.clock.stamp(captured_at));
        let body = serde_json::to_vec(records).map_err(std::io::Error::from)?;

        self.store.put(&key, body, "application/json").await?;
        tracing::info!(%key, records = records.len(), "uploaded raw weather data");

        Ok(key)
    }
}
