//! Core library for the `weatherflow` pipeline.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and the WeatherAPI.com client
//! - Fetching, raw batch writing and raw → transformed normalization
//! - Blob store backends and latest-object selection
//! - Table loading and aggregates for the dashboard
//!
//! It is used by `weatherflow-cli`, but the components only meet through a
//! [`BlobStore`], so they can be driven from any scheduler.

pub mod config;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod location;
pub mod model;
pub mod provider;
pub mod select;
pub mod store;
pub mod table;
pub mod transform;

pub use config::{Config, DashboardConfig, StoreConfig, WeatherApiConfig};
pub use error::{ProviderError, StoreError, TableError, TransformError};
pub use fetch::{FetchOutcome, FetchReport, Fetcher, RawWriter, TimestampSource};
pub use location::{Location, LocationsConfig};
pub use model::{CurrentConditions, TransformedRecord, WeatherRecord};
pub use provider::{WeatherProvider, provider_from_config};
pub use select::latest_object;
pub use store::{BlobStore, Namespace, ObjectMeta, StoreBackend, store_from_config};
pub use table::{LoadedTable, Metrics, Parameter, WeatherTable};
pub use transform::{OutputFormat, RawSchema, TransformSummary, Transformer};
