//! Raw batch → transformed batch.
//!
//! Two raw shapes exist: the canonical one written by [`crate::fetch::RawWriter`]
//! (`temperature_c`, `wind_kph`, `precipitation_mm`, ...) and the state-tagged
//! one, which carries the whole API response plus flattened `temperature`,
//! `wind_speed`, `rainfall`, `visibility` and `fetch_timestamp` fields. The
//! shape of a batch is detected from its first record and every record must
//! then conform to it.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use std::sync::Arc;

use crate::{
    error::TransformError,
    keys::{self, KeyClock},
    model::TransformedRecord,
    select,
    store::{BlobStore, Namespace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSchema {
    Canonical,
    StateTagged,
}

/// Source field names for one raw schema.
struct SourceFields {
    temperature: &'static str,
    humidity: &'static str,
    wind: &'static str,
    rainfall: &'static str,
    visibility: &'static str,
    timestamp: &'static str,
}

impl RawSchema {
    /// Detect the schema of a single raw record.
    pub fn detect(record: &Map<String, Value>) -> Option<Self> {
        if record.contains_key("temperature_c") {
            Some(RawSchema::Canonical)
        } else if record.contains_key("temperature") {
            Some(RawSchema::StateTagged)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RawSchema::Canonical => "canonical",
            RawSchema::StateTagged => "state-tagged",
        }
    }

    fn fields(&self) -> SourceFields {
        match self {
            RawSchema::Canonical => SourceFields {
                temperature: "temperature_c",
                humidity: "humidity",
                wind: "wind_kph",
                rainfall: "precipitation_mm",
                visibility: "visibility_km",
                timestamp: "timestamp",
            },
            RawSchema::StateTagged => SourceFields {
                temperature: "temperature",
                humidity: "humidity",
                wind: "wind_speed",
                rainfall: "rainfall",
                visibility: "visibility",
                timestamp: "fetch_timestamp",
            },
        }
    }
}

impl std::fmt::Display for RawSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Json => "application/json",
        }
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow::anyhow!(
                "Unknown output format '{value}'. Supported formats: csv, json."
            )),
        }
    }
}

/// Records of one raw batch in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    /// `None` for an empty batch.
    pub schema: Option<RawSchema>,
    pub records: Vec<TransformedRecord>,
}

/// Parse a raw batch and map every record to the transformed schema.
pub fn normalize_batch(key: &str, bytes: &[u8]) -> Result<NormalizedBatch, TransformError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|source| TransformError::Json { key: key.to_string(), source })?;
    let Value::Array(items) = value else {
        return Err(TransformError::NotAnArray(key.to_string()));
    };

    let mut schema = None;
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(TransformError::NotAnObject { index });
        };
        let batch_schema = match schema {
            Some(s) => s,
            None => {
                let detected =
                    RawSchema::detect(obj).ok_or(TransformError::UnknownSchema { index })?;
                *schema.insert(detected)
            }
        };
        records.push(normalize_record(index, obj, batch_schema)?);
    }

    Ok(NormalizedBatch { schema, records })
}

fn normalize_record(
    index: usize,
    obj: &Map<String, Value>,
    schema: RawSchema,
) -> Result<TransformedRecord, TransformError> {
    let f = schema.fields();
    let rec = RecordFields { index, obj };

    Ok(TransformedRecord {
        city: rec.required_str("city")?,
        state: rec.optional_str("state")?,
        temperature_c: rec.required_num(f.temperature)?,
        humidity: rec.required_num(f.humidity)?,
        wind_kph: rec.required_num(f.wind)?,
        rainfall_mm: rec.optional_num(f.rainfall)?,
        visibility_km: rec.optional_num(f.visibility)?,
        condition: rec.optional_str("condition")?,
        timestamp: rec.required_str(f.timestamp)?,
    })
}

struct RecordFields<'a> {
    index: usize,
    obj: &'a Map<String, Value>,
}

impl RecordFields<'_> {
    /// `null` counts as absent.
    fn get(&self, field: &str) -> Option<&Value> {
        self.obj.get(field).filter(|v| !v.is_null())
    }

    fn missing(&self, field: &'static str) -> TransformError {
        TransformError::MissingField { index: self.index, field }
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> TransformError {
        TransformError::InvalidField { index: self.index, field, expected }
    }

    fn optional_str(&self, field: &'static str) -> Result<String, TransformError> {
        match self.get(field) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    fn required_str(&self, field: &'static str) -> Result<String, TransformError> {
        match self.get(field) {
            None => Err(self.missing(field)),
            Some(_) => self.optional_str(field),
        }
    }

    fn optional_num(&self, field: &'static str) -> Result<Number, TransformError> {
        match self.get(field) {
            None => Ok(Number::from(0)),
            Some(Value::Number(n)) => Ok(n.clone()),
            Some(_) => Err(self.invalid(field, "a number")),
        }
    }

    fn required_num(&self, field: &'static str) -> Result<Number, TransformError> {
        match self.get(field) {
            None => Err(self.missing(field)),
            Some(_) => self.optional_num(field),
        }
    }
}

/// CSV with a header row, even for an empty batch.
pub fn encode_csv(records: &[TransformedRecord]) -> Result<Vec<u8>, TransformError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(TransformedRecord::HEADER)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.into_inner().map_err(|e| TransformError::Encode(e.to_string()))
}

pub fn encode_json(records: &[TransformedRecord]) -> Result<Vec<u8>, TransformError> {
    serde_json::to_vec(records).map_err(|e| TransformError::Encode(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformSummary {
    pub source_key: String,
    pub output_key: String,
    pub schema: Option<RawSchema>,
    pub records: usize,
}

/// Transforms the latest raw batch into the transformed namespace.
#[derive(Debug, Clone)]
pub struct Transformer {
    store: Arc<dyn BlobStore>,
    format: OutputFormat,
    clock: &'static KeyClock,
}

impl Transformer {
    pub fn new(store: Arc<dyn BlobStore>, format: OutputFormat) -> Self {
        Self::with_clock(store, format, KeyClock::global())
    }

    pub fn with_clock(
        store: Arc<dyn BlobStore>,
        format: OutputFormat,
        clock: &'static KeyClock,
    ) -> Self {
        Self { store, format, clock }
    }

    /// Transform the latest raw batch. `Ok(None)` means the raw namespace is empty.
    pub async fn run(&self) -> Result<Option<TransformSummary>, TransformError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<TransformSummary>, TransformError> {
        let Some(latest) = select::latest_object(self.store.as_ref(), Namespace::Raw).await? else {
            tracing::warn!("no files found in the raw data folder");
            return Ok(None);
        };
        tracing::info!(key = %latest.key, "processing raw batch");

        let bytes = self.store.get(&latest.key).await?;
        let batch = normalize_batch(&latest.key, &bytes)?;

        let body = match self.format {
            OutputFormat::Csv => encode_csv(&batch.records)?,
            OutputFormat::Json => encode_json(&batch.records)?,
        };

        let output_key = keys::transformed_key(self.clock.stamp(now), self.format.extension());
        self.store.put(&output_key, body, self.format.content_type()).await?;

        tracing::info!(
            key = %output_key,
            records = batch.records.len(),
            schema = batch.schema.map(|s| s.as_str()).unwrap_or("none"),
            "transformed data saved"
        );

        Ok(Some(TransformSummary {
            source_key: latest.key,
            output_key,
            schema: batch.schema,
            records: batch.records.len(),
        }))
    }
}
