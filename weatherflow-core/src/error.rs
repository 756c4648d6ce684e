use thiserror::Error;

/// Failures talking to a blob store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("store {op} request for '{key}' failed with status {status}: {body}")]
    Status {
        op: &'static str,
        key: String,
        status: u16,
        body: String,
    },

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("failed to parse object listing: {0}")]
    Listing(String),

    #[error("store client error: {0}")]
    Sdk(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures fetching current conditions for one location.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("weather API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to reach weather API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse weather API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures turning a raw batch into a transformed batch.
///
/// Any of these aborts the whole transform run; nothing is written.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("raw batch '{key}' is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("raw batch '{0}' is not a JSON array of records")]
    NotAnArray(String),

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} matches no known raw schema")]
    UnknownSchema { index: usize },

    #[error("record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index} has field '{field}' of the wrong type, expected {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("failed to encode transformed batch: {0}")]
    Encode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<csv::Error> for TransformError {
    fn from(err: csv::Error) -> Self {
        TransformError::Encode(err.to_string())
    }
}

/// Failures loading a transformed batch for the dashboard.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("transformed batch '{key}' is not valid UTF-8")]
    Utf8 { key: String },

    #[error("transformed batch '{key}' could not be parsed: {reason}")]
    Parse { key: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_record_and_field() {
        let err = TransformError::MissingField {
            index: 3,
            field: "city",
        };
        let msg = err.to_string();

        assert!(msg.contains("record 3"));
        assert!(msg.contains("'city'"));
    }

    #[test]
    fn store_errors_pass_through_transform_errors() {
        let err: TransformError = StoreError::NotFound("raw/x.json".into()).into();
        assert_eq!(err.to_string(), "object not found: raw/x.json");
    }
}
