use thiserror::Error;

/// Failure to turn a delivery envelope into a `SensorEvent`. Always fatal to the invocation.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed delivery envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("payload must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("payload field has the wrong type: {0}")]
    Field(#[source] serde_json::Error),
}

/// Sink-level fault: the store call itself failed, distinct from a rejected row.
#[derive(Error, Debug)]
pub enum SinkFault {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refusing archive key {0}")]
    InvalidKey(String),

    #[error("invalid store URL {0}")]
    InvalidUrl(String),

    #[error("'{0}' is not a valid table name")]
    InvalidTable(String),

    #[error("store task failed: {0}")]
    Task(String),
}

/// Fatal outcome of one pipeline run; the delivery platform redelivers the envelope.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("analytics store fault: {0}")]
    AnalyticsTransport(#[source] SinkFault),

    #[error("archive write to {key} failed: {source}")]
    Archive {
        key: String,
        #[source]
        source: SinkFault,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
