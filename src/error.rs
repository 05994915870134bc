// src/error.rs
use std::num::ParseFloatError;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the pipeline can hit. None of them are recovered from:
/// the first one aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Header row is empty or lacks the timestamp column
    #[error("malformed header: {message}")]
    MalformedHeader { message: String },

    /// Timestamp cell is not RFC3339
    #[error("invalid timestamp in row {row}: '{value}'")]
    InvalidTimestamp {
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Non-empty load cell that is not a float
    #[error("invalid number in row {row}, column '{column}': '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// Dataset could not be fetched
    #[error("error downloading dataset from {url}: {message}")]
    Download { url: String, message: String },

    /// Broker unreachable or refused the session
    #[error("could not connect to sink at {broker}: {message}")]
    SinkConnect { broker: String, message: String },

    /// Broker did not take a message
    #[error("error publishing to topic '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// CSV body could not be decoded
    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }

    pub fn invalid_timestamp(
        row: usize,
        value: impl Into<String>,
        source: chrono::ParseError,
    ) -> Self {
        Self::InvalidTimestamp {
            row,
            value: value.into(),
            source,
        }
    }

    pub fn invalid_number(
        row: usize,
        column: impl Into<String>,
        value: impl Into<String>,
        source: ParseFloatError,
    ) -> Self {
        Self::InvalidNumber {
            row,
            column: column.into(),
            value: value.into(),
            source,
        }
    }

    pub fn download(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn sink_connect(broker: impl Into<String>, message: impl ToString) -> Self {
        Self::SinkConnect {
            broker: broker.into(),
            message: message.to_string(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl ToString) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}
