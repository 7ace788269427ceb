use crate::{connection_string::ParseError, http_client::HttpError};

/// Errors that occurred while setting up or running the channel.
///
/// The send pipeline itself never returns these to the caller of
/// [`Sender::process_telemetry`](crate::Sender::process_telemetry); they surface from
/// configuration entry points and are folded into internal diagnostics everywhere else.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    ConnectionString(#[from] ParseError),

    /// The configuration object could not be deserialized.
    #[error("deserializing configuration failed with {0}")]
    Configuration(serde_json::Error),

    /// Reading from or writing to session storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A send buffer slot could not be encoded or decoded.
    #[error("send buffer encoding failed with {0}")]
    BufferEncoding(serde_json::Error),

    /// Could not complete the HTTP request to Application Insights to send telemetry data.
    #[error("sending upload request failed with {0}")]
    UploadConnection(HttpError),

    /// Application Insights responded with something that is not a transmission summary.
    #[error("deserializing upload response failed with {0}")]
    UploadDeserializeResponse(serde_json::Error),
}

/// Errors reported by a [`SessionStorage`](crate::SessionStorage) backend.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// The backend refused to read the given key.
    #[error("cannot read storage key {key}: {reason}")]
    Read {
        /// Storage key.
        key: String,
        /// Backend specific description.
        reason: String,
    },

    /// The backend refused to write the given key, e.g. because the quota is exceeded.
    #[error("cannot write storage key {key}: {reason}")]
    Write {
        /// Storage key.
        key: String,
        /// Backend specific description.
        reason: String,
    },

    /// I/O failure of a file backed storage.
    #[error("storage I/O failed with {0}")]
    Io(#[from] std::io::Error),
}
