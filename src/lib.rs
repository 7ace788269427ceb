//! A buffered telemetry channel for [Azure Application Insights].
//!
//! [Azure Application Insights]: https://docs.microsoft.com/en-us/azure/azure-monitor/app/app-insights-overview
//!
//! **Disclaimer**: This is not an official Microsoft product.
//!
//! The channel sits at the end of a telemetry pipeline. It turns loosely shaped telemetry
//! items into Application Insights envelopes, buffers them (optionally persisted in a
//! session storage so they survive a restart), sends them in batches and retries failed
//! batches with an exponential backoff.
//!
//! # Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest-client")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
//! use application_insights_channel::{Sender, SenderConfig, TelemetryItem};
//! use serde_json::json;
//!
//! let config = SenderConfig::from_connection_string(
//!     "InstrumentationKey=...;IngestionEndpoint=https://westeurope-1.in.applicationinsights.azure.com/",
//! )?;
//! let mut sender = Sender::builder()
//!     .with_http_client(reqwest::Client::new())
//!     .initialize(config);
//!
//! let item = TelemetryItem::new("EventData").with_base_data(json!({ "name": "started" }));
//! sender.process_telemetry(&item).await;
//!
//! // Call `on_timer` once `timer_deadline` passed, or send right away:
//! sender.flush().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Telemetry kinds
//!
//! The `baseType` of an item selects the Application Insights telemetry type:
//!
//! | `baseType`                | Application Insights telemetry type |
//! | ------------------------- | ----------------------------------- |
//! | `EventData`               | Event                               |
//! | `MessageData`             | Trace                               |
//! | `ExceptionData`           | Exception                           |
//! | `MetricData`              | Metric                              |
//! | `PageviewData`            | Page view                           |
//! | `PageviewPerformanceData` | Page view performance               |
//! | `RemoteDependencyData`    | Dependency                          |
//! | anything else             | Event, with a `baseTypeSource` property |
//!
//! Custom data (`data`) is split into custom measurements (numbers) and custom properties
//! (everything else).
//!
//! # Errors
//!
//! Sending never fails towards the caller. Problems are reported to the
//! [`DiagnosticLogger`], which mirrors them to [`tracing`] and queues a de-duplicated
//! subset for reporting.
//!
//! # Features
//!
//! - `reqwest-client`, `reqwest-client-vendored-tls`, `reqwest-client-rustls`: implement
//!   [`HttpClient`] for `reqwest::Client`.
#![warn(missing_docs, unreachable_pub, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod backoff;
mod buffer;
mod clock;
mod config;
mod connection_string;
mod convert;
mod diagnostics;
mod envelope_creator;
mod error;
mod http_client;
mod models;
mod offline;
mod sample;
mod sender;
pub mod serializer;
mod storage;
mod tags;
mod telemetry_item;
mod transport;
mod uploader;
mod validator;

pub use clock::{Clock, SystemClock};
pub use config::{
    Configuration, SenderConfig, DEFAULT_EVENTS_LIMIT_IN_MEM, DEFAULT_MAX_BATCH_INTERVAL,
    DEFAULT_MAX_BATCH_SIZE_IN_BYTES, SENDER_IDENTIFIER,
};
pub use connection_string::ParseError;
pub use diagnostics::{
    DiagnosticLogger, DiagnosticLoggerConfig, InternalLogMessage, InternalMessageId,
    LoggingSeverity,
};
pub use error::{Error, StorageError};
pub use http_client::{HttpClient, HttpError};
pub use models::{Envelope, Measurements, Properties, Tags};
pub use offline::OfflineListener;
pub use sender::{SendRequestReason, Sender, SenderBuilder, SenderState, TelemetryProcessor};
pub use storage::{
    can_use_session_storage, FileSessionStorage, InMemorySessionStorage, SessionStorage,
};
pub use telemetry_item::{
    AppExt, BoxError, DeviceExt, Extensions, OsExt, TelemetryInitializer, TelemetryItem,
    TelemetryKind, TraceExt, UserExt, WebExt,
};
pub use transport::{BeaconClient, CrossDomainClient, TransportKind, BEACON_CONTENT_TYPE};
pub use validator::{DefaultValidator, Validator};
