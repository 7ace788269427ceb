//! Channel configuration.
//!
//! [`Configuration`] is the shared configuration object of the host, usually read from
//! JSON. Each extension resolves its own settings from it with [`SenderConfig::resolve`]:
//! the extension specific map wins over the top-level value, which wins over the default.

use crate::{
    connection_string::{ConnectionString, DEFAULT_BREEZE_ENDPOINT},
    diagnostics::DiagnosticLoggerConfig,
    Error,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{collections::HashMap, time::Duration};

/// Identifier the sender resolves its extension config with.
pub const SENDER_IDENTIFIER: &str = "AppInsightsChannelPlugin";

/// Default maximum size of a batch, in bytes.
pub const DEFAULT_MAX_BATCH_SIZE_IN_BYTES: usize = 102_400;

/// Default interval after which buffered telemetry is sent.
pub const DEFAULT_MAX_BATCH_INTERVAL: Duration = Duration::from_millis(15_000);

/// Default limit of the in-memory buffer.
pub const DEFAULT_EVENTS_LIMIT_IN_MEM: usize = 10_000;

/// Host configuration object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct Configuration {
    pub instrumentation_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub emit_line_delimited_json: Option<bool>,
    pub max_batch_size_in_bytes: Option<usize>,
    /// Milliseconds.
    pub max_batch_interval: Option<u64>,
    pub disable_telemetry: Option<bool>,
    pub enable_session_storage_buffer: Option<bool>,
    pub is_retry_disabled: Option<bool>,
    pub is_beacon_api_disabled: Option<bool>,
    pub onunload_disable_beacon: Option<bool>,
    pub name_prefix: Option<String>,
    pub sampling_percentage: Option<f64>,
    pub events_limit_in_mem: Option<usize>,
    pub logging_level_console: Option<u8>,
    pub logging_level_telemetry: Option<u8>,
    pub max_message_limit: Option<usize>,
    /// Per extension overrides, keyed by extension identifier.
    pub extension_config: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl Configuration {
    /// Parse a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Configuration)
    }

    /// Settings of the diagnostic logger.
    pub fn diagnostic_logger_config(&self) -> DiagnosticLoggerConfig {
        let defaults = DiagnosticLoggerConfig::default();
        DiagnosticLoggerConfig {
            console_logging_level: self
                .logging_level_console
                .unwrap_or(defaults.console_logging_level),
            telemetry_logging_level: self
                .logging_level_telemetry
                .unwrap_or(defaults.telemetry_logging_level),
            max_message_limit: self
                .max_message_limit
                .unwrap_or(defaults.max_message_limit),
        }
    }

    fn extension_value<T: DeserializeOwned>(&self, identifier: &str, field: &str) -> Option<T> {
        self.extension_config
            .get(identifier)
            .and_then(|config| config.get(field))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Resolved settings of the [`Sender`](crate::Sender).
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    pub(crate) instrumentation_key: Option<String>,
    pub(crate) endpoint_url: String,
    pub(crate) emit_line_delimited_json: bool,
    pub(crate) max_batch_size_in_bytes: usize,
    pub(crate) max_batch_interval: Duration,
    pub(crate) disable_telemetry: bool,
    pub(crate) enable_session_storage_buffer: bool,
    pub(crate) is_retry_disabled: bool,
    pub(crate) is_beacon_api_disabled: bool,
    pub(crate) onunload_disable_beacon: bool,
    pub(crate) name_prefix: Option<String>,
    pub(crate) sampling_percentage: f64,
    pub(crate) events_limit_in_mem: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            instrumentation_key: None,
            endpoint_url: format!("{}/v2/track", DEFAULT_BREEZE_ENDPOINT),
            emit_line_delimited_json: false,
            max_batch_size_in_bytes: DEFAULT_MAX_BATCH_SIZE_IN_BYTES,
            max_batch_interval: DEFAULT_MAX_BATCH_INTERVAL,
            disable_telemetry: false,
            enable_session_storage_buffer: true,
            is_retry_disabled: false,
            is_beacon_api_disabled: true,
            onunload_disable_beacon: false,
            name_prefix: None,
            sampling_percentage: 100.0,
            events_limit_in_mem: DEFAULT_EVENTS_LIMIT_IN_MEM,
        }
    }
}

macro_rules! resolve {
    ($config:expr, $identifier:expr, $field:ident, $json_name:literal, $default:expr) => {
        $config
            .extension_value($identifier, $json_name)
            .or_else(|| $config.$field.clone())
            .unwrap_or($default)
    };
}

impl SenderConfig {
    /// Resolve the settings for the extension `identifier`.
    pub fn resolve(config: &Configuration, identifier: &str) -> Self {
        let defaults = Self::default();
        let max_batch_interval: u64 = resolve!(
            config,
            identifier,
            max_batch_interval,
            "maxBatchInterval",
            defaults.max_batch_interval.as_millis() as u64
        );
        Self {
            instrumentation_key: config
                .extension_value(identifier, "instrumentationKey")
                .or_else(|| config.instrumentation_key.clone()),
            endpoint_url: resolve!(
                config,
                identifier,
                endpoint_url,
                "endpointUrl",
                defaults.endpoint_url
            ),
            emit_line_delimited_json: resolve!(
                config,
                identifier,
                emit_line_delimited_json,
                "emitLineDelimitedJson",
                defaults.emit_line_delimited_json
            ),
            max_batch_size_in_bytes: resolve!(
                config,
                identifier,
                max_batch_size_in_bytes,
                "maxBatchSizeInBytes",
                defaults.max_batch_size_in_bytes
            ),
            max_batch_interval: Duration::from_millis(max_batch_interval),
            disable_telemetry: resolve!(
                config,
                identifier,
                disable_telemetry,
                "disableTelemetry",
                defaults.disable_telemetry
            ),
            enable_session_storage_buffer: resolve!(
                config,
                identifier,
                enable_session_storage_buffer,
                "enableSessionStorageBuffer",
                defaults.enable_session_storage_buffer
            ),
            is_retry_disabled: resolve!(
                config,
                identifier,
                is_retry_disabled,
                "isRetryDisabled",
                defaults.is_retry_disabled
            ),
            is_beacon_api_disabled: resolve!(
                config,
                identifier,
                is_beacon_api_disabled,
                "isBeaconApiDisabled",
                defaults.is_beacon_api_disabled
            ),
            onunload_disable_beacon: resolve!(
                config,
                identifier,
                onunload_disable_beacon,
                "onunloadDisableBeacon",
                defaults.onunload_disable_beacon
            ),
            name_prefix: config
                .extension_value(identifier, "namePrefix")
                .or_else(|| config.name_prefix.clone()),
            sampling_percentage: resolve!(
                config,
                identifier,
                sampling_percentage,
                "samplingPercentage",
                defaults.sampling_percentage
            ),
            events_limit_in_mem: resolve!(
                config,
                identifier,
                events_limit_in_mem,
                "eventsLimitInMem",
                defaults.events_limit_in_mem
            ),
        }
    }

    /// Settings for sending to the resource described by an Application Insights connection
    /// string, e.g. `InstrumentationKey=...;IngestionEndpoint=https://...`.
    pub fn from_connection_string(connection_string: impl AsRef<str>) -> Result<Self, Error> {
        let connection_string: ConnectionString = connection_string.as_ref().parse()?;
        Ok(Self {
            endpoint_url: connection_string.track_endpoint(),
            instrumentation_key: Some(connection_string.instrumentation_key),
            ..Self::default()
        })
    }

    /// Settings read from the `APPLICATIONINSIGHTS_CONNECTION_STRING` environment variable.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let connection_string = std::env::var("APPLICATIONINSIGHTS_CONNECTION_STRING")?;
        Ok(Self::from_connection_string(connection_string)?)
    }

    /// Instrumentation key used for items that do not carry their own.
    pub fn with_instrumentation_key(mut self, instrumentation_key: impl Into<String>) -> Self {
        self.instrumentation_key = Some(instrumentation_key.into());
        self
    }

    /// Ingestion endpoint.
    ///
    /// Default: `https://dc.services.visualstudio.com/v2/track`
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Join batches with newlines instead of sending a JSON array.
    pub fn with_emit_line_delimited_json(mut self, emit: bool) -> Self {
        self.emit_line_delimited_json = emit;
        self
    }

    /// Send the buffer before it would grow beyond this many bytes.
    ///
    /// Default: 102400
    pub fn with_max_batch_size_in_bytes(mut self, max: usize) -> Self {
        self.max_batch_size_in_bytes = max;
        self
    }

    /// Send buffered telemetry at least this often.
    ///
    /// Default: 15 seconds
    pub fn with_max_batch_interval(mut self, interval: Duration) -> Self {
        self.max_batch_interval = interval;
        self
    }

    /// Drop all telemetry instead of sending it.
    pub fn with_disable_telemetry(mut self, disable: bool) -> Self {
        self.disable_telemetry = disable;
        self
    }

    /// Persist the buffer in session storage when one is available.
    ///
    /// Default: true
    pub fn with_session_storage_buffer(mut self, enable: bool) -> Self {
        self.enable_session_storage_buffer = enable;
        self
    }

    /// Never retry failed sends.
    pub fn with_retry_disabled(mut self, disable: bool) -> Self {
        self.is_retry_disabled = disable;
        self
    }

    /// Do not use the beacon transport for regular sends.
    ///
    /// Default: true
    pub fn with_beacon_api_disabled(mut self, disable: bool) -> Self {
        self.is_beacon_api_disabled = disable;
        self
    }

    /// Do not use the beacon transport when flushing on unload.
    pub fn with_onunload_disable_beacon(mut self, disable: bool) -> Self {
        self.onunload_disable_beacon = disable;
        self
    }

    /// Prefix for the session storage keys.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Percentage (0 to 100) of telemetry to keep.
    ///
    /// Default: 100
    pub fn with_sampling_percentage(mut self, percentage: f64) -> Self {
        self.sampling_percentage = percentage;
        self
    }

    /// Limit of the in-memory buffer.
    ///
    /// Default: 10000
    pub fn with_events_limit_in_mem(mut self, limit: usize) -> Self {
        self.events_limit_in_mem = limit;
        self
    }

    /// Ingestion endpoint.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Instrumentation key used for items that do not carry their own.
    pub fn instrumentation_key(&self) -> Option<&str> {
        self.instrumentation_key.as_deref()
    }
}
