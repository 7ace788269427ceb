use crate::models::Envelope;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

/// Error type telemetry initializers may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Callback run on the envelope of an item before it is serialized. `Ok(false)` drops the item.
pub type TelemetryInitializer = Arc<dyn Fn(&mut Envelope) -> Result<bool, BoxError> + Send + Sync>;

/// Kind of a telemetry item, from its `baseType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TelemetryKind {
    /// `EventData`
    Event,
    /// `MessageData`
    Trace,
    /// `ExceptionData`
    Exception,
    /// `MetricData`
    Metric,
    /// `PageviewData`
    PageView,
    /// `PageviewPerformanceData`
    PageViewPerformance,
    /// `RemoteDependencyData`
    RemoteDependency,
    /// Any other base type. Sent as an event.
    Custom(String),
}

impl TelemetryKind {
    /// Kind for a `baseType` string.
    pub fn from_base_type(base_type: &str) -> Self {
        match base_type {
            "EventData" => TelemetryKind::Event,
            "MessageData" => TelemetryKind::Trace,
            "ExceptionData" => TelemetryKind::Exception,
            "MetricData" => TelemetryKind::Metric,
            "PageviewData" => TelemetryKind::PageView,
            "PageviewPerformanceData" => TelemetryKind::PageViewPerformance,
            "RemoteDependencyData" => TelemetryKind::RemoteDependency,
            other => TelemetryKind::Custom(other.to_string()),
        }
    }

    /// `baseType` string of the kind.
    pub fn base_type(&self) -> &str {
        match self {
            TelemetryKind::Event => "EventData",
            TelemetryKind::Trace => "MessageData",
            TelemetryKind::Exception => "ExceptionData",
            TelemetryKind::Metric => "MetricData",
            TelemetryKind::PageView => "PageviewData",
            TelemetryKind::PageViewPerformance => "PageviewPerformanceData",
            TelemetryKind::RemoteDependency => "RemoteDependencyData",
            TelemetryKind::Custom(base_type) => base_type,
        }
    }
}

/// A telemetry item as produced by the tracking layer.
///
/// The shape is loose on purpose: `base_data` and `data` are free-form JSON, which the
/// envelope creator of the item's kind picks apart.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryItem {
    /// Item name.
    pub name: Option<String>,
    /// Event time as an ISO 8601 string. Defaults to the time the envelope is created.
    pub time: Option<String>,
    /// Instrumentation key. Defaults to the configured key.
    #[serde(rename = "iKey")]
    pub i_key: Option<String>,
    /// Discriminator of `base_data`, e.g. `EventData`.
    pub base_type: Option<String>,
    /// Kind specific fields.
    pub base_data: Option<Value>,
    /// Custom data, split into properties and measurements.
    pub data: Option<Value>,
    /// Context tags. When maps repeat a key, the first map wins.
    #[serde(default)]
    pub tags: Vec<Map<String, Value>>,
    /// Structured context.
    #[serde(default)]
    pub ext: Extensions,
    /// Callbacks run on the envelope before it is buffered.
    #[serde(skip)]
    pub initializers: Vec<TelemetryInitializer>,
}

impl fmt::Debug for TelemetryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryItem")
            .field("name", &self.name)
            .field("time", &self.time)
            .field("i_key", &self.i_key)
            .field("base_type", &self.base_type)
            .field("base_data", &self.base_data)
            .field("data", &self.data)
            .field("tags", &self.tags)
            .field("ext", &self.ext)
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

impl TelemetryItem {
    /// Create an item of the given base type.
    pub fn new(base_type: impl Into<String>) -> Self {
        Self {
            base_type: Some(base_type.into()),
            ..Self::default()
        }
    }

    /// Set the item name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the kind specific fields.
    pub fn with_base_data(mut self, base_data: Value) -> Self {
        self.base_data = Some(base_data);
        self
    }

    /// Set the custom data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the instrumentation key.
    pub fn with_i_key(mut self, i_key: impl Into<String>) -> Self {
        self.i_key = Some(i_key.into());
        self
    }

    /// Set the event time.
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Append a map of context tags.
    pub fn with_tags(mut self, tags: Map<String, Value>) -> Self {
        self.tags.push(tags);
        self
    }

    /// Set the structured context.
    pub fn with_ext(mut self, ext: Extensions) -> Self {
        self.ext = ext;
        self
    }

    /// Add a telemetry initializer.
    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&mut Envelope) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.initializers.push(Arc::new(initializer));
        self
    }

    /// Kind of the item. `None` when no base type is set.
    pub fn kind(&self) -> Option<TelemetryKind> {
        self.base_type.as_deref().map(TelemetryKind::from_base_type)
    }
}

/// Structured context of a [`TelemetryItem`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Extensions {
    /// User context.
    pub user: UserExt,
    /// Device context.
    pub device: DeviceExt,
    /// Application context.
    pub app: AppExt,
    /// Operating system context.
    pub os: OsExt,
    /// Browser context.
    pub web: WebExt,
    /// Correlation context.
    pub trace: TraceExt,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct UserExt {
    pub id: Option<String>,
    pub auth_id: Option<String>,
    pub local_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct DeviceExt {
    pub id: Option<String>,
    pub local_id: Option<String>,
    pub device_class: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct AppExt {
    pub ses_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct OsExt {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct WebExt {
    pub browser_lang: Option<String>,
    pub browser_ver: Option<String>,
    pub browser: Option<String>,
    pub domain: Option<String>,
    pub is_manual: Option<bool>,
    pub screen_res: Option<String>,
    pub user_consent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TraceExt {
    #[serde(rename = "traceID")]
    pub trace_id: Option<String>,
    #[serde(rename = "parentID")]
    pub parent_id: Option<String>,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn deserializes_item() {
        let item: TelemetryItem = serde_json::from_str(
            r#"{
                "name": "evt",
                "iKey": "key",
                "baseType": "EventData",
                "baseData": { "name": "clicked" },
                "data": { "n": 1 },
                "tags": [{ "ai.user.id": "u" }],
                "ext": {
                    "user": { "id": "u", "authId": "a" },
                    "trace": { "traceID": "t", "parentID": "p" },
                    "web": { "isManual": true }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(Some(TelemetryKind::Event), item.kind());
        assert_eq!(Some("key".into()), item.i_key);
        assert_eq!(Some("a".into()), item.ext.user.auth_id);
        assert_eq!(Some("t".into()), item.ext.trace.trace_id);
        assert_eq!(Some(true), item.ext.web.is_manual);
        assert_eq!(1, item.tags.len());
        assert!(item.initializers.is_empty());
    }

    #[test_case("EventData", TelemetryKind::Event)]
    #[test_case("MessageData", TelemetryKind::Trace)]
    #[test_case("PageviewPerformanceData", TelemetryKind::PageViewPerformance)]
    #[test_case("RemoteDependencyData", TelemetryKind::RemoteDependency)]
    #[test_case("MyCustomData", TelemetryKind::Custom("MyCustomData".into()))]
    fn kind_round_trip(base_type: &str, kind: TelemetryKind) {
        assert_eq!(kind, TelemetryKind::from_base_type(base_type));
        assert_eq!(base_type, kind.base_type());
    }
}
