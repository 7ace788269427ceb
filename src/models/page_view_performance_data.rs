use crate::{
    models::{Measurements, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// Timings of a page load. All durations use the format `DD.HH:MM:SS.MMMMMM`.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct PageViewPerformanceData {
    pub(crate) ver: i64,
    pub(crate) name: String,
    pub(crate) url: Option<String>,
    pub(crate) duration: Option<String>,
    /// Performance total in TimeSpan.
    pub(crate) perf_total: Option<String>,
    /// Network connection time in TimeSpan.
    pub(crate) network_connect: Option<String>,
    /// Sent request time in TimeSpan.
    pub(crate) sent_request: Option<String>,
    /// Received response time in TimeSpan.
    pub(crate) received_response: Option<String>,
    /// DOM processing time in TimeSpan.
    pub(crate) dom_processing: Option<String>,
    pub(crate) properties: Properties,
    pub(crate) measurements: Measurements,
}

impl PageViewPerformanceData {
    pub(crate) fn new(name: String, properties: Properties, measurements: Measurements) -> Self {
        Self {
            ver: DATA_VERSION,
            name,
            properties,
            measurements,
            ..Default::default()
        }
    }
}

impl Contract for PageViewPerformanceData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("name", FieldType::DEFAULT, self.name.as_str()),
            Field::new("url", FieldType::DEFAULT, self.url.as_deref()),
            Field::new("duration", FieldType::DEFAULT, self.duration.as_deref()),
            Field::new("perfTotal", FieldType::DEFAULT, self.perf_total.as_deref()),
            Field::new("networkConnect", FieldType::DEFAULT, self.network_connect.as_deref()),
            Field::new("sentRequest", FieldType::DEFAULT, self.sent_request.as_deref()),
            Field::new("receivedResponse", FieldType::DEFAULT, self.received_response.as_deref()),
            Field::new("domProcessing", FieldType::DEFAULT, self.dom_processing.as_deref()),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
            Field::new("measurements", FieldType::DEFAULT, Some(&self.measurements)),
        ]
    }
}
