use crate::{
    models::{Data, Measurements, Properties, Tags},
    serializer::{Contract, Field, FieldType, FieldValue},
};

const ENVELOPE_VERSION: i64 = 1;
const DEFAULT_SAMPLE_RATE: f64 = 100.0;

/// System variables for a telemetry item.
///
/// Telemetry initializers receive the envelope before it is serialized and may change its
/// tags, custom properties and sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub(crate) ver: i64,
    pub(crate) name: String,
    pub(crate) time: String,
    pub(crate) i_key: Option<String>,
    pub(crate) sample_rate: f64,
    pub(crate) tags: Tags,
    pub(crate) data: Data,
}

impl Envelope {
    pub(crate) fn new(i_key: Option<String>, time: String, data: Data) -> Self {
        let key = i_key.as_deref().unwrap_or_default().replace('-', "");
        Self {
            ver: ENVELOPE_VERSION,
            name: format!("Microsoft.ApplicationInsights.{}.{}", key, data.envelope_type()),
            time,
            i_key,
            sample_rate: DEFAULT_SAMPLE_RATE,
            tags: Tags::new(),
            data,
        }
    }

    /// Envelope name, `Microsoft.ApplicationInsights.<key>.<type>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instrumentation key.
    pub fn i_key(&self) -> Option<&str> {
        self.i_key.as_deref()
    }

    /// Event time as an ISO 8601 string.
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Wire name of the domain payload, e.g. `EventData`.
    pub fn base_type(&self) -> &'static str {
        self.data.base_type()
    }

    /// Percentage of items this one represents.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Override the sample rate. `100` is not written to the wire.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Context tags.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Context tags, for changing.
    pub fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    /// Custom properties of the domain payload.
    pub fn properties(&self) -> &Properties {
        self.data.properties()
    }

    /// Custom properties, for changing.
    pub fn properties_mut(&mut self) -> &mut Properties {
        self.data.properties_mut()
    }

    /// Custom measurements, if the payload kind has them.
    pub fn measurements_mut(&mut self) -> Option<&mut Measurements> {
        self.data.measurements_mut()
    }
}

impl Contract for Envelope {
    fn fields(&self) -> Vec<Field<'_>> {
        let sample_rate_kind = if self.sample_rate == DEFAULT_SAMPLE_RATE {
            FieldType::HIDDEN
        } else {
            FieldType::REQUIRED
        };
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("name", FieldType::REQUIRED, self.name.as_str()),
            Field::new("time", FieldType::REQUIRED, self.time.as_str()),
            Field::new("iKey", FieldType::REQUIRED, self.i_key.as_deref()),
            Field::new("sampleRate", sample_rate_kind, FieldValue::Num(self.sample_rate)),
            Field::new("tags", FieldType::REQUIRED, Some(&self.tags)),
            Field::new("data", FieldType::REQUIRED, FieldValue::Object(&self.data)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::DiagnosticLogger,
        models::{EventData, MessageData},
        serializer::Serializer,
    };
    use serde_json::json;

    #[test]
    fn name_contains_key_without_dashes() {
        let envelope = Envelope::new(
            Some("b7170927-2d1c-44f1-acec-59f4e1751c11".into()),
            "2020-06-21T10:40:00.000Z".into(),
            Data::Event(EventData::new("e".into(), Properties::new(), Measurements::new())),
        );
        assert_eq!(
            "Microsoft.ApplicationInsights.b71709272d1c44f1acec59f4e1751c11.Event",
            envelope.name()
        );
        assert_eq!(Some("b7170927-2d1c-44f1-acec-59f4e1751c11"), envelope.i_key());
    }

    #[test]
    fn name_without_key_has_no_placeholder() {
        let envelope = Envelope::new(
            None,
            "2020-06-21T10:40:00.000Z".into(),
            Data::Message(MessageData::new("m".into(), None, Properties::new())),
        );
        assert_eq!("Microsoft.ApplicationInsights..Message", envelope.name());
    }

    #[test]
    fn serialization_format() {
        let logger = DiagnosticLogger::default();
        let mut envelope = Envelope::new(
            Some("key".into()),
            "2020-06-21T10:40:00.000Z".into(),
            Data::Message(MessageData::new("hello world".into(), None, Properties::new())),
        );
        let serialized = Serializer::new(&logger).serialize(&envelope);
        let expected = "{\"ver\":1,\"name\":\"Microsoft.ApplicationInsights.key.Message\",\"time\":\"2020-06-21T10:40:00.000Z\",\"iKey\":\"key\",\"tags\":{},\"data\":{\"baseType\":\"MessageData\",\"baseData\":{\"ver\":2,\"message\":\"hello world\",\"properties\":{}}}}";
        assert_eq!(expected, serialized);

        envelope.set_sample_rate(33.3);
        let value = Serializer::new(&logger).serialize_to_value(&envelope);
        assert_eq!(json!(33.3), value["sampleRate"]);
    }
}
