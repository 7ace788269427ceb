use crate::{
    models::{Measurements, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// Instances of Event represent structured event records that can be grouped and searched by their
/// properties. Event data item also creates a metric of event count by name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EventData {
    /// Schema version
    pub(crate) ver: i64,

    /// Event name. Keep it low cardinality to allow proper grouping and useful metrics.
    pub(crate) name: String,

    /// Collection of custom properties.
    pub(crate) properties: Properties,

    /// Collection of custom measurements.
    pub(crate) measurements: Measurements,
}

impl EventData {
    pub(crate) fn new(name: String, properties: Properties, measurements: Measurements) -> Self {
        Self {
            ver: DATA_VERSION,
            name,
            properties,
            measurements,
        }
    }
}

impl Contract for EventData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("name", FieldType::REQUIRED, self.name.as_str()),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
            Field::new("measurements", FieldType::DEFAULT, Some(&self.measurements)),
        ]
    }
}
