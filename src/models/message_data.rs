use crate::{
    models::{Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// Instances of Message represent printf-like trace statements that are text-searched. The
/// message does not have measurements.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MessageData {
    /// Schema version
    pub(crate) ver: i64,

    /// Trace message
    pub(crate) message: String,

    /// Trace severity level, 0 (verbose) to 4 (critical).
    pub(crate) severity_level: Option<i64>,

    /// Collection of custom properties.
    pub(crate) properties: Properties,
}

impl MessageData {
    pub(crate) fn new(message: String, severity_level: Option<i64>, properties: Properties) -> Self {
        Self {
            ver: DATA_VERSION,
            message,
            severity_level,
            properties,
        }
    }
}

impl Contract for MessageData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("message", FieldType::REQUIRED, self.message.as_str()),
            Field::new("severityLevel", FieldType::DEFAULT, self.severity_level),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
        ]
    }
}
