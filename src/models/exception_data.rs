use crate::{
    models::{ExceptionDetails, Measurements, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// An instance of Exception represents a handled or unhandled exception that occurred during
/// execution of the monitored application.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExceptionData {
    /// Schema version
    pub(crate) ver: i64,

    /// Exception chain - list of inner exceptions.
    pub(crate) exceptions: Vec<ExceptionDetails>,

    /// Severity level, 0 (verbose) to 4 (critical).
    pub(crate) severity_level: Option<i64>,

    /// Identifier of where the exception was thrown in code. Used for exceptions grouping.
    pub(crate) problem_id: Option<String>,

    /// Collection of custom properties.
    pub(crate) properties: Properties,

    /// Collection of custom measurements.
    pub(crate) measurements: Measurements,
}

impl ExceptionData {
    pub(crate) fn new(
        exceptions: Vec<ExceptionDetails>,
        severity_level: Option<i64>,
        problem_id: Option<String>,
        properties: Properties,
        measurements: Measurements,
    ) -> Self {
        Self {
            ver: DATA_VERSION,
            exceptions,
            severity_level,
            problem_id,
            properties,
            measurements,
        }
    }
}

impl Contract for ExceptionData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new(
                "exceptions",
                FieldType::REQUIRED | FieldType::ARRAY,
                FieldValue::Objects(self.exceptions.iter().map(|e| e as &dyn Contract).collect()),
            ),
            Field::new("severityLevel", FieldType::DEFAULT, self.severity_level),
            Field::new("problemId", FieldType::DEFAULT, self.problem_id.as_deref()),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
            Field::new("measurements", FieldType::DEFAULT, Some(&self.measurements)),
        ]
    }
}
