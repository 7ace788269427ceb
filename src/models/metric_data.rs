use crate::{
    models::{DataPoint, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// An instance of the Metric item is a list of measurements (single data points) and/or
/// aggregations.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MetricData {
    /// Schema version
    pub(crate) ver: i64,

    /// List of metrics. Only one metric in the list is currently supported by Application Insights
    /// storage. If multiple data points were sent only the first one will be used.
    pub(crate) metrics: Vec<DataPoint>,

    /// Collection of custom properties.
    pub(crate) properties: Properties,
}

impl MetricData {
    pub(crate) fn new(metrics: Vec<DataPoint>, properties: Properties) -> Self {
        Self {
            ver: DATA_VERSION,
            metrics,
            properties,
        }
    }
}

impl Contract for MetricData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new(
                "metrics",
                FieldType::REQUIRED | FieldType::ARRAY,
                FieldValue::Objects(self.metrics.iter().map(|m| m as &dyn Contract).collect()),
            ),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
        ]
    }
}
