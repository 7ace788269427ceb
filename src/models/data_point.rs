use crate::serializer::{Contract, Field, FieldType, FieldValue};

/// Type of the metric data measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataPointType {
    Measurement = 0,
    Aggregation = 1,
}

/// Metric data single measurement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataPoint {
    /// Name of the metric.
    pub(crate) name: String,

    /// Metric type. Single measurement or the aggregated value.
    pub(crate) kind: DataPointType,

    /// Single value for measurement. Sum of individual measurements for the aggregation.
    pub(crate) value: Option<f64>,

    /// Metric weight of the aggregated metric. Should not be set for a measurement.
    pub(crate) count: Option<i64>,

    /// Minimum value of the aggregated metric. Should not be set for a measurement.
    pub(crate) min: Option<f64>,

    /// Maximum value of the aggregated metric. Should not be set for a measurement.
    pub(crate) max: Option<f64>,

    /// Standard deviation of the aggregated metric. Should not be set for a measurement.
    pub(crate) std_dev: Option<f64>,
}

impl Contract for DataPoint {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("name", FieldType::REQUIRED, self.name.as_str()),
            Field::new("kind", FieldType::DEFAULT, FieldValue::Int(self.kind as i64)),
            Field::new("value", FieldType::REQUIRED, self.value),
            Field::new("count", FieldType::DEFAULT, self.count),
            Field::new("min", FieldType::DEFAULT, self.min),
            Field::new("max", FieldType::DEFAULT, self.max),
            Field::new("stdDev", FieldType::DEFAULT, self.std_dev),
        ]
    }
}
