use crate::{
    models::{Measurements, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// An instance of Remote Dependency represents an interaction of the monitored component with a
/// remote component/service like SQL or an HTTP endpoint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RemoteDependencyData {
    pub(crate) ver: i64,
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) result_code: Option<String>,
    pub(crate) duration: String,
    pub(crate) success: Option<bool>,
    pub(crate) data: Option<String>,
    pub(crate) target: Option<String>,
    pub(crate) type_: Option<String>,
    pub(crate) properties: Properties,
    pub(crate) measurements: Measurements,
}

impl Default for RemoteDependencyData {
    fn default() -> Self {
        Self {
            ver: DATA_VERSION,
            id: Option::default(),
            name: String::default(),
            result_code: Option::default(),
            duration: String::default(),
            success: Some(true),
            data: Option::default(),
            target: Option::default(),
            type_: Option::default(),
            properties: Properties::default(),
            measurements: Measurements::default(),
        }
    }
}

impl Contract for RemoteDependencyData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("id", FieldType::REQUIRED, self.id.as_deref()),
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("name", FieldType::DEFAULT, self.name.as_str()),
            Field::new("resultCode", FieldType::DEFAULT, self.result_code.as_deref()),
            Field::new("duration", FieldType::DEFAULT, self.duration.as_str()),
            Field::new("success", FieldType::DEFAULT, self.success),
            Field::new("data", FieldType::DEFAULT, self.data.as_deref()),
            Field::new("target", FieldType::DEFAULT, self.target.as_deref()),
            Field::new("type", FieldType::DEFAULT, self.type_.as_deref()),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
            Field::new("measurements", FieldType::DEFAULT, Some(&self.measurements)),
        ]
    }
}
