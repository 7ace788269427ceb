use crate::{
    models::{Measurements, Properties, DATA_VERSION},
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// An instance of PageView represents a generic action on a page like a button click.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageViewData {
    pub(crate) ver: i64,
    pub(crate) name: String,
    pub(crate) url: Option<String>,
    /// Request duration in format `DD.HH:MM:SS.MMMMMM`.
    pub(crate) duration: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) properties: Properties,
    pub(crate) measurements: Measurements,
}

impl PageViewData {
    pub(crate) fn new(name: String, properties: Properties, measurements: Measurements) -> Self {
        Self {
            ver: DATA_VERSION,
            name,
            url: None,
            duration: None,
            id: None,
            properties,
            measurements,
        }
    }
}

impl Contract for PageViewData {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("ver", FieldType::REQUIRED, FieldValue::Int(self.ver)),
            Field::new("name", FieldType::DEFAULT, self.name.as_str()),
            Field::new("url", FieldType::DEFAULT, self.url.as_deref()),
            Field::new("duration", FieldType::DEFAULT, self.duration.as_deref()),
            Field::new("properties", FieldType::DEFAULT, Some(&self.properties)),
            Field::new("measurements", FieldType::DEFAULT, Some(&self.measurements)),
            Field::new("id", FieldType::DEFAULT, self.id.as_deref()),
        ]
    }
}
