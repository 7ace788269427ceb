use crate::{
    models::{
        EventData, ExceptionData, Measurements, MessageData, MetricData, PageViewData,
        PageViewPerformanceData, Properties, RemoteDependencyData,
    },
    serializer::{Contract, Field, FieldType, FieldValue},
};

/// Data struct to contain both B and C sections.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Data {
    Event(EventData),
    Exception(ExceptionData),
    Message(MessageData),
    Metric(MetricData),
    PageView(PageViewData),
    PageViewPerformance(PageViewPerformanceData),
    RemoteDependency(RemoteDependencyData),
}

impl Data {
    /// Name of the domain payload on the wire.
    pub(crate) fn base_type(&self) -> &'static str {
        match self {
            Data::Event(_) => "EventData",
            Data::Exception(_) => "ExceptionData",
            Data::Message(_) => "MessageData",
            Data::Metric(_) => "MetricData",
            Data::PageView(_) => "PageviewData",
            Data::PageViewPerformance(_) => "PageviewPerformanceData",
            Data::RemoteDependency(_) => "RemoteDependencyData",
        }
    }

    /// Suffix of the envelope name.
    pub(crate) fn envelope_type(&self) -> &'static str {
        match self {
            Data::Event(_) => "Event",
            Data::Exception(_) => "Exception",
            Data::Message(_) => "Message",
            Data::Metric(_) => "Metric",
            Data::PageView(_) => "Pageview",
            Data::PageViewPerformance(_) => "PageviewPerformance",
            Data::RemoteDependency(_) => "RemoteDependency",
        }
    }

    fn base_data(&self) -> &dyn Contract {
        match self {
            Data::Event(data) => data,
            Data::Exception(data) => data,
            Data::Message(data) => data,
            Data::Metric(data) => data,
            Data::PageView(data) => data,
            Data::PageViewPerformance(data) => data,
            Data::RemoteDependency(data) => data,
        }
    }

    pub(crate) fn properties(&self) -> &Properties {
        match self {
            Data::Event(data) => &data.properties,
            Data::Exception(data) => &data.properties,
            Data::Message(data) => &data.properties,
            Data::Metric(data) => &data.properties,
            Data::PageView(data) => &data.properties,
            Data::PageViewPerformance(data) => &data.properties,
            Data::RemoteDependency(data) => &data.properties,
        }
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Data::Event(data) => &mut data.properties,
            Data::Exception(data) => &mut data.properties,
            Data::Message(data) => &mut data.properties,
            Data::Metric(data) => &mut data.properties,
            Data::PageView(data) => &mut data.properties,
            Data::PageViewPerformance(data) => &mut data.properties,
            Data::RemoteDependency(data) => &mut data.properties,
        }
    }

    /// Message and Metric payloads have no measurements.
    pub(crate) fn measurements_mut(&mut self) -> Option<&mut Measurements> {
        match self {
            Data::Event(data) => Some(&mut data.measurements),
            Data::Exception(data) => Some(&mut data.measurements),
            Data::Message(_) | Data::Metric(_) => None,
            Data::PageView(data) => Some(&mut data.measurements),
            Data::PageViewPerformance(data) => Some(&mut data.measurements),
            Data::RemoteDependency(data) => Some(&mut data.measurements),
        }
    }
}

impl Contract for Data {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("baseType", FieldType::REQUIRED, self.base_type()),
            Field::new(
                "baseData",
                FieldType::REQUIRED,
                FieldValue::Object(self.base_data()),
            ),
        ]
    }
}
