//! Turns loosely shaped [`TelemetryItem`]s into typed [`Envelope`]s.
//!
//! There is one creator per [`TelemetryKind`]. Items of unknown base types are sent as
//! events.

use crate::{
    convert::{
        extract_props_and_measurements, ms_to_time_span, time_to_string, value_to_ms,
        value_to_string,
    },
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    models::{
        sanitize_id, sanitize_measurements, sanitize_message, sanitize_properties,
        sanitize_string, sanitize_url, Data, DataPoint, DataPointType, Envelope, EventData,
        ExceptionData, ExceptionDetails, Measurements, MessageData, MetricData, PageViewData,
        PageViewPerformanceData, Properties, RemoteDependencyData, MAX_STRING_LENGTH,
        NOT_SPECIFIED,
    },
    tags::get_tags_for_item,
    telemetry_item::{TelemetryItem, TelemetryKind},
};
use serde_json::Value;
use std::time::SystemTime;

const HTTP_METHOD: &str = "http.method";
const DEPENDENCY_TYPE: &str = "Ajax";

/// Build the envelope of `item`. Returns `None` and reports a critical diagnostic when the
/// item has no `baseData`.
pub(crate) fn create_envelope(
    logger: &DiagnosticLogger,
    kind: &TelemetryKind,
    item: &TelemetryItem,
    i_key: Option<String>,
    now: SystemTime,
) -> Option<Envelope> {
    let Some(base_data) = item.base_data.as_ref().filter(|data| !data.is_null()) else {
        logger.throw_internal(
            LoggingSeverity::Critical,
            InternalMessageId::TelemetryEnvelopeInvalid,
            "telemetryItem.baseData cannot be null.",
            None,
            false,
        );
        return None;
    };

    let data = match kind {
        TelemetryKind::Event => event(logger, item, base_data, None),
        TelemetryKind::Custom(base_type) => event(logger, item, base_data, Some(base_type)),
        TelemetryKind::Trace => trace(logger, item, base_data),
        TelemetryKind::Exception => exception(logger, item, base_data),
        TelemetryKind::Metric => metric(logger, item, base_data),
        TelemetryKind::PageView => page_view(logger, item, base_data),
        TelemetryKind::PageViewPerformance => page_view_performance(logger, item, base_data),
        TelemetryKind::RemoteDependency => remote_dependency(logger, item, base_data),
    };

    let time = item.time.clone().unwrap_or_else(|| time_to_string(now));
    let mut envelope = Envelope::new(i_key, time, data);
    let tags = get_tags_for_item(item, envelope.properties_mut());
    envelope.tags = tags;
    Some(envelope)
}

fn get_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .filter(|v| !v.is_null())
        .map(value_to_string)
}

fn get_map(value: &Value, key: &str) -> Properties {
    value
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn name_or_not_specified(logger: &DiagnosticLogger, name: Option<&str>) -> String {
    name.map(|name| sanitize_string(logger, name, MAX_STRING_LENGTH))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.into())
}

fn event(
    logger: &DiagnosticLogger,
    item: &TelemetryItem,
    base_data: &Value,
    custom_base_type: Option<&str>,
) -> Data {
    let mut properties = Properties::new();
    let mut measurements = Measurements::new();
    match custom_base_type {
        None => {
            properties = get_map(base_data, "properties");
            measurements = get_map(base_data, "measurements");
        }
        Some(base_type) => {
            properties.insert("baseTypeSource".into(), Value::from(base_type));
            let mut fields = base_data.clone();
            if let Some(fields) = fields.as_object_mut() {
                fields.remove("name");
            }
            extract_props_and_measurements(Some(&fields), &mut properties, &mut measurements);
        }
    }
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut measurements);

    let name = get_string(base_data, "name").or_else(|| custom_base_type.map(String::from));
    Data::Event(EventData::new(
        name_or_not_specified(logger, name.as_deref()),
        sanitize_properties(logger, &properties),
        sanitize_measurements(logger, &measurements),
    ))
}

fn trace(logger: &DiagnosticLogger, item: &TelemetryItem, base_data: &Value) -> Data {
    let mut properties = get_map(base_data, "properties");
    let mut numbers = Measurements::new();
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut numbers);
    // Messages carry no measurements.
    for (key, value) in numbers {
        properties.insert(key, Value::String(value.to_string()));
    }

    let message = get_string(base_data, "message")
        .map(|message| sanitize_message(logger, &message))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.into());
    let severity_level = base_data.get("severityLevel").and_then(Value::as_i64);
    Data::Message(MessageData::new(
        message,
        severity_level,
        sanitize_properties(logger, &properties),
    ))
}

fn exception_details(logger: &DiagnosticLogger, details: &Value) -> ExceptionDetails {
    let type_name = get_string(details, "typeName").or_else(|| get_string(details, "name"));
    let message = get_string(details, "message");
    let stack = get_string(details, "stack");
    ExceptionDetails::new(
        logger,
        type_name.as_deref(),
        message.as_deref(),
        stack.as_deref(),
    )
}

fn exception(logger: &DiagnosticLogger, item: &TelemetryItem, base_data: &Value) -> Data {
    let mut properties = get_map(base_data, "properties");
    let mut measurements = get_map(base_data, "measurements");
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut measurements);

    let exceptions = match base_data.get("exceptions").and_then(Value::as_array) {
        Some(exceptions) => exceptions
            .iter()
            .map(|details| exception_details(logger, details))
            .collect(),
        None => {
            let error = base_data
                .get("exception")
                .or_else(|| base_data.get("error"))
                .unwrap_or(&Value::Null);
            vec![exception_details(logger, error)]
        }
    };

    Data::Exception(ExceptionData::new(
        exceptions,
        base_data.get("severityLevel").and_then(Value::as_i64),
        get_string(base_data, "problemId"),
        sanitize_properties(logger, &properties),
        sanitize_measurements(logger, &measurements),
    ))
}

fn metric(logger: &DiagnosticLogger, item: &TelemetryItem, base_data: &Value) -> Data {
    let mut properties = get_map(base_data, "properties");
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut Measurements::new());

    let count = base_data
        .get("sampleCount")
        .and_then(Value::as_i64)
        .filter(|count| *count > 0);
    let min = base_data.get("min").and_then(Value::as_f64);
    let max = base_data.get("max").and_then(Value::as_f64);
    let kind = if count.is_some() || min.is_some() || max.is_some() {
        DataPointType::Aggregation
    } else {
        DataPointType::Measurement
    };
    let name = get_string(base_data, "name");
    let point = DataPoint {
        name: name_or_not_specified(logger, name.as_deref()),
        kind,
        value: base_data.get("average").and_then(Value::as_f64),
        count,
        min,
        max,
        std_dev: base_data.get("stdDev").and_then(Value::as_f64),
    };
    Data::Metric(MetricData::new(
        vec![point],
        sanitize_properties(logger, &properties),
    ))
}

fn page_view(logger: &DiagnosticLogger, item: &TelemetryItem, base_data: &Value) -> Data {
    let mut properties = get_map(base_data, "properties");
    let mut measurements = get_map(base_data, "measurements");
    let mut data = item.data.clone();

    // The duration is not part of the custom dimensions; take the first one found.
    let duration = properties
        .remove("duration")
        .or_else(|| {
            data.as_mut()
                .and_then(Value::as_object_mut)
                .and_then(|data| data.remove("duration"))
        })
        .or_else(|| measurements.remove("duration"))
        .or_else(|| base_data.get("duration").cloned())
        .as_ref()
        .and_then(value_to_ms);

    if let Some(ref_uri) = get_string(base_data, "refUri") {
        properties.insert("refUri".into(), Value::String(ref_uri));
    }
    if let Some(page_type) = get_string(base_data, "pageType") {
        properties.insert("pageType".into(), Value::String(page_type));
    }
    if let Some(is_logged_in) = get_string(base_data, "isLoggedIn") {
        properties.insert("isLoggedIn".into(), Value::String(is_logged_in));
    }
    extract_props_and_measurements(data.as_ref(), &mut properties, &mut measurements);

    let name = get_string(base_data, "name");
    let mut page_view = PageViewData::new(
        name_or_not_specified(logger, name.as_deref()),
        sanitize_properties(logger, &properties),
        sanitize_measurements(logger, &measurements),
    );
    page_view.url = get_string(base_data, "uri")
        .or_else(|| get_string(base_data, "url"))
        .map(|url| sanitize_url(logger, &url));
    page_view.duration = duration.map(ms_to_time_span);
    page_view.id = get_string(base_data, "id")
        .or_else(|| item.ext.trace.trace_id.clone())
        .map(|id| sanitize_id(logger, &id));
    Data::PageView(page_view)
}

fn time_span_field(base_data: &Value, key: &str) -> Option<String> {
    match base_data.get(key)? {
        Value::String(span) => Some(span.clone()),
        other => value_to_ms(other).map(ms_to_time_span),
    }
}

fn page_view_performance(
    logger: &DiagnosticLogger,
    item: &TelemetryItem,
    base_data: &Value,
) -> Data {
    let mut properties = get_map(base_data, "properties");
    let mut measurements = get_map(base_data, "measurements");
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut measurements);

    let name = get_string(base_data, "name");
    let mut performance = PageViewPerformanceData::new(
        name_or_not_specified(logger, name.as_deref()),
        sanitize_properties(logger, &properties),
        sanitize_measurements(logger, &measurements),
    );
    performance.url = get_string(base_data, "uri")
        .or_else(|| get_string(base_data, "url"))
        .map(|url| sanitize_url(logger, &url));
    performance.duration = time_span_field(base_data, "duration");
    performance.perf_total = time_span_field(base_data, "perfTotal");
    performance.network_connect = time_span_field(base_data, "networkConnect");
    performance.sent_request = time_span_field(base_data, "sentRequest");
    performance.received_response = time_span_field(base_data, "receivedResponse");
    performance.dom_processing = time_span_field(base_data, "domProcessing");
    Data::PageViewPerformance(performance)
}

/// Target host, display name and data of a dependency call. Without a command name the
/// data is the path of the URL.
fn parse_dependency_path(
    logger: &DiagnosticLogger,
    absolute_url: Option<&str>,
    method: &str,
    command_name: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let Some(absolute_url) = absolute_url.filter(|url| !url.is_empty()) else {
        let command_name = command_name.map(String::from);
        return (command_name.clone(), command_name.clone(), command_name);
    };
    let parsed = absolute_url
        .parse::<http::Uri>()
        .ok()
        .filter(|uri| uri.authority().is_some());
    let target = parsed
        .as_ref()
        .and_then(http::Uri::authority)
        .map(|authority| authority.as_str().rsplit('@').next().unwrap_or_default().to_string())
        .unwrap_or_else(|| absolute_url.to_string());
    match command_name {
        Some(name) => (Some(target), Some(name.to_string()), Some(name.to_string())),
        None => {
            let raw_path = parsed.as_ref().map_or("", http::Uri::path);
            let path = if raw_path.starts_with('/') {
                raw_path.to_string()
            } else {
                format!("/{}", raw_path)
            };
            let name = sanitize_string(logger, &format!("{} {}", method, path), MAX_STRING_LENGTH);
            (Some(target), Some(name), Some(raw_path.to_string()))
        }
    }
}

fn remote_dependency(logger: &DiagnosticLogger, item: &TelemetryItem, base_data: &Value) -> Data {
    let mut properties = get_map(base_data, "properties");
    let mut measurements = get_map(base_data, "measurements");
    extract_props_and_measurements(item.data.as_ref(), &mut properties, &mut measurements);

    let method = properties
        .get(HTTP_METHOD)
        .filter(|m| !m.is_null())
        .map(value_to_string)
        .unwrap_or_else(|| "GET".into());
    let command_name = get_string(base_data, "name");
    let target_url = get_string(base_data, "target");
    let (target, name, path_data) = parse_dependency_path(
        logger,
        target_url.as_deref(),
        &method,
        command_name.as_deref(),
    );

    let mut target = target.map(|target| sanitize_string(logger, &target, MAX_STRING_LENGTH));
    if let (Some(target), Some(correlation)) =
        (target.as_mut(), get_string(base_data, "correlationContext"))
    {
        target.push_str(" | ");
        target.push_str(&correlation);
    }

    Data::RemoteDependency(RemoteDependencyData {
        id: get_string(base_data, "id").map(|id| sanitize_id(logger, &id)),
        name: name
            .map(|name| sanitize_string(logger, &name, MAX_STRING_LENGTH))
            .unwrap_or_default(),
        result_code: get_string(base_data, "responseCode")
            .or_else(|| get_string(base_data, "resultCode")),
        duration: ms_to_time_span(
            base_data
                .get("duration")
                .and_then(value_to_ms)
                .unwrap_or_default(),
        ),
        success: base_data.get("success").and_then(Value::as_bool),
        data: command_name
            .map(|name| sanitize_url(logger, &name))
            .filter(|data| !data.is_empty())
            .or(path_data),
        target,
        type_: Some(DEPENDENCY_TYPE.into()),
        properties: sanitize_properties(logger, &properties),
        measurements: sanitize_measurements(logger, &measurements),
        ..Default::default()
    })
}
