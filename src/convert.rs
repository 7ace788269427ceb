use crate::models::{Measurements, Properties};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::time::SystemTime;

/// Format milliseconds as a time span, `[d.]hh:mm:ss.mmm`. Negative and non-finite values are
/// treated as zero.
pub(crate) fn ms_to_time_span(total_ms: f64) -> String {
    let total_ms = if total_ms.is_finite() && total_ms > 0.0 {
        total_ms.round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let s = total_ms / 1000 % 60;
    let m = total_ms / (1000 * 60) % 60;
    let h = total_ms / (1000 * 60 * 60) % 24;
    let d = total_ms / (1000 * 60 * 60 * 24);
    let days = if d > 0 {
        format!("{}.", d)
    } else {
        String::new()
    };
    format!("{}{:0>2}:{:0>2}:{:0>2}.{:0>3}", days, h, m, s, ms)
}

pub(crate) fn time_to_string(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Split free-form custom data: numbers become measurements, strings become properties and
/// every other value is written into properties as JSON.
pub(crate) fn extract_props_and_measurements(
    data: Option<&Value>,
    properties: &mut Properties,
    measurements: &mut Measurements,
) {
    let Some(Value::Object(data)) = data else {
        return;
    };
    for (key, value) in data {
        match value {
            Value::Number(_) => {
                measurements.insert(key.clone(), value.clone());
            }
            Value::String(_) => {
                properties.insert(key.clone(), value.clone());
            }
            other => {
                properties.insert(key.clone(), Value::String(other.to_string()));
            }
        }
    }
}

/// Number of milliseconds in a JSON value: numbers as they are, strings parsed.
pub(crate) fn value_to_ms(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text of a JSON value as JavaScript's `toString` would write it.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
