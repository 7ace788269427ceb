use crate::{
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    models::{Measurements, Properties},
};
use serde_json::{json, Value};

pub(crate) const MAX_NAME_LENGTH: usize = 150;
pub(crate) const MAX_ID_LENGTH: usize = 128;
pub(crate) const MAX_PROPERTY_VALUE_LENGTH: usize = 8192;
pub(crate) const MAX_STRING_LENGTH: usize = 1024;
pub(crate) const MAX_URL_LENGTH: usize = 2048;
pub(crate) const MAX_MESSAGE_LENGTH: usize = 32768;
pub(crate) const MAX_EXCEPTION_LENGTH: usize = 32768;

/// Truncate `s` to at most `max` characters.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Trim and cap a name (property key, event name).
pub(crate) fn sanitize_key(logger: &DiagnosticLogger, name: &str) -> String {
    let name = name.trim();
    if char_len(name) > MAX_NAME_LENGTH {
        let truncated = truncate_chars(name, MAX_NAME_LENGTH);
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::NameTooLong,
            format!(
                "name is too long.  It has been truncated to {} characters.",
                MAX_NAME_LENGTH
            ),
            Some(json!({ "name": truncated })),
            true,
        );
        truncated.to_string()
    } else {
        name.to_string()
    }
}

/// Sanitize `key`. If that changed it, add a 3 digit suffix until it does not collide with
/// a key of `existing`.
pub(crate) fn sanitize_key_and_add_uniqueness(
    logger: &DiagnosticLogger,
    key: &str,
    existing: &serde_json::Map<String, Value>,
) -> String {
    let field = sanitize_key(logger, key);
    if char_len(&field) == char_len(key) {
        return field;
    }

    let mut unique = field.clone();
    let mut i = 0;
    while existing.contains_key(&unique) {
        i += 1;
        unique = format!(
            "{}{}",
            truncate_chars(&field, MAX_NAME_LENGTH - 3),
            pad_number(i)
        );
    }
    unique
}

fn pad_number(n: usize) -> String {
    let padded = format!("00{}", n);
    padded[padded.len() - 3..].to_string()
}

/// Trim and cap a string value.
pub(crate) fn sanitize_string(logger: &DiagnosticLogger, value: &str, max_length: usize) -> String {
    let value = value.trim();
    if char_len(value) > max_length {
        let truncated = truncate_chars(value, max_length);
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::StringValueTooLong,
            format!(
                "string value is too long. It has been truncated to {} characters.",
                max_length
            ),
            Some(json!({ "value": truncated })),
            true,
        );
        truncated.to_string()
    } else {
        value.to_string()
    }
}

fn sanitize_input(
    logger: &DiagnosticLogger,
    input: &str,
    max_length: usize,
    message_id: InternalMessageId,
) -> String {
    let input = input.trim();
    if char_len(input) > max_length {
        let truncated = truncate_chars(input, max_length);
        logger.throw_internal(
            LoggingSeverity::Warning,
            message_id,
            format!(
                "input is too long, it has been truncated to {} characters.",
                max_length
            ),
            Some(json!({ "data": truncated })),
            true,
        );
        truncated.to_string()
    } else {
        input.to_string()
    }
}

pub(crate) fn sanitize_url(logger: &DiagnosticLogger, url: &str) -> String {
    sanitize_input(logger, url, MAX_URL_LENGTH, InternalMessageId::UrlTooLong)
}

pub(crate) fn sanitize_id(logger: &DiagnosticLogger, id: &str) -> String {
    sanitize_input(logger, id, MAX_ID_LENGTH, InternalMessageId::IdTooLong)
}

pub(crate) fn sanitize_message(logger: &DiagnosticLogger, message: &str) -> String {
    if char_len(message) > MAX_MESSAGE_LENGTH {
        let truncated = truncate_chars(message, MAX_MESSAGE_LENGTH);
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::MessageTruncated,
            format!(
                "message is too long, it has been truncated to {} characters.",
                MAX_MESSAGE_LENGTH
            ),
            Some(json!({ "message": truncated })),
            true,
        );
        truncated.to_string()
    } else {
        message.to_string()
    }
}

pub(crate) fn sanitize_exception(logger: &DiagnosticLogger, exception: &str) -> String {
    if char_len(exception) > MAX_EXCEPTION_LENGTH {
        let truncated = truncate_chars(exception, MAX_EXCEPTION_LENGTH);
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::ExceptionTruncated,
            format!(
                "exception is too long, it has been truncated to {} characters.",
                MAX_EXCEPTION_LENGTH
            ),
            Some(json!({ "exception": truncated })),
            true,
        );
        truncated.to_string()
    } else {
        exception.to_string()
    }
}

/// Sanitize keys and values of custom properties. Non-string values are written as JSON.
pub(crate) fn sanitize_properties(logger: &DiagnosticLogger, properties: &Properties) -> Properties {
    let mut sanitized = Properties::new();
    for (key, value) in properties {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = sanitize_string(logger, &value, MAX_PROPERTY_VALUE_LENGTH);
        let key = sanitize_key_and_add_uniqueness(logger, key, &sanitized);
        sanitized.insert(key, Value::String(value));
    }
    sanitized
}

/// Sanitize keys of custom measurements. Values are kept as they are.
pub(crate) fn sanitize_measurements(
    logger: &DiagnosticLogger,
    measurements: &Measurements,
) -> Measurements {
    let mut sanitized = Measurements::new();
    for (key, value) in measurements {
        let key = sanitize_key_and_add_uniqueness(logger, key, &sanitized);
        sanitized.insert(key, value.clone());
    }
    sanitized
}
