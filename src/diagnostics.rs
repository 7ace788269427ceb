//! Internal diagnostics of the channel.
//!
//! Every failure inside the send pipeline ends up here instead of being returned to the
//! caller. Messages are mirrored to [`tracing`] and a bounded, de-duplicated subset is
//! queued so that it can be reported as telemetry.

use serde::Serialize;
use serde_repr::Serialize_repr;
use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

/// Severity of an internal diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr)]
#[repr(u8)]
pub enum LoggingSeverity {
    /// Likely permanent data loss for the current item or batch.
    Critical = 1,
    /// Degraded behavior.
    Warning = 2,
}

/// Identifies the kind of an internal diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum InternalMessageId {
    BrowserCannotReadSessionStorage = 2,
    CannotSendEmptyTelemetry = 7,
    FailedToRestoreStorageBuffer = 13,
    InvalidEvent = 21,
    TransmissionFailed = 26,
    FailedToSetStorageBuffer = 40,
    InvalidBackendResponse = 43,
    CreateEnvelopeError = 47,
    CannotSerializeObject = 48,
    CannotSerializeObjectNonSerializable = 49,
    CircularReferenceDetected = 50,
    ExceptionTruncated = 52,
    ItemNotInArray = 54,
    MessageTruncated = 56,
    NameTooLong = 57,
    SampleRateOutOfRange = 58,
    SessionStorageBufferFull = 67,
    StringValueTooLong = 61,
    TelemetrySampledAndNotSent = 62,
    TelemetryEnvelopeInvalid = 63,
    UrlTooLong = 66,
    MessageLimitPerPVExceeded = 68,
    MissingRequiredFieldSpecification = 69,
    IdTooLong = 70,
    TelemetryInitializerFailed = 71,
    SenderNotInitialized = 72,
    InMemoryStorageBufferFull = 105,
}

/// A message as it is queued for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalLogMessage {
    /// Kind of the message.
    pub message_id: InternalMessageId,
    /// Severity it was reported with.
    pub severity: LoggingSeverity,
    /// Formatted text, including the message id and properties.
    pub message: String,
}

impl InternalLogMessage {
    fn new(
        severity: LoggingSeverity,
        message_id: InternalMessageId,
        text: &str,
        properties: Option<&serde_json::Value>,
        is_user_actionable: bool,
    ) -> Self {
        let prefix = if is_user_actionable {
            "AI: "
        } else {
            "AI (Internal): "
        };
        let mut message = format!(
            "{}{} message:{}",
            prefix,
            message_id as u16,
            sanitize_diagnostic_text(text)
        );
        if let Some(properties) = properties {
            message.push_str(" props:");
            message.push_str(&sanitize_diagnostic_text(&properties.to_string()));
        }
        Self {
            message_id,
            severity,
            message,
        }
    }
}

fn sanitize_diagnostic_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', ""))
}

/// Settings of the [`DiagnosticLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticLoggerConfig {
    /// `0`: nothing goes to the console, `1`: critical only, `2`: critical and warnings.
    pub console_logging_level: u8,
    /// Highest severity number queued for telemetry. `1` queues critical messages only.
    pub telemetry_logging_level: u8,
    /// Number of queued messages after which a single throttle message is queued.
    pub max_message_limit: usize,
}

impl Default for DiagnosticLoggerConfig {
    fn default() -> Self {
        Self {
            console_logging_level: 0,
            telemetry_logging_level: 1,
            max_message_limit: 25,
        }
    }
}

#[derive(Debug, Default)]
struct LoggerState {
    queue: Vec<InternalLogMessage>,
    message_count: usize,
    console_logged: HashSet<InternalMessageId>,
    queued: HashSet<InternalMessageId>,
    reported: HashMap<InternalMessageId, usize>,
}

/// Shared diagnostic logger.
#[derive(Debug, Default)]
pub struct DiagnosticLogger {
    config: DiagnosticLoggerConfig,
    state: Mutex<LoggerState>,
}

impl DiagnosticLogger {
    /// Create a logger with the given settings.
    pub fn new(config: DiagnosticLoggerConfig) -> Self {
        Self {
            config,
            state: Mutex::default(),
        }
    }

    /// Settings this logger was created with.
    pub fn config(&self) -> DiagnosticLoggerConfig {
        self.config
    }

    fn state(&self) -> MutexGuard<'_, LoggerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Report an internal diagnostic message. Never fails.
    pub fn throw_internal(
        &self,
        severity: LoggingSeverity,
        message_id: InternalMessageId,
        message: impl AsRef<str>,
        properties: Option<serde_json::Value>,
        is_user_actionable: bool,
    ) {
        let message = InternalLogMessage::new(
            severity,
            message_id,
            message.as_ref(),
            properties.as_ref(),
            is_user_actionable,
        );
        let console_warnings = self.config.console_logging_level >= LoggingSeverity::Warning as u8;

        {
            let mut state = self.state();
            *state.reported.entry(message_id).or_default() += 1;
            if is_user_actionable {
                // Once per message id, unless warnings are enabled for the console anyway.
                if state.console_logged.insert(message_id) || console_warnings {
                    tracing::warn!(message_id = message_id as u16, "{}", message.message);
                }
            } else if console_warnings {
                tracing::warn!(message_id = message_id as u16, "{}", message.message);
            }
        }

        match severity {
            LoggingSeverity::Critical => {
                tracing::error!(message_id = message_id as u16, "{}", message.message)
            }
            LoggingSeverity::Warning => {
                tracing::debug!(message_id = message_id as u16, "{}", message.message)
            }
        }

        self.log_internal_message(message);
    }

    /// Write a message to the console channel, bypassing the queue.
    pub fn warn_to_console(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn log_internal_message(&self, message: InternalLogMessage) {
        let throttle_message = {
            let mut state = self.state();
            if state.message_count >= self.config.max_message_limit
                || !state.queued.insert(message.message_id)
            {
                return;
            }

            if message.severity as u8 <= self.config.telemetry_logging_level {
                state.queue.push(message);
                state.message_count += 1;
            }

            if state.message_count == self.config.max_message_limit {
                let throttle = InternalLogMessage::new(
                    LoggingSeverity::Warning,
                    InternalMessageId::MessageLimitPerPVExceeded,
                    THROTTLE_LIMIT_MESSAGE,
                    None,
                    false,
                );
                state.queue.push(throttle);
                state.message_count += 1;
                true
            } else {
                false
            }
        };
        if throttle_message {
            self.warn_to_console(THROTTLE_LIMIT_MESSAGE);
        }
    }

    /// Snapshot of the messages queued for reporting.
    pub fn queue(&self) -> Vec<InternalLogMessage> {
        self.state().queue.clone()
    }

    /// Remove and return the queued messages.
    pub fn take_queue(&self) -> Vec<InternalLogMessage> {
        std::mem::take(&mut self.state().queue)
    }

    /// How often a message id was reported, including de-duplicated reports.
    pub fn times_reported(&self, message_id: InternalMessageId) -> usize {
        self.state()
            .reported
            .get(&message_id)
            .copied()
            .unwrap_or_default()
    }
}

const THROTTLE_LIMIT_MESSAGE: &str =
    "Internal events throttle limit per PageView reached for this app.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_each_message_id_once() {
        let logger = DiagnosticLogger::default();
        for _ in 0..3 {
            logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::TransmissionFailed,
                "boom",
                None,
                false,
            );
        }
        assert_eq!(1, logger.queue().len());
        assert_eq!(3, logger.times_reported(InternalMessageId::TransmissionFailed));
    }

    #[test]
    fn warnings_are_not_queued_by_default() {
        let logger = DiagnosticLogger::default();
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::NameTooLong,
            "long",
            None,
            true,
        );
        assert!(logger.queue().is_empty());
        assert_eq!(1, logger.times_reported(InternalMessageId::NameTooLong));
    }

    #[test]
    fn message_format() {
        let logger = DiagnosticLogger::new(DiagnosticLoggerConfig {
            telemetry_logging_level: 2,
            ..Default::default()
        });
        logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::UrlTooLong,
            "url is \"too\" long",
            Some(serde_json::json!({ "url": "x" })),
            true,
        );
        let queue = logger.take_queue();
        assert_eq!(
            "AI: 66 message:\"url is too long\" props:\"{url:x}\"",
            queue[0].message
        );
        assert!(logger.queue().is_empty());
    }

    #[test]
    fn throttles_after_limit() {
        let logger = DiagnosticLogger::new(DiagnosticLoggerConfig {
            telemetry_logging_level: 2,
            max_message_limit: 2,
            ..Default::default()
        });
        for id in [
            InternalMessageId::NameTooLong,
            InternalMessageId::UrlTooLong,
            InternalMessageId::IdTooLong,
            InternalMessageId::MessageTruncated,
        ] {
            logger.throw_internal(LoggingSeverity::Warning, id, "x", None, false);
        }
        let ids: Vec<_> = logger.queue().iter().map(|m| m.message_id).collect();
        assert_eq!(
            vec![
                InternalMessageId::NameTooLong,
                InternalMessageId::UrlTooLong,
                InternalMessageId::MessageLimitPerPVExceeded,
            ],
            ids
        );
    }

    #[test]
    fn serializes_ids_as_numbers() {
        let message = InternalLogMessage::new(
            LoggingSeverity::Critical,
            InternalMessageId::SenderNotInitialized,
            "x",
            None,
            false,
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(serde_json::json!(72), json["messageId"]);
        assert_eq!(serde_json::json!(1), json["severity"]);
    }
}
