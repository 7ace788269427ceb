use crate::{
    buffer::SendBuffer,
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    storage::SessionStorage,
    Error,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub(crate) const BUFFER_KEY: &str = "AI_buffer";
pub(crate) const SENT_BUFFER_KEY: &str = "AI_sentBuffer";
pub(crate) const MAX_BUFFER_SIZE: usize = 2000;

/// Buffer mirrored to session storage. Payloads handed to a transport move to a second slot
/// until the send completes, and both slots are merged back on construction.
#[derive(Debug)]
pub(crate) struct SessionStorageSendBuffer {
    logger: Arc<DiagnosticLogger>,
    storage: Arc<dyn SessionStorage>,
    buffer: Vec<String>,
    buffer_key: String,
    sent_buffer_key: String,
    emit_line_delimited_json: bool,
    full_reported: bool,
}

impl SessionStorageSendBuffer {
    /// Restore payloads left over by an earlier session. In-flight payloads count as unsent.
    pub(crate) fn new(
        logger: Arc<DiagnosticLogger>,
        storage: Arc<dyn SessionStorage>,
        name_prefix: Option<&str>,
        emit_line_delimited_json: bool,
    ) -> Self {
        let prefixed = |key: &str| match name_prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key.to_string(),
        };
        let mut buffer = Self {
            logger,
            storage,
            buffer: Vec::new(),
            buffer_key: prefixed(BUFFER_KEY),
            sent_buffer_key: prefixed(SENT_BUFFER_KEY),
            emit_line_delimited_json,
            full_reported: false,
        };

        let mut restored = buffer.get_buffer(&buffer.buffer_key);
        restored.extend(buffer.get_buffer(&buffer.sent_buffer_key));
        restored.truncate(MAX_BUFFER_SIZE);
        buffer.buffer = restored;

        buffer.set_buffer(&buffer.sent_buffer_key, &[]);
        buffer.set_buffer(&buffer.buffer_key, &buffer.buffer);
        buffer
    }

    fn get_buffer(&self, key: &str) -> Vec<String> {
        match self.read_buffer(key) {
            Ok(items) => items,
            Err(err @ Error::Storage(_)) => {
                self.logger.throw_internal(
                    LoggingSeverity::Warning,
                    InternalMessageId::BrowserCannotReadSessionStorage,
                    format!("Browser failed read of session storage. {}", err),
                    Some(json!({ "exception": err.to_string() })),
                    false,
                );
                Vec::new()
            }
            Err(err) => {
                self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::FailedToRestoreStorageBuffer,
                    format!(" storage key: {}, {}", key, err),
                    Some(json!({ "exception": err.to_string() })),
                    false,
                );
                Vec::new()
            }
        }
    }

    fn read_buffer(&self, key: &str) -> Result<Vec<String>, Error> {
        match self.storage.get_item(key)? {
            Some(text) => parse_buffer(&text).map_err(Error::BufferEncoding),
            None => Ok(Vec::new()),
        }
    }

    fn set_buffer(&self, key: &str, items: &[String]) {
        if let Err(err) = self.write_buffer(key, items) {
            // The slot content is unknown now; telemetry in it is lost.
            let _ = self.storage.set_item(key, "[]");
            self.logger.throw_internal(
                LoggingSeverity::Warning,
                InternalMessageId::FailedToSetStorageBuffer,
                format!(" storage key: {}, {}. Buffer cleared", key, err),
                Some(json!({ "exception": err.to_string() })),
                false,
            );
        }
    }

    fn write_buffer(&self, key: &str, items: &[String]) -> Result<(), Error> {
        let text = serde_json::to_string(items).map_err(Error::BufferEncoding)?;
        self.storage.set_item(key, &text)?;
        Ok(())
    }
}

/// A slot holds a JSON array of payload strings. Slots written as a JSON string containing
/// the array are accepted too.
fn parse_buffer(text: &str) -> Result<Vec<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner),
        value => serde_json::from_value(value),
    }
}

impl SendBuffer for SessionStorageSendBuffer {
    fn enqueue(&mut self, payload: String) {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            if !self.full_reported {
                self.logger.throw_internal(
                    LoggingSeverity::Warning,
                    InternalMessageId::SessionStorageBufferFull,
                    format!("Maximum buffer size reached: {}", self.buffer.len()),
                    None,
                    true,
                );
                self.full_reported = true;
            }
            return;
        }
        self.buffer.push(payload);
        self.set_buffer(&self.buffer_key, &self.buffer);
    }

    fn count(&self) -> usize {
        self.buffer.len()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.set_buffer(&self.buffer_key, &[]);
        self.set_buffer(&self.sent_buffer_key, &[]);
        self.full_reported = false;
    }

    fn get_items(&self) -> Vec<String> {
        self.buffer.clone()
    }

    fn emit_line_delimited_json(&self) -> bool {
        self.emit_line_delimited_json
    }

    fn mark_as_sent(&mut self, payloads: &[String]) {
        self.buffer.retain(|payload| !payloads.contains(payload));
        self.set_buffer(&self.buffer_key, &self.buffer);

        let mut sent = self.get_buffer(&self.sent_buffer_key);
        sent.extend_from_slice(payloads);
        if sent.len() > MAX_BUFFER_SIZE {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::SessionStorageBufferFull,
                format!("Sent buffer reached its maximum size: {}", sent.len()),
                None,
                true,
            );
            sent.truncate(MAX_BUFFER_SIZE);
        }
        self.set_buffer(&self.sent_buffer_key, &sent);
    }

    fn clear_sent(&mut self, payloads: &[String]) {
        let mut sent = self.get_buffer(&self.sent_buffer_key);
        sent.retain(|payload| !payloads.contains(payload));
        self.set_buffer(&self.sent_buffer_key, &sent);
    }
}
