use crate::{
    buffer::SendBuffer,
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
};
use std::sync::Arc;

/// In-memory buffer. Payloads handed to a transport are forgotten right away.
#[derive(Debug)]
pub(crate) struct ArraySendBuffer {
    logger: Arc<DiagnosticLogger>,
    buffer: Vec<String>,
    events_limit: usize,
    emit_line_delimited_json: bool,
    full_reported: bool,
}

impl ArraySendBuffer {
    pub(crate) fn new(
        logger: Arc<DiagnosticLogger>,
        events_limit: usize,
        emit_line_delimited_json: bool,
    ) -> Self {
        Self {
            logger,
            buffer: Vec::new(),
            events_limit,
            emit_line_delimited_json,
            full_reported: false,
        }
    }
}

impl SendBuffer for ArraySendBuffer {
    fn enqueue(&mut self, payload: String) {
        if self.buffer.len() >= self.events_limit {
            if !self.full_reported {
                self.logger.throw_internal(
                    LoggingSeverity::Warning,
                    InternalMessageId::InMemoryStorageBufferFull,
                    format!("Maximum in-memory buffer size reached: {}", self.buffer.len()),
                    None,
                    true,
                );
                self.full_reported = true;
            }
            return;
        }
        self.buffer.push(payload);
    }

    fn count(&self) -> usize {
        self.buffer.len()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.full_reported = false;
    }

    fn get_items(&self) -> Vec<String> {
        self.buffer.clone()
    }

    fn emit_line_delimited_json(&self) -> bool {
        self.emit_line_delimited_json
    }

    fn mark_as_sent(&mut self, _payloads: &[String]) {
        self.clear();
    }

    fn clear_sent(&mut self, _payloads: &[String]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(limit: usize) -> (Arc<DiagnosticLogger>, ArraySendBuffer) {
        let logger = Arc::new(DiagnosticLogger::default());
        (logger.clone(), ArraySendBuffer::new(logger, limit, false))
    }

    #[test]
    fn keeps_enqueue_order() {
        let (_, mut buffer) = buffer(10);
        buffer.enqueue("a".into());
        buffer.enqueue("b".into());
        assert_eq!(2, buffer.count());
        assert_eq!(vec!["a".to_string(), "b".to_string()], buffer.get_items());
        assert_eq!(Some("[a,b]".into()), buffer.batch_payloads(&buffer.get_items()));
    }

    #[test]
    fn mark_as_sent_empties_the_buffer() {
        let (_, mut buffer) = buffer(10);
        buffer.enqueue("a".into());
        let items = buffer.get_items();
        buffer.mark_as_sent(&items);
        assert_eq!(0, buffer.count());
        buffer.clear_sent(&items);
        assert_eq!(0, buffer.count());
    }

    #[test]
    fn drops_payloads_over_the_limit_with_one_warning() {
        let (logger, mut buffer) = buffer(2);
        for payload in ["a", "b", "c", "d"] {
            buffer.enqueue(payload.into());
        }
        assert_eq!(2, buffer.count());
        assert_eq!(1, logger.times_reported(InternalMessageId::InMemoryStorageBufferFull));

        buffer.clear();
        for payload in ["a", "b", "c"] {
            buffer.enqueue(payload.into());
        }
        assert_eq!(2, logger.times_reported(InternalMessageId::InMemoryStorageBufferFull));
    }
}
