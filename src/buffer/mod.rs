//! Buffers holding serialized payloads until they are sent.
//!
//! Both buffers keep payloads in enqueue order. The persisted one also remembers which
//! payloads are in flight, so that they are sent again after a restart of the host.

mod array;
mod session_storage;

pub(crate) use array::ArraySendBuffer;
pub(crate) use session_storage::SessionStorageSendBuffer;

use std::fmt::Debug;

/// Payload buffer of the sender.
pub(crate) trait SendBuffer: Debug + Send {
    /// Append a serialized payload.
    fn enqueue(&mut self, payload: String);

    /// Number of buffered payloads.
    fn count(&self) -> usize;

    /// Drop every buffered and in-flight payload.
    fn clear(&mut self);

    /// Snapshot of the buffered payloads, in enqueue order.
    fn get_items(&self) -> Vec<String>;

    /// Whether batches are newline separated instead of JSON arrays.
    fn emit_line_delimited_json(&self) -> bool;

    /// Join payloads into a request body. `None` for an empty list.
    fn batch_payloads(&self, payloads: &[String]) -> Option<String> {
        batch_payloads(payloads, self.emit_line_delimited_json())
    }

    /// Move payloads from the buffer to the in-flight set.
    fn mark_as_sent(&mut self, payloads: &[String]);

    /// Forget in-flight payloads once their send attempt completed.
    fn clear_sent(&mut self, payloads: &[String]);
}

pub(crate) fn batch_payloads(payloads: &[String], emit_line_delimited_json: bool) -> Option<String> {
    if payloads.is_empty() {
        return None;
    }
    Some(if emit_line_delimited_json {
        payloads.join("\n")
    } else {
        format!("[{}]", payloads.join(","))
    })
}
