use crate::telemetry_item::{TelemetryItem, TelemetryKind};
use std::fmt::Debug;

/// Gate run on every item before its envelope is built. Rejected items are dropped with a
/// critical diagnostic.
pub trait Validator: Debug + Send + Sync {
    /// Whether `item` of `kind` may be sent.
    fn validate(&self, kind: &TelemetryKind, item: &TelemetryItem) -> bool;
}

/// Accepts every item of every kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl DefaultValidator {
    fn event(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn trace(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn exception(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn metric(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn page_view(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn page_view_performance(&self, _item: &TelemetryItem) -> bool {
        true
    }

    fn remote_dependency(&self, _item: &TelemetryItem) -> bool {
        true
    }
}

impl Validator for DefaultValidator {
    fn validate(&self, kind: &TelemetryKind, item: &TelemetryItem) -> bool {
        match kind {
            TelemetryKind::Event | TelemetryKind::Custom(_) => self.event(item),
            TelemetryKind::Trace => self.trace(item),
            TelemetryKind::Exception => self.exception(item),
            TelemetryKind::Metric => self.metric(item),
            TelemetryKind::PageView => self.page_view(item),
            TelemetryKind::PageViewPerformance => self.page_view_performance(item),
            TelemetryKind::RemoteDependency => self.remote_dependency(item),
        }
    }
}
