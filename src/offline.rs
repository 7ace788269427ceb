//! Connectivity tracking.
//!
//! The host forwards its `online`/`offline` notifications to an [`OfflineListener`]. While
//! the listener is started those notifications are authoritative; otherwise the optional
//! fallback probe is asked, and without a probe the device is assumed to be online. Both
//! signals can be stale, which is accepted: the sender only uses them to stretch its retry
//! backoff.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

type OnlineProbe = Arc<dyn Fn() -> Option<bool> + Send + Sync>;

/// Tracks whether the device currently has network connectivity.
pub struct OfflineListener {
    is_listening: AtomicBool,
    online_status: AtomicBool,
    probe: Option<OnlineProbe>,
}

impl fmt::Debug for OfflineListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineListener")
            .field("is_listening", &self.is_listening())
            .field("online_status", &self.online_status.load(Ordering::SeqCst))
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

impl Default for OfflineListener {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineListener {
    /// Create a listener that is not yet listening and has no fallback probe.
    pub fn new() -> Self {
        Self {
            is_listening: AtomicBool::new(false),
            online_status: AtomicBool::new(true),
            probe: None,
        }
    }

    /// Fallback consulted while not listening, e.g. a platform "is online" flag. Returning
    /// `None` means the platform does not know.
    pub fn with_probe(mut self, probe: impl Fn() -> Option<bool> + Send + Sync + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Start treating `online`/`offline` notifications as authoritative.
    pub fn start(&self) {
        self.is_listening.store(true, Ordering::SeqCst);
    }

    /// Stop listening. Notifications are still recorded but no longer consulted.
    pub fn stop(&self) {
        self.is_listening.store(false, Ordering::SeqCst);
    }

    /// Whether notifications are currently authoritative.
    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Handler for the host's `online` notification.
    pub fn set_online(&self) {
        self.online_status.store(true, Ordering::SeqCst);
    }

    /// Handler for the host's `offline` notification.
    pub fn set_offline(&self) {
        self.online_status.store(false, Ordering::SeqCst);
    }

    /// Best guess of the current connectivity.
    pub fn is_online(&self) -> bool {
        if self.is_listening() {
            self.online_status.load(Ordering::SeqCst)
        } else {
            self.probe.as_ref().and_then(|probe| probe()).unwrap_or(true)
        }
    }

    /// Negation of [`is_online`](Self::is_online).
    pub fn is_offline(&self) -> bool {
        !self.is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_by_default() {
        let listener = OfflineListener::new();
        assert!(listener.is_online());
    }

    #[test]
    fn notifications_only_count_while_listening() {
        let listener = OfflineListener::new();
        listener.set_offline();
        assert!(listener.is_online());

        listener.start();
        assert!(listener.is_offline());
        listener.set_online();
        assert!(listener.is_online());

        listener.set_offline();
        listener.stop();
        assert!(listener.is_online());
    }

    #[test]
    fn falls_back_to_probe() {
        let listener = OfflineListener::new().with_probe(|| Some(false));
        assert!(listener.is_offline());

        let listener = OfflineListener::new().with_probe(|| None);
        assert!(listener.is_online());
    }
}
