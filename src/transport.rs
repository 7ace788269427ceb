//! Transports the sender can deliver batches with, besides the [`HttpClient`].

use crate::http_client::{HttpClient, HttpError};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt::Debug, sync::Arc};

/// Content type of beacon payloads. Cross-origin beacons only allow simple content types.
pub const BEACON_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Fire-and-forget transport used while the host is going away.
pub trait BeaconClient: Debug + Send + Sync {
    /// Queue `body` for delivery to `url`. Returns whether it was queued; delivery itself
    /// is never confirmed.
    fn send_beacon(&self, url: &str, body: Bytes, content_type: &str) -> bool;
}

/// Legacy cross-domain request transport.
#[async_trait]
pub trait CrossDomainClient: Debug + Send + Sync {
    /// POST `body` to `url`, which has its scheme stripped (`//host/path`). `Ok` carries
    /// the response text, `Err` means the request failed.
    async fn send(&self, url: &str, body: String) -> Result<String, HttpError>;
}

/// Transport picked at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// [`BeaconClient`].
    Beacon,
    /// [`HttpClient`].
    Xhr,
    /// [`CrossDomainClient`].
    CrossDomain,
}

/// Available transport implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transports {
    pub(crate) http: Option<Arc<dyn HttpClient>>,
    pub(crate) beacon: Option<Arc<dyn BeaconClient>>,
    pub(crate) cross_domain: Option<Arc<dyn CrossDomainClient>>,
    /// Protocol of the host page, e.g. `https:`. Cross-domain requests cannot change it.
    pub(crate) page_protocol: String,
}

impl Transports {
    /// Pick the transport in priority order.
    pub(crate) fn select(&self, is_beacon_api_disabled: bool) -> Option<TransportKind> {
        if !is_beacon_api_disabled && self.beacon.is_some() {
            Some(TransportKind::Beacon)
        } else if self
            .http
            .as_ref()
            .map_or(false, |client| client.supports_credentials())
        {
            Some(TransportKind::Xhr)
        } else if self.cross_domain.is_some() {
            Some(TransportKind::CrossDomain)
        } else {
            None
        }
    }
}

/// Whether a cross-domain request from a page using `page_protocol` may reach `endpoint`.
pub(crate) fn matches_page_protocol(endpoint: &str, page_protocol: &str) -> bool {
    let protocol = page_protocol.trim_end_matches(':');
    endpoint
        .get(..protocol.len() + 1)
        .map_or(false, |prefix| {
            prefix.eq_ignore_ascii_case(&format!("{}:", protocol))
        })
}

/// Remove a leading `http:` or `https:` from `endpoint`.
pub(crate) fn strip_protocol(endpoint: &str) -> &str {
    for scheme in ["https:", "http:"] {
        if let Some(prefix) = endpoint.get(..scheme.len()) {
            if prefix.eq_ignore_ascii_case(scheme) {
                return &endpoint[scheme.len()..];
            }
        }
    }
    endpoint
}
