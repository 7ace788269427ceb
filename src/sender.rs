use crate::{
    backoff,
    buffer::{ArraySendBuffer, SendBuffer, SessionStorageSendBuffer},
    clock::{Clock, SystemClock},
    config::{Configuration, SenderConfig, SENDER_IDENTIFIER},
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    envelope_creator::create_envelope,
    http_client::HttpClient,
    models::Envelope,
    offline::OfflineListener,
    sample::Sampler,
    serializer::Serializer,
    storage::{can_use_session_storage, SessionStorage},
    telemetry_item::{TelemetryItem, TelemetryKind},
    transport::{
        matches_page_protocol, strip_protocol, BeaconClient, CrossDomainClient, TransportKind,
        Transports, BEACON_CONTENT_TYPE,
    },
    uploader::{self, Transmission, STATUS_PARTIAL_CONTENT},
    validator::{DefaultValidator, Validator},
    Error,
};
use bytes::Bytes;
use serde_json::json;
use std::{
    fmt,
    sync::Arc,
    time::{Instant, SystemTime},
};

const DEFAULT_PAGE_PROTOCOL: &str = "https:";
const OFFLINE_BACKOFF_FACTOR: u32 = 10;

/// Why a batch is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendRequestReason {
    /// No specific reason.
    Undefined,
    /// The batch timer elapsed.
    NormalSchedule,
    /// The next payload would not fit into the batch.
    MaxBatchSize,
    /// [`Sender::flush`] was called.
    ManualFlush,
    /// The host is going away.
    Unload,
}

/// Phase of the send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderState {
    /// Nothing was buffered yet.
    Idle,
    /// Payloads are collected until the batch timer elapses.
    Buffering,
    /// A batch is handed to the transport.
    Sending,
    /// The transport accepted the batch and its outcome is pending.
    AwaitingResponse,
    /// The last batch failed and is scheduled to be sent again.
    RetryScheduled,
}

/// Next stage of the telemetry pipeline.
pub trait TelemetryProcessor: Send {
    /// Process an item. Called with every item the sender saw, whatever happened to it.
    fn process_telemetry(&mut self, item: &TelemetryItem);
}

impl<F> TelemetryProcessor for F
where
    F: FnMut(&TelemetryItem) + Send,
{
    fn process_telemetry(&mut self, item: &TelemetryItem) {
        self(item)
    }
}

/// Builder for a [`Sender`], collecting the host facilities it runs on.
pub struct SenderBuilder {
    transports: Transports,
    session_storage: Option<Arc<dyn SessionStorage>>,
    offline_listener: Option<Arc<OfflineListener>>,
    clock: Arc<dyn Clock>,
    logger: Option<Arc<DiagnosticLogger>>,
    validator: Arc<dyn Validator>,
    next: Option<Box<dyn TelemetryProcessor>>,
}

impl fmt::Debug for SenderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderBuilder")
            .field("transports", &self.transports)
            .field("session_storage", &self.session_storage)
            .field("offline_listener", &self.offline_listener)
            .field("clock", &self.clock)
            .field("validator", &self.validator)
            .field("next", &self.next.is_some())
            .finish()
    }
}

impl Default for SenderBuilder {
    fn default() -> Self {
        Self {
            transports: Transports {
                page_protocol: DEFAULT_PAGE_PROTOCOL.into(),
                ..Transports::default()
            },
            session_storage: None,
            offline_listener: None,
            clock: Arc::new(SystemClock),
            logger: None,
            validator: Arc::new(DefaultValidator),
            next: None,
        }
    }
}

impl SenderBuilder {
    /// Send batches with this client.
    pub fn with_http_client<C: HttpClient + 'static>(mut self, client: C) -> Self {
        self.transports.http = Some(Arc::new(client));
        self
    }

    /// Send batches as beacons. Used only when the beacon API is not disabled, and on unload.
    pub fn with_beacon<B: BeaconClient + 'static>(mut self, beacon: B) -> Self {
        self.transports.beacon = Some(Arc::new(beacon));
        self
    }

    /// Fall back to cross-domain requests from a page served over `page_protocol`, e.g.
    /// `https:`.
    pub fn with_cross_domain<X: CrossDomainClient + 'static>(
        mut self,
        client: X,
        page_protocol: impl Into<String>,
    ) -> Self {
        self.transports.cross_domain = Some(Arc::new(client));
        self.transports.page_protocol = page_protocol.into();
        self
    }

    /// Persist buffered payloads in this storage, if the configuration allows it.
    pub fn with_session_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    /// Use a shared connectivity tracker.
    pub fn with_offline_listener(mut self, listener: Arc<OfflineListener>) -> Self {
        self.offline_listener = Some(listener);
        self
    }

    /// Use another time source for timers.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Report diagnostics to a shared logger.
    pub fn with_logger(mut self, logger: Arc<DiagnosticLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the item validator.
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Forward every processed item to `next`.
    pub fn with_next<P: TelemetryProcessor + 'static>(mut self, next: P) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Create the sender from a core configuration object, using the settings of the
    /// channel extension. Without an explicit logger, one is created from the diagnostic
    /// settings of `configuration`.
    pub fn initialize_from(mut self, configuration: &Configuration) -> Sender {
        if self.logger.is_none() {
            self.logger = Some(Arc::new(DiagnosticLogger::new(
                configuration.diagnostic_logger_config(),
            )));
        }
        let config = SenderConfig::resolve(configuration, SENDER_IDENTIFIER);
        self.initialize(config)
    }

    /// Create the sender. Restores payloads persisted by an earlier session and picks the
    /// transport.
    pub fn initialize(self, config: SenderConfig) -> Sender {
        let logger = self.logger.unwrap_or_default();
        let sampler = Sampler::new(&logger, config.sampling_percentage);

        let buffer: Box<dyn SendBuffer> = match self.session_storage {
            Some(storage)
                if config.enable_session_storage_buffer
                    && can_use_session_storage(storage.as_ref()) =>
            {
                Box::new(SessionStorageSendBuffer::new(
                    logger.clone(),
                    storage,
                    config.name_prefix.as_deref(),
                    config.emit_line_delimited_json,
                ))
            }
            _ => Box::new(ArraySendBuffer::new(
                logger.clone(),
                config.events_limit_in_mem,
                config.emit_line_delimited_json,
            )),
        };

        let offline_listener = self.offline_listener.unwrap_or_default();
        offline_listener.start();

        let transport = self.transports.select(config.is_beacon_api_disabled);
        match transport {
            Some(kind) => tracing::debug!(transport = ?kind, "sender initialized"),
            None => tracing::debug!("no transport available, telemetry will not be sent"),
        }

        Sender {
            config,
            logger,
            clock: self.clock,
            transports: self.transports,
            transport,
            buffer,
            validator: self.validator,
            sampler,
            offline_listener,
            next: self.next,
            state: SenderState::Idle,
            consecutive_errors: 0,
            retry_at: None,
            timer_deadline: None,
            last_send: None,
            app_id: None,
        }
    }
}

/// Batches telemetry items and sends them to Application Insights.
///
/// The sender never fails towards its caller. Every problem is reported to its
/// [`DiagnosticLogger`] instead.
///
/// The batch timer is data: [`timer_deadline`](Sender::timer_deadline) tells the host when
/// to call [`on_timer`](Sender::on_timer).
pub struct Sender {
    config: SenderConfig,
    logger: Arc<DiagnosticLogger>,
    clock: Arc<dyn Clock>,
    transports: Transports,
    transport: Option<TransportKind>,
    buffer: Box<dyn SendBuffer>,
    validator: Arc<dyn Validator>,
    sampler: Sampler,
    offline_listener: Arc<OfflineListener>,
    next: Option<Box<dyn TelemetryProcessor>>,
    state: SenderState,
    consecutive_errors: u32,
    retry_at: Option<Instant>,
    timer_deadline: Option<Instant>,
    last_send: Option<Instant>,
    app_id: Option<String>,
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("buffer", &self.buffer)
            .field("state", &self.state)
            .field("consecutive_errors", &self.consecutive_errors)
            .field("retry_at", &self.retry_at)
            .field("timer_deadline", &self.timer_deadline)
            .field("last_send", &self.last_send)
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl Sender {
    /// Start building a sender.
    pub fn builder() -> SenderBuilder {
        SenderBuilder::default()
    }

    /// Buffer an item for sending and hand it to the next processor.
    ///
    /// May send the current batch first when the item would not fit into it.
    pub async fn process_telemetry(&mut self, item: &TelemetryItem) {
        self.buffer_item(item).await;
        if let Some(next) = self.next.as_mut() {
            next.process_telemetry(item);
        }
    }

    async fn buffer_item(&mut self, item: &TelemetryItem) {
        if self.config.disable_telemetry {
            return;
        }

        if is_empty(item) {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::CannotSendEmptyTelemetry,
                "Cannot send empty telemetry",
                None,
                false,
            );
            return;
        }

        let kind = match (&item.base_type, &item.base_data) {
            (Some(base_type), _) => TelemetryKind::from_base_type(base_type),
            (None, Some(_)) => {
                self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::InvalidEvent,
                    "Cannot send telemetry without baseData and baseType",
                    None,
                    false,
                );
                return;
            }
            (None, None) => TelemetryKind::Event,
        };

        if self.transport.is_none() {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::SenderNotInitialized,
                "Sender was not initialized",
                None,
                false,
            );
            return;
        }

        if !self.sampler.is_sampled_in(&kind, item) {
            self.logger.throw_internal(
                LoggingSeverity::Warning,
                InternalMessageId::TelemetrySampledAndNotSent,
                "Telemetry item was sampled out and not sent",
                Some(json!({ "SampleRate": self.sampler.sample_rate() })),
                false,
            );
            return;
        }

        if !self.validator.validate(&kind, item) {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::InvalidEvent,
                format!("Telemetry item of type {} failed validation", kind.base_type()),
                None,
                false,
            );
            return;
        }

        let i_key = item
            .i_key
            .clone()
            .or_else(|| self.config.instrumentation_key.clone());
        let Some(mut envelope) = create_envelope(&self.logger, &kind, item, i_key, SystemTime::now())
        else {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::CreateEnvelopeError,
                "Unable to create an AppInsights envelope",
                None,
                false,
            );
            return;
        };
        envelope.set_sample_rate(self.sampler.sample_rate());

        if !self.run_initializers(item, &mut envelope) {
            return;
        }

        let payload = Serializer::new(&self.logger).serialize(&envelope);

        let buffered = self.buffer.get_items();
        if let Some(batch) = self.buffer.batch_payloads(&buffered) {
            if batch.len() + payload.len() > self.config.max_batch_size_in_bytes {
                self.trigger_send(SendRequestReason::MaxBatchSize).await;
            }
        }

        self.buffer.enqueue(payload);
        if self.state == SenderState::Idle {
            self.state = SenderState::Buffering;
        }
        self.setup_timer();
    }

    /// Run the initializers attached to the item. Returns `false` when one of them asks for
    /// the item to be dropped. Failing initializers do not stop the others.
    fn run_initializers(&self, item: &TelemetryItem, envelope: &mut Envelope) -> bool {
        let mut send_item = true;
        for initializer in &item.initializers {
            match initializer(envelope) {
                Ok(true) => {}
                Ok(false) => send_item = false,
                Err(err) => self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::TelemetryInitializerFailed,
                    format!("One of telemetry initializers failed: {}", err),
                    Some(json!({ "exception": err.to_string() })),
                    true,
                ),
            }
        }
        send_item
    }

    /// Send the buffered batch now with the selected transport.
    pub async fn trigger_send(&mut self, reason: SendRequestReason) {
        self.send_with(self.transport, reason).await;
    }

    /// Send the buffered batch now.
    pub async fn flush(&mut self) {
        self.trigger_send(SendRequestReason::ManualFlush).await;
    }

    /// Last chance to send the buffered batch before the host goes away. Uses the beacon
    /// transport when it is allowed for unloading.
    pub async fn onunload_flush(&mut self) {
        let beacon_allowed =
            !self.config.onunload_disable_beacon || !self.config.is_beacon_api_disabled;
        if beacon_allowed && self.transports.beacon.is_some() {
            self.send_with(Some(TransportKind::Beacon), SendRequestReason::Unload)
                .await;
        } else {
            self.trigger_send(SendRequestReason::Unload).await;
        }
    }

    /// Flush and stop tracking connectivity.
    pub async fn teardown(&mut self) {
        self.flush().await;
        self.offline_listener.stop();
    }

    /// Send the batch if the timer deadline has passed.
    pub async fn on_timer(&mut self) {
        let Some(deadline) = self.timer_deadline else {
            return;
        };
        if self.clock.now() < deadline {
            return;
        }
        self.timer_deadline = None;
        self.trigger_send(SendRequestReason::NormalSchedule).await;
    }

    async fn send_with(&mut self, transport: Option<TransportKind>, reason: SendRequestReason) {
        self.timer_deadline = None;
        self.retry_at = None;

        if self.config.disable_telemetry {
            self.buffer.clear();
            return;
        }

        self.last_send = Some(self.clock.now());
        if self.buffer.count() == 0 {
            return;
        }

        let Some(transport) = transport else {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::TransmissionFailed,
                "Telemetry transmission failed, some telemetry will be lost: no transport available",
                None,
                false,
            );
            return;
        };

        let payload = self.buffer.get_items();
        tracing::debug!(?reason, ?transport, items = payload.len(), "sending telemetry");
        self.state = SenderState::Sending;
        match transport {
            TransportKind::Beacon => self.beacon_sender(payload),
            TransportKind::Xhr => self.xhr_sender(payload).await,
            TransportKind::CrossDomain => self.xdr_sender(payload).await,
        }
        self.state = if self.retry_at.is_some() {
            SenderState::RetryScheduled
        } else {
            SenderState::Buffering
        };
    }

    fn beacon_sender(&mut self, payload: Vec<String>) {
        let Some(beacon) = self.transports.beacon.clone() else {
            return;
        };
        let body = self.buffer.batch_payloads(&payload).unwrap_or_default();
        if beacon.send_beacon(&self.config.endpoint_url, Bytes::from(body), BEACON_CONTENT_TYPE) {
            self.buffer.mark_as_sent(&payload);
            self.on_success(&payload);
        } else {
            self.logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::TransmissionFailed,
                "Failed to send telemetry with Beacon API.",
                None,
                true,
            );
        }
    }

    async fn xhr_sender(&mut self, payload: Vec<String>) {
        let Some(client) = self.transports.http.clone() else {
            return;
        };
        let body = self.buffer.batch_payloads(&payload).unwrap_or_default();
        let request = match uploader::build_request(&self.config.endpoint_url, body) {
            Ok(request) => request,
            Err(err) => {
                self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::TransmissionFailed,
                    format!("Telemetry transmission failed, some telemetry will be lost: {}", err),
                    Some(json!({ "exception": err.to_string() })),
                    false,
                );
                return;
            }
        };

        self.buffer.mark_as_sent(&payload);
        self.state = SenderState::AwaitingResponse;
        match client.send(request).await {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = String::from_utf8_lossy(response.body()).into_owned();
                self.on_xhr_response(payload, status, &text);
            }
            Err(err) => {
                if self.offline_listener.is_offline() && !self.config.is_retry_disabled {
                    self.resend_offline(payload, 0);
                } else {
                    let err = Error::UploadConnection(err);
                    self.on_error(&payload, &format!("XMLHttpRequest,Error:{}", err));
                }
            }
        }
    }

    fn on_xhr_response(&mut self, payload: Vec<String>, status: u16, text: &str) {
        if self.app_id.is_none() {
            if let Some(response) = uploader::parse_response(&self.logger, text) {
                self.app_id = response.app_id;
            }
        }

        if !(200..300).contains(&status) && status != 0 {
            if !self.config.is_retry_disabled && uploader::is_retriable(status) {
                let count = payload.len();
                self.resend_payload(payload, 1);
                self.logger.throw_internal(
                    LoggingSeverity::Warning,
                    InternalMessageId::TransmissionFailed,
                    format!(
                        "Failed to send telemetry. Response code {}. Will retry to send {} items.",
                        status, count
                    ),
                    None,
                    false,
                );
            } else {
                self.on_error(&payload, &uploader::format_error_message(status, text));
            }
        } else if self.offline_listener.is_offline() {
            if self.config.is_retry_disabled {
                self.on_error(&payload, &uploader::format_error_message(status, text));
            } else {
                self.resend_offline(payload, status);
            }
        } else if status == STATUS_PARTIAL_CONTENT {
            match uploader::parse_response(&self.logger, text) {
                Some(response) if !self.config.is_retry_disabled => {
                    self.on_partial_success(payload, response)
                }
                _ => self.on_error(&payload, &uploader::format_error_message(status, text)),
            }
        } else {
            self.consecutive_errors = 0;
            self.on_success(&payload);
        }
    }

    fn resend_offline(&mut self, payload: Vec<String>, status: u16) {
        let count = payload.len();
        self.resend_payload(payload, OFFLINE_BACKOFF_FACTOR);
        self.logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::TransmissionFailed,
            format!(
                "Offline - Response Code: {}. Offline status: true. Will retry to send {} items.",
                status, count
            ),
            None,
            false,
        );
    }

    async fn xdr_sender(&mut self, payload: Vec<String>) {
        let Some(client) = self.transports.cross_domain.clone() else {
            return;
        };
        let endpoint_url = self.config.endpoint_url.clone();
        if !matches_page_protocol(&endpoint_url, &self.transports.page_protocol) {
            self.logger.throw_internal(
                LoggingSeverity::Warning,
                InternalMessageId::TransmissionFailed,
                "Cannot send XDomain request. The endpoint URL protocol doesn't match the hosting page protocol.",
                None,
                false,
            );
            self.buffer.clear();
            return;
        }

        let body = self.buffer.batch_payloads(&payload).unwrap_or_default();
        self.buffer.mark_as_sent(&payload);
        self.state = SenderState::AwaitingResponse;
        match client.send(strip_protocol(&endpoint_url), body).await {
            Ok(text) => self.on_xdr_response(payload, &text),
            Err(err) => self.on_error(&payload, &format!("XDomainRequest,Response:{}", err)),
        }
    }

    fn on_xdr_response(&mut self, payload: Vec<String>, text: &str) {
        if text == "200" || text.is_empty() {
            self.consecutive_errors = 0;
            self.on_success(&payload);
            return;
        }
        match uploader::parse_response(&self.logger, text) {
            Some(response)
                if response.items_received > response.items_accepted
                    && !self.config.is_retry_disabled =>
            {
                self.on_partial_success(payload, response)
            }
            Some(response) if response.items_received == response.items_accepted => {
                self.consecutive_errors = 0;
                self.on_success(&payload);
            }
            _ => self.on_error(&payload, &format!("XDomainRequest,Response:{}", text)),
        }
    }

    /// Split a partially accepted batch into delivered, failed and retried payloads.
    fn on_partial_success(&mut self, payload: Vec<String>, response: Transmission) {
        let mut remaining = payload;
        let mut failed = Vec::new();
        let mut retry = Vec::new();

        let mut errors = response.errors;
        errors.sort_by(|a, b| b.index.cmp(&a.index));
        errors.dedup_by_key(|error| error.index);
        for error in errors {
            if error.index >= remaining.len() {
                continue;
            }
            let item = remaining.remove(error.index);
            if uploader::is_retriable(error.status_code) {
                retry.push(item);
            } else {
                failed.push(item);
            }
        }

        if !remaining.is_empty() {
            self.on_success(&remaining);
        }

        if !failed.is_empty() {
            self.on_error(
                &failed,
                &format!(
                    "partial success {} of {}",
                    response.items_accepted, response.items_received
                ),
            );
        }

        if !retry.is_empty() {
            let (delivered, failed, retried) = (remaining.len(), failed.len(), retry.len());
            self.resend_payload(retry, 1);
            self.logger.throw_internal(
                LoggingSeverity::Warning,
                InternalMessageId::TransmissionFailed,
                format!(
                    "Partial success. Delivered: {}, Failed: {}. Will retry to send {} out of {} items",
                    delivered, failed, retried, response.items_received
                ),
                None,
                false,
            );
        }
    }

    /// Put payloads back into the buffer and schedule the next attempt.
    fn resend_payload(&mut self, payload: Vec<String>, linear_factor: u32) {
        if payload.is_empty() {
            return;
        }
        self.buffer.clear_sent(&payload);
        self.consecutive_errors += 1;
        for item in payload {
            self.buffer.enqueue(item);
        }
        let delay = backoff::delay_for(self.consecutive_errors, linear_factor, rand::random());
        self.retry_at = Some(self.clock.now() + delay);
        self.setup_timer();
    }

    fn setup_timer(&mut self) {
        if self.timer_deadline.is_some() {
            return;
        }
        let now = self.clock.now();
        let retry_in = self
            .retry_at
            .map(|retry_at| retry_at.saturating_duration_since(now))
            .unwrap_or_default();
        self.timer_deadline = Some(now + self.config.max_batch_interval.max(retry_in));
    }

    fn on_success(&mut self, payload: &[String]) {
        self.buffer.clear_sent(payload);
    }

    fn on_error(&mut self, payload: &[String], message: &str) {
        self.logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::TransmissionFailed,
            format!("Failed to send telemetry. {}", message),
            Some(json!({ "message": message })),
            false,
        );
        self.buffer.clear_sent(payload);
    }

    /// Phase of the send cycle.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Transport picked at initialization. `None` when no transport is available.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport
    }

    /// Number of buffered payloads.
    pub fn buffer_count(&self) -> usize {
        self.buffer.count()
    }

    /// Buffered payloads, in the order they will be sent.
    pub fn buffered_items(&self) -> Vec<String> {
        self.buffer.get_items()
    }

    /// When [`on_timer`](Sender::on_timer) should be called next.
    pub fn timer_deadline(&self) -> Option<Instant> {
        self.timer_deadline
    }

    /// Earliest time of the scheduled retry.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Number of failed sends since the last success.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Time of the last send attempt.
    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Application id reported by the ingestion service.
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// Logger the sender reports to.
    pub fn logger(&self) -> &DiagnosticLogger {
        &self.logger
    }

    /// Settings the sender was initialized with.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }
}

fn is_empty(item: &TelemetryItem) -> bool {
    item.name.is_none()
        && item.base_type.is_none()
        && item.base_data.is_none()
        && item.data.is_none()
        && item.tags.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http_client::tests::RecordingHttpClient, storage::InMemorySessionStorage,
        transport::tests::RecordingBeacon,
    };
    use serde_json::{json, Value};
    use std::{sync::Mutex, time::Duration};

    #[derive(Debug, Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Instant::now())))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn event(name: &str) -> TelemetryItem {
        TelemetryItem::new("EventData").with_base_data(json!({ "name": name }))
    }

    fn config() -> SenderConfig {
        SenderConfig::default()
            .with_instrumentation_key("key")
            .with_session_storage_buffer(false)
    }

    fn names(body: &str) -> Vec<String> {
        let batch: Vec<Value> = serde_json::from_str(body).unwrap();
        batch
            .iter()
            .map(|envelope| envelope["data"]["baseData"]["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn buffers_until_flush() {
        let client = RecordingHttpClient::default();
        let mut sender = Sender::builder()
            .with_http_client(client.clone())
            .initialize(config());
        assert_eq!(Some(TransportKind::Xhr), sender.transport_kind());
        assert_eq!(SenderState::Idle, sender.state());

        sender.process_telemetry(&event("a")).await;
        sender.process_telemetry(&event("b")).await;
        assert_eq!(2, sender.buffer_count());
        assert_eq!(SenderState::Buffering, sender.state());
        assert!(client.bodies().is_empty());

        sender.flush().await;
        let bodies = client.bodies();
        assert_eq!(1, bodies.len());
        assert_eq!(vec!["a".to_string(), "b".to_string()], names(&bodies[0]));
        assert_eq!(0, sender.buffer_count());
        assert!(sender.timer_deadline().is_none());
    }

    #[tokio::test]
    async fn forwards_every_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let mut sender = Sender::builder()
            .with_next(move |item: &TelemetryItem| {
                recorded.lock().unwrap().push(item.base_type.clone())
            })
            .initialize(config());

        // No transport: the item is rejected but still forwarded.
        sender.process_telemetry(&event("a")).await;
        assert_eq!(vec![Some("EventData".to_string())], *seen.lock().unwrap());
        assert_eq!(1, sender.logger().times_reported(InternalMessageId::SenderNotInitialized));
    }

    #[tokio::test]
    async fn rejects_malformed_items() {
        let mut sender = Sender::builder()
            .with_http_client(RecordingHttpClient::default())
            .initialize(config());

        sender.process_telemetry(&TelemetryItem::default()).await;
        assert_eq!(1, sender.logger().times_reported(InternalMessageId::CannotSendEmptyTelemetry));

        let item = TelemetryItem::default().with_base_data(json!({ "name": "x" }));
        sender.process_telemetry(&item).await;
        assert_eq!(1, sender.logger().times_reported(InternalMessageId::InvalidEvent));

        // Neither base type nor base data: defaults to an event without data.
        sender
            .process_telemetry(&TelemetryItem::default().with_name("n"))
            .await;
        assert_eq!(1, sender.logger().times_reported(InternalMessageId::CreateEnvelopeError));
        assert_eq!(0, sender.buffer_count());
    }

    #[tokio::test]
    async fn disabled_telemetry_drops_everything() {
        let client = RecordingHttpClient::default();
        let mut sender = Sender::builder()
            .with_http_client(client.clone())
            .initialize(config().with_disable_telemetry(true));
        sender.process_telemetry(&event("a")).await;
        sender.flush().await;
        assert_eq!(0, sender.buffer_count());
        assert!(client.bodies().is_empty());
    }

    #[tokio::test]
    async fn timer_fires_after_interval() {
        let clock = ManualClock::new();
        let client = RecordingHttpClient::default();
        let mut sender = Sender::builder()
            .with_http_client(client.clone())
            .with_clock(clock.clone())
            .initialize(config().with_max_batch_interval(Duration::from_secs(15)));

        sender.process_telemetry(&event("a")).await;
        assert_eq!(Some(clock.now() + Duration::from_secs(15)), sender.timer_deadline());

        clock.advance(Duration::from_secs(14));
        sender.on_timer().await;
        assert!(client.bodies().is_empty());

        clock.advance(Duration::from_secs(1));
        sender.on_timer().await;
        assert_eq!(1, client.bodies().len());
        assert_eq!(Some(clock.now()), sender.last_send());
        assert!(sender.timer_deadline().is_none());
    }

    #[tokio::test]
    async fn initializers_can_drop_and_change_items() {
        let client = RecordingHttpClient::default();
        let mut sender = Sender::builder()
            .with_http_client(client.clone())
            .initialize(config());

        let dropped = event("dropped")
            .with_initializer(|_| Ok(false))
            .with_initializer(|envelope| {
                envelope.properties_mut().insert("ran".into(), json!("yes"));
                Ok(true)
            });
        sender.process_telemetry(&dropped).await;
        assert_eq!(0, sender.buffer_count());

        let changed = event("kept")
            .with_initializer(|_| Err("boom".into()))
            .with_initializer(|envelope| {
                envelope.tags_mut().insert("ai.cloud.role".into(), json!("web"));
                Ok(true)
            });
        sender.process_telemetry(&changed).await;
        assert_eq!(1, sender.buffer_count());
        assert_eq!(
            1,
            sender
                .logger()
                .times_reported(InternalMessageId::TelemetryInitializerFailed)
        );
        let envelope: Value = serde_json::from_str(&sender.buffered_items()[0]).unwrap();
        assert_eq!("web", envelope["tags"]["ai.cloud.role"]);
    }

    #[tokio::test]
    async fn caches_app_id_from_first_response() {
        let client = RecordingHttpClient::default();
        client.respond(
            200,
            r#"{"itemsReceived":1,"itemsAccepted":1,"errors":[],"appId":"app-1"}"#,
        );
        client.respond(
            200,
            r#"{"itemsReceived":1,"itemsAccepted":1,"errors":[],"appId":"app-2"}"#,
        );
        let mut sender = Sender::builder()
            .with_http_client(client.clone())
            .initialize(config());
        for name in ["a", "b"] {
            sender.process_telemetry(&event(name)).await;
            sender.flush().await;
        }
        assert_eq!(Some("app-1"), sender.app_id());
    }

    #[tokio::test]
    async fn beacon_is_preferred_when_enabled() {
        let beacon = Arc::new(RecordingBeacon {
            accept: true,
            ..Default::default()
        });
        let mut sender = Sender::builder()
            .with_beacon(SharedBeacon(beacon.clone()))
            .with_http_client(RecordingHttpClient::default())
            .initialize(config().with_beacon_api_disabled(false));
        assert_eq!(Some(TransportKind::Beacon), sender.transport_kind());

        sender.process_telemetry(&event("a")).await;
        sender.flush().await;
        let sent = beacon.sent.lock().unwrap();
        assert_eq!(1, sent.len());
        assert_eq!(BEACON_CONTENT_TYPE, sent[0].2);
        assert_eq!(vec!["a".to_string()], names(std::str::from_utf8(&sent[0].1).unwrap()));
        assert_eq!(0, sender.buffer_count());
    }

    #[derive(Debug)]
    struct SharedBeacon(Arc<RecordingBeacon>);

    impl BeaconClient for SharedBeacon {
        fn send_beacon(&self, url: &str, body: Bytes, content_type: &str) -> bool {
            self.0.send_beacon(url, body, content_type)
        }
    }

    #[tokio::test]
    async fn session_storage_buffer_is_used_when_enabled() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let mut sender = Sender::builder()
            .with_http_client(RecordingHttpClient::default())
            .with_session_storage(storage.clone())
            .initialize(config().with_session_storage_buffer(true));
        sender.process_telemetry(&event("a")).await;
        let stored = storage.get_item("AI_buffer").unwrap().unwrap();
        let stored: Vec<String> = serde_json::from_str(&stored).unwrap();
        assert_eq!(sender.buffered_items(), stored);
    }
}
