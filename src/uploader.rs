use crate::{
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    Error,
};
use http::Request;
use serde::Deserialize;

pub(crate) const STATUS_PARTIAL_CONTENT: u16 = 206;
const STATUS_REQUEST_TIMEOUT: u16 = 408;
const STATUS_TOO_MANY_REQUESTS: u16 = 429;
const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;
const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

const BYPASS_INSTRUMENTATION_HEADER: &str = "x-ms-bypass-ajax-instrumentation";
const SDK_CONTEXT_HEADER: &str = "sdk-context";
const SDK_CONTEXT_APP_ID_REQUEST: &str = "appId";

/// Ingestion endpoints that understand the `Sdk-Context` correlation header.
const INTERNAL_ENDPOINTS: [&str; 3] = [
    "https://dc.services.visualstudio.com/v2/track",
    "https://breeze.aimon.applicationinsights.io/v2/track",
    "https://dc-int.services.visualstudio.com/v2/track",
];

/// Summary the ingestion service returns for a batch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Transmission {
    /// Number of items in the batch.
    pub(crate) items_received: usize,
    /// Number of items stored.
    pub(crate) items_accepted: usize,
    /// One entry per rejected item.
    pub(crate) errors: Vec<TransmissionItem>,
    /// Application id of the instrumentation key, used for correlation.
    pub(crate) app_id: Option<String>,
}

/// A rejected item of a [`Transmission`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TransmissionItem {
    /// Position of the item in the batch.
    pub(crate) index: usize,
    /// Status code for this item alone.
    pub(crate) status_code: u16,
    /// Reason for the rejection.
    pub(crate) message: String,
}

/// Whether items rejected with this status code may be sent again.
pub(crate) fn is_retriable(status_code: u16) -> bool {
    matches!(
        status_code,
        STATUS_REQUEST_TIMEOUT
            | STATUS_TOO_MANY_REQUESTS
            | STATUS_INTERNAL_SERVER_ERROR
            | STATUS_SERVICE_UNAVAILABLE
    )
}

/// Parse a response body. Returns `None` for empty bodies and for summaries whose counts do
/// not add up; unparsable bodies are also logged.
pub(crate) fn parse_response(logger: &DiagnosticLogger, body: &str) -> Option<Transmission> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Transmission>(body).map_err(Error::UploadDeserializeResponse) {
        Ok(result)
            if result.items_received > 0
                && result.items_received >= result.items_accepted
                && result.items_received - result.items_accepted == result.errors.len() =>
        {
            Some(result)
        }
        Ok(_) => None,
        Err(err) => {
            logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::InvalidBackendResponse,
                format!("Cannot parse the response. {}", err),
                Some(serde_json::json!({ "exception": err.to_string() })),
                false,
            );
            None
        }
    }
}

/// Build the XHR request for a batch. Known ingestion endpoints are asked to include the
/// application id in their response.
pub(crate) fn build_request(
    endpoint_url: &str,
    payload: String,
) -> Result<Request<Vec<u8>>, http::Error> {
    let mut builder = Request::post(endpoint_url)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(BYPASS_INSTRUMENTATION_HEADER, "true");
    if INTERNAL_ENDPOINTS.contains(&endpoint_url.to_lowercase().as_str()) {
        builder = builder.header(SDK_CONTEXT_HEADER, SDK_CONTEXT_APP_ID_REQUEST);
    }
    builder.body(payload.into_bytes())
}

/// Message used when a whole XHR batch fails.
pub(crate) fn format_error_message(status: u16, response_text: &str) -> String {
    format!("XMLHttpRequest,Status:{},Response:{}", status, response_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(408, true ; "request timeout")]
    #[test_case(429, true ; "too many requests")]
    #[test_case(500, true ; "internal server error")]
    #[test_case(503, true ; "service unavailable")]
    #[test_case(400, false ; "bad request")]
    #[test_case(439, false ; "quota")]
    #[test_case(206, false ; "partial content")]
    fn retriable_status(status: u16, expected: bool) {
        assert_eq!(expected, is_retriable(status));
    }

    #[test]
    fn parses_valid_summary() {
        let logger = DiagnosticLogger::default();
        let result = parse_response(
            &logger,
            r#"{"itemsReceived":5,"itemsAccepted":3,"errors":[{"index":1,"statusCode":500,"message":"x"},{"index":4,"statusCode":429}],"appId":"abc"}"#,
        )
        .unwrap();
        assert_eq!(2, result.errors.len());
        assert_eq!(429, result.errors[1].status_code);
        assert_eq!(Some("abc".into()), result.app_id);
    }

    #[test_case("" ; "empty")]
    #[test_case(r#"{"itemsReceived":0,"itemsAccepted":0,"errors":[]}"# ; "nothing received")]
    #[test_case(r#"{"itemsReceived":2,"itemsAccepted":3,"errors":[]}"# ; "more accepted than received")]
    #[test_case(r#"{"itemsReceived":3,"itemsAccepted":1,"errors":[{"index":0,"statusCode":400}]}"# ; "error count mismatch")]
    fn rejects_inconsistent_summary(body: &str) {
        let logger = DiagnosticLogger::default();
        assert_eq!(None, parse_response(&logger, body));
        assert_eq!(
            0,
            logger.times_reported(InternalMessageId::InvalidBackendResponse)
        );
    }

    #[test]
    fn logs_unparsable_body() {
        let logger = DiagnosticLogger::default();
        assert_eq!(None, parse_response(&logger, "<html>"));
        assert_eq!(
            1,
            logger.times_reported(InternalMessageId::InvalidBackendResponse)
        );
    }

    #[test]
    fn request_headers() {
        let request =
            build_request("https://DC.services.visualstudio.com/v2/track", "[]".into()).unwrap();
        assert_eq!("POST", request.method());
        assert_eq!("application/json", request.headers()["content-type"]);
        assert_eq!("true", request.headers()[BYPASS_INSTRUMENTATION_HEADER]);
        assert_eq!("appId", request.headers()[SDK_CONTEXT_HEADER]);
        assert_eq!(b"[]".to_vec(), *request.body());

        let custom = build_request("https://ingest.example.com/v2/track", "[]".into()).unwrap();
        assert!(custom.headers().get(SDK_CONTEXT_HEADER).is_none());
    }
}
