use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::fmt::Debug;

/// Error returned by [`HttpClient`] and [`CrossDomainClient`](crate::CrossDomainClient)
/// implementations.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HTTP client used by the XHR transport.
///
/// A response with an error status code is still `Ok`; `Err` means the request did not
/// complete at all.
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    /// Send the request and read the full response body.
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError>;

    /// Whether the client can send credentialed cross-origin requests. Clients that cannot
    /// are skipped during transport selection.
    fn supports_credentials(&self) -> bool {
        true
    }
}

#[cfg(feature = "reqwest")]
mod reqwest {
    use super::{async_trait, Bytes, HttpClient, HttpError, Request, Response};
    use std::convert::TryInto;

    #[async_trait]
    impl HttpClient for ::reqwest::Client {
        async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
            let request: ::reqwest::Request = request.try_into()?;
            let response = self.execute(request).await?;
            let mut builder = Response::builder().status(response.status().as_u16());
            for (name, value) in response.headers() {
                builder = builder.header(name.as_str(), value.as_bytes());
            }
            Ok(builder.body(response.bytes().await?)?)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    /// Records requests and replays queued responses. Answers `200` with an empty
    /// summary when the queue is empty.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingHttpClient {
        pub(crate) requests: Arc<Mutex<Vec<Request<Vec<u8>>>>>,
        pub(crate) responses: Arc<Mutex<VecDeque<Result<(u16, String), String>>>>,
    }

    impl RecordingHttpClient {
        pub(crate) fn respond(&self, status: u16, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok((status, body.into())));
        }

        pub(crate) fn fail(&self, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(message.into()));
        }

        pub(crate) fn bodies(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| String::from_utf8(r.body().clone()).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingHttpClient {
        async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
            self.requests.lock().unwrap().push(request);
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok((status, body))) => Ok(Response::builder()
                    .status(status)
                    .body(Bytes::from(body))
                    .unwrap()),
                Some(Err(message)) => Err(message.into()),
                None => Ok(Response::builder()
                    .status(200)
                    .body(Bytes::from_static(b""))
                    .unwrap()),
            }
        }
    }
}
