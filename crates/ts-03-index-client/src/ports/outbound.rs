//! # Outbound Ports
//!
//! The HTTP transport the client runs on.

use crate::domain::ClientError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;

/// Raw HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded lossily, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with `ClientError::Http` unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Http {
                status: self.status,
                body: self.text(),
            })
        }
    }

    /// Parse the body as JSON.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartPart {
    /// Plain form field.
    Text { name: String, value: String },
    /// File field.
    File {
        name: String,
        filename: String,
        bytes: Vec<u8>,
    },
}

/// HTTP transport - outbound port.
///
/// One attempt per call. Non-2xx statuses are returned as responses, not
/// errors; only transport failures are errors.
#[async_trait]
pub trait HttpRequester: Send + Sync {
    /// `GET url?query`.
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, ClientError>;

    /// `POST url` with a JSON body.
    async fn post_json(&self, url: &str, body: &serde_json::Value)
        -> Result<HttpResponse, ClientError>;

    /// `POST url` with a multipart body.
    async fn post_multipart(
        &self,
        url: &str,
        parts: Vec<MultipartPart>,
    ) -> Result<HttpResponse, ClientError>;
}

#[async_trait]
impl<T: HttpRequester + ?Sized> HttpRequester for Arc<T> {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, ClientError> {
        (**self).get(url, query).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ClientError> {
        (**self).post_json(url, body).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        parts: Vec<MultipartPart>,
    ) -> Result<HttpResponse, ClientError> {
        (**self).post_multipart(url, parts).await
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// A request seen by [`MockHttpRequester`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    Get {
        url: String,
        query: Vec<(String, String)>,
    },
    PostJson {
        url: String,
        body: serde_json::Value,
    },
    PostMultipart {
        url: String,
        parts: Vec<MultipartPart>,
    },
}

impl RecordedRequest {
    pub fn url(&self) -> &str {
        match self {
            Self::Get { url, .. } | Self::PostJson { url, .. } | Self::PostMultipart { url, .. } => {
                url
            }
        }
    }
}

/// Mock transport replaying queued responses in order.
///
/// When the queue is empty every call fails with a transport error.
#[derive(Clone, Default)]
pub struct MockHttpRequester {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpRequester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(HttpResponse::json(status, &body))
    }

    /// Queue a transport failure.
    pub fn push_transport_error(&self, reason: &str) -> &Self {
        self.responses.lock().push_back(Err(reason.to_string()));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn next(&self, request: RecordedRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().push(request);
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(ClientError::Transport(reason)),
            None => Err(ClientError::Transport("no mock response queued".to_string())),
        }
    }
}

#[async_trait]
impl HttpRequester for MockHttpRequester {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, ClientError> {
        self.next(RecordedRequest::Get {
            url: url.to_string(),
            query: query.to_vec(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ClientError> {
        self.next(RecordedRequest::PostJson {
            url: url.to_string(),
            body: body.clone(),
        })
    }

    async fn post_multipart(
        &self,
        url: &str,
        parts: Vec<MultipartPart>,
    ) -> Result<HttpResponse, ClientError> {
        self.next(RecordedRequest::PostMultipart {
            url: url.to_string(),
            parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockHttpRequester::new();
        mock.push_json(200, json!({"n": 1})).push_json(500, json!({"n": 2}));

        let first = mock.get("http://x/a", &[]).await.unwrap();
        let second = mock.post_json("http://x/b", &json!({})).await.unwrap();

        assert!(first.is_success());
        assert!(second.clone().error_for_status().unwrap_err().is_transient());
        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.requests()[1].url(), "http://x/b");
    }

    #[tokio::test]
    async fn test_mock_empty_queue_is_transport_error() {
        let mock = MockHttpRequester::new();
        let err = mock.get("http://x", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn test_error_for_status_keeps_body() {
        let response = HttpResponse {
            status: 422,
            body: b"bad field".to_vec(),
        };
        match response.error_for_status() {
            Err(ClientError::Http { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad field");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
