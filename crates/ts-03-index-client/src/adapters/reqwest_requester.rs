//! reqwest Transport Adapter
//!
//! Implements the `HttpRequester` port over a pooled `reqwest::Client`.

use crate::domain::{ClientError, IndexConfig};
use crate::ports::outbound::{HttpRequester, HttpResponse, MultipartPart};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder};
use tracing::trace;

/// HTTP transport backed by reqwest with rustls.
#[derive(Clone, Debug)]
pub struct ReqwestRequester {
    client: Client,
}

impl ReqwestRequester {
    /// Build a client honouring the configured timeouts.
    pub fn new(config: &IndexConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("ts-provisioner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: RequestBuilder) -> Result<HttpResponse, ClientError> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();
        trace!(status, bytes = body.len(), "HTTP response");

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, ClientError> {
        self.send(self.client.get(url).query(query)).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ClientError> {
        self.send(self.client.post(url).json(body)).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        parts: Vec<MultipartPart>,
    ) -> Result<HttpResponse, ClientError> {
        let mut form = Form::new();
        for part in parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name, value),
                MultipartPart::File {
                    name,
                    filename,
                    bytes,
                } => form.part(name, Part::bytes(bytes).file_name(filename)),
            };
        }
        self.send(self.client.post(url).multipart(form)).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(e.to_string())
    } else {
        ClientError::Transport(e.to_string())
    }
}
