//! HTTP client for the inference endpoint.
//!
//! The endpoint is addressed by name under a base URL:
//! `POST {base}/endpoints/{name}/invocations` for a single JSON response,
//! `POST {base}/endpoints/{name}/invocations-response-stream` for a streamed
//! body, and `GET {base}/endpoints` to list what the backend hosts.
//!
//! Only the single-response and listing calls carry a total deadline. A
//! streamed body stays open for as long as the endpoint keeps sending.

use crate::config::BackendConfig;
use crate::error::{GatewayError, Result};
use crate::translate::openai_types::InvocationPayload;

use bytes::Bytes;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of one hosted endpoint, as returned by `/v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    #[serde(rename = "EndpointName")]
    pub name: String,
    #[serde(rename = "EndpointStatus")]
    pub status: Option<String>,
}

/// One page of the backend's endpoint listing.
#[derive(Debug, Deserialize)]
struct ListEndpointsPage {
    #[serde(rename = "Endpoints", default)]
    endpoints: Vec<EndpointSummary>,
    #[serde(rename = "NextToken")]
    next_token: Option<String>,
}

const LIST_PAGE_SIZE: u32 = 100;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared HTTP client. Only connection setup is bounded here;
/// request deadlines are applied per call.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

#[derive(Debug, Clone)]
pub struct EndpointClient {
    client: reqwest::Client,
    base_url: String,
    endpoint_name: String,
    request_timeout: Duration,
}

impl EndpointClient {
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoint_name: config.endpoint_name.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    fn invocation_url(&self, streaming: bool) -> String {
        let action = if streaming {
            "invocations-response-stream"
        } else {
            "invocations"
        };
        format!("{}/endpoints/{}/{}", self.base_url, self.endpoint_name, action)
    }

    /// Invoke the endpoint and return the full response body.
    pub async fn invoke(&self, payload: &InvocationPayload) -> Result<Bytes> {
        let url = self.invocation_url(false);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;

        let response = check_status(response).await?;
        response.bytes().await.map_err(|e| request_failed(&url, e))
    }

    /// Invoke the endpoint in streaming mode and return its raw body chunks.
    /// No total deadline applies once the response headers arrive.
    pub async fn invoke_stream(
        &self,
        payload: &InvocationPayload,
    ) -> Result<impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static>
    {
        let url = self.invocation_url(true);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;

        Ok(check_status(response).await?.bytes_stream())
    }

    /// List every endpoint the backend hosts, following pagination.
    pub async fn list_endpoints(&self) -> Result<Vec<EndpointSummary>> {
        let url = format!("{}/endpoints", self.base_url);
        let mut all = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .timeout(self.request_timeout)
                .query(&[("MaxResults", LIST_PAGE_SIZE.to_string())]);
            if let Some(ref token) = next_token {
                request = request.query(&[("NextToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| request_failed(&url, e))?;
            let page: ListEndpointsPage = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| request_failed(&url, e))?;

            all.extend(page.endpoints);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(all)
    }
}

/// Turn a non-2xx response into a backend error. The body is logged, never
/// returned, so endpoint error payloads don't reach callers.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        status = status.as_u16(),
        body = truncate(&body, 500),
        "Endpoint returned an error"
    );
    Err(GatewayError::backend(format!(
        "Endpoint returned status {}",
        status.as_u16()
    )))
}

/// Log a transport failure with its target and cause. Callers only see a
/// generic message so backend addresses stay internal.
fn request_failed(url: &str, err: reqwest::Error) -> GatewayError {
    tracing::warn!(url, error = %err, timeout = err.is_timeout(), "Endpoint request failed");
    GatewayError::backend("Endpoint request failed")
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> EndpointClient {
        EndpointClient::new(
            reqwest::Client::new(),
            &BackendConfig {
                base_url: base_url.to_string(),
                endpoint_name: "qwen-1-5b".to_string(),
                timeout_secs: 30,
            },
        )
    }

    #[test]
    fn test_invocation_urls() {
        let c = client("http://backend:9000/");
        assert_eq!(
            c.invocation_url(false),
            "http://backend:9000/endpoints/qwen-1-5b/invocations"
        );
        assert_eq!(
            c.invocation_url(true),
            "http://backend:9000/endpoints/qwen-1-5b/invocations-response-stream"
        );
    }

    #[test]
    fn test_request_timeout_comes_from_config() {
        assert_eq!(client("http://backend:9000").request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abcdef", 3), "abc");
    }

    #[test]
    fn test_endpoint_summary_wire_names() {
        let page: ListEndpointsPage = serde_json::from_str(
            r#"{"Endpoints":[{"EndpointName":"a","EndpointStatus":"InService"}],"NextToken":"t1"}"#,
        )
        .unwrap();
        assert_eq!(page.endpoints[0].name, "a");
        assert_eq!(page.endpoints[0].status.as_deref(), Some("InService"));
        assert_eq!(page.next_token.as_deref(), Some("t1"));
    }
}
