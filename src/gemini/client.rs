//! Gemini API client
//!
//! Direct HTTP client for the Gemini REST API. Offers a one-shot
//! `generateContent` call and a streaming `streamGenerateContent` call that
//! yields one parsed response chunk per SSE event.

use crate::gemini::config::GeminiConfig;
use crate::gemini::error::GeminiError;
use crate::gemini::sse::SseDecoder;
use crate::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::time::Duration;

/// Lazily-consumed sequence of streamed response chunks
pub type ResponseStream =
    Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, GeminiError>> + Send>>;

/// HTTP client bound to one API key and base URL
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
    stream_idle_timeout: Duration,
}

impl GeminiClient {
    /// Create a client from a shared `reqwest::Client` (connection pooling)
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, config: &GeminiConfig) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            stream_idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        }
    }

    /// Whether a non-empty API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn ensure_api_key(&self) -> Result<(), GeminiError> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(GeminiError::MissingApiKey)
        }
    }

    fn map_send_error(&self, err: reqwest::Error, timeout: Duration) -> GeminiError {
        if err.is_timeout() {
            GeminiError::Timeout(timeout.as_secs())
        } else {
            GeminiError::Request(err)
        }
    }

    /// Call `generateContent` and return the parsed response
    ///
    /// # Errors
    /// * `MissingApiKey` if no key is configured
    /// * `Timeout` if the call exceeds the request deadline
    /// * `RateLimited` / `Status` for non-success HTTP statuses
    /// * `Parse` if the body is not a valid response
    /// * `Blocked` if the provider rejected the prompt
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        self.ensure_api_key()?;

        tracing::debug!(
            model = %model,
            turns = request.contents.len(),
            "Calling Gemini generateContent"
        );

        let response = self
            .http
            .post(self.endpoint(model, "generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, self.request_timeout))?;

        let response = check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e, self.request_timeout))?;

        let parsed = parse_response(&body)?;
        tracing::debug!(
            model = %model,
            parts = parsed.parts().len(),
            "Received Gemini response"
        );
        Ok(parsed)
    }

    /// Call `streamGenerateContent?alt=sse` and return the chunk stream
    ///
    /// The stream ends after the last chunk, or after the first error (an
    /// idle timeout, a transport failure, an unparsable or blocked chunk).
    pub async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream, GeminiError> {
        self.ensure_api_key()?;

        tracing::debug!(
            model = %model,
            turns = request.contents.len(),
            "Calling Gemini streamGenerateContent"
        );

        let idle = self.stream_idle_timeout;
        let send = self
            .http
            .post(self.endpoint(model, "streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(request)
            .send();

        let response = match tokio::time::timeout(idle, send).await {
            Ok(result) => result.map_err(|e| self.map_send_error(e, idle))?,
            Err(_) => return Err(GeminiError::Timeout(idle.as_secs())),
        };
        let response = check_status(response).await?;
        let mut body = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            loop {
                let next = match tokio::time::timeout(idle, body.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(GeminiError::Timeout(idle.as_secs()));
                        return;
                    }
                };
                match next {
                    Some(Ok(chunk)) => {
                        for data in decoder.push(&chunk) {
                            let parsed = parse_response(&data);
                            let failed = parsed.is_err();
                            yield parsed;
                            if failed {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(GeminiError::Request(e));
                        return;
                    }
                    None => break,
                }
            }
            if let Some(data) = decoder.finish() {
                yield parse_response(&data);
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Turn non-success statuses into errors, keeping the body for diagnostics
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error body".to_string());

    tracing::error!(
        status_code = status_code,
        error_body = %body,
        "Gemini API returned error status"
    );

    if status_code == 429 {
        return Err(GeminiError::RateLimited { body });
    }
    Err(GeminiError::Status {
        status: status_code,
        body,
    })
}

/// Parse one response body (or one SSE payload), rejecting blocked prompts
fn parse_response(body: &str) -> Result<GenerateContentResponse, GeminiError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)?;
    if let Some(reason) = parsed.block_reason() {
        return Err(GeminiError::Blocked(reason.to_string()));
    }
    Ok(parsed)
}
