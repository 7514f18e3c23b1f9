//! Backend capability provider
//!
//! The gateway talks to the generative backend only through this trait, so
//! a capability object is built once at startup and injected, and tests can
//! substitute a scripted backend.

use crate::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use crate::gemini::{GeminiClient, GeminiError, ResponseStream};
use async_trait::async_trait;

/// Generative-AI capabilities used by the gateway
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Check that calls can be made at all (e.g. a credential is present)
    fn ensure_ready(&self) -> Result<(), GeminiError>;

    /// One-shot generation
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError>;

    /// Streaming generation, one response chunk per item
    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream, GeminiError>;
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn ensure_ready(&self) -> Result<(), GeminiError> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(GeminiError::MissingApiKey)
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        GeminiClient::generate_content(self, model, request).await
    }

    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream, GeminiError> {
        GeminiClient::stream_generate_content(self, model, request).await
    }
}
