use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use forumsage_core::error::CallError;
use forumsage_core::traits::{Responder, Synthesizer};
use forumsage_core::types::{ResponderReply, ResponderRequest, ResponderType, SynthesisRequest};

/// HTTP client for the remote specialist service. One instance is shared by
/// every `RemoteResponder` and doubles as the remote synthesizer.
///
/// Timeouts are not configured here; callers wrap each call in their own
/// deadline so that one slow role never holds up another.
pub struct SpecialistClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    #[serde(default)]
    synthesized_response: String,
}

impl SpecialistClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap, CallError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !self.api_key.is_empty() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| CallError::Transport(format!("invalid api key header: {}", e)))?;
            headers.insert(AUTHORIZATION, bearer);
        }
        Ok(headers)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, CallError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CallError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(CallError::Status { status: status.as_u16(), body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn process(&self, request: &ResponderRequest) -> Result<ResponderReply, CallError> {
        debug!(responder = %request.responder, "specialist request");
        self.post_json("/agents/process", request).await
    }
}

#[async_trait]
impl Synthesizer for SpecialistClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, CallError> {
        debug!(responses = request.responses.len(), "synthesis request");
        let reply: SynthesisReply = self.post_json("/synthesize", request).await?;
        Ok(reply.synthesized_response)
    }
}

/// One specialist role served by the shared remote client.
pub struct RemoteResponder {
    kind: ResponderType,
    client: Arc<SpecialistClient>,
}

impl RemoteResponder {
    pub fn new(kind: ResponderType, client: Arc<SpecialistClient>) -> Self {
        Self { kind, client }
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    fn kind(&self) -> ResponderType {
        self.kind
    }

    async fn respond(&self, request: &ResponderRequest) -> Result<ResponderReply, CallError> {
        self.client.process(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = SpecialistClient::new("http://localhost:9000/v1/", "");
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn bearer_header_only_with_key() {
        let anonymous = SpecialistClient::new("http://localhost", "").headers().unwrap();
        assert!(anonymous.get(AUTHORIZATION).is_none());
        let keyed = SpecialistClient::new("http://localhost", "k3y").headers().unwrap();
        assert_eq!(keyed.get(AUTHORIZATION).unwrap(), "Bearer k3y");
    }

    #[test]
    fn request_uses_wire_field_names() {
        let request = ResponderRequest {
            responder: ResponderType::SafetySpecialist,
            question: "q".to_string(),
            context: "c".to_string(),
            system_prompt: "p".to_string(),
            max_tokens: 800,
            temperature: 0.5,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["agent_type"], "safety_specialist");
        assert_eq!(value["max_tokens"], 800);
    }
}
