use async_trait::async_trait;

use crate::error::CallError;
use crate::types::{ResponderReply, ResponderRequest, ResponderType, SynthesisRequest};

/// A specialist that answers a question given retrieved context.
#[async_trait]
pub trait Responder: Send + Sync {
    /// The role this responder plays; decides its prompt and weight.
    fn kind(&self) -> ResponderType;
    async fn respond(&self, request: &ResponderRequest) -> Result<ResponderReply, CallError>;
}

/// Combines several responder answers into one text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, CallError>;
}
