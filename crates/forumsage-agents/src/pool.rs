use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use forumsage_core::config::ResponderSettings;
use forumsage_core::error::CallError;
use forumsage_core::traits::Responder;
use forumsage_core::types::{
    GenerationLimits, RelevanceHit, ResponderOutput, ResponderRequest, ResponderType,
};

use crate::client::{RemoteResponder, SpecialistClient};
use crate::context::build_context;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fans a question out to every configured responder at once.
///
/// Each call runs in its own task under its own deadline. A timeout, a
/// transport or status error, a malformed reply or a panicking task costs
/// only that responder's output; the pool always waits for every call to
/// settle and never fails as a whole.
pub struct ResponderPool {
    responders: Vec<Arc<dyn Responder>>,
    timeout: Duration,
    limits: GenerationLimits,
}

impl ResponderPool {
    pub fn new(responders: Vec<Arc<dyn Responder>>) -> Self {
        Self { responders, timeout: DEFAULT_TIMEOUT, limits: GenerationLimits::default() }
    }

    /// One `RemoteResponder` per enabled role, all sharing `client`.
    pub fn remote(settings: &ResponderSettings, client: Arc<SpecialistClient>) -> Self {
        let responders = settings
            .enabled
            .iter()
            .map(|kind| {
                Arc::new(RemoteResponder::new(*kind, Arc::clone(&client))) as Arc<dyn Responder>
            })
            .collect();
        Self::new(responders).with_timeout(settings.timeout()).with_limits(settings.limits())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn kinds(&self) -> Vec<ResponderType> {
        self.responders.iter().map(|r| r.kind()).collect()
    }

    /// Consult every responder with the same context. Successful outputs come
    /// back in submission order; failed responders are simply absent.
    pub async fn dispatch(&self, question: &str, hits: &[RelevanceHit]) -> Vec<ResponderOutput> {
        let context = build_context(hits);
        let kinds = self.kinds();

        let tasks = self.responders.iter().map(|responder| {
            let kind = responder.kind();
            let request = ResponderRequest {
                responder: kind,
                question: question.to_string(),
                context: context.clone(),
                system_prompt: kind.system_prompt().to_string(),
                max_tokens: self.limits.max_tokens,
                temperature: self.limits.temperature,
            };
            let responder = Arc::clone(responder);
            let timeout = self.timeout;
            tokio::spawn(async move { consult(responder, request, timeout).await })
        });
        let settled = join_all(tasks).await;

        let outputs: Vec<ResponderOutput> = settled
            .into_iter()
            .zip(kinds)
            .filter_map(|(joined, kind)| match joined {
                Ok(Ok(output)) => Some(output),
                Ok(Err(e)) => {
                    warn!(responder = %kind, error = %e, "responder produced no output");
                    None
                }
                Err(e) => {
                    warn!(responder = %kind, error = %e, "responder task aborted");
                    None
                }
            })
            .collect();
        info!(
            succeeded = outputs.len(),
            dispatched = self.responders.len(),
            "responder dispatch settled"
        );
        outputs
    }
}

async fn consult(
    responder: Arc<dyn Responder>,
    request: ResponderRequest,
    timeout: Duration,
) -> Result<ResponderOutput, CallError> {
    let started = Instant::now();
    let reply = tokio::time::timeout(timeout, responder.respond(&request))
        .await
        .map_err(|_| CallError::Timeout(timeout))??;

    if !reply.confidence.is_finite() || !(0.0..=1.0).contains(&reply.confidence) {
        return Err(CallError::Malformed(format!("confidence {} outside [0, 1]", reply.confidence)));
    }

    Ok(ResponderOutput {
        responder: request.responder,
        response: reply.response,
        confidence: reply.confidence,
        sources: reply.sources,
        elapsed: started.elapsed(),
        reasoning: reply.reasoning.filter(|r| !r.trim().is_empty()),
    })
}
