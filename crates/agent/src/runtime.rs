use anyhow::Result;

use crate::context::ConversationContext;
use crate::intent::{ClassifyError, Intent, IntentClassifier};
use crate::llm::LlmClient;

/// Routes one inbound message. Classification happens exactly once per turn;
/// everything after the returned [`Intent`] is deterministic dispatch in the
/// caller.
pub struct AgentRuntime<C> {
    classifier: IntentClassifier<C>,
}

impl<C: LlmClient> AgentRuntime<C> {
    pub fn new(client: C) -> Self {
        Self { classifier: IntentClassifier::new(client) }
    }

    /// An unrecognized reply routes to [`Intent::Escalate`]: when the oracle
    /// cannot name a destination, a human gets the turn instead of a guessed
    /// booking action. Transport failures propagate to the orchestrator,
    /// which owns retries.
    pub async fn route_turn(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<Intent> {
        match self.classifier.classify(message, context).await {
            Ok(intent) => Ok(intent),
            Err(ClassifyError::UnrecognizedIntent(reply)) => {
                tracing::warn!(%reply, "unrecognized intent reply, escalating");
                Ok(Intent::Escalate)
            }
            Err(error @ ClassifyError::Llm(_)) => Err(error.into()),
        }
    }
}
