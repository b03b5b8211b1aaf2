use std::str::FromStr;

use thiserror::Error;

use crate::context::ConversationContext;
use crate::llm::LlmClient;

/// The closed set of destinations a turn can route to. Free text goes in,
/// exactly one of these comes out; nothing else about the conversation is
/// delegated to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Knowledge,
    Book,
    Cancel,
    Confirm,
    Reschedule,
    Escalate,
    End,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Book => "book",
            Self::Cancel => "cancel",
            Self::Confirm => "confirm",
            Self::Reschedule => "reschedule",
            Self::Escalate => "escalate",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("llm request failed: {0}")]
    Llm(String),
    #[error("unrecognized intent reply: `{0}`")]
    UnrecognizedIntent(String),
}

impl FromStr for Intent {
    type Err = ClassifyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "knowledge" => Ok(Self::Knowledge),
            "book" => Ok(Self::Book),
            "cancel" => Ok(Self::Cancel),
            "confirm" => Ok(Self::Confirm),
            "reschedule" => Ok(Self::Reschedule),
            "escalate" => Ok(Self::Escalate),
            "end" => Ok(Self::End),
            other => Err(ClassifyError::UnrecognizedIntent(other.to_string())),
        }
    }
}

pub struct IntentClassifier<C> {
    client: C,
}

impl<C: LlmClient> IntentClassifier<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// One oracle call per turn. The reply must be a single token from the
    /// closed intent set; anything else surfaces as
    /// [`ClassifyError::UnrecognizedIntent`] so the caller can fail toward a
    /// human.
    pub async fn classify(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<Intent, ClassifyError> {
        let prompt = routing_prompt(message, context);
        let reply =
            self.client.complete(&prompt).await.map_err(|error| ClassifyError::Llm(error.to_string()))?;
        reply.parse()
    }
}

fn routing_prompt(message: &str, context: &ConversationContext) -> String {
    let mut known = Vec::new();
    if context.service_id.is_some() {
        known.push("servicio elegido");
    }
    if context.contact_id.is_some() {
        known.push("contacto identificado");
    }
    if !context.available_slots.is_empty() {
        known.push("horarios ya ofrecidos");
    }
    let state = if known.is_empty() { "sin datos previos".to_string() } else { known.join(", ") };

    format!(
        "Eres el enrutador de un asistente de reservas para un spa. \
         Clasifica el mensaje del cliente en exactamente una palabra de esta lista: \
         knowledge, book, cancel, confirm, reschedule, escalate, end. \
         Responde solo con la palabra, sin explicaciones.\n\
         Estado de la conversacion: {state}.\n\
         Mensaje del cliente: {message}"
    )
}
