// CeCe, the conversational support assistant.
//
// Each turn runs a small state machine: classify the message, then either
// answer directly, consult the corpus first, or start collecting the contact
// details a booking needs. Critical messages short-circuit to a safety
// response that always carries the support line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::modules::assistant::model::{ModelError, ModelProvider, structured};
use crate::modules::assistant::retrieval::{CorpusIndex, DEFAULT_TOP_K};

pub const SUPPORT_LINE: &str = "0800-123-HELP";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("nothing to resume: no detail was requested")]
    NothingToResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Inquiry,
    Booking,
    UrgentHelp,
    Conversational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Stable,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub urgency: Urgency,
    pub summary_request: String,
}

impl Classification {
    pub fn is_critical(&self) -> bool {
        self.intent == Intent::UrgentHelp || self.urgency == Urgency::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    Phone,
    Email,
}

impl ContactField {
    /// Field tag as the frontend knows it.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::FirstName => "user_Fname",
            Self::LastName => "user_Lname",
            Self::Phone => "user_phonenumber",
            Self::Email => "user_email",
        }
    }

    pub fn request(self) -> &'static str {
        match self {
            Self::FirstName => {
                "Before I proceed to book your appointment I'll need your first name"
            }
            Self::LastName => "Next, I'll need your Last name",
            Self::Phone => "I'll also need your phone number to send appointment reminders",
            Self::Email => "And finally I'll need your email address so we can keep in touch",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactDetails {
    pub fn first_missing(&self) -> Option<ContactField> {
        if self.first_name.is_none() {
            Some(ContactField::FirstName)
        } else if self.last_name.is_none() {
            Some(ContactField::LastName)
        } else if self.phone.is_none() {
            Some(ContactField::Phone)
        } else if self.email.is_none() {
            Some(ContactField::Email)
        } else {
            None
        }
    }

    pub fn fill(&mut self, field: ContactField, value: String) {
        match field {
            ContactField::FirstName => self.first_name = Some(value),
            ContactField::LastName => self.last_name = Some(value),
            ContactField::Phone => self.phone = Some(value),
            ContactField::Email => self.email = Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Self::User => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

/// Per-session conversation state, owned by the WebSocket task.
#[derive(Debug, Default)]
pub struct Conversation {
    pub history: Vec<(Speaker, String)>,
    pub contact: ContactDetails,
    pub classification: Option<Classification>,
    pub search_results: Vec<String>,
    pub booking_initiated: bool,
    pub pending: Option<ContactField>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|(speaker, text)| format!("{}: {}", speaker.label(), text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What a single turn produced, in order of emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// A contact detail is needed before the turn can continue.
    Interrupt { field: ContactField, request: String },
    Response { text: String },
    /// The booking flow finished; the frontend takes over with doctor
    /// selection.
    End,
}

#[derive(Debug, Deserialize)]
struct ReformulatedQuery {
    new_query: String,
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    response: String,
}

pub struct Agent {
    model: Arc<dyn ModelProvider>,
    corpus: Arc<CorpusIndex>,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelProvider>, corpus: Arc<CorpusIndex>) -> Self {
        Self { model, corpus }
    }

    /// Runs one user turn. May pause with an `Interrupt` event, in which case
    /// the next input must come through [`Agent::resume`].
    pub async fn handle_message(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<Vec<TurnEvent>, AgentError> {
        conversation
            .history
            .push((Speaker::User, message.to_string()));

        let classification = self.classify(message).await?;
        info!(
            intent = ?classification.intent,
            urgency = ?classification.urgency,
            "message classified"
        );
        let critical = classification.is_critical();
        let intent = classification.intent;
        conversation.classification = Some(classification);

        if critical {
            return self.respond_events(conversation, message).await;
        }
        match intent {
            Intent::Inquiry => {
                conversation.search_results = self.search(message).await;
                self.respond_events(conversation, message).await
            }
            Intent::Booking => self.collect_step(conversation, message).await,
            Intent::Conversational | Intent::UrgentHelp => {
                self.respond_events(conversation, message).await
            }
        }
    }

    /// Feeds the answer to the pending contact-detail request back in and
    /// continues the booking flow.
    pub async fn resume(
        &self,
        conversation: &mut Conversation,
        value: String,
    ) -> Result<Vec<TurnEvent>, AgentError> {
        let field = conversation.pending.take().ok_or(AgentError::NothingToResume)?;
        conversation.contact.fill(field, value);
        let message = conversation
            .history
            .iter()
            .rev()
            .find(|(speaker, _)| *speaker == Speaker::User)
            .map(|(_, text)| text.clone())
            .unwrap_or_default();
        self.collect_step(conversation, &message).await
    }

    async fn collect_step(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<Vec<TurnEvent>, AgentError> {
        if let Some(field) = conversation.contact.first_missing() {
            conversation.pending = Some(field);
            return Ok(vec![TurnEvent::Interrupt {
                field,
                request: field.request().to_string(),
            }]);
        }

        conversation.booking_initiated = true;
        let mut events = self.respond_events(conversation, message).await?;
        events.push(TurnEvent::End);
        Ok(events)
    }

    async fn respond_events(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<Vec<TurnEvent>, AgentError> {
        let text = self.respond(conversation, message).await?;
        conversation
            .history
            .push((Speaker::Assistant, text.clone()));
        Ok(vec![TurnEvent::Response { text }])
    }

    async fn classify(&self, message: &str) -> Result<Classification, AgentError> {
        let prompt = format!(
            "You are an expert mental health support agent.\n\
             Your job is to analyze this request and classify it by intent and urgency.\n\
             intent can be one of: inquiry, booking, urgent_help, conversational.\n\
             Requests for rescheduling are not conversational but rather a booking intent.\n\
             urgency can be one of: stable, critical.\n\
             conversational intent is for friendly, empathetic small talk only and general \
             emotional support; use it to suggest coping strategies for down moods or for \
             dealing with interpersonal relationships that do not indicate self harm.\n\
             Pay special attention to requests indicating immediate danger, suicide ideation, \
             self-harm, or a depressive mood and tone.\n\
             Classify this request accordingly.\n\
             Request: {message}"
        );
        let schema = json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "enum": ["inquiry", "booking", "urgent_help", "conversational"],
                },
                "urgency": { "type": "string", "enum": ["stable", "critical"] },
                "summary_request": { "type": "string" },
            },
            "required": ["intent", "urgency", "summary_request"],
        });
        Ok(structured(self.model.as_ref(), &prompt, &schema).await?)
    }

    async fn search(&self, message: &str) -> Vec<String> {
        if self.corpus.is_empty() {
            return Vec::new();
        }
        let prompt = format!(
            "Rewrite this user query into a more effective query about the mental health \
             facility's website.\nRequest: {message}"
        );
        let schema = json!({
            "type": "object",
            "properties": { "new_query": { "type": "string" } },
            "required": ["new_query"],
        });
        let query = match structured::<ReformulatedQuery>(self.model.as_ref(), &prompt, &schema)
            .await
        {
            Ok(reformulated) => reformulated.new_query,
            Err(error) => {
                warn!(%error, "query reformulation failed, searching with the raw message");
                message.to_string()
            }
        };
        self.corpus.search(&query, DEFAULT_TOP_K)
    }

    async fn respond(
        &self,
        conversation: &Conversation,
        message: &str,
    ) -> Result<String, AgentError> {
        let classification = conversation
            .classification
            .as_ref()
            .map(|c| serde_json::to_string(c).unwrap_or_default())
            .unwrap_or_else(|| "null".into());
        let search_results = if conversation.search_results.is_empty() {
            "None".to_string()
        } else {
            conversation.search_results.join("\n---\n")
        };

        let prompt = format!(
            "You are a mental health support chatbot named CeCe for a nonprofit youth health \
             organization, Corner Health.\n\
             Your purpose is to respond gently, clearly, and safely. You do NOT give medical \
             advice or instructions. You only provide emotional support, general information \
             about services, and guidance on how to reach human help.\n\
             \n\
             ### SAFETY RULES (VERY IMPORTANT)\n\
             1. If the classification intent is \"urgent_help\" OR the urgency is \"critical\":\n\
                - Do NOT describe self-harm.\n\
                - Do NOT analyze methods or details.\n\
                - Do NOT give medical or diagnostic guidance.\n\
                - You MUST respond with supportive language AND direct them to immediate human help.\n\
                - You MUST ALWAYS include this support line: \"{SUPPORT_LINE}\" for them to reach out to.\n\
                - Encourage them to contact a trusted adult, friend, or local emergency services.\n\
                - Be calm, warm, and brief.\n\
             2. If the intent is \"booking\" and booking is initiated:\n\
                - Inform the user that you've gathered their information.\n\
                - Tell them they'll now see available doctors to choose from.\n\
                - Keep the tone supportive and simple.\n\
                - Don't ask for more information as booking is handled by the calendar UI.\n\
             3. If the intent is \"inquiry\":\n\
                - Use the search results to give safe, non-clinical information about services.\n\
                - Do not describe mental health conditions.\n\
                - Keep answers short and clear.\n\
             4. If the intent is \"conversational\":\n\
                - Give friendly and empathetic small talk.\n\
                - Redirect gently toward available services when appropriate.\n\
             \n\
             ### RESPONSE STYLE RULES\n\
             - Warm, neutral, respectful tone.\n\
             - No clinical claims. No diagnosis. No referencing medical severity.\n\
             - Short paragraphs. Clear sentences.\n\
             - No judgmental wording.\n\
             - Use the user's first name when available.\n\
             \n\
             ### CONTEXT\n\
             User first name: {first_name}\n\
             Classification: {classification}\n\
             Search results:\n{search_results}\n\
             Booking initiated: {booking_initiated}\n\
             Conversation so far:\n{transcript}\n\
             \n\
             ### NOW PRODUCE THE RESPONSE\n\
             Generate a final response to the user based on their original message: \
             \"{message}\"\n\
             Be safe, supportive, and helpful.",
            first_name = conversation
                .contact
                .first_name
                .as_deref()
                .unwrap_or("unknown"),
            booking_initiated = conversation.booking_initiated,
            transcript = conversation.transcript(),
        );
        let schema = json!({
            "type": "object",
            "properties": { "response": { "type": "string" } },
            "required": ["response"],
        });
        let reply: ModelResponse = structured(self.model.as_ref(), &prompt, &schema).await?;
        Ok(reply.response)
    }
}
