use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::directory::records::CalendarCredentials;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EventDraft {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_email: String,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar unreachable: {0}")]
    Network(String),

    #[error("calendar rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("calendar backend error: {0}")]
    Backend(String),
}

/// Port onto the doctor's external calendar. Credentials travel with every
/// call so the adapter stays stateless per doctor.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn events(
        &self,
        credentials: &CalendarCredentials,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn create_event(
        &self,
        credentials: &CalendarCredentials,
        draft: EventDraft,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn delete_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> Result<(), CalendarError>;
}
