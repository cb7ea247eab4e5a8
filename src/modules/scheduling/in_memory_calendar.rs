// In memory implementation of the CalendarGateway port.
//
// Events are keyed by the credential's access token, which stands in for the
// calendar owner in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::modules::directory::records::CalendarCredentials;
use crate::modules::scheduling::calendar::{
    CalendarError, CalendarEvent, CalendarGateway, EventDraft,
};

pub struct InMemoryCalendar {
    events: RwLock<HashMap<String, Vec<CalendarEvent>>>,
    offline: AtomicBool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn toggle_offline(&self) {
        self.offline.fetch_xor(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), CalendarError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CalendarError::Backend("calendar offline".into()));
        }
        Ok(())
    }

    pub async fn seed(&self, credentials: &CalendarCredentials, event: CalendarEvent) {
        self.events
            .write()
            .await
            .entry(credentials.access_token.clone())
            .or_default()
            .push(event);
    }

    pub async fn event_count(&self, credentials: &CalendarCredentials) -> usize {
        self.events
            .read()
            .await
            .get(&credentials.access_token)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarGateway for InMemoryCalendar {
    async fn events(
        &self,
        credentials: &CalendarCredentials,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.check_online()?;
        let mut matching: Vec<_> = self
            .events
            .read()
            .await
            .get(&credentials.access_token)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.start < to && event.end > from)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|event| event.start);
        Ok(matching)
    }

    async fn create_event(
        &self,
        credentials: &CalendarCredentials,
        draft: EventDraft,
    ) -> Result<CalendarEvent, CalendarError> {
        self.check_online()?;
        let event = CalendarEvent {
            id: format!("evt-{}", Uuid::new_v4()),
            summary: draft.summary,
            start: draft.start,
            end: draft.end,
            attendees: vec![draft.attendee_email],
        };
        self.events
            .write()
            .await
            .entry(credentials.access_token.clone())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn delete_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        self.check_online()?;
        let mut events = self.events.write().await;
        let owned = events
            .get_mut(&credentials.access_token)
            .ok_or_else(|| CalendarError::Backend("unknown calendar".into()))?;
        let before = owned.len();
        owned.retain(|event| event.id != event_id);
        if owned.len() == before {
            return Err(CalendarError::Rejected {
                status: 404,
                message: "event not found".into(),
            });
        }
        Ok(())
    }
}
