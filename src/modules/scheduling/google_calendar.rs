// Google Calendar v3 adapter for the CalendarGateway port.
//
// Works against the owner's primary calendar. On a 401 the access token is
// refreshed through the stored refresh token and the call retried once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::modules::directory::records::CalendarCredentials;
use crate::modules::scheduling::calendar::{
    CalendarError, CalendarEvent, CalendarGateway, EventDraft,
};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

pub struct GoogleCalendar {
    http: Client,
    base_url: String,
}

impl GoogleCalendar {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    async fn refresh_access_token(
        &self,
        credentials: &CalendarCredentials,
    ) -> Result<String, CalendarError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(|| CalendarError::Backend("no refresh token stored".into()))?;
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CalendarError::Rejected {
                status: response.status().as_u16(),
                message: "token refresh failed".into(),
            });
        }

        #[derive(Deserialize)]
        struct Refreshed {
            access_token: String,
        }
        let refreshed: Refreshed = response
            .json()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))?;
        debug!("refreshed calendar access token");
        Ok(refreshed.access_token)
    }

    /// Runs `request` with the stored token, refreshing and retrying once on
    /// a 401.
    async fn authorized(
        &self,
        credentials: &CalendarCredentials,
        request: impl Fn(&str) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CalendarError> {
        let response = request(&credentials.access_token)
            .send()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let fresh = self.refresh_access_token(credentials).await?;
        request(&fresh)
            .send()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))
    }
}

impl Default for GoogleCalendar {
    fn default() -> Self {
        Self::new()
    }
}

async fn reject(response: reqwest::Response) -> CalendarError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    CalendarError::Rejected { status, message }
}

#[derive(Debug, Deserialize)]
struct ApiEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiAttendee {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    #[serde(default)]
    attendees: Vec<ApiAttendee>,
}

#[derive(Debug, Deserialize)]
struct ApiEventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

impl ApiEvent {
    /// Timed events only. All-day entries carry `date` instead of `dateTime`
    /// and are skipped, matching how slots are computed.
    fn into_event(self) -> Option<CalendarEvent> {
        let start = self.start.and_then(|t| t.date_time)?;
        let end = self.end.and_then(|t| t.date_time)?;
        Some(CalendarEvent {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            start,
            end,
            attendees: self.attendees.into_iter().map(|a| a.email).collect(),
        })
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendar {
    async fn events(
        &self,
        credentials: &CalendarCredentials,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url();
        let time_min = from.to_rfc3339();
        let time_max = to.to_rfc3339();
        let response = self
            .authorized(credentials, |token| {
                self.http
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[
                        ("timeMin", time_min.as_str()),
                        ("timeMax", time_max.as_str()),
                        ("singleEvents", "true"),
                        ("orderBy", "startTime"),
                    ])
            })
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let list: ApiEventList = response
            .json()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))?;
        Ok(list
            .items
            .into_iter()
            .filter_map(ApiEvent::into_event)
            .collect())
    }

    async fn create_event(
        &self,
        credentials: &CalendarCredentials,
        draft: EventDraft,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url();
        let body: Value = json!({
            "summary": draft.summary,
            "description": draft.description,
            "start": { "dateTime": draft.start.to_rfc3339(), "timeZone": "UTC" },
            "end": { "dateTime": draft.end.to_rfc3339(), "timeZone": "UTC" },
            "attendees": [ { "email": draft.attendee_email } ],
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "email", "minutes": 24 * 60 },
                    { "method": "popup", "minutes": 30 },
                ],
            },
        });
        let response = self
            .authorized(credentials, |token| {
                self.http
                    .post(&url)
                    .bearer_auth(token)
                    .query(&[("sendUpdates", "all")])
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let created: ApiEvent = response
            .json()
            .await
            .map_err(|err| CalendarError::Network(err.to_string()))?;
        created
            .into_event()
            .ok_or_else(|| CalendarError::Backend("created event missing times".into()))
    }

    async fn delete_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let url = format!("{}/{}", self.events_url(), event_id);
        let response = self
            .authorized(credentials, |token| {
                self.http.delete(&url).bearer_auth(token)
            })
            .await?;
        // Google answers 204 on success and 410 for already-deleted events.
        if response.status().is_success() || response.status() == StatusCode::GONE {
            return Ok(());
        }
        Err(reject(response).await)
    }
}

#[cfg(test)]
mod google_calendar_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_parse_timed_events_and_skip_all_day_entries() {
        let raw = json!({
            "items": [
                {
                    "id": "evt-1",
                    "summary": "Checkup",
                    "start": { "dateTime": "2026-03-10T09:00:00Z" },
                    "end": { "dateTime": "2026-03-10T09:30:00Z" },
                    "attendees": [ { "email": "pat@clinic.test" } ],
                },
                {
                    "id": "evt-all-day",
                    "summary": "Conference",
                    "start": { "date": "2026-03-10" },
                    "end": { "date": "2026-03-11" },
                },
            ],
        });
        let list: ApiEventList = serde_json::from_value(raw).expect("parse failed");
        let events: Vec<_> = list
            .items
            .into_iter()
            .filter_map(ApiEvent::into_event)
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "evt-1");
        assert_eq!(events[0].attendees, vec!["pat@clinic.test".to_string()]);
    }

    #[rstest]
    fn it_should_tolerate_events_without_summaries_or_attendees() {
        let raw = json!({
            "id": "evt-2",
            "start": { "dateTime": "2026-03-10T09:00:00Z" },
            "end": { "dateTime": "2026-03-10T09:30:00Z" },
        });
        let event: ApiEvent = serde_json::from_value(raw).expect("parse failed");
        let event = event.into_event().expect("expected timed event");
        assert_eq!(event.summary, "");
        assert!(event.attendees.is_empty());
    }
}
