use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::modules::assistant::agent::Agent;
use crate::modules::assistant::model::{ModelError, ModelProvider, ModelResult};
use crate::modules::assistant::retrieval::CorpusIndex;
use crate::modules::assistant::ws::ChatSessions;
use crate::modules::directory::in_memory::InMemoryDirectory;
use crate::modules::directory::records::{
    AppointmentRecord, AppointmentStatus, CalendarCredentials, DoctorRecord, HospitalRecord,
};
use crate::modules::identity::accounts::AccountService;
use crate::modules::identity::oauth::GoogleOAuth;
use crate::modules::scheduling::booking::BookingHandler;
use crate::modules::scheduling::dashboards::DashboardService;
use crate::modules::scheduling::in_memory_calendar::InMemoryCalendar;
use crate::shared::config::Settings;
use crate::shell::state::AppState;

/// Model stub that replays scripted replies in order and fails once the
/// script runs out.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Value>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Value>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete_structured(
        &self,
        _prompt: &str,
        _response_schema: &Value,
    ) -> ModelResult<Value> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| ModelError::ServiceUnavailable {
                message: "script lock poisoned".into(),
            })?;
        replies.pop_front().ok_or(ModelError::ServiceUnavailable {
            message: "script exhausted".into(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn classification_json(intent: &str, urgency: &str) -> Value {
    json!({
        "intent": intent,
        "urgency": urgency,
        "summary_request": "test classification",
    })
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.google_client_id = "test-client".into();
    settings.google_client_secret = "test-secret".into();
    settings
}

pub fn make_test_state() -> (AppState, Arc<InMemoryDirectory>, Arc<InMemoryCalendar>) {
    make_state_with(Arc::new(ScriptedProvider::new(Vec::new())))
}

pub fn make_state_with(
    model: Arc<dyn ModelProvider>,
) -> (AppState, Arc<InMemoryDirectory>, Arc<InMemoryCalendar>) {
    let settings = Arc::new(test_settings());
    let directory = Arc::new(InMemoryDirectory::new());
    let calendar = Arc::new(InMemoryCalendar::new());

    let state = AppState {
        settings: settings.clone(),
        directory: directory.clone(),
        calendar: calendar.clone(),
        oauth: Arc::new(GoogleOAuth::from_settings(&settings)),
        accounts: Arc::new(AccountService::new(directory.clone())),
        booking: Arc::new(BookingHandler::new(directory.clone(), calendar.clone())),
        dashboards: Arc::new(DashboardService::new(directory.clone(), calendar.clone())),
        agent: Arc::new(Agent::new(model, Arc::new(CorpusIndex::empty()))),
        chats: Arc::new(ChatSessions::new()),
    };
    (state, directory, calendar)
}

pub fn sample_credentials() -> CalendarCredentials {
    CalendarCredentials {
        access_token: "test-access-token".into(),
        refresh_token: Some("test-refresh-token".into()),
        token_uri: "https://oauth2.googleapis.com/token".into(),
        client_id: "test-client".into(),
        client_secret: "test-secret".into(),
        scopes: vec!["https://www.googleapis.com/auth/calendar.events".into()],
    }
}

pub fn sample_doctor(id: &str, hospital_id: Option<&str>) -> DoctorRecord {
    let now = Utc::now();
    DoctorRecord {
        id: id.into(),
        name: "Gregory".into(),
        email: format!("{id}@clinic.test"),
        specialty: Some("General Practice".into()),
        profile_pic: None,
        hospital_id: hospital_id.map(str::to_string),
        password_digest: crate::modules::identity::password::hash_password("secret"),
        credentials: None,
        linked_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_hospital(id: &str) -> HospitalRecord {
    let now = Utc::now();
    HospitalRecord {
        id: id.into(),
        name: "St. Mungo's".into(),
        email: format!("{id}@clinic.test"),
        address: Some("1 Clinic Way".into()),
        phone: Some("555-0100".into()),
        admin_name: Some("Ada".into()),
        admin_email: Some(format!("{id}@clinic.test")),
        password_digest: crate::modules::identity::password::hash_password("secret"),
        status: "active".into(),
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_appointment(id: &str, doctor_id: &str) -> AppointmentRecord {
    let now = Utc::now();
    let start = now + Duration::days(1);
    AppointmentRecord {
        id: id.into(),
        doctor_id: doctor_id.into(),
        doctor_name: "Gregory".into(),
        patient_name: "Pat Smith".into(),
        patient_email: "pat@clinic.test".into(),
        start_time: start,
        end_time: start + Duration::minutes(30),
        notes: None,
        calendar_event_id: Some(format!("evt-{}", Uuid::new_v4())),
        status: AppointmentStatus::Confirmed,
        hospital_id: None,
        created_at: now,
        updated_at: now,
    }
}
