// Records held by the directory store.
//
// Doctors carry their Google Calendar OAuth material; the public projections
// strip credentials and password digests before anything leaves the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub profile_pic: Option<String>,
    pub hospital_id: Option<String>,
    pub password_digest: String,
    pub credentials: Option<CalendarCredentials>,
    pub linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorRecord {
    pub fn calendar_connected(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn public(&self) -> DoctorPublic {
        DoctorPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            specialty: self.specialty.clone(),
            profile_pic: self.profile_pic.clone(),
            hospital_id: self.hospital_id.clone(),
            calendar_connected: self.calendar_connected(),
            linked_at: self.linked_at,
        }
    }
}

/// Doctor view safe for API responses. No tokens, no digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPublic {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub profile_pic: Option<String>,
    pub hospital_id: Option<String>,
    pub calendar_connected: bool,
    pub linked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub password_digest: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HospitalRecord {
    pub fn public(&self) -> HospitalPublic {
        HospitalPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            admin_name: self.admin_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalPublic {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub admin_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub calendar_event_id: Option<String>,
    pub status: AppointmentStatus,
    pub hospital_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn public(&self) -> AppointmentPublic {
        AppointmentPublic {
            id: self.id.clone(),
            doctor_id: self.doctor_id.clone(),
            doctor_name: self.doctor_name.clone(),
            patient_name: self.patient_name.clone(),
            patient_email: self.patient_email.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            notes: self.notes.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPublic {
    pub id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod directory_records_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_report_calendar_connected_only_with_credentials() {
        let now = Utc::now();
        let mut doctor = DoctorRecord {
            id: "doctor_1".into(),
            name: "Gregory".into(),
            email: "greg@clinic.test".into(),
            specialty: None,
            profile_pic: None,
            hospital_id: None,
            password_digest: "salt$digest".into(),
            credentials: None,
            linked_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!doctor.calendar_connected());

        doctor.credentials = Some(CalendarCredentials {
            access_token: "tok".into(),
            refresh_token: Some("refresh".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: "cid".into(),
            client_secret: "secret".into(),
            scopes: vec![],
        });
        assert!(doctor.calendar_connected());
        assert!(doctor.public().calendar_connected);
    }

    #[rstest]
    fn it_should_round_trip_appointment_status_labels() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
        ] {
            let parsed: AppointmentStatus = status.to_string().parse().expect("parse failed");
            assert_eq!(parsed, status);
        }
        assert!("walked_out".parse::<AppointmentStatus>().is_err());
    }
}
