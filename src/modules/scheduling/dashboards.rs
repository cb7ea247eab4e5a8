// Read models for the doctor and hospital dashboards.
//
// Calendar failures never break a dashboard: the upcoming-events panel just
// comes back empty and the failure is logged.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::modules::directory::records::{
    AppointmentPublic, AppointmentStatus, DoctorPublic, DoctorRecord, HospitalPublic,
    HospitalRecord,
};
use crate::modules::directory::store::{Directory, DirectoryError};
use crate::modules::scheduling::calendar::{CalendarEvent, CalendarGateway};

const UPCOMING_EVENT_LIMIT: usize = 10;
const UPCOMING_WINDOW_DAYS: i64 = 30;
const RECENT_APPOINTMENT_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Serialize)]
pub struct DoctorStats {
    pub total: usize,
    pub today: usize,
}

#[derive(Debug, Serialize)]
pub struct DoctorDashboard {
    pub doctor: DoctorPublic,
    pub upcoming_events: Vec<CalendarEvent>,
    pub stats: DoctorStats,
}

#[derive(Debug, Serialize)]
pub struct HospitalStats {
    pub total_doctors: usize,
    pub connected_doctors: usize,
    pub total_appointments: usize,
    pub upcoming_appointments: usize,
}

#[derive(Debug, Serialize)]
pub struct HospitalDashboard {
    pub hospital: HospitalPublic,
    pub stats: HospitalStats,
    pub doctors: Vec<DoctorPublic>,
    pub recent_appointments: Vec<AppointmentPublic>,
}

pub struct DashboardService {
    directory: Arc<dyn Directory>,
    calendar: Arc<dyn CalendarGateway>,
}

impl DashboardService {
    pub fn new(directory: Arc<dyn Directory>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self { directory, calendar }
    }

    async fn upcoming_events(&self, doctor: &DoctorRecord) -> Vec<CalendarEvent> {
        let Some(credentials) = doctor.credentials.as_ref() else {
            return Vec::new();
        };
        let now = Utc::now();
        match self
            .calendar
            .events(credentials, now, now + Duration::days(UPCOMING_WINDOW_DAYS))
            .await
        {
            Ok(mut events) => {
                events.truncate(UPCOMING_EVENT_LIMIT);
                events
            }
            Err(error) => {
                warn!(doctor_id = %doctor.id, %error, "calendar fetch failed for dashboard");
                Vec::new()
            }
        }
    }

    pub async fn doctor_dashboard(
        &self,
        doctor_id: &str,
    ) -> Result<DoctorDashboard, DashboardError> {
        let doctor = self
            .directory
            .doctor(doctor_id)
            .await?
            .ok_or(DashboardError::DoctorNotFound)?;

        let appointments = self.directory.doctor_appointments(doctor_id, None).await?;
        let today = Utc::now().date_naive();
        let stats = DoctorStats {
            total: appointments.len(),
            today: appointments
                .iter()
                .filter(|appointment| appointment.start_time.date_naive() == today)
                .count(),
        };

        Ok(DoctorDashboard {
            upcoming_events: self.upcoming_events(&doctor).await,
            doctor: doctor.public(),
            stats,
        })
    }

    pub async fn doctor_appointments(
        &self,
        doctor_id: &str,
        days: i64,
    ) -> Result<Vec<AppointmentPublic>, DashboardError> {
        let now = Utc::now();
        let appointments = self
            .directory
            .doctor_appointments(doctor_id, Some((now, now + Duration::days(days))))
            .await?;
        Ok(appointments.iter().map(|a| a.public()).collect())
    }

    /// Hospital roll-up. A hospital record is created on first access when
    /// only the id exists, so freshly provisioned accounts see a dashboard
    /// instead of a 404.
    pub async fn hospital_dashboard(
        &self,
        hospital_id: &str,
    ) -> Result<HospitalDashboard, DashboardError> {
        let hospital = match self.directory.hospital(hospital_id).await? {
            Some(hospital) => hospital,
            None => {
                let now = Utc::now();
                let placeholder = HospitalRecord {
                    id: hospital_id.to_string(),
                    name: "Hospital".into(),
                    email: String::new(),
                    address: None,
                    phone: None,
                    admin_name: None,
                    admin_email: None,
                    password_digest: String::new(),
                    status: "active".into(),
                    created_at: now,
                    updated_at: now,
                };
                self.directory.save_hospital(placeholder.clone()).await?;
                placeholder
            }
        };

        let doctors = self.directory.doctors_by_hospital(hospital_id).await?;
        let mut appointments = Vec::new();
        for doctor in &doctors {
            appointments.extend(self.directory.doctor_appointments(&doctor.id, None).await?);
        }

        let stats = HospitalStats {
            total_doctors: doctors.len(),
            connected_doctors: doctors
                .iter()
                .filter(|doctor| doctor.calendar_connected())
                .count(),
            total_appointments: appointments.len(),
            upcoming_appointments: {
                let now = Utc::now();
                let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
                appointments
                    .iter()
                    .filter(|appointment| {
                        appointment.status == AppointmentStatus::Confirmed
                            && appointment.start_time > now
                            && appointment.start_time <= horizon
                    })
                    .count()
            },
        };

        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        appointments.truncate(RECENT_APPOINTMENT_LIMIT);

        Ok(HospitalDashboard {
            hospital: hospital.public(),
            stats,
            doctors: doctors.iter().map(|doctor| doctor.public()).collect(),
            recent_appointments: appointments.iter().map(|a| a.public()).collect(),
        })
    }

    pub async fn hospital_appointments(
        &self,
        hospital_id: &str,
        days: i64,
    ) -> Result<Vec<AppointmentPublic>, DashboardError> {
        let now = Utc::now();
        let window = Some((now, now + Duration::days(days)));
        let doctors = self.directory.doctors_by_hospital(hospital_id).await?;

        let mut appointments = Vec::new();
        for doctor in &doctors {
            appointments.extend(
                self.directory
                    .doctor_appointments(&doctor.id, window)
                    .await?,
            );
        }
        appointments.sort_by_key(|appointment| appointment.start_time);
        Ok(appointments.iter().map(|a| a.public()).collect())
    }
}
