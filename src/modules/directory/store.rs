use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::modules::directory::records::{
    AppointmentRecord, AppointmentStatus, CalendarCredentials, DoctorRecord, HospitalRecord,
};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("record not found")]
    NotFound,
}

/// Persistence port for doctors, hospitals and appointments.
///
/// Adapters must treat records as whole documents: `save_*` upserts by id.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn save_doctor(&self, doctor: DoctorRecord) -> Result<(), DirectoryError>;
    async fn doctor(&self, doctor_id: &str) -> Result<Option<DoctorRecord>, DirectoryError>;
    async fn doctor_by_email(&self, email: &str) -> Result<Option<DoctorRecord>, DirectoryError>;
    async fn doctors(&self) -> Result<Vec<DoctorRecord>, DirectoryError>;
    async fn doctors_by_hospital(
        &self,
        hospital_id: &str,
    ) -> Result<Vec<DoctorRecord>, DirectoryError>;
    async fn link_calendar(
        &self,
        doctor_id: &str,
        credentials: CalendarCredentials,
    ) -> Result<(), DirectoryError>;

    async fn save_hospital(&self, hospital: HospitalRecord) -> Result<(), DirectoryError>;
    async fn hospital(&self, hospital_id: &str) -> Result<Option<HospitalRecord>, DirectoryError>;
    async fn hospital_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HospitalRecord>, DirectoryError>;
    async fn hospitals(&self) -> Result<Vec<HospitalRecord>, DirectoryError>;

    async fn save_appointment(&self, appointment: AppointmentRecord) -> Result<(), DirectoryError>;
    async fn appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentRecord>, DirectoryError>;
    /// Appointments for a doctor, ordered by start time ascending. The
    /// optional window filters on start time, both bounds inclusive.
    async fn doctor_appointments(
        &self,
        doctor_id: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<AppointmentRecord>, DirectoryError>;
    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), DirectoryError>;
}
