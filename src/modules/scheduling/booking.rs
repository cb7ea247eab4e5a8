// Appointment booking against the doctor's linked calendar.
//
// Booking writes the calendar event first and the directory record second;
// if the record cannot be saved the event is deleted again so the calendar
// never shows an appointment the clinic does not know about.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::modules::directory::records::{
    AppointmentRecord, AppointmentStatus, DoctorRecord,
};
use crate::modules::directory::store::{Directory, DirectoryError};
use crate::modules::scheduling::calendar::{CalendarError, CalendarGateway, EventDraft};
use crate::modules::scheduling::slots::{self, TimeSlot};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("This doctor has not connected their calendar yet")]
    CalendarNotLinked,

    #[error("A valid patient email is required")]
    InvalidPatientEmail,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Appointment belongs to a different doctor")]
    NotOwner,

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub appointment_id: String,
    pub calendar_event_id: String,
    pub message: String,
}

pub struct BookingHandler {
    directory: Arc<dyn Directory>,
    calendar: Arc<dyn CalendarGateway>,
}

impl BookingHandler {
    pub fn new(directory: Arc<dyn Directory>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self { directory, calendar }
    }

    async fn linked_doctor(&self, doctor_id: &str) -> Result<DoctorRecord, BookingError> {
        let doctor = self
            .directory
            .doctor(doctor_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;
        if doctor.credentials.is_none() {
            return Err(BookingError::CalendarNotLinked);
        }
        Ok(doctor)
    }

    pub async fn available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        duration_minutes: i64,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        let doctor = self.linked_doctor(doctor_id).await?;
        let credentials = doctor
            .credentials
            .as_ref()
            .ok_or(BookingError::CalendarNotLinked)?;

        let day_start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let day_end = day_start + Duration::days(1);
        let busy: Vec<_> = self
            .calendar
            .events(credentials, day_start, day_end)
            .await?
            .into_iter()
            .map(|event| (event.start, event.end))
            .collect();

        Ok(slots::free_slots(date, &busy, duration_minutes))
    }

    pub async fn book(
        &self,
        doctor_id: &str,
        patient_name: &str,
        patient_email: &str,
        start: DateTime<Utc>,
        duration_minutes: i64,
        notes: Option<String>,
    ) -> Result<BookingConfirmation, BookingError> {
        if !patient_email.contains('@') {
            return Err(BookingError::InvalidPatientEmail);
        }
        let doctor = self.linked_doctor(doctor_id).await?;
        let credentials = doctor
            .credentials
            .clone()
            .ok_or(BookingError::CalendarNotLinked)?;

        let end = start + Duration::minutes(slots::clamp_duration(duration_minutes));
        let draft = EventDraft {
            summary: format!("Appointment: {patient_name}"),
            description: notes.clone().unwrap_or_default(),
            start,
            end,
            attendee_email: patient_email.to_string(),
        };
        let event = self.calendar.create_event(&credentials, draft).await?;

        let now = Utc::now();
        let appointment = AppointmentRecord {
            id: Uuid::now_v7().to_string(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            patient_name: patient_name.to_string(),
            patient_email: patient_email.to_string(),
            start_time: start,
            end_time: end,
            notes,
            calendar_event_id: Some(event.id.clone()),
            status: AppointmentStatus::Confirmed,
            hospital_id: doctor.hospital_id.clone(),
            created_at: now,
            updated_at: now,
        };
        if let Err(error) = self.directory.save_appointment(appointment.clone()).await {
            warn!(%error, event_id = %event.id, "record save failed, rolling calendar event back");
            if let Err(rollback) = self.calendar.delete_event(&credentials, &event.id).await {
                warn!(%rollback, event_id = %event.id, "rollback failed, event is orphaned");
            }
            return Err(error.into());
        }
        info!(appointment_id = %appointment.id, doctor_id = %doctor.id, "appointment booked");

        let message = format!(
            "Appointment booked with Dr. {} on {}. A calendar invitation has been sent to {}.",
            doctor.name,
            start.format("%B %d, %Y at %I:%M %p"),
            patient_email,
        );
        Ok(BookingConfirmation {
            appointment_id: appointment.id,
            calendar_event_id: event.id,
            message,
        })
    }

    pub async fn cancel(&self, appointment_id: &str) -> Result<(), BookingError> {
        let appointment = self
            .directory
            .appointment(appointment_id)
            .await?
            .ok_or(BookingError::AppointmentNotFound)?;
        let doctor = self
            .directory
            .doctor(&appointment.doctor_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;

        if let (Some(event_id), Some(credentials)) =
            (appointment.calendar_event_id.as_deref(), doctor.credentials.as_ref())
        {
            if let Err(error) = self.calendar.delete_event(credentials, event_id).await {
                warn!(%error, %event_id, "calendar delete failed during cancellation");
            }
        }
        self.directory
            .update_appointment_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;
        info!(%appointment_id, "appointment cancelled");
        Ok(())
    }

    /// Status change gated on ownership: only the appointed doctor may move
    /// an appointment through its lifecycle.
    pub async fn update_status(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), BookingError> {
        let appointment = self
            .directory
            .appointment(appointment_id)
            .await?
            .ok_or(BookingError::AppointmentNotFound)?;
        if appointment.doctor_id != doctor_id {
            return Err(BookingError::NotOwner);
        }
        self.directory
            .update_appointment_status(appointment_id, status)
            .await?;
        Ok(())
    }
}
