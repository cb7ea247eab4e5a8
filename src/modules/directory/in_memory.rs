// In memory implementation of the Directory port.
//
// Purpose
// - Back handler tests and local development without an external database.
//
// Responsibilities
// - Store whole records keyed by id.
// - Simulate an unreachable backend via the offline toggle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::modules::directory::records::{
    AppointmentRecord, AppointmentStatus, CalendarCredentials, DoctorRecord, HospitalRecord,
};
use crate::modules::directory::store::{Directory, DirectoryError};

pub struct InMemoryDirectory {
    doctors: RwLock<HashMap<String, DoctorRecord>>,
    hospitals: RwLock<HashMap<String, HospitalRecord>>,
    appointments: RwLock<HashMap<String, AppointmentRecord>>,
    offline: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            doctors: RwLock::new(HashMap::new()),
            hospitals: RwLock::new(HashMap::new()),
            appointments: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn toggle_offline(&self) {
        self.offline.fetch_xor(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DirectoryError::Backend("directory offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn save_doctor(&self, doctor: DoctorRecord) -> Result<(), DirectoryError> {
        self.check_online()?;
        self.doctors.write().await.insert(doctor.id.clone(), doctor);
        Ok(())
    }

    async fn doctor(&self, doctor_id: &str) -> Result<Option<DoctorRecord>, DirectoryError> {
        self.check_online()?;
        Ok(self.doctors.read().await.get(doctor_id).cloned())
    }

    async fn doctor_by_email(&self, email: &str) -> Result<Option<DoctorRecord>, DirectoryError> {
        self.check_online()?;
        Ok(self
            .doctors
            .read()
            .await
            .values()
            .find(|doctor| doctor.email == email)
            .cloned())
    }

    async fn doctors(&self) -> Result<Vec<DoctorRecord>, DirectoryError> {
        self.check_online()?;
        let mut all: Vec<_> = self.doctors.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn doctors_by_hospital(
        &self,
        hospital_id: &str,
    ) -> Result<Vec<DoctorRecord>, DirectoryError> {
        self.check_online()?;
        let mut matching: Vec<_> = self
            .doctors
            .read()
            .await
            .values()
            .filter(|doctor| doctor.hospital_id.as_deref() == Some(hospital_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }

    async fn link_calendar(
        &self,
        doctor_id: &str,
        credentials: CalendarCredentials,
    ) -> Result<(), DirectoryError> {
        self.check_online()?;
        let mut doctors = self.doctors.write().await;
        let doctor = doctors.get_mut(doctor_id).ok_or(DirectoryError::NotFound)?;
        doctor.credentials = Some(credentials);
        doctor.linked_at = Some(Utc::now());
        doctor.updated_at = Utc::now();
        Ok(())
    }

    async fn save_hospital(&self, hospital: HospitalRecord) -> Result<(), DirectoryError> {
        self.check_online()?;
        self.hospitals
            .write()
            .await
            .insert(hospital.id.clone(), hospital);
        Ok(())
    }

    async fn hospital(&self, hospital_id: &str) -> Result<Option<HospitalRecord>, DirectoryError> {
        self.check_online()?;
        Ok(self.hospitals.read().await.get(hospital_id).cloned())
    }

    async fn hospital_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HospitalRecord>, DirectoryError> {
        self.check_online()?;
        Ok(self
            .hospitals
            .read()
            .await
            .values()
            .find(|hospital| hospital.email == email)
            .cloned())
    }

    async fn hospitals(&self) -> Result<Vec<HospitalRecord>, DirectoryError> {
        self.check_online()?;
        let mut all: Vec<_> = self.hospitals.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn save_appointment(&self, appointment: AppointmentRecord) -> Result<(), DirectoryError> {
        self.check_online()?;
        self.appointments
            .write()
            .await
            .insert(appointment.id.clone(), appointment);
        Ok(())
    }

    async fn appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentRecord>, DirectoryError> {
        self.check_online()?;
        Ok(self.appointments.read().await.get(appointment_id).cloned())
    }

    async fn doctor_appointments(
        &self,
        doctor_id: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<AppointmentRecord>, DirectoryError> {
        self.check_online()?;
        let mut matching: Vec<_> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.doctor_id == doctor_id)
            .filter(|appointment| match window {
                Some((from, to)) => {
                    appointment.start_time >= from && appointment.start_time <= to
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by_key(|appointment| appointment.start_time);
        Ok(matching)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), DirectoryError> {
        self.check_online()?;
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(appointment_id)
            .ok_or(DirectoryError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(())
    }
}
