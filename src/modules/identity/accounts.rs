// Account registration and email/password login for doctors and hospitals.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::modules::directory::records::{DoctorRecord, HospitalRecord};
use crate::modules::directory::store::{Directory, DirectoryError};
use crate::modules::identity::password::{hash_password, verify_password};
use crate::modules::identity::session::{DOCTOR_PREFIX, HOSPITAL_PREFIX};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Hospital not found")]
    HospitalNotFound,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unknown account type: {0}")]
    InvalidAccountType(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Deserialize)]
pub struct HospitalSignup {
    pub name: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub admin_name: String,
    pub admin_email: String,
}

#[derive(Debug, Deserialize)]
pub struct DoctorSignup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialty: Option<String>,
    pub hospital_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user_id: String,
    pub user_type: String,
    pub redirect_url: String,
    pub name: String,
    pub email: String,
}

pub struct AccountService {
    directory: Arc<dyn Directory>,
}

impl AccountService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Registers a hospital account. The admin email doubles as the login
    /// email, so it must be unique across hospitals.
    pub async fn register_hospital(
        &self,
        signup: HospitalSignup,
    ) -> Result<HospitalRecord, AccountError> {
        if self
            .directory
            .hospital_by_email(&signup.admin_email)
            .await?
            .is_some()
        {
            return Err(AccountError::EmailTaken);
        }

        let now = Utc::now();
        let hospital = HospitalRecord {
            id: format!("{HOSPITAL_PREFIX}{}", Uuid::new_v4()),
            name: signup.name,
            email: signup.admin_email.clone(),
            address: signup.address,
            phone: signup.phone,
            admin_name: Some(signup.admin_name),
            admin_email: Some(signup.admin_email),
            password_digest: hash_password(&signup.password),
            status: "active".into(),
            created_at: now,
            updated_at: now,
        };
        self.directory.save_hospital(hospital.clone()).await?;
        Ok(hospital)
    }

    pub async fn register_doctor(
        &self,
        signup: DoctorSignup,
    ) -> Result<DoctorRecord, AccountError> {
        if self
            .directory
            .hospital(&signup.hospital_id)
            .await?
            .is_none()
        {
            return Err(AccountError::HospitalNotFound);
        }
        if self
            .directory
            .doctor_by_email(&signup.email)
            .await?
            .is_some()
        {
            return Err(AccountError::EmailTaken);
        }

        let now = Utc::now();
        let doctor = DoctorRecord {
            id: format!("{DOCTOR_PREFIX}{}", Uuid::new_v4()),
            name: signup.name,
            email: signup.email,
            specialty: signup
                .specialty
                .or_else(|| Some("General Practice".into())),
            profile_pic: None,
            hospital_id: Some(signup.hospital_id),
            password_digest: hash_password(&signup.password),
            credentials: None,
            linked_at: None,
            created_at: now,
            updated_at: now,
        };
        self.directory.save_doctor(doctor.clone()).await?;
        Ok(doctor)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        account_type: &str,
    ) -> Result<LoginOutcome, AccountError> {
        match account_type {
            "doctor" => {
                let doctor = self
                    .directory
                    .doctor_by_email(email)
                    .await?
                    .ok_or(AccountError::InvalidCredentials)?;
                if !verify_password(password, &doctor.password_digest) {
                    return Err(AccountError::InvalidCredentials);
                }
                Ok(LoginOutcome {
                    user_id: doctor.id,
                    user_type: "doctor".into(),
                    redirect_url: "/doctor/dashboard".into(),
                    name: doctor.name,
                    email: doctor.email,
                })
            }
            "hospital" => {
                let hospital = self
                    .directory
                    .hospital_by_email(email)
                    .await?
                    .ok_or(AccountError::InvalidCredentials)?;
                if !verify_password(password, &hospital.password_digest) {
                    return Err(AccountError::InvalidCredentials);
                }
                Ok(LoginOutcome {
                    user_id: hospital.id,
                    user_type: "hospital".into(),
                    redirect_url: "/hospital/dashboard".into(),
                    name: hospital.name,
                    email: hospital.email,
                })
            }
            other => Err(AccountError::InvalidAccountType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod account_service_tests {
    use super::*;
    use crate::modules::directory::in_memory::InMemoryDirectory;
    use rstest::{fixture, rstest};

    #[fixture]
    fn service() -> (AccountService, Arc<InMemoryDirectory>) {
        let directory = Arc::new(InMemoryDirectory::new());
        (AccountService::new(directory.clone()), directory)
    }

    fn hospital_signup() -> HospitalSignup {
        HospitalSignup {
            name: "St. Mungo's".into(),
            password: "secret".into(),
            phone: Some("555-0100".into()),
            address: Some("1 Clinic Way".into()),
            admin_name: "Ada".into(),
            admin_email: "admin@mungos.test".into(),
        }
    }

    fn doctor_signup(hospital_id: &str) -> DoctorSignup {
        DoctorSignup {
            name: "Gregory".into(),
            email: "greg@mungos.test".into(),
            password: "secret".into(),
            specialty: None,
            hospital_id: hospital_id.into(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_register_a_hospital_with_a_prefixed_id(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        let hospital = accounts
            .register_hospital(hospital_signup())
            .await
            .expect("signup failed");
        assert!(hospital.id.starts_with("hospital_"));
        assert_eq!(hospital.status, "active");
        assert_ne!(hospital.password_digest, "secret");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_duplicate_hospital_emails(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        accounts
            .register_hospital(hospital_signup())
            .await
            .expect("signup failed");
        let second = accounts.register_hospital(hospital_signup()).await;
        assert!(matches!(second, Err(AccountError::EmailTaken)));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_register_a_doctor_under_an_existing_hospital(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        let hospital = accounts
            .register_hospital(hospital_signup())
            .await
            .expect("signup failed");
        let doctor = accounts
            .register_doctor(doctor_signup(&hospital.id))
            .await
            .expect("signup failed");
        assert!(doctor.id.starts_with("doctor_"));
        assert_eq!(doctor.specialty.as_deref(), Some("General Practice"));
        assert_eq!(doctor.hospital_id.as_deref(), Some(hospital.id.as_str()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_doctors_for_unknown_hospitals(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        let result = accounts
            .register_doctor(doctor_signup("hospital_missing"))
            .await;
        assert!(matches!(result, Err(AccountError::HospitalNotFound)));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_log_a_doctor_in_with_the_right_password(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        let hospital = accounts
            .register_hospital(hospital_signup())
            .await
            .expect("signup failed");
        accounts
            .register_doctor(doctor_signup(&hospital.id))
            .await
            .expect("signup failed");

        let outcome = accounts
            .login("greg@mungos.test", "secret", "doctor")
            .await
            .expect("login failed");
        assert_eq!(outcome.user_type, "doctor");
        assert_eq!(outcome.redirect_url, "/doctor/dashboard");

        let wrong = accounts.login("greg@mungos.test", "nope", "doctor").await;
        assert!(matches!(wrong, Err(AccountError::InvalidCredentials)));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_log_a_hospital_in_via_the_admin_email(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        accounts
            .register_hospital(hospital_signup())
            .await
            .expect("signup failed");

        let outcome = accounts
            .login("admin@mungos.test", "secret", "hospital")
            .await
            .expect("login failed");
        assert_eq!(outcome.user_type, "hospital");
        assert_eq!(outcome.redirect_url, "/hospital/dashboard");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_unknown_account_types(
        service: (AccountService, Arc<InMemoryDirectory>),
    ) {
        let (accounts, _) = service;
        let result = accounts.login("x@y.test", "secret", "nurse").await;
        assert!(matches!(result, Err(AccountError::InvalidAccountType(_))));
    }
}
