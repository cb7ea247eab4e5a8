// Cookie sessions.
//
// The session cookie carries the opaque account id (`doctor_<uuid>` or
// `hospital_<uuid>`); every request resolves it against the directory, so a
// deleted account invalidates its sessions immediately.

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::modules::directory::records::{DoctorRecord, HospitalRecord};
use crate::modules::directory::store::DirectoryError;
use crate::shared::config::Settings;
use crate::shell::state::AppState;

pub const DOCTOR_PREFIX: &str = "doctor_";
pub const HOSPITAL_PREFIX: &str = "hospital_";

#[derive(Debug, Clone)]
pub enum Principal {
    Doctor(DoctorRecord),
    Hospital(HospitalRecord),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid session. Please log in again.")]
    InvalidSession,

    #[error("No hospital associated with this account")]
    NoHospital,

    #[error("Hospital not found")]
    HospitalNotFound,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::NoHospital => StatusCode::FORBIDDEN,
            Self::HospitalNotFound => StatusCode::NOT_FOUND,
            Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Set-Cookie value establishing a session.
pub fn set_session_cookie(settings: &Settings, user_id: &str) -> String {
    let secure = if settings.is_production() { "; Secure" } else { "" };
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
        settings.session_cookie_name, user_id, settings.session_max_age, secure
    )
}

/// Set-Cookie value removing the session.
pub fn clear_session_cookie(settings: &Settings) -> String {
    let secure = if settings.is_production() { "; Secure" } else { "" };
    format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax{}",
        settings.session_cookie_name, secure
    )
}

/// Session id from the request's Cookie header, if any.
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == cookie_name).then(|| value.to_string())
    })
}

pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Principal>, DirectoryError> {
    let Some(user_id) = session_id(headers, &state.settings.session_cookie_name) else {
        return Ok(None);
    };

    if user_id.starts_with(DOCTOR_PREFIX) {
        if let Some(doctor) = state.directory.doctor(&user_id).await? {
            return Ok(Some(Principal::Doctor(doctor)));
        }
    }
    if user_id.starts_with(HOSPITAL_PREFIX) {
        if let Some(hospital) = state.directory.hospital(&user_id).await? {
            return Ok(Some(Principal::Hospital(hospital)));
        }
    }
    Ok(None)
}

pub async fn require_doctor(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<DoctorRecord, AuthError> {
    if session_id(headers, &state.settings.session_cookie_name).is_none() {
        return Err(AuthError::Unauthenticated);
    }
    match current_user(state, headers).await? {
        Some(Principal::Doctor(doctor)) => Ok(doctor),
        _ => Err(AuthError::InvalidSession),
    }
}

/// Hospital id for the session: either a hospital login, or a doctor login
/// resolved through the doctor's hospital association.
pub async fn require_hospital(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, AuthError> {
    match current_user(state, headers).await? {
        None => Err(AuthError::Unauthenticated),
        Some(Principal::Hospital(hospital)) => Ok(hospital.id),
        Some(Principal::Doctor(doctor)) => {
            let hospital_id = doctor.hospital_id.ok_or(AuthError::NoHospital)?;
            state
                .directory
                .hospital(&hospital_id)
                .await?
                .ok_or(AuthError::HospitalNotFound)?;
            Ok(hospital_id)
        }
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    #[rstest]
    fn it_should_build_a_lax_http_only_cookie() {
        let settings = Settings::default();
        let cookie = set_session_cookie(&settings, "doctor_abc");
        assert_eq!(
            cookie,
            "cece_doctor_session=doctor_abc; Max-Age=15552000; Path=/; HttpOnly; SameSite=Lax"
        );
    }

    #[rstest]
    fn it_should_mark_cookies_secure_in_production() {
        let mut settings = Settings::default();
        settings.environment = "production".into();
        assert!(set_session_cookie(&settings, "doctor_abc").ends_with("; Secure"));
        assert!(clear_session_cookie(&settings).ends_with("; Secure"));
    }

    #[rstest]
    fn it_should_extract_the_session_from_a_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; cece_doctor_session=doctor_abc; lang=en"),
        );
        assert_eq!(
            session_id(&headers, "cece_doctor_session"),
            Some("doctor_abc".to_string())
        );
        assert_eq!(session_id(&headers, "other_cookie"), None);
    }

    #[rstest]
    fn it_should_return_none_without_a_cookie_header() {
        let headers = HeaderMap::new();
        assert_eq!(session_id(&headers, "cece_doctor_session"), None);
    }
}
