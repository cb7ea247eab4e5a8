// HTTP surface for sessions, signup and the Google OAuth round trip.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::modules::identity::accounts::{
    AccountError, DoctorSignup, HospitalSignup,
};
use crate::modules::identity::session::{
    Principal, clear_session_cookie, current_user, set_session_cookie,
};
use crate::shell::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login/email", post(login))
        .route("/auth/session", get(session))
        .route("/auth/logout", post(logout).get(logout_redirect))
        .route("/auth/calendar/connect", get(calendar_connect))
        .route("/auth/callback", get(oauth_callback))
        .route("/signup/hospital/register", post(register_hospital))
        .route("/signup/doctor/register", post(register_doctor))
}

fn account_error_status(error: &AccountError) -> StatusCode {
    match error {
        AccountError::EmailTaken => StatusCode::CONFLICT,
        AccountError::HospitalNotFound => StatusCode::NOT_FOUND,
        AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AccountError::InvalidAccountType(_) => StatusCode::BAD_REQUEST,
        AccountError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    account_type: String,
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    match state
        .accounts
        .login(&body.email, &body.password, &body.account_type)
        .await
    {
        Ok(outcome) => {
            info!(user_id = %outcome.user_id, "login succeeded");
            let cookie = set_session_cookie(&state.settings, &outcome.user_id);
            (
                [(header::SET_COOKIE, cookie)],
                Json(json!({
                    "success": true,
                    "user_id": outcome.user_id,
                    "user_type": outcome.user_type,
                    "redirect_url": outcome.redirect_url,
                    "name": outcome.name,
                    "email": outcome.email,
                })),
            )
                .into_response()
        }
        Err(error) => detail(account_error_status(&error), error.to_string()),
    }
}

async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match current_user(&state, &headers).await {
        Ok(Some(Principal::Doctor(doctor))) => Json(json!({
            "authenticated": true,
            "user_type": "doctor",
            "user": doctor.public(),
        }))
        .into_response(),
        Ok(Some(Principal::Hospital(hospital))) => Json(json!({
            "authenticated": true,
            "user_type": "hospital",
            "user": hospital.public(),
        }))
        .into_response(),
        Ok(None) => Json(json!({ "authenticated": false })).into_response(),
        Err(error) => detail(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

async fn logout(State(state): State<AppState>) -> Response {
    let cookie = clear_session_cookie(&state.settings);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// Browser-friendly logout: clears the cookie and lands on the start page.
async fn logout_redirect(State(state): State<AppState>) -> Response {
    let cookie = clear_session_cookie(&state.settings);
    ([(header::SET_COOKIE, cookie)], Redirect::temporary("/")).into_response()
}

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    doctor_id: Option<String>,
}

/// Sends the doctor off to the Google consent screen. The doctor id rides in
/// the OAuth `state` parameter.
async fn calendar_connect(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> Response {
    let Some(doctor_id) = query.doctor_id else {
        return detail(StatusCode::BAD_REQUEST, "doctor_id is required".into());
    };
    match state.directory.doctor(&doctor_id).await {
        Ok(Some(_)) => {
            let url = state.oauth.authorization_url(&doctor_id);
            Redirect::temporary(&url).into_response()
        }
        Ok(None) => detail(StatusCode::NOT_FOUND, "Doctor not found".into()),
        Err(error) => detail(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(reason) = query.error {
        warn!(%reason, "oauth consent denied");
        return detail(StatusCode::BAD_REQUEST, format!("OAuth failed: {reason}"));
    }
    let (Some(code), Some(doctor_id)) = (query.code, query.state) else {
        return detail(
            StatusCode::BAD_REQUEST,
            "Missing code or state parameter".into(),
        );
    };

    let credentials = match state.oauth.exchange_code(&code).await {
        Ok(credentials) => credentials,
        Err(error) => {
            warn!(%error, "token exchange failed");
            return detail(StatusCode::BAD_GATEWAY, error.to_string());
        }
    };
    if let Err(error) = state.directory.link_calendar(&doctor_id, credentials).await {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
    }
    info!(%doctor_id, "calendar linked");

    let cookie = set_session_cookie(&state.settings, &doctor_id);
    let destination = format!(
        "{}/doctor/dashboard?calendar=connected",
        state.settings.frontend_url
    );
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::temporary(&destination),
    )
        .into_response()
}

async fn register_hospital(
    State(state): State<AppState>,
    Json(body): Json<HospitalSignup>,
) -> Response {
    match state.accounts.register_hospital(body).await {
        Ok(hospital) => {
            let cookie = set_session_cookie(&state.settings, &hospital.id);
            (
                StatusCode::CREATED,
                [(header::SET_COOKIE, cookie)],
                Json(json!({
                    "success": true,
                    "hospital_id": hospital.id,
                    "redirect_url": "/hospital/dashboard",
                })),
            )
                .into_response()
        }
        Err(error) => detail(account_error_status(&error), error.to_string()),
    }
}

async fn register_doctor(
    State(state): State<AppState>,
    Json(body): Json<DoctorSignup>,
) -> Response {
    match state.accounts.register_doctor(body).await {
        Ok(doctor) => {
            let cookie = set_session_cookie(&state.settings, &doctor.id);
            (
                StatusCode::CREATED,
                [(header::SET_COOKIE, cookie)],
                Json(json!({
                    "success": true,
                    "doctor_id": doctor.id,
                    "redirect_url": "/doctor/dashboard",
                })),
            )
                .into_response()
        }
        Err(error) => detail(account_error_status(&error), error.to_string()),
    }
}
