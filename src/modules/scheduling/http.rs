// HTTP surface for dashboards, availability and booking.
//
// Routes under /doctor/api and /hospital/api require a session; the /api
// routes are the public booking surface used by the assistant's frontend.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::modules::directory::records::AppointmentStatus;
use crate::modules::identity::session::{require_doctor, require_hospital};
use crate::modules::scheduling::booking::BookingError;
use crate::modules::scheduling::dashboards::DashboardError;
use crate::modules::scheduling::slots::DEFAULT_SLOT_MINUTES;
use crate::shell::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/doctor/api/dashboard", get(doctor_dashboard))
        .route("/doctor/api/appointments", get(doctor_appointments))
        .route("/doctor/api/available-slots", get(doctor_available_slots))
        .route(
            "/doctor/api/appointments/{id}/status",
            put(update_appointment_status),
        )
        .route("/hospital/api/dashboard", get(hospital_dashboard))
        .route("/hospital/api/doctors", get(hospital_doctors))
        .route("/hospital/api/appointments", get(hospital_appointments))
        .route("/api/doctors", get(public_doctors))
        .route("/api/availability", post(public_availability))
        .route("/api/book", post(public_book))
        .route("/api/cancel", post(public_cancel))
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn dashboard_error(error: DashboardError) -> Response {
    let status = match error {
        DashboardError::DoctorNotFound => StatusCode::NOT_FOUND,
        DashboardError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    detail(status, error.to_string())
}

#[derive(Debug, Deserialize)]
struct DaysQuery {
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: String,
    duration: Option<i64>,
}

async fn doctor_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let doctor = match require_doctor(&state, &headers).await {
        Ok(doctor) => doctor,
        Err(error) => return error.into_response(),
    };
    match state.dashboards.doctor_dashboard(&doctor.id).await {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(error) => dashboard_error(error),
    }
}

async fn doctor_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DaysQuery>,
) -> Response {
    let doctor = match require_doctor(&state, &headers).await {
        Ok(doctor) => doctor,
        Err(error) => return error.into_response(),
    };
    let days = query.days.unwrap_or(7).clamp(1, 90);
    match state.dashboards.doctor_appointments(&doctor.id, days).await {
        Ok(appointments) => Json(json!({ "appointments": appointments })).into_response(),
        Err(error) => dashboard_error(error),
    }
}

async fn doctor_available_slots(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Response {
    let doctor = match require_doctor(&state, &headers).await {
        Ok(doctor) => doctor,
        Err(error) => return error.into_response(),
    };
    let Ok(date) = query.date.parse::<NaiveDate>() else {
        return detail(
            StatusCode::BAD_REQUEST,
            "date must be formatted YYYY-MM-DD".into(),
        );
    };
    let duration = query.duration.unwrap_or(DEFAULT_SLOT_MINUTES);
    match state.booking.available_slots(&doctor.id, date, duration).await {
        Ok(slots) => Json(json!({ "date": query.date, "slots": slots })).into_response(),
        Err(error) => booking_failure(error),
    }
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    status: String,
}

async fn update_appointment_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(appointment_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let doctor = match require_doctor(&state, &headers).await {
        Ok(doctor) => doctor,
        Err(error) => return error.into_response(),
    };
    let Ok(status) = query.status.parse::<AppointmentStatus>() else {
        return detail(
            StatusCode::BAD_REQUEST,
            format!("unknown appointment status: {}", query.status),
        );
    };
    match state
        .booking
        .update_status(&doctor.id, &appointment_id, status)
        .await
    {
        Ok(()) => Json(json!({ "success": true, "status": status })).into_response(),
        Err(error) => booking_failure(error),
    }
}

async fn hospital_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let hospital_id = match require_hospital(&state, &headers).await {
        Ok(id) => id,
        Err(error) => return error.into_response(),
    };
    match state.dashboards.hospital_dashboard(&hospital_id).await {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(error) => dashboard_error(error),
    }
}

async fn hospital_doctors(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let hospital_id = match require_hospital(&state, &headers).await {
        Ok(id) => id,
        Err(error) => return error.into_response(),
    };
    match state.directory.doctors_by_hospital(&hospital_id).await {
        Ok(doctors) => {
            let public: Vec<_> = doctors.iter().map(|doctor| doctor.public()).collect();
            Json(json!({ "doctors": public })).into_response()
        }
        Err(error) => detail(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

async fn hospital_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DaysQuery>,
) -> Response {
    let hospital_id = match require_hospital(&state, &headers).await {
        Ok(id) => id,
        Err(error) => return error.into_response(),
    };
    let days = query.days.unwrap_or(7).clamp(1, 90);
    match state
        .dashboards
        .hospital_appointments(&hospital_id, days)
        .await
    {
        Ok(appointments) => Json(json!({ "appointments": appointments })).into_response(),
        Err(error) => dashboard_error(error),
    }
}

async fn public_doctors(State(state): State<AppState>) -> Response {
    match state.directory.doctors().await {
        Ok(doctors) => {
            let public: Vec<_> = doctors.iter().map(|doctor| doctor.public()).collect();
            Json(json!({ "doctors": public })).into_response()
        }
        Err(error) => detail(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityRequest {
    doctor_id: String,
    date: String,
    duration_minutes: Option<i64>,
}

/// Booking outcomes ride in a 200 envelope so the conversational frontend can
/// show the failure text; only infrastructure faults surface as 5xx.
fn booking_failure(error: BookingError) -> Response {
    match error {
        BookingError::Calendar(inner) => {
            detail(StatusCode::BAD_GATEWAY, inner.to_string())
        }
        BookingError::Directory(inner) => {
            detail(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
        }
        domain => Json(json!({ "success": false, "message": domain.to_string() })).into_response(),
    }
}

async fn public_availability(
    State(state): State<AppState>,
    Json(body): Json<AvailabilityRequest>,
) -> Response {
    let Ok(date) = body.date.parse::<NaiveDate>() else {
        return detail(
            StatusCode::BAD_REQUEST,
            "date must be formatted YYYY-MM-DD".into(),
        );
    };
    let duration = body.duration_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
    match state
        .booking
        .available_slots(&body.doctor_id, date, duration)
        .await
    {
        Ok(slots) => Json(json!({
            "success": true,
            "date": body.date,
            "slots": slots,
        }))
        .into_response(),
        Err(error) => booking_failure(error),
    }
}

#[derive(Debug, Deserialize)]
struct BookRequest {
    doctor_id: String,
    patient_name: String,
    patient_email: String,
    start_time: DateTime<Utc>,
    duration_minutes: Option<i64>,
    notes: Option<String>,
}

async fn public_book(State(state): State<AppState>, Json(body): Json<BookRequest>) -> Response {
    let duration = body.duration_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
    match state
        .booking
        .book(
            &body.doctor_id,
            &body.patient_name,
            &body.patient_email,
            body.start_time,
            duration,
            body.notes,
        )
        .await
    {
        Ok(confirmation) => Json(json!({
            "success": true,
            "appointment_id": confirmation.appointment_id,
            "calendar_event_id": confirmation.calendar_event_id,
            "message": confirmation.message,
        }))
        .into_response(),
        Err(error) => booking_failure(error),
    }
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    appointment_id: String,
}

async fn public_cancel(
    State(state): State<AppState>,
    Json(body): Json<CancelRequest>,
) -> Response {
    match state.booking.cancel(&body.appointment_id).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Appointment cancelled",
        }))
        .into_response(),
        Err(error) => booking_failure(error),
    }
}
