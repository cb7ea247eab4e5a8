// Full booking journey over the HTTP surface: hospital signs up, a doctor
// joins, links a calendar, a patient books, and the hospital dashboard
// reflects it.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::rstest;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use crate::modules::directory::store::Directory;
use crate::shell::http::router;
use crate::tests::fixtures::{make_test_state, sample_credentials};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("invalid json body")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build failed")
}

#[rstest]
#[tokio::test]
async fn it_should_carry_a_booking_from_signup_to_the_hospital_dashboard() {
    let (state, directory, _) = make_test_state();
    let app = router(state);

    // hospital signs up
    let response = app
        .clone()
        .oneshot(post_json(
            "/signup/hospital/register",
            json!({
                "name": "St. Mungo's",
                "password": "secret",
                "admin_name": "Ada",
                "admin_email": "admin@mungos.test",
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let hospital = body_json(response).await;
    let hospital_id = hospital["hospital_id"]
        .as_str()
        .expect("missing hospital id")
        .to_string();

    // a doctor joins the hospital
    let response = app
        .clone()
        .oneshot(post_json(
            "/signup/doctor/register",
            json!({
                "name": "Gregory",
                "email": "greg@mungos.test",
                "password": "secret",
                "hospital_id": hospital_id,
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let doctor = body_json(response).await;
    let doctor_id = doctor["doctor_id"]
        .as_str()
        .expect("missing doctor id")
        .to_string();

    // the doctor logs in and gets a session cookie
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login/email",
            json!({
                "email": "greg@mungos.test",
                "password": "secret",
                "account_type": "doctor",
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let doctor_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing cookie")
        .to_str()
        .expect("bad cookie")
        .split(';')
        .next()
        .expect("empty cookie")
        .to_string();

    // calendar linked (the OAuth round trip happens out of band)
    directory
        .link_calendar(&doctor_id, sample_credentials())
        .await
        .expect("link failed");

    // a free slot exists on the target day
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/doctor/api/available-slots?date=2026-03-10")
                .header(header::COOKIE, &doctor_cookie)
                .body(Body::empty())
                .expect("request build failed"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let slots = body_json(response).await;
    let first_slot = slots["slots"][0]["start"]
        .as_str()
        .expect("no free slots")
        .to_string();

    // a patient books it through the public api
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/book",
            json!({
                "doctor_id": doctor_id,
                "patient_name": "Pat Smith",
                "patient_email": "pat@clinic.test",
                "start_time": first_slot,
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let booking = body_json(response).await;
    assert_eq!(booking["success"], json!(true));
    assert!(booking["message"]
        .as_str()
        .expect("missing message")
        .contains("Dr. Gregory"));

    // the booked slot is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/doctor/api/available-slots?date=2026-03-10")
                .header(header::COOKIE, &doctor_cookie)
                .body(Body::empty())
                .expect("request build failed"),
        )
        .await
        .expect("request failed");
    let remaining = body_json(response).await;
    assert!(remaining["slots"]
        .as_array()
        .expect("missing slots")
        .iter()
        .all(|slot| slot["start"].as_str() != Some(first_slot.as_str())));

    // the hospital dashboard shows the appointment
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login/email",
            json!({
                "email": "admin@mungos.test",
                "password": "secret",
                "account_type": "hospital",
            }),
        ))
        .await
        .expect("request failed");
    let hospital_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing cookie")
        .to_str()
        .expect("bad cookie")
        .split(';')
        .next()
        .expect("empty cookie")
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/hospital/api/dashboard")
                .header(header::COOKIE, &hospital_cookie)
                .body(Body::empty())
                .expect("request build failed"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let dashboard = body_json(response).await;
    assert_eq!(dashboard["stats"]["total_doctors"], json!(1));
    assert_eq!(dashboard["stats"]["connected_doctors"], json!(1));
    assert_eq!(dashboard["stats"]["total_appointments"], json!(1));
    assert_eq!(
        dashboard["recent_appointments"][0]["patient_name"],
        json!("Pat Smith")
    );
}
