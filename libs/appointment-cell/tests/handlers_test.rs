use std::sync::Arc;
use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_models::{auth::User, error::AppError};
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockStoreResponses};

fn create_test_user_extension(role: &str, id: &str) -> Extension<User> {
    Extension(User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", role)),
        role: Some(role.to_string()),
    })
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    let auth = Authorization::bearer(token).unwrap();
    TypedHeader(auth)
}

fn mock_config(mock_server: &MockServer) -> shared_config::AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.datastore_url = mock_server.uri();
    config
}

#[tokio::test]
async fn test_create_appointment_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    // The chosen doctor must resolve in the directory with the doctor role
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("role", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_row(&doctor_id.to_string(), "doctor", "Aoife", "Byrne", "Dublin")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let create_request = CreateAppointmentRequest {
        doctor_id,
        scheduled_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
        scheduled_time: "10:00".to_string(),
        visit_type: VisitType::Online,
        notes: Some("Follow-up consultation".to_string()),
    };

    let result = create_appointment(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(create_request),
    ).await;

    assert!(result.is_ok(), "Expected booking to succeed, got: {:?}", result.err());
    let response = result.unwrap();
    assert_eq!(response.status_code, 201);
    assert!(response.success);
    assert_eq!(response.message, "Appointment created successfully");
    assert_eq!(response.data.patient_id.to_string(), patient_user.id);

    // The stored row carries a freshly minted room code for online visits
    let requests = mock_server.received_requests().await.unwrap();
    let create_req = requests.iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/appointments")
        .expect("no create request recorded");
    let body: serde_json::Value = serde_json::from_slice(&create_req.body).unwrap();

    assert_eq!(body["patientId"], patient_user.id);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["visitType"], "online");
    let room_code = body["roomCode"].as_str().expect("online booking missing room code");
    assert_eq!(room_code.len(), 6);
    assert!(room_code.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_create_in_person_appointment_gets_no_room_code() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("role", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_row(&doctor_id.to_string(), "doctor", "Aoife", "Byrne", "Dublin")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::in_person_appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let create_request = CreateAppointmentRequest {
        doctor_id,
        scheduled_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
        scheduled_time: "10:00".to_string(),
        visit_type: VisitType::InPerson,
        notes: None,
    };

    let result = create_appointment(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(create_request),
    ).await;

    assert!(result.is_ok(), "Expected booking to succeed, got: {:?}", result.err());
    let response = result.unwrap();
    assert_eq!(response.data.visit_type, VisitType::InPerson);
    assert!(response.data.room_code.is_none());

    // In-person rows must not even carry the roomCode key
    let requests = mock_server.received_requests().await.unwrap();
    let create_req = requests.iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/appointments")
        .expect("no create request recorded");
    let body: serde_json::Value = serde_json::from_slice(&create_req.body).unwrap();

    assert_eq!(body["visitType"], "in-person");
    assert!(body.get("roomCode").is_none());
}

#[tokio::test]
async fn test_create_appointment_unknown_doctor() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let create_request = CreateAppointmentRequest {
        doctor_id,
        scheduled_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
        scheduled_time: "10:00".to_string(),
        visit_type: VisitType::Online,
        notes: None,
    };

    let result = create_appointment(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(create_request),
    ).await;

    match result.unwrap_err() {
        AppError::NotFound(msg) => assert_eq!(msg, "Doctor not found"),
        other => panic!("Expected NotFound, got: {:?}", other),
    }

    // Nothing must be written when the doctor does not resolve
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "POST"));
}

#[tokio::test]
async fn test_create_appointment_rejects_non_patient() {
    let config = TestConfig::default();
    let doctor_user = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor_user, &config.jwt_secret, Some(24));

    let create_request = CreateAppointmentRequest {
        doctor_id: Uuid::new_v4(),
        scheduled_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
        scheduled_time: "10:00".to_string(),
        visit_type: VisitType::Online,
        notes: None,
    };

    let result = create_appointment(
        State(config.to_arc()),
        create_auth_header(&token),
        create_test_user_extension("doctor", &doctor_user.id),
        Json(create_request),
    ).await;

    match result.unwrap_err() {
        AppError::Forbidden(msg) => {
            assert_eq!(msg, "Access denied. Only patients can access this route.")
        }
        other => panic!("Expected Forbidden, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_appointment_rejects_malformed_time() {
    let config = TestConfig::default();
    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));

    let create_request = CreateAppointmentRequest {
        doctor_id: Uuid::new_v4(),
        scheduled_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
        scheduled_time: "10am".to_string(),
        visit_type: VisitType::Online,
        notes: None,
    };

    let result = create_appointment(
        State(config.to_arc()),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(create_request),
    ).await;

    assert_matches!(result.unwrap_err(), AppError::BadRequest(_));
}

#[tokio::test]
async fn test_get_appointments_patient_listing_joins_doctor() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();

    // Listings are ordered newest first by the store query itself
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .and(query_param("order", "scheduledDate.desc,scheduledTime.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&first_id.to_string(), &patient_user.id, &doctor_id.to_string()),
            MockStoreResponses::appointment_row(&second_id.to_string(), &patient_user.id, &doctor_id.to_string()),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_row(&doctor_id.to_string(), "doctor", "Aoife", "Byrne", "Dublin")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_profile_row(&doctor_id.to_string())
        ])))
        .mount(&mock_server)
        .await;

    let result = get_appointments(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    assert!(result.is_ok(), "Expected listing to succeed, got: {:?}", result.err());
    let response = result.unwrap();
    assert_eq!(response.message, "Appointments fetched successfully");

    match response.data {
        AppointmentListing::Patient(views) => {
            assert_eq!(views.len(), 2);
            assert_eq!(views[0].appointment.id, first_id);
            let doctor = views[0].doctor.as_ref().expect("doctor card missing");
            assert_eq!(doctor.first_name, "Aoife");
            assert_eq!(doctor.specialization.as_deref(), Some("General Practice"));
        }
        AppointmentListing::Doctor(_) => panic!("Expected the patient-facing listing"),
    }

    // Directory reads stay on the explicit projection; credentials never leave the store
    let requests = mock_server.received_requests().await.unwrap();
    let directory_reqs: Vec<_> = requests.iter()
        .filter(|r| r.url.path() == "/rest/v1/users")
        .collect();
    assert!(!directory_reqs.is_empty());
    for req in directory_reqs {
        let query = req.url.query().unwrap_or_default();
        assert!(query.contains("select="));
        assert!(!query.contains("password"));
    }
}

#[tokio::test]
async fn test_get_appointments_empty_listing_skips_joins() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = get_appointments(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    assert!(result.is_ok());
    match result.unwrap().data {
        AppointmentListing::Patient(views) => assert!(views.is_empty()),
        AppointmentListing::Doctor(_) => panic!("Expected the patient-facing listing"),
    }

    // No directory lookups for an empty page
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_get_appointments_doctor_listing_joins_patients() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let doctor_user = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor_user, &config.jwt_secret, Some(24));
    let first_patient = Uuid::new_v4();
    let second_patient = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctorId", format!("eq.{}", doctor_user.id)))
        .and(query_param("order", "scheduledDate.desc,scheduledTime.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &first_patient.to_string(),
                &doctor_user.id,
            ),
            MockStoreResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &second_patient.to_string(),
                &doctor_user.id,
            ),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_row(&first_patient.to_string(), "patient", "Niamh", "Kelly", "Galway"),
            MockStoreResponses::user_row(&second_patient.to_string(), "patient", "Sean", "Walsh", "Cork"),
        ])))
        .mount(&mock_server)
        .await;

    let result = get_appointments(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("doctor", &doctor_user.id),
    ).await;

    assert!(result.is_ok(), "Expected listing to succeed, got: {:?}", result.err());
    match result.unwrap().data {
        AppointmentListing::Doctor(views) => {
            assert_eq!(views.len(), 2);
            let patient = views[0].patient.as_ref().expect("patient summary missing");
            assert_eq!(patient.id, first_patient);
            assert_eq!(patient.first_name, "Niamh");
        }
        AppointmentListing::Patient(_) => panic!("Expected the doctor-facing listing"),
    }
}

#[tokio::test]
async fn test_get_appointments_rejects_other_roles() {
    let config = TestConfig::default();
    let admin_user = TestUser::new("admin@example.com", "admin");
    let token = JwtTestUtils::create_test_token(&admin_user, &config.jwt_secret, Some(24));

    let result = get_appointments(
        State(config.to_arc()),
        create_auth_header(&token),
        create_test_user_extension("admin", &admin_user.id),
    ).await;

    assert_matches!(result.unwrap_err(), AppError::Forbidden(_));
}

#[tokio::test]
async fn test_get_appointment_visible_to_owner() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &Uuid::new_v4().to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = get_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    assert!(result.is_ok());
    let response = result.unwrap();
    assert_eq!(response.data.id, appointment_id);
    assert_eq!(response.message, "Appointment fetched successfully");
}

#[tokio::test]
async fn test_get_appointment_hidden_from_strangers() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    // The record belongs to an unrelated patient and doctor
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = get_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    match result.unwrap_err() {
        AppError::Forbidden(msg) => assert_eq!(msg, "Not authorized to view this appointment"),
        other => panic!("Expected Forbidden, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_appointment_rejects_past_schedule() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    let mut past_row = MockStoreResponses::appointment_row(
        &appointment_id.to_string(),
        &patient_user.id,
        &Uuid::new_v4().to_string(),
    );
    past_row["scheduledDate"] = json!("2020-01-01");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([past_row])))
        .mount(&mock_server)
        .await;

    let update_request = UpdateAppointmentRequest {
        doctor_id: None,
        scheduled_date: None,
        scheduled_time: None,
        visit_type: None,
        notes: Some("Bring previous scan".to_string()),
    };

    let result = update_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(update_request),
    ).await;

    assert_matches!(result.unwrap_err(), AppError::InvalidState(_));

    // Validation fires before anything reaches the store
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "PATCH"));
}

#[tokio::test]
async fn test_update_appointment_switch_to_in_person_clears_room_code() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::in_person_appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let update_request = UpdateAppointmentRequest {
        doctor_id: None,
        scheduled_date: None,
        scheduled_time: None,
        visit_type: Some(VisitType::InPerson),
        notes: None,
    };

    let result = update_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(update_request),
    ).await;

    assert!(result.is_ok(), "Expected update to succeed, got: {:?}", result.err());
    assert!(result.unwrap().data.room_code.is_none());

    // Switching off video writes an explicit null to clear the stored code
    let requests = mock_server.received_requests().await.unwrap();
    let patch_req = requests.iter()
        .find(|r| r.method.as_str() == "PATCH")
        .expect("no update request recorded");
    let body: serde_json::Value = serde_json::from_slice(&patch_req.body).unwrap();

    assert_eq!(body["visitType"], "in-person");
    assert!(body.as_object().unwrap().contains_key("roomCode"));
    assert!(body["roomCode"].is_null());
    assert!(body.as_object().unwrap().contains_key("updatedAt"));
}

#[tokio::test]
async fn test_update_appointment_switch_to_online_mints_room_code() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::in_person_appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &doctor_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let update_request = UpdateAppointmentRequest {
        doctor_id: None,
        scheduled_date: None,
        scheduled_time: None,
        visit_type: Some(VisitType::Online),
        notes: None,
    };

    let result = update_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(update_request),
    ).await;

    assert!(result.is_ok(), "Expected update to succeed, got: {:?}", result.err());

    let requests = mock_server.received_requests().await.unwrap();
    let patch_req = requests.iter()
        .find(|r| r.method.as_str() == "PATCH")
        .expect("no update request recorded");
    let body: serde_json::Value = serde_json::from_slice(&patch_req.body).unwrap();

    assert_eq!(body["visitType"], "online");
    let room_code = body["roomCode"].as_str().expect("switch to online must mint a room code");
    assert_eq!(room_code.len(), 6);
    assert!(room_code.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_update_appointment_not_owned_reads_as_missing() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    // Ownership is part of the read predicate, so a foreign record is just absent
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let update_request = UpdateAppointmentRequest {
        doctor_id: None,
        scheduled_date: None,
        scheduled_time: Some("11:30".to_string()),
        visit_type: None,
        notes: None,
    };

    let result = update_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(update_request),
    ).await;

    assert_matches!(result.unwrap_err(), AppError::NotFound(_));
}

#[tokio::test]
async fn test_delete_appointment_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id.to_string(),
                &patient_user.id,
                &Uuid::new_v4().to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = delete_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    assert!(result.is_ok(), "Expected delete to succeed, got: {:?}", result.err());
    let response = result.unwrap();
    assert_eq!(response.message, "Appointment deleted successfully");
    assert_eq!(response.data.id, appointment_id);
}

#[tokio::test]
async fn test_delete_appointment_not_owned_reads_as_missing() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient_user, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patientId", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = delete_appointment(
        State(Arc::new(config)),
        axum::extract::Path(appointment_id),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    ).await;

    assert_matches!(result.unwrap_err(), AppError::NotFound(_));
}
