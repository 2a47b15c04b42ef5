use crate::backend::AppointmentBackend;
use crate::booking_service::{BookingService, DEFAULT_DURATION_MIN};
use crate::slot_generator::{MAX_HORIZON_DAYS, MIN_HORIZON_DAYS};
use crate::clock::SystemClock;
use crate::configuration::Configuration;
use crate::contact::ContactService;
use crate::error::BookingError;
use crate::notifier::{Delivery, Notifier, NotifyError, SmtpNotifier};
use crate::staff_directory::StaffDirectory;
use crate::types::{ClientInfo, ContactMessage};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Json, Router,
};
use axum_valid::{Valid, ValidRejection};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use validator::Validate;

const DEFAULT_HORIZON_DAYS: u32 = 14;
const DEV_MODE_INFO: &str = "Message received (development mode)";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct AvailabilityQuery {
    #[validate(length(max = 64))]
    staff_id: String,
    #[serde(default = "default_horizon_days")]
    #[validate(range(min = MIN_HORIZON_DAYS, max = MAX_HORIZON_DAYS))]
    days: u32,
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotsResponse {
    slots: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct AppointmentRequest {
    #[validate(length(max = 64))]
    staff_id: String,
    #[serde(deserialize_with = "deserialize_start_time")]
    start_time: NaiveDateTime,
    #[serde(default = "default_duration_min")]
    #[validate(range(min = 1, max = 480))]
    duration_min: i32,
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(email, length(max = 200))]
    email: String,
    #[validate(length(max = 64))]
    phone: Option<String>,
    notes: Option<String>,
}

fn default_duration_min() -> i32 {
    DEFAULT_DURATION_MIN
}

/// Accepts ISO-8601 local times with or without seconds.
fn deserialize_start_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M"))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct ContactRequest {
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(email)]
    email: String,
    phone: Option<String>,
    subject: Option<String>,
    #[validate(length(min = 1))]
    message: String,
}

/// Builds the production router: SMTP notifier, system clock and configured staff.
pub fn create_app<B: AppointmentBackend, C: Configuration>(
    backend: B,
    configuration: &C,
) -> Result<Router, NotifyError> {
    let notifier: Arc<dyn Notifier> =
        Arc::new(SmtpNotifier::new(configuration.smtp_settings().as_ref())?);
    let site_name = configuration.site_name();
    let inbox = configuration.contact_inbox();

    let staff_directory = Arc::new(StaffDirectory::new(
        configuration.staff_entries(),
        &format!("{site_name} Team"),
        &inbox,
    ));
    info!(
        staff = staff_directory.list_staff().len(),
        "Staff directory loaded"
    );

    let state = AppState {
        booking_service: BookingService::new(
            backend,
            staff_directory,
            notifier.clone(),
            Arc::new(SystemClock),
            &site_name,
        ),
        contact_service: ContactService::new(notifier, &site_name, &inbox),
    };
    Ok(router(state, &configuration.allowed_origins()))
}

pub fn router<B: AppointmentBackend>(state: AppState<B>, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/staff", get(get_staff))
        .route("/availability", get(get_availability))
        .route("/contact", post(submit_contact))
        .route("/appointments", post(create_appointment));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, %err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn get_staff<B: AppointmentBackend>(State(state): State<AppState<B>>) -> Json<Value> {
    Json(json!({ "staff": state.booking_service.list_staff() }))
}

async fn get_availability<B: AppointmentBackend>(
    State(state): State<AppState<B>>,
    query: Result<Valid<Query<AvailabilityQuery>>, ValidRejection<QueryRejection>>,
) -> Result<Json<SlotsResponse>, BookingError> {
    let Valid(Query(query)) = query?;
    let slots = tokio::task::spawn_blocking(move || {
        state
            .booking_service
            .availability(&query.staff_id, query.days)
    })
    .await??;
    Ok(Json(SlotsResponse { slots }))
}

async fn submit_contact<B: AppointmentBackend>(
    State(state): State<AppState<B>>,
    request: Result<Valid<Json<ContactRequest>>, ValidRejection<JsonRejection>>,
) -> Result<Json<Value>, BookingError> {
    let Valid(Json(request)) = request?;
    let message = ContactMessage {
        name: request.name,
        email: request.email,
        phone: request.phone,
        subject: request.subject,
        message: request.message,
    };

    let delivery =
        tokio::task::spawn_blocking(move || state.contact_service.submit_contact(&message))
            .await??;
    match delivery {
        Delivery::Sent => Ok(Json(json!({ "ok": true }))),
        Delivery::Discarded => Ok(Json(json!({ "ok": true, "info": DEV_MODE_INFO }))),
    }
}

async fn create_appointment<B: AppointmentBackend>(
    State(state): State<AppState<B>>,
    request: Result<Valid<Json<AppointmentRequest>>, ValidRejection<JsonRejection>>,
) -> Result<Json<Value>, BookingError> {
    let Valid(Json(request)) = request?;
    let client = ClientInfo {
        name: request.name,
        email: request.email,
        phone: request.phone,
        notes: request.notes,
    };

    let outcome = tokio::task::spawn_blocking(move || {
        state.booking_service.create_appointment(
            &request.staff_id,
            request.start_time,
            request.duration_min,
            client,
        )
    })
    .await??;
    debug!(
        id = outcome.appointment.id,
        notification = ?outcome.notification,
        "Booking request completed"
    );
    Ok(Json(
        json!({ "ok": true, "appointment_id": outcome.appointment.id }),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::FixedClock;
    use crate::local_appointments::LocalAppointments;
    use crate::notifier::MockNotifier;
    use crate::staff_directory::StaffEntry;
    use crate::testutils::MockAppointmentBackend;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use reqwest::Client;
    use std::sync::atomic::Ordering;
    use test_case::test_case;
    use tokio::task::JoinHandle;

    const ORIGIN: &str = "http://localhost:5173";

    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn discarding_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_deliver()
            .returning(|_| Ok(Delivery::Discarded));
        notifier
    }

    fn state<B: AppointmentBackend>(
        backend: B,
        notifier: MockNotifier,
        now: NaiveDateTime,
    ) -> AppState<B> {
        let notifier: Arc<dyn Notifier> = Arc::new(notifier);
        let staff_directory = Arc::new(StaffDirectory::new(
            vec![StaffEntry {
                id: Some("alice".into()),
                name: Some("Alice".into()),
                email: Some("alice@example.com".into()),
            }],
            "Acme Team",
            "inbox@example.com",
        ));
        AppState {
            booking_service: BookingService::new(
                backend,
                staff_directory,
                notifier.clone(),
                Arc::new(FixedClock(now)),
                "Acme",
            ),
            contact_service: ContactService::new(notifier, "Acme", "inbox@example.com"),
        }
    }

    async fn init<B: AppointmentBackend>(state: AppState<B>) -> (JoinHandle<()>, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = router(state, &[ORIGIN.to_string()]);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (server, format!("http://{address}"))
    }

    fn booking(start_time: NaiveDateTime) -> Value {
        json!({
            "staff_id": "alice",
            "start_time": start_time,
            "name": "Peter",
            "email": "peter@example.com",
        })
    }

    #[tokio::test]
    async fn test_health_and_staff() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(10, 7),
        ))
        .await;
        let client = Client::new();

        let health: Value = client
            .get(format!("{base}/api/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({ "ok": true }));

        let staff: Value = client
            .get(format!("{base}/api/staff"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(staff, json!({ "staff": [{ "id": "alice", "name": "Alice" }] }));

        server.abort();
    }

    #[tokio::test]
    async fn test_availability_for_monday_morning() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .get(format!("{base}/api/availability?staff_id=alice&days=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());

        let slots: SlotsResponse = response.json().await.unwrap();
        assert_eq!(slots.slots.len(), 13);
        assert_eq!(slots.slots.first(), Some(&monday_at(10, 30)));
        assert_eq!(slots.slots.last(), Some(&monday_at(16, 30)));

        server.abort();
    }

    #[tokio::test]
    async fn test_availability_wire_format() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(16, 0),
        ))
        .await;

        let body: Value = Client::new()
            .get(format!("{base}/api/availability?staff_id=alice&days=1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({ "slots": ["2024-06-03T16:30:00"] }));

        server.abort();
    }

    #[test_case("staff_id=bob&days=1", StatusCode::NOT_FOUND ; "unknown staff")]
    #[test_case("staff_id=&days=1", StatusCode::NOT_FOUND ; "empty staff")]
    #[test_case("staff_id=alice&days=0", StatusCode::BAD_REQUEST ; "horizon too short")]
    #[test_case("staff_id=alice&days=61", StatusCode::BAD_REQUEST ; "horizon too long")]
    #[test_case("staff_id=alice&days=soon", StatusCode::BAD_REQUEST ; "horizon not a number")]
    #[test_case("staff_id=alice&days=60", StatusCode::OK ; "longest horizon")]
    #[test_case("staff_id=alice", StatusCode::OK ; "default horizon")]
    #[test_case("days=3", StatusCode::BAD_REQUEST ; "missing staff")]
    #[tokio::test]
    async fn test_availability_status(query: &str, status_code: StatusCode) {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .get(format!("{base}/api/availability?{query}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), status_code.as_u16());
        if status_code != StatusCode::OK {
            let body: Value = response.json().await.unwrap();
            assert!(body["detail"].is_string(), "unexpected body {body}");
        }

        server.abort();
    }

    #[tokio::test]
    async fn test_book_then_conflict() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            discarding_notifier(),
            monday_at(10, 7),
        ))
        .await;
        let client = Client::new();

        let response = client
            .post(format!("{base}/api/appointments"))
            .json(&booking(monday_at(10, 30)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "ok": true, "appointment_id": 1 }));

        let response = client
            .post(format!("{base}/api/appointments"))
            .json(&booking(monday_at(10, 30)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT.as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "detail": "Slot already booked" }));

        let slots: SlotsResponse = client
            .get(format!("{base}/api/availability?staff_id=alice&days=1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(slots.slots.first(), Some(&monday_at(11, 0)));

        server.abort();
    }

    #[tokio::test]
    async fn test_booking_in_the_past() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(9, 5),
        ))
        .await;

        let response = Client::new()
            .post(format!("{base}/api/appointments"))
            .json(&booking(monday_at(9, 0)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "detail": "Cannot book in the past" }));

        server.abort();
    }

    #[test_case(json!({ "staff_id": "bob", "start_time": "2024-06-03T11:00:00", "name": "Peter", "email": "peter@example.com" }), StatusCode::NOT_FOUND ; "unknown staff")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00", "name": "Peter", "email": "not-an-email" }), StatusCode::BAD_REQUEST ; "invalid email")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00", "duration_min": 0, "name": "Peter", "email": "peter@example.com" }), StatusCode::BAD_REQUEST ; "zero duration")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00", "name": "", "email": "peter@example.com" }), StatusCode::BAD_REQUEST ; "empty name")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00", "email": "peter@example.com" }), StatusCode::BAD_REQUEST ; "missing name")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "next monday", "name": "Peter", "email": "peter@example.com" }), StatusCode::BAD_REQUEST ; "unparsable start time")]
    #[test_case(json!({ "staff_id": "", "start_time": "2024-06-03T11:00:00", "name": "Peter", "email": "peter@example.com" }), StatusCode::NOT_FOUND ; "empty staff")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00", "name": "Peter", "email": "peter@example.com" }), StatusCode::OK ; "start time without seconds")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00.000", "name": "Peter", "email": "peter@example.com" }), StatusCode::OK ; "start time with fraction")]
    #[test_case(json!({ "staff_id": "alice", "start_time": "2024-06-03T11:00:00", "name": "Peter", "email": "peter@example.com", "phone": "+43 1", "notes": "first visit" }), StatusCode::OK ; "all fields")]
    #[tokio::test]
    async fn test_booking_status(request: Value, status_code: StatusCode) {
        let (server, base) = init(state(
            LocalAppointments::default(),
            discarding_notifier(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .post(format!("{base}/api/appointments"))
            .json(&request)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), status_code.as_u16());
        let body: Value = response.json().await.unwrap();
        match status_code {
            StatusCode::OK => assert_eq!(body, json!({ "ok": true, "appointment_id": 1 })),
            StatusCode::NOT_FOUND => assert_eq!(body, json!({ "detail": "Staff not found" })),
            _ => assert!(body["detail"].is_string(), "unexpected body {body}"),
        }

        server.abort();
    }

    #[tokio::test]
    async fn test_malformed_json_gets_detail() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .post(format!("{base}/api/contact"))
            .header("content-type", "application/json")
            .body("{\"name\": \"Peter\"")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].is_string());

        let response = Client::new()
            .post(format!("{base}/api/contact"))
            .json(&json!({ "name": "Peter", "email": "peter@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("missing field `message`"));

        server.abort();
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let backend = MockAppointmentBackend::new();
        backend.0.success.store(false, Ordering::SeqCst);
        let (server, base) =
            init(state(backend.clone(), MockNotifier::new(), monday_at(10, 7))).await;

        let response = Client::new()
            .post(format!("{base}/api/appointments"))
            .json(&booking(monday_at(10, 30)))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "detail": "Internal server error" }));
        assert_eq!(backend.0.calls_to_insert_appointment.load(Ordering::SeqCst), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_contact_in_development_mode() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            discarding_notifier(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .post(format!("{base}/api/contact"))
            .json(&json!({
                "name": "Peter",
                "email": "peter@example.com",
                "message": "Hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "ok": true, "info": DEV_MODE_INFO }));

        server.abort();
    }

    #[tokio::test]
    async fn test_contact_delivery_failure() {
        let mut notifier = MockNotifier::new();
        notifier.expect_deliver().returning(|_| {
            Err(NotifyError::Address {
                address: "inbox".into(),
                source: "inbox".parse::<lettre::Address>().unwrap_err(),
            })
        });
        let (server, base) =
            init(state(LocalAppointments::default(), notifier, monday_at(10, 7))).await;

        let response = Client::new()
            .post(format!("{base}/api/contact"))
            .json(&json!({
                "name": "Peter",
                "email": "peter@example.com",
                "subject": "Pricing",
                "message": "Hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "detail": "Failed to send email" }));

        server.abort();
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (server, base) = init(state(
            LocalAppointments::default(),
            MockNotifier::new(),
            monday_at(10, 7),
        ))
        .await;

        let response = Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/api/appointments"))
            .header("origin", ORIGIN)
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap()
                .to_str()
                .unwrap(),
            ORIGIN
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap()
                .to_str()
                .unwrap(),
            "true"
        );

        server.abort();
    }
}
