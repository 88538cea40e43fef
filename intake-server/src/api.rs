//! `/api/applications` routes.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
    Router,
};
use intake_core::{ApplicationRecord, SubmissionInput, SubmitResponse, APPLICATIONS_PATH};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::AppState;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Run the request inside a span carrying a fresh correlation id, and echo
/// the id back in the response headers.
async fn assign_correlation_id(request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "api_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value);
    }
    response
}

pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), ServiceError> {
    info!("Received application");

    let input: SubmissionInput = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::MalformedPayload(e.to_string()))?;

    let response = state.service.submit(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_applications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ApplicationRecord>>, ServiceError> {
    Ok(Json(state.service.get_all().await?))
}

pub async fn get_applications_by_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<ApplicationRecord>>, ServiceError> {
    Ok(Json(state.service.get_by_day(&date).await?))
}

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            APPLICATIONS_PATH,
            get(list_applications).post(submit_application),
        )
        .route(
            &format!("{}/:date", APPLICATIONS_PATH),
            get(get_applications_by_day),
        )
        .route_layer(middleware::from_fn(assign_correlation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{FixedClock, IntakeService};
    use crate::store::{FileRecordStore, InMemoryRecordStore, RecordRepository};
    use crate::build_router;
    use axum::body::Body;
    use axum::http::{header, Method, Request as HttpRequest};
    use chrono::{TimeZone, Utc};
    use intake_core::{ApplicationFields, ErrorBody};
    use serde_json::json;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn app_with(store: Arc<dyn RecordRepository>, static_dir: PathBuf) -> Router {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        let service = IntakeService::new(store).with_clock(Arc::new(FixedClock(now)));
        build_router(Arc::new(AppState {
            service,
            static_dir,
        }))
    }

    fn app() -> (Router, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        (
            app_with(store.clone(), PathBuf::from("does-not-exist")),
            store,
        )
    }

    fn post_json(body: impl Into<Body>) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(Method::POST)
            .uri(APPLICATIONS_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_read_back() {
        let (app, _store) = app();
        let payload = json!({"name": "Alice", "grade": "大一", "introduction": "Hello"});

        let response = app
            .clone()
            .oneshot(post_json(payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: SubmitResponse = body_json(response).await;
        assert_eq!(created.timestamp, "2025-06-01T08:30:00.000Z");
        assert_eq!(created.message, "Application saved");

        let response = app
            .oneshot(get("/api/applications/2025-06-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let records: Vec<ApplicationRecord> = body_json(response).await;
        assert_eq!(
            records,
            vec![ApplicationRecord::new(
                "2025-06-01T08:30:00.000Z",
                ApplicationFields::new("Alice", "大一", "Hello"),
            )]
        );
    }

    #[tokio::test]
    async fn test_submit_missing_field_is_bad_request() {
        let (app, store) = app();
        let payload = json!({"name": "Alice", "introduction": "Hello"});

        let response = app.oneshot(post_json(payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = body_json(response).await;
        assert!(body.error.contains("grade"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_missing_field_leaves_no_partition_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileRecordStore::new(temp_dir.path()).await.unwrap());
        let app = app_with(store, PathBuf::from("does-not-exist"));
        let payload = json!({"name": "Alice", "introduction": "Hello"});

        let response = app.oneshot(post_json(payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!temp_dir.path().join("application_2025-06-01.txt").exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_submit_malformed_json_is_bad_request() {
        let (app, store) = app();
        for body in ["{not json", "[1, 2]", r#"{"name": 5}"#] {
            let response = app.clone().oneshot(post_json(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let _: ErrorBody = body_json(response).await;
        }
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_invalid_day_is_not_found() {
        let (app, _store) = app();
        for uri in [
            "/api/applications/2025-06-02",
            "/api/applications/2025-13-01",
            "/api/applications/..%2Fetc",
        ] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
            let _: ErrorBody = body_json(response).await;
        }
    }

    #[tokio::test]
    async fn test_corrupt_partition_is_server_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileRecordStore::new(temp_dir.path()).await.unwrap());
        std::fs::write(temp_dir.path().join("application_2025-06-01.txt"), "oops").unwrap();
        let app = app_with(store, PathBuf::from("does-not-exist"));

        for uri in ["/api/applications/2025-06-01", APPLICATIONS_PATH] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(
                response.status(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "uri {}",
                uri
            );
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (app, store) = app();
        for (day, timestamp, name) in [
            ("2025-05-31", "2025-05-31T23:00:00.000Z", "older"),
            ("2025-06-01", "2025-06-01T01:00:00.000Z", "newer"),
        ] {
            store
                .append(
                    day.parse().unwrap(),
                    ApplicationRecord::new(timestamp, ApplicationFields::new(name, "大四", "x")),
                )
                .await
                .unwrap();
        }

        let response = app.oneshot(get(APPLICATIONS_PATH)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let records: Vec<ApplicationRecord> = body_json(response).await;
        let names: Vec<_> = records.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_api_responses_carry_correlation_id() {
        let (app, _store) = app();
        let first = app.clone().oneshot(get(APPLICATIONS_PATH)).await.unwrap();
        let second = app.oneshot(get("/api/applications/bad")).await.unwrap();

        let id = |response: &Response| {
            response
                .headers()
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| Uuid::parse_str(v).ok())
        };
        let (a, b) = (id(&first), id(&second));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _store) = app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "intake");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_unmatched_paths_fall_back_to_index() {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), "<h1>apply</h1>").unwrap();
        std::fs::write(static_dir.path().join("app.js"), "console.log(1)").unwrap();
        let app = app_with(
            Arc::new(InMemoryRecordStore::new()),
            static_dir.path().to_path_buf(),
        );

        let response = app.clone().oneshot(get("/app.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"console.log(1)");

        let response = app.oneshot(get("/some/client/route")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<h1>apply</h1>");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let (app, _store) = app();
        let request = HttpRequest::builder()
            .method(Method::OPTIONS)
            .uri(APPLICATIONS_PATH)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
