//! API Routes

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use super::pages;
use crate::error::{Error, Result};
use crate::guardian_store::{Guardian, SetGuardianRequest};
use crate::models::ApiResponse;
use crate::state::AppState;

/// MJPEG part boundary, matching the content-type header below
const STREAM_BOUNDARY: &str = "frame";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page))
        .route("/set_guardian", get(set_guardian_page).post(submit_guardian))
        // Video
        .route("/video_feed", get(video_feed))
        // Health & API
        .route("/healthz", get(super::health_check))
        .route(
            "/api/guardian",
            get(get_guardian).put(put_guardian).delete(clear_guardian),
        )
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/test", post(send_test_alert))
        .with_state(state)
}

// ========================================
// Pages
// ========================================

/// Index page; redirects to the setup form until a guardian is stored
async fn index_page(State(state): State<AppState>) -> Response {
    match state.guardian.get().await {
        Some(guardian) => Html(pages::index(&guardian.number)).into_response(),
        None => Redirect::to("/set_guardian").into_response(),
    }
}

/// Guardian setup form
async fn set_guardian_page() -> Html<String> {
    Html(pages::set_guardian(None))
}

/// Store the submitted guardian number, re-rendering the form on bad input
async fn submit_guardian(
    State(state): State<AppState>,
    Form(req): Form<SetGuardianRequest>,
) -> Result<Response> {
    match state.guardian.set(&req.number).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(Error::Validation(msg)) => Ok((
            StatusCode::BAD_REQUEST,
            Html(pages::set_guardian(Some(&msg))),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

// ========================================
// Video feed
// ========================================

/// Wrap one JPEG frame as an MJPEG multipart chunk
fn multipart_chunk(frame: &Bytes) -> Bytes {
    let mut chunk = Vec::with_capacity(frame.len() + 128);
    chunk.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            STREAM_BOUNDARY,
            frame.len()
        )
        .as_bytes(),
    );
    chunk.extend_from_slice(frame);
    chunk.extend_from_slice(b"\r\n");
    Bytes::from(chunk)
}

/// MJPEG stream of annotated frames
async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.frames.subscribe();
    tracing::info!(viewers = state.frames.viewer_count(), "Video feed viewer connected");

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(frame) => Some(Ok::<_, std::convert::Infallible>(multipart_chunk(&frame))),
            // Lagging viewers just skip to the next frame
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        }
    });

    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", STREAM_BOUNDARY),
        )],
        Body::from_stream(stream),
    )
}

// ========================================
// JSON API
// ========================================

/// Get the guardian record
async fn get_guardian(State(state): State<AppState>) -> Result<Json<ApiResponse<Guardian>>> {
    let guardian = state
        .guardian
        .get()
        .await
        .ok_or_else(|| Error::NotFound("No guardian number set".to_string()))?;
    Ok(Json(ApiResponse::success(guardian)))
}

/// Set the guardian number
async fn put_guardian(
    State(state): State<AppState>,
    Json(req): Json<SetGuardianRequest>,
) -> Result<Json<ApiResponse<Guardian>>> {
    let guardian = state.guardian.set(&req.number).await?;
    Ok(Json(ApiResponse::success(guardian)))
}

/// Remove the guardian number; fall alerts are skipped until a new one is set
async fn clear_guardian(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    state.guardian.clear().await?;
    Ok(Json(ApiResponse::success(json!({ "cleared": true }))))
}

#[derive(Debug, Deserialize)]
struct ListAlertsQuery {
    limit: Option<usize>,
}

/// List recent alert events, newest first
async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).min(500);
    let events = state.alerts.get_latest(limit).await;
    Json(ApiResponse::success(events))
}

/// Send a test SMS to the stored guardian
async fn send_test_alert(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let guardian = state
        .guardian
        .get()
        .await
        .ok_or_else(|| Error::NotFound("No guardian number set".to_string()))?;

    let message = state
        .sms
        .send(&guardian.number, "Test alert from fallwatch.")
        .await?;

    Ok(Json(ApiResponse::success(json!({
        "message_sid": message.sid,
        "to": guardian.number,
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_log::AlertLog;
    use crate::fall_monitor::{FallMonitor, FallPolicy};
    use crate::frame_hub::FrameHub;
    use crate::guardian_store::GuardianStore;
    use crate::sms_client::{SmsClient, SmsConfig};
    use crate::state::AppConfig;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let guardian = Arc::new(GuardianStore::new(pool.clone()).await.unwrap());
        let alerts = Arc::new(AlertLog::new(pool.clone(), 100).await.unwrap());
        let sms = Arc::new(SmsClient::new(SmsConfig::default()));
        let frames = Arc::new(FrameHub::new());
        let monitor = Arc::new(FallMonitor::new(
            guardian.clone(),
            sms.clone(),
            alerts.clone(),
            FallPolicy {
                fall_class: "falling".to_string(),
                confidence: 0.85,
                cooldown: Duration::from_secs(30),
                alert_message: "Fall detected.".to_string(),
            },
        ));

        AppState {
            pool,
            config: AppConfig::default(),
            guardian,
            frames,
            alerts,
            sms,
            monitor,
            started_at: Instant::now(),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_redirects_without_guardian() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/set_guardian"
        );
    }

    #[tokio::test]
    async fn test_index_shows_guardian_number() {
        let state = test_state().await;
        state.guardian.set("+821012345678").await.unwrap();

        let app = create_router(state);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("+821012345678"));
    }

    #[tokio::test]
    async fn test_submit_guardian_redirects_home() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::post("/set_guardian")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("number=%2B821012345678"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_submit_invalid_number_rerenders_form() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::post("/set_guardian")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("number=abc"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("Invalid phone number"));
    }

    #[tokio::test]
    async fn test_get_guardian_404_when_unset() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::get("/api/guardian").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_and_get_guardian() {
        let app = create_router(test_state().await);

        let response = app
            .clone()
            .oneshot(
                Request::put("/api/guardian")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"number": "+82 10-1234-5678"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/guardian").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("+821012345678"));
    }

    #[tokio::test]
    async fn test_list_alerts_empty() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::get("/api/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#""ok":true"#));
    }

    #[tokio::test]
    async fn test_test_alert_requires_guardian() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::post("/api/alerts/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_healthz_reports_state() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#""db_connected":true"#));
        assert!(body.contains(r#""guardian_configured":false"#));
        assert!(body.contains(r#""sms_configured":false"#));
        assert!(body.contains(r#""fall_class":"falling""#));
        assert!(body.contains(r#""cooldown_remaining_sec":null"#));
    }

    #[tokio::test]
    async fn test_delete_guardian() {
        let state = test_state().await;
        state.guardian.set("+821012345678").await.unwrap();

        let app = create_router(state);
        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/guardian")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/guardian").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_multipart_chunk_format() {
        let frame = Bytes::from_static(b"jpegdata");
        let chunk = multipart_chunk(&frame);
        let text = String::from_utf8_lossy(&chunk);

        assert!(text.starts_with("--frame\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("Content-Length: 8\r\n"));
        assert!(text.ends_with("jpegdata\r\n"));
    }

    #[tokio::test]
    async fn test_video_feed_content_type() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::get("/video_feed").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "multipart/x-mixed-replace; boundary=frame"
        );
    }
}
