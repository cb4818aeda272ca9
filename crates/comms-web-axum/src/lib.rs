//! Axum adapter for the commskit gateway.
//!
//! Exposes `POST /sendEmail`, `POST /sendSms`, `POST /sendWhatsAppMessage`,
//! `GET /health`, and `GET /openapi.json` when the OpenAPI document is enabled.

pub mod openapi;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use comms_core::DispatchResponse;
use comms_web_generic::Dispatcher;
use serde::Serialize;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Serve `/openapi.json`. Disabled in production.
    pub expose_openapi: bool,
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl AxumResponseConverter {
    pub fn from_dispatch_response(response: DispatchResponse) -> Response {
        let status = StatusCode::from_u16(response.status.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut res = (status, response.body).into_response();
        let headers = res.headers_mut();
        if let Ok(v) = HeaderValue::from_str(&response.content_type) {
            headers.insert(header::CONTENT_TYPE, v);
        }
        for (name, value) in response.headers {
            // Provider ids are plain ASCII; anything else is dropped.
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                headers.insert(name, value);
            }
        }
        res
    }
}

/// POST /sendEmail
#[utoipa::path(
    post,
    path = "/sendEmail",
    tag = "messaging",
    request_body = comms_web_generic::EmailRequest,
    responses(
        (status = 200, description = "Email sent successfully", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Provider call failed")
    )
)]
pub async fn send_email(State(state): State<AppState>, body: Bytes) -> Response {
    AxumResponseConverter::from_dispatch_response(state.dispatcher.send_email(&body).await)
}

/// POST /sendSms
#[utoipa::path(
    post,
    path = "/sendSms",
    tag = "messaging",
    request_body = comms_web_generic::SmsRequest,
    responses(
        (status = 200, description = "SMS sent successfully", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Provider call failed"),
        (status = 502, description = "Recipient rejected (strict delivery status only)")
    )
)]
pub async fn send_sms(State(state): State<AppState>, body: Bytes) -> Response {
    AxumResponseConverter::from_dispatch_response(state.dispatcher.send_sms(&body).await)
}

/// POST /sendWhatsAppMessage
#[utoipa::path(
    post,
    path = "/sendWhatsAppMessage",
    tag = "messaging",
    request_body = comms_web_generic::WhatsAppRequest,
    responses(
        (status = 200, description = "WhatsApp sent successfully", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Provider call failed")
    )
)]
pub async fn send_whatsapp_message(State(state): State<AppState>, body: Bytes) -> Response {
    AxumResponseConverter::from_dispatch_response(state.dispatcher.send_whatsapp(&body).await)
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Gateway is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn openapi_json() -> impl IntoResponse {
    Json(openapi::ApiDoc::openapi())
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/sendEmail", post(send_email))
        .route("/sendSms", post(send_sms))
        .route("/sendWhatsAppMessage", post(send_whatsapp_message))
        .route("/health", get(health));
    if state.expose_openapi {
        app = app.route("/openapi.json", get(openapi_json));
    }
    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use comms_core::{DELIVERY_SUCCESSFUL_HEADER, HttpStatus, MESSAGE_ID_HEADER};
    use comms_web_generic::testing::{RecordingClient, test_senders};
    use tower::ServiceExt;

    use super::*;

    fn app(client: &Arc<RecordingClient>, expose_openapi: bool) -> Router {
        router(AppState {
            dispatcher: Dispatcher::new(client.channels(), test_senders()),
            expose_openapi,
        })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn converter_copies_status_and_headers() {
        let res = AxumResponseConverter::from_dispatch_response(DispatchResponse::success(
            "ok",
            vec![
                (MESSAGE_ID_HEADER.to_string(), "abc".to_string()),
                ("bad header".to_string(), "x".to_string()),
            ],
        ));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[MESSAGE_ID_HEADER], "abc");
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(res.headers().values().all(|v| v != "x"));
    }

    #[test]
    fn converter_maps_error_status() {
        let res = AxumResponseConverter::from_dispatch_response(DispatchResponse::error(
            HttpStatus::BadGateway,
            "rejected",
        ));
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn send_sms_returns_confirmation_and_ids() {
        let client = Arc::new(RecordingClient::new());
        let res = app(&client, false)
            .oneshot(post_json(
                "/sendSms",
                r#"{"phoneNumber":"+14255550123","message":"hi"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[MESSAGE_ID_HEADER], "msg-1");
        assert_eq!(res.headers()[DELIVERY_SUCCESSFUL_HEADER], "true");
        assert_eq!(body_string(res).await, "SMS sent successfully");
    }

    #[tokio::test]
    async fn body_without_content_type_is_still_decoded() {
        let client = Arc::new(RecordingClient::new());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/sendEmail")
            .body(Body::from(
                r#"{"recipient":"a@b.c","subject":"s","htmlContent":"h"}"#,
            ))
            .unwrap();
        let res = app(&client, false).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "Email sent successfully");
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let client = Arc::new(RecordingClient::new());
        let res = app(&client, false)
            .oneshot(post_json("/sendWhatsAppMessage", "{\"phoneNumber\":"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("malformed request"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn get_on_send_route_is_not_allowed() {
        let client = Arc::new(RecordingClient::new());
        let req = Request::builder()
            .uri("/sendSms")
            .body(Body::empty())
            .unwrap();
        let res = app(&client, false).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let client = Arc::new(RecordingClient::new());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let res = app(&client, false).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn openapi_document_is_only_served_when_enabled() {
        let client = Arc::new(RecordingClient::new());
        let req = || {
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap()
        };

        let res = app(&client, true).oneshot(req()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert!(doc["paths"]["/sendWhatsAppMessage"]["post"].is_object());

        let res = app(&client, false).oneshot(req()).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
