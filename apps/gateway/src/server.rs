//! The axum router and the `/Microsoft-Server-ActiveSync` handler (§6).

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{options, post};
use axum::Router;

use eas_sync::AuthService;

use crate::auth::parse_basic_auth;
use crate::error::GatewayError;
use crate::AppState;

const PROTOCOL_VERSIONS_HEADER_VALUE: &str = "12.1,14.0,14.1,16.0,16.1";
const PROTOCOL_COMMANDS_HEADER_VALUE: &str = "Sync,FolderSync,FolderCreate,FolderDelete,\
FolderUpdate,GetItemEstimate,Ping,Provision,Options,Settings,ItemOperations,SendMail,\
SmartForward,SmartReply,MoveItems,MeetingResponse,Search,Find,GetAttachment,\
ResolveRecipients,ValidateCert";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/Microsoft-Server-ActiveSync",
            post(handle_post).options(handle_options),
        )
        .with_state(state)
}

async fn handle_options() -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_protocol_headers(response.headers_mut(), None, "0");
    response
}

async fn handle_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_post_inner(state, params, headers, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle_post_inner(
    state: Arc<AppState>,
    params: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::MissingCredentials)?;
    let credentials = parse_basic_auth(auth_header).ok_or(GatewayError::MissingCredentials)?;
    let user = state
        .auth
        .authenticate(&credentials.username, &credentials.password)
        .await
        .map_err(|e| GatewayError::AuthFailed(e.to_string()))?;

    let cmd = params
        .get("Cmd")
        .ok_or_else(|| GatewayError::MissingQueryParam("Cmd".to_string()))?;
    let device_id = params
        .get("DeviceId")
        .ok_or_else(|| GatewayError::MissingQueryParam("DeviceId".to_string()))?;
    let device_type = params
        .get("DeviceType")
        .map(String::as_str)
        .unwrap_or("Unknown");

    let requested_version = headers
        .get("MS-ASProtocolVersion")
        .and_then(|v| v.to_str().ok());

    let body = if body.is_empty() { None } else { Some(body.as_ref()) };

    let dispatched = state
        .dispatcher
        .dispatch(cmd, &user.user_id, device_id, device_type, requested_version, body)
        .await?;

    let mut response = (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "application/vnd.ms-sync.wbxml",
        )],
        dispatched.wbxml,
    )
        .into_response();

    let policy_key = state
        .dispatcher
        .db
        .devices()
        .load(&user.user_id, device_id)
        .await
        .ok()
        .flatten()
        .map(|d| d.policy_key)
        .unwrap_or_else(|| "0".to_string());

    apply_protocol_headers(
        response.headers_mut(),
        Some(dispatched.negotiated_protocol_version),
        &policy_key,
    );

    Ok(response)
}

fn apply_protocol_headers(headers: &mut HeaderMap, negotiated: Option<&str>, policy_key: &str) {
    headers.insert(
        HeaderName::from_static("ms-server-activesync"),
        HeaderValue::from_static("16.1"),
    );
    if let Some(version) = negotiated {
        if let Ok(value) = HeaderValue::from_str(version) {
            headers.insert(HeaderName::from_static("ms-asprotocolversion"), value);
        }
    }
    headers.insert(
        HeaderName::from_static("ms-asprotocolversions"),
        HeaderValue::from_static(PROTOCOL_VERSIONS_HEADER_VALUE),
    );
    headers.insert(
        HeaderName::from_static("ms-asprotocolcommands"),
        HeaderValue::from_static(PROTOCOL_COMMANDS_HEADER_VALUE),
    );
    if let Ok(value) = HeaderValue::from_str(policy_key) {
        headers.insert(HeaderName::from_static("x-ms-policykey"), value);
    }
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache"),
    );
    headers.insert(
        HeaderName::from_static("pragma"),
        HeaderValue::from_static("no-cache"),
    );
}
