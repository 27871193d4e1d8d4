//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tdc_licensing::{Issuance, IssuanceStats, LicenseRecord, LicensingError, SaleEvent, SalePayload};

use crate::state::AppState;

/// Records returned by `/admin/stats`
const RECENT_LIMIT: usize = 10;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub email_configured: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Serialize)]
pub struct Endpoints {
    pub webhook: &'static str,
    pub health: &'static str,
    pub verify: &'static str,
    pub stats: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub success: bool,
    pub license_key: String,
    pub email_sent: bool,
    pub message: String,
}

impl From<Issuance> for IssueResponse {
    fn from(issuance: Issuance) -> Self {
        let message = if issuance.email_sent {
            "License generated and email sent successfully"
        } else {
            "License generated but the email could not be sent"
        };

        Self {
            success: true,
            license_key: issuance.license_key,
            email_sent: issuance.email_sent,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ManualIssueRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyLicenseResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn storage_error(e: &LicensingError) -> ApiError {
    tracing::error!(retryable = e.is_retryable(), "License store error: {}", e);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORAGE_ERROR",
        e.user_message(),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        email_configured: state.email_configured,
    })
}

/// Service description
pub async fn api_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "Tu Dinero Claro - Webhook Server",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            webhook: "/webhook/gumroad",
            health: "/health",
            verify: "/api/license/verify",
            stats: "/admin/stats",
        },
    })
}

/// Gumroad sale ping. Form-encoded or JSON.
pub async fn gumroad_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<IssueResponse>, ApiError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let payload = if is_json {
        Json::<SalePayload>::from_request(request, &state)
            .await
            .map(|Json(p)| p)
            .map_err(|e| e.body_text())
    } else {
        Form::<SalePayload>::from_request(request, &state)
            .await
            .map(|Form(p)| p)
            .map_err(|e| e.body_text())
    }
    .map_err(|reason| {
        tracing::warn!(reason = %reason, "Unreadable webhook body");
        api_error(StatusCode::BAD_REQUEST, "INVALID_WEBHOOK", "Invalid webhook data")
    })?;

    tracing::debug!(payload = ?payload, "Webhook received");

    let sale = SaleEvent::from_payload(payload, state.issuer.product_name()).map_err(|e| {
        tracing::warn!("Webhook rejected: {}", e);
        api_error(StatusCode::BAD_REQUEST, "INVALID_WEBHOOK", e.user_message())
    })?;

    let issuance = state.issuer.issue_for_sale(sale).await;

    Ok(Json(IssueResponse::from(issuance)))
}

/// Check a license code the way the browser app does.
///
/// Always answers 200. Anything that is not a JSON object with a string
/// `license_key` is simply not valid.
pub async fn verify_license(State(state): State<AppState>, body: Bytes) -> Json<VerifyLicenseResponse> {
    let candidate = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("license_key").and_then(|k| k.as_str()).map(str::to_owned))
        .map(|k| k.trim().to_uppercase());

    let Some(candidate) = candidate else {
        return Json(VerifyLicenseResponse {
            valid: false,
            license_key: None,
            error: Some("license_key must be a string".into()),
        });
    };

    match state.issuer.codec().parse(&candidate) {
        Ok(code) => Json(VerifyLicenseResponse {
            valid: true,
            license_key: Some(code.into_string()),
            error: None,
        }),
        Err(reason) => Json(VerifyLicenseResponse {
            valid: false,
            license_key: None,
            error: Some(reason.to_string()),
        }),
    }
}

/// Issuance totals and the most recent records
pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<IssuanceStats>, ApiError> {
    state
        .store
        .stats(RECENT_LIMIT)
        .await
        .map(Json)
        .map_err(|e| storage_error(&e))
}

/// Every issued record, newest first
pub async fn admin_licenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseRecord>>, ApiError> {
    state
        .store
        .list()
        .await
        .map(Json)
        .map_err(|e| storage_error(&e))
}

/// Issue a license by hand
pub async fn admin_generate(
    State(state): State<AppState>,
    Json(payload): Json<ManualIssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    let email = payload.email.unwrap_or_default();

    let issuance = state
        .issuer
        .issue_manual(&email, payload.name.as_deref())
        .await
        .map_err(|e| match e {
            LicensingError::InvalidRequest(_) => {
                api_error(StatusCode::BAD_REQUEST, "EMAIL_REQUIRED", "Email requerido")
            }
            other => storage_error(&other),
        })?;

    Ok(Json(IssueResponse::from(issuance)))
}

/// Reject admin requests without the configured bearer token
pub async fn require_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Admin token required").into_response()
    }
}
