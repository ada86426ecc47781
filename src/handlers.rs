// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact service.
//!
//! `POST /api/contact` runs a fixed sequence and stops at the first
//! failure: CSRF check, rate limit, schema validation, insert.

use crate::config::Config;
use crate::csrf::{self, CsrfGuard};
use crate::db::Database;
use crate::error::{AppError, ErrorResponse, INTERNAL_ERROR_MESSAGE};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::logging::ACCESS_TARGET;
use crate::metrics::Metrics;
use crate::models::ContactMessage;
use crate::schema;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub limiter: RateLimiter,
    pub csrf: CsrfGuard,
    pub metrics: Metrics,
}

impl AppState {
    /// Wire up state around an already-open database.
    pub fn new(config: Config, db: Database) -> anyhow::Result<Self> {
        let csrf = CsrfGuard::from_config(&config.csrf)?;
        let metrics = Metrics::new()?;
        let limiter = RateLimiter::new(config.rate_limit.clone());
        Ok(Self {
            config,
            db,
            limiter,
            csrf,
            metrics,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub data: ContactMessage,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<ContactMessage>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Issue an anti-forgery token, starting a session when needed.
pub async fn csrf_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        if !csrf::is_allowed_origin(origin, host, &state.config.allowed_origins) {
            warn!(target: ACCESS_TARGET, origin, "Refused cross-origin token request");
            return Err(AppError::ForbiddenOrigin);
        }
    }

    let existing = csrf::cookie_value(&headers, csrf::COOKIE_NAME);
    let issued = state.csrf.issue(existing.as_deref());
    state.metrics.record_token_issued();

    let mut response = Json(CsrfTokenResponse {
        csrf_token: issued.token,
    })
    .into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Some(secret) = issued.new_secret {
        response_headers.append(header::SET_COOKIE, state.csrf.session_cookie(&secret));
    }

    Ok(response)
}

/// Remaining quota, echoed as `RateLimit-*` headers.
#[derive(Debug, Clone, Copy)]
struct Quota {
    limit: u32,
    remaining: u32,
    reset_in: Duration,
}

impl Quota {
    fn apply(self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        headers.insert("ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert(
            "ratelimit-reset",
            HeaderValue::from(self.reset_in.as_secs().max(1)),
        );
        response
    }
}

/// Accept a contact form submission.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = addr.ip();

    if let Err(reason) = state.csrf.verify_request(&headers) {
        warn!(
            target: ACCESS_TARGET,
            ip = %ip,
            reason = %reason,
            "Rejected contact submission with invalid CSRF token"
        );
        return reject(&state, AppError::InvalidToken(reason));
    }

    let limit = state.limiter.config().max_requests;
    let quota = match state.limiter.check(ip).await {
        RateLimitResult::Allowed {
            remaining,
            reset_in,
        } => Quota {
            limit,
            remaining,
            reset_in,
        },
        RateLimitResult::Limited { retry_after } => {
            info!(
                ip = %ip,
                retry_after_secs = retry_after.as_secs(),
                "Contact submission rate limited"
            );
            let err = AppError::RateLimited {
                retry_after,
                message: state.limiter.config().limited_message(),
            };
            let quota = Quota {
                limit,
                remaining: 0,
                reset_in: retry_after,
            };
            return quota.apply(reject(&state, err));
        }
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let submission = match schema::validate(content_type, &body) {
        Ok(submission) => submission,
        Err(errors) => {
            debug!(ip = %ip, errors = %errors, "Contact submission failed validation");
            return quota.apply(reject(&state, AppError::ValidationFailed(errors)));
        }
    };

    match state.db.create(&submission).await {
        Ok(saved) => {
            state.metrics.record_submission("created");
            info!(id = saved.id, ip = %ip, "Stored contact message");
            quota.apply(
                (
                    StatusCode::CREATED,
                    Json(SubmissionResponse {
                        success: true,
                        data: saved,
                    }),
                )
                    .into_response(),
            )
        }
        Err(err) => {
            error!(
                method = %method,
                path = %uri.path(),
                body = %String::from_utf8_lossy(&body),
                headers = ?redacted_headers(&headers),
                ip = %ip,
                error = %err,
                "Failed to store contact message"
            );
            quota.apply(reject(&state, err))
        }
    }
}

/// List stored messages, newest first. Requires the admin bearer token.
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, AppError> {
    authorize_admin(&state.config, &headers)?;

    let data = state.db.list().await.map_err(|err| {
        error!(error = %err, "Failed to retrieve contact messages");
        err
    })?;

    Ok(Json(ListResponse {
        success: true,
        data,
    }))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            AppError::Internal(err.to_string()).into_response()
        }
    }
}

/// Response for a handler that panicked.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(
        panic = %detail,
        backtrace = %std::backtrace::Backtrace::force_capture(),
        "Unhandled error in request handler"
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            message: Some(INTERNAL_ERROR_MESSAGE.to_string()),
            errors: None,
            code: None,
        }),
    )
        .into_response()
}

fn reject(state: &AppState, err: AppError) -> Response {
    state.metrics.record_submission(err.outcome());
    err.into_response()
}

fn authorize_admin(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Err(AppError::ListingDisabled);
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    // Compare digests so the check does not leak a matching prefix.
    if blake3::hash(presented.as_bytes()) == blake3::hash(expected.as_bytes()) {
        Ok(())
    } else {
        warn!(target: ACCESS_TARGET, "Rejected listing request with bad admin token");
        Err(AppError::Unauthorized)
    }
}

const REDACTED_HEADERS: [&str; 6] = [
    "authorization",
    "cookie",
    "x-csrf-token",
    "csrf-token",
    "x-xsrf-token",
    "proxy-authorization",
];

/// Header list for error logs, with credentials masked.
fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if REDACTED_HEADERS.contains(&name.as_str()) {
                "[redacted]".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}
