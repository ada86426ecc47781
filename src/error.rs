// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact service.
//!
//! Every failure reaching the HTTP boundary becomes one of the fixed
//! response bodies below. Storage and internal detail stays in the logs.

use crate::csrf::CsrfError;
use crate::schema::FieldErrors;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Generic body for server-side failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("Invalid CSRF token: {0}")]
    InvalidToken(CsrfError),

    #[error("Cross-origin token request refused")]
    ForbiddenOrigin,

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Listing disabled")]
    ListingDisabled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// `{ success: false, ... }` envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ErrorResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            errors: None,
            code: None,
        }
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken(_) | Self::ForbiddenOrigin | Self::ListingDisabled => {
                StatusCode::FORBIDDEN
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the submissions metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidToken(_) | Self::ForbiddenOrigin => "invalid_token",
            Self::RateLimited { .. } => "rate_limited",
            Self::Storage(_) => "storage_error",
            Self::Unauthorized | Self::ListingDisabled => "unauthorized",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::ValidationFailed(errors) => (
                status,
                Json(ErrorResponse {
                    success: false,
                    message: None,
                    errors: Some(errors),
                    code: None,
                }),
            )
                .into_response(),
            Self::InvalidToken(_) => (
                status,
                Json(ErrorResponse::message("Invalid CSRF token").with_code("INVALID_TOKEN")),
            )
                .into_response(),
            Self::ForbiddenOrigin => (
                status,
                Json(
                    ErrorResponse::message("Cross-origin request refused")
                        .with_code("FORBIDDEN_ORIGIN"),
                ),
            )
                .into_response(),
            Self::RateLimited {
                retry_after,
                message,
            } => {
                let mut response =
                    (status, Json(ErrorResponse::message(message))).into_response();
                let secs = retry_after.as_secs().max(1);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            Self::Unauthorized => {
                let mut response = (
                    status,
                    Json(ErrorResponse::message("Unauthorized").with_code("UNAUTHORIZED")),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            Self::ListingDisabled => (
                status,
                Json(
                    ErrorResponse::message("Listing is disabled").with_code("LISTING_DISABLED"),
                ),
            )
                .into_response(),
            Self::Storage(_) | Self::Internal(_) => {
                (status, Json(ErrorResponse::message(INTERNAL_ERROR_MESSAGE))).into_response()
            }
        }
    }
}
