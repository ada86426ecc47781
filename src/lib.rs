// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact API
//!
//! Backend for the studio website's contact form:
//!
//! - CSRF-protected `POST /api/contact` (double-submit cookie + header)
//! - Per-IP sliding-window rate limiting (5 per 15 minutes default)
//! - Field-level validation of name, email and message
//! - Append-only SQLite storage with a newest-first admin listing
//! - Structured access and error logs

pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod schema;

pub use config::Config;
pub use db::Database;
pub use error::{AppError, Result};
pub use handlers::AppState;
pub use limiter::{RateLimitResult, RateLimiter};
pub use routes::router;
