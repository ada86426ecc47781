// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Structured logging.
//!
//! Three sinks hang off one `tracing` registry:
//! - console, JSON lines, filtered by `RUST_LOG`
//! - `access.log`, every event with target [`ACCESS_TARGET`]
//! - `error.log`, every ERROR event
//!
//! File writers are non-blocking; a full or failing disk drops lines
//! instead of stalling requests.

use crate::config::{Environment, LogConfig};
use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, info, level_filters::LevelFilter, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{filter::Targets, fmt, prelude::*, EnvFilter, Layer, Registry};

/// Target for access events.
pub const ACCESS_TARGET: &str = "access";

/// Response bodies larger than this are not captured for debug logging.
const DEBUG_BODY_LIMIT: usize = 64 * 1024;
const DEBUG_BODY_PREVIEW: usize = 80;

/// Keeps the file writers flushing; drop on shutdown.
#[must_use]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// A type-erased layer over the base registry.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber.
pub fn init(config: &LogConfig, environment: Environment) -> anyhow::Result<LogGuards> {
    let (layers, guards) = build_layers(config, environment)?;
    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(guards)
}

/// Build the console and file sinks without installing them.
///
/// The guards must outlive every event written to the file sinks; dropping
/// them flushes what is buffered.
pub fn build_layers(
    config: &LogConfig,
    environment: Environment,
) -> anyhow::Result<(Vec<BoxedLayer>, LogGuards)> {
    let default_level = if environment.is_development() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console = fmt::layer().json().with_filter(
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy(),
    );

    let mut layers = vec![console.boxed()];
    let mut guards = Vec::new();
    if config.files {
        std::fs::create_dir_all(&config.dir)?;

        let (access_writer, access_guard) =
            tracing_appender::non_blocking(rolling::never(&config.dir, "access.log"));
        let (error_writer, error_guard) =
            tracing_appender::non_blocking(rolling::never(&config.dir, "error.log"));
        guards.push(access_guard);
        guards.push(error_guard);

        let access = fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(access_writer)
            .with_filter(Targets::new().with_target(ACCESS_TARGET, Level::INFO));
        let errors = fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(error_writer)
            .with_filter(LevelFilter::ERROR);
        layers.push(access.boxed());
        layers.push(errors.boxed());
    }

    Ok((layers, LogGuards { _guards: guards }))
}

/// Options for [`access_log`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog {
    /// Log a truncated copy of JSON response bodies on `/api` paths.
    pub debug_bodies: bool,
}

impl AccessLog {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            debug_bodies: environment.is_development(),
        }
    }
}

/// Best-effort caller address.
pub fn client_ip<B>(request: &axum::http::Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Middleware emitting one access event per request.
pub async fn access_log(State(opts): State<AccessLog>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(&request);

    let mut response = next.run(request).await;

    if opts.debug_bodies && path.starts_with("/api") && is_json(&response) {
        response = log_body_preview(response).await;
    }

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        target: ACCESS_TARGET,
        method = %method,
        path = %path,
        status,
        ip = %ip,
        duration_ms,
        "{method} {path} {status} from {ip} - {duration_ms}ms"
    );

    response
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

async fn log_body_preview(response: Response) -> Response {
    // Bodies of unknown or large size pass through unbuffered.
    let size = response.body().size_hint().upper();
    if !size.is_some_and(|n| n <= DEBUG_BODY_LIMIT as u64) {
        debug!(size = ?size, "Response body not captured");
        return response;
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            debug!(body = %preview(&String::from_utf8_lossy(&bytes)), "Response body");
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            debug!(error = %e, "Response body not captured");
            Response::from_parts(parts, Body::empty())
        }
    }
}

/// First [`DEBUG_BODY_PREVIEW`] characters, with an ellipsis when cut.
fn preview(text: &str) -> String {
    if text.chars().count() > DEBUG_BODY_PREVIEW {
        let mut cut: String = text.chars().take(DEBUG_BODY_PREVIEW - 1).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}
