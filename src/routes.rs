// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Router assembly.

use crate::handlers::{
    csrf_token, health, list_contacts, metrics, panic_response, submit_contact, AppState,
};
use crate::csrf::TOKEN_HEADERS;
use crate::logging::{access_log, AccessLog};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let config = &state.config;

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/csrf-token", get(csrf_token))
        .route("/api/contact", get(list_contacts).post(submit_contact));

    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(metrics));
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let mut app = app
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http());

    if !origins.is_empty() {
        let mut allow_headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
        allow_headers.extend(TOKEN_HEADERS.map(HeaderName::from_static));

        app = app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(allow_headers)
                .allow_credentials(true),
        );
    }

    app.layer(middleware::from_fn_with_state(
        AccessLog::for_environment(config.environment),
        access_log,
    ))
    .with_state(state)
}
