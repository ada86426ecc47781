// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the contact API.
//!
//! Builds a router over an in-memory database and drives it with
//! `tower::ServiceExt::oneshot`, attaching a client address the way the
//! real server's connect-info layer does.

#![allow(dead_code)]

pub mod generators;
pub mod metrics;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request},
    response::Response,
    Router,
};
use contact_api::{
    config::{Config, CsrfConfig, LogConfig},
    db::Database,
    handlers::AppState,
    routes,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

/// Bearer token configured on test apps.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Fixed server key so tokens are reproducible across a test.
pub const CSRF_KEY_HEX: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

/// A browser session: the cookie pair and a token issued for it.
#[derive(Debug, Clone)]
pub struct Session {
    /// `Cookie` header value, e.g. `_csrf=...`
    pub cookie: String,
    /// Token for the `x-csrf-token` header; empty sends none
    pub token: String,
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_admin(Some(ADMIN_TOKEN)).await
    }

    pub async fn with_admin(admin_token: Option<&str>) -> Self {
        Self::with_config(test_config(admin_token)).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::connect(&config.database_url).await.unwrap();
        let state = Arc::new(AppState::new(config, db).unwrap());
        Self {
            router: routes::router(state.clone()),
            state,
        }
    }

    /// Start a session by fetching a token with no cookie.
    pub async fn session(&self) -> Session {
        let response = self
            .router
            .clone()
            .oneshot(Request::get("/api/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        Session {
            cookie,
            token: json["csrfToken"].as_str().unwrap().to_string(),
        }
    }

    pub async fn post(&self, session: &Session, ip: &str, payload: Value) -> Response {
        self.post_raw(session, ip, Some("application/json"), &payload.to_string())
            .await
    }

    pub async fn post_raw(
        &self,
        session: &Session,
        ip: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> Response {
        let mut builder = Request::post("/api/contact");
        if !session.cookie.is_empty() {
            builder = builder.header(header::COOKIE, &session.cookie);
        }
        if !session.token.is_empty() {
            builder = builder.header("x-csrf-token", &session.token);
        }
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }

        let mut request = builder.body(Body::from(body.to_string())).unwrap();
        request.extensions_mut().insert(ConnectInfo(socket(ip)));
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn list(&self, bearer: Option<&str>) -> Response {
        let mut builder = Request::get("/api/contact");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub fn test_config(admin_token: Option<&str>) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        csrf: CsrfConfig {
            secret_hex: Some(CSRF_KEY_HEX.to_string()),
            cookie_secure: false,
        },
        logging: LogConfig {
            files: false,
            ..Default::default()
        },
        admin_token: admin_token.map(str::to_string),
        ..Default::default()
    }
}

pub fn socket(ip: &str) -> SocketAddr {
    SocketAddr::new(ip.parse().unwrap(), 40000)
}
