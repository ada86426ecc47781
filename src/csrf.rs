// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Double-submit CSRF protection.
//!
//! A session secret lives in an HTTP-only cookie. Tokens handed to the page
//! are `<salt>.<mac>`, where `mac` is a BLAKE3 keyed hash over the secret
//! and a fresh salt under the server key. A mutating request must carry
//! both the cookie and a token whose MAC checks out against it.
//!
//! Any number of tokens may be issued per session; all stay valid for as
//! long as the session secret does.

use crate::config::CsrfConfig;
use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "_csrf";

/// Headers a client may present the token in, in lookup order.
pub const TOKEN_HEADERS: [&str; 3] = ["x-csrf-token", "csrf-token", "x-xsrf-token"];

const SECRET_LEN: usize = 18;
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;

/// Why a request failed CSRF verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    #[error("missing CSRF session cookie")]
    MissingCookie,

    #[error("missing CSRF token")]
    MissingToken,

    #[error("malformed CSRF token")]
    Malformed,

    #[error("CSRF token does not match session")]
    Mismatch,
}

/// Failure to build the guard from configuration.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("CSRF secret is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("CSRF secret must be 32 bytes, got {0}")]
    Length(usize),
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Set when the request had no usable session and a new one was minted.
    pub new_secret: Option<String>,
}

/// Issues and verifies anti-forgery tokens.
pub struct CsrfGuard {
    key: [u8; KEY_LEN],
    cookie_secure: bool,
}

impl CsrfGuard {
    /// Build a guard from configuration, generating a key when none is set.
    pub fn from_config(config: &CsrfConfig) -> Result<Self, KeyError> {
        let key = match &config.secret_hex {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key.trim())?;
                let len = bytes.len();
                <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| KeyError::Length(len))?
            }
            None => {
                warn!(
                    "CSRF_SECRET not set; generated a per-process key, \
                     tokens will not survive restarts"
                );
                random_bytes::<KEY_LEN>()
            }
        };
        Ok(Self::new(key, config.cookie_secure))
    }

    pub fn new(key: [u8; KEY_LEN], cookie_secure: bool) -> Self {
        Self { key, cookie_secure }
    }

    /// Issue a token for the session identified by `existing` (the current
    /// cookie value, if any). A missing or malformed secret is replaced.
    pub fn issue(&self, existing: Option<&str>) -> IssuedToken {
        let (secret, new_secret) = match existing.filter(|s| is_well_formed_secret(s)) {
            Some(secret) => (secret.to_string(), None),
            None => {
                let secret = URL_SAFE_NO_PAD.encode(random_bytes::<SECRET_LEN>());
                debug!("Minted new CSRF session secret");
                (secret.clone(), Some(secret))
            }
        };

        let salt = URL_SAFE_NO_PAD.encode(random_bytes::<SALT_LEN>());
        let mac = self.mac(&secret, &salt);
        IssuedToken {
            token: format!("{salt}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes())),
            new_secret,
        }
    }

    /// Verify `token` against the session `secret`.
    pub fn verify(&self, secret: Option<&str>, token: Option<&str>) -> Result<(), CsrfError> {
        let secret = secret.filter(|s| !s.is_empty()).ok_or(CsrfError::MissingCookie)?;
        let token = token.filter(|t| !t.is_empty()).ok_or(CsrfError::MissingToken)?;

        let (salt, mac_b64) = token.split_once('.').ok_or(CsrfError::Malformed)?;
        if salt.is_empty() {
            return Err(CsrfError::Malformed);
        }
        let presented: [u8; blake3::OUT_LEN] = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(CsrfError::Malformed)?;

        // blake3::Hash equality is constant-time.
        if blake3::Hash::from(presented) == self.mac(secret, salt) {
            Ok(())
        } else {
            Err(CsrfError::Mismatch)
        }
    }

    /// Verify a request using its cookie and token headers.
    pub fn verify_request(&self, headers: &HeaderMap) -> Result<(), CsrfError> {
        let secret = cookie_value(headers, COOKIE_NAME);
        self.verify(secret.as_deref(), token_from_headers(headers))
    }

    /// `Set-Cookie` value carrying a session secret.
    pub fn session_cookie(&self, secret: &str) -> HeaderValue {
        let mut cookie = format!("{COOKIE_NAME}={secret}; Path=/; HttpOnly; SameSite=Strict");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        // Secrets are base64url, always a valid header value.
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    fn mac(&self, secret: &str, salt: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(salt.as_bytes());
        hasher.update(b".");
        hasher.update(secret.as_bytes());
        hasher.finalize()
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

fn is_well_formed_secret(secret: &str) -> bool {
    URL_SAFE_NO_PAD
        .decode(secret)
        .map(|bytes| bytes.len() == SECRET_LEN)
        .unwrap_or(false)
}

/// First token header present on the request.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    TOKEN_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Look up a cookie by name across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
}

/// Whether `origin` may fetch a token from a server reached as `host`.
///
/// Same-origin means the Origin's `host[:port]` equals the Host header.
/// Configured `allowed` origins are compared by their serialized origin.
pub fn is_allowed_origin(origin: &str, host: Option<&str>, allowed: &[String]) -> bool {
    let Ok(url) = url::Url::parse(origin) else {
        return false;
    };
    let serialized = url.origin().ascii_serialization();
    if allowed.iter().any(|a| a.trim_end_matches('/') == serialized) {
        return true;
    }

    let Some(origin_host) = url.host_str() else {
        return false;
    };
    let origin_authority = match url.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    host.is_some_and(|h| h.eq_ignore_ascii_case(&origin_authority))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CsrfGuard {
        CsrfGuard::new([7u8; KEY_LEN], false)
    }

    #[test]
    fn test_issue_then_verify() {
        let guard = guard();
        let issued = guard.issue(None);
        let secret = issued.new_secret.clone().expect("new session");

        assert!(guard.verify(Some(&secret), Some(&issued.token)).is_ok());
    }

    #[test]
    fn test_repeated_issue_keeps_prior_tokens_valid() {
        let guard = guard();
        let first = guard.issue(None);
        let secret = first.new_secret.clone().unwrap();

        let tokens: Vec<String> = (0..5)
            .map(|_| guard.issue(Some(&secret)))
            .map(|t| {
                assert!(t.new_secret.is_none(), "existing session must be reused");
                t.token
            })
            .collect();

        assert!(guard.verify(Some(&secret), Some(&first.token)).is_ok());
        for token in &tokens {
            assert!(guard.verify(Some(&secret), Some(token)).is_ok());
            assert_ne!(token, &first.token);
        }
    }

    #[test]
    fn test_tokens_are_bound_to_session() {
        let guard = guard();
        let a = guard.issue(None);
        let b = guard.issue(None);
        let secret_b = b.new_secret.unwrap();

        assert_eq!(
            guard.verify(Some(&secret_b), Some(&a.token)),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn test_tokens_are_bound_to_server_key() {
        let issued = guard().issue(None);
        let other = CsrfGuard::new([8u8; KEY_LEN], false);
        assert_eq!(
            other.verify(issued.new_secret.as_deref(), Some(&issued.token)),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn test_missing_and_malformed() {
        let guard = guard();
        let issued = guard.issue(None);
        let secret = issued.new_secret.unwrap();

        assert_eq!(guard.verify(None, Some(&issued.token)), Err(CsrfError::MissingCookie));
        assert_eq!(guard.verify(Some(&secret), None), Err(CsrfError::MissingToken));
        assert_eq!(guard.verify(Some(&secret), Some("")), Err(CsrfError::MissingToken));
        assert_eq!(guard.verify(Some(&secret), Some("no-dot")), Err(CsrfError::Malformed));
        assert_eq!(guard.verify(Some(&secret), Some("salt.!!!")), Err(CsrfError::Malformed));
        assert_eq!(guard.verify(Some(&secret), Some("salt.AAAA")), Err(CsrfError::Malformed));
        assert_eq!(guard.verify(Some(&secret), Some(&secret)), Err(CsrfError::Malformed));
    }

    #[test]
    fn test_malformed_cookie_replaced_on_issue() {
        let issued = guard().issue(Some("tampered"));
        assert!(issued.new_secret.is_some());
    }

    #[test]
    fn test_key_from_config() {
        let ok = CsrfConfig {
            secret_hex: Some("ab".repeat(32)),
            cookie_secure: true,
        };
        assert!(CsrfGuard::from_config(&ok).is_ok());

        let short = CsrfConfig {
            secret_hex: Some("abcd".into()),
            cookie_secure: false,
        };
        assert!(matches!(CsrfGuard::from_config(&short), Err(KeyError::Length(2))));

        let bad = CsrfConfig {
            secret_hex: Some("zz".repeat(32)),
            cookie_secure: false,
        };
        assert!(matches!(CsrfGuard::from_config(&bad), Err(KeyError::Hex(_))));
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; _csrf=abc123"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, COOKIE_NAME).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "other").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = CsrfGuard::new([0u8; KEY_LEN], true).session_cookie("abc");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("_csrf=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_token_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("x-xsrf-token", HeaderValue::from_static("third"));
        assert_eq!(token_from_headers(&headers), Some("third"));
        headers.insert("x-csrf-token", HeaderValue::from_static("first"));
        assert_eq!(token_from_headers(&headers), Some("first"));
    }

    #[test]
    fn test_origin_checks() {
        let allowed = vec!["https://studio.example".to_string()];
        assert!(is_allowed_origin("http://localhost:5000", Some("localhost:5000"), &[]));
        assert!(is_allowed_origin("https://studio.example", Some("api.internal"), &allowed));
        assert!(!is_allowed_origin("https://evil.example", Some("localhost:5000"), &allowed));
        assert!(!is_allowed_origin("http://localhost:5001", Some("localhost:5000"), &[]));
        assert!(!is_allowed_origin("null", Some("localhost:5000"), &[]));
    }
}
