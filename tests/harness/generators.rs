// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client addresses.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A submission that passes validation.
pub fn valid_payload(i: usize) -> Value {
    json!({
        "name": format!("Visitor {i}"),
        "email": format!("visitor{i}@example.com"),
        "message": format!("Hello, this is enquiry number {i}."),
    })
}

/// Tokens an attacker could produce without the server key.
pub fn forged_tokens() -> Vec<String> {
    let zero_mac = URL_SAFE_NO_PAD.encode([0u8; 32]);
    vec![
        "forged".to_string(),
        ".".to_string(),
        format!("salt.{zero_mac}"),
        format!(".{zero_mac}"),
        "salt.not-base64!".to_string(),
        format!("salt.{}", URL_SAFE_NO_PAD.encode([1u8; 16])),
    ]
}

/// Session cookies that were never issued by the server.
pub fn forged_cookies() -> Vec<String> {
    vec![
        "_csrf=".to_string(),
        format!("_csrf={}", URL_SAFE_NO_PAD.encode([9u8; 18])),
        "_csrf=short".to_string(),
        "other=value".to_string(),
    ]
}
