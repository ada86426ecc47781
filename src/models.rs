// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact message records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

/// A validated submission, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewContactMessage {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,

    #[validate(custom(
        function = "validate_email_address",
        message = "Please enter a valid email address."
    ))]
    pub email: String,

    #[validate(length(min = 10, message = "Message must be at least 10 characters."))]
    pub message: String,
}

/// A stored contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Address syntax plus a dotted domain ending in an alphabetic TLD of two
/// or more letters, so `jo@localhost` and `jo@x` are refused.
fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    let dotted_domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .and_then(|domain| domain.rsplit_once('.'))
        .is_some_and(|(host, tld)| {
            !host.is_empty()
                && !host.split('.').any(str::is_empty)
                && tld.len() >= 2
                && tld.chars().all(|c| c.is_ascii_alphabetic())
        });

    if dotted_domain && email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// Fixed-width RFC 3339 rendering, so stored timestamps sort lexically.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
