// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission schema.
//!
//! Turns a raw request body into a [`NewContactMessage`] or a
//! [`FieldErrors`] listing every field that failed. The per-field rules live
//! on [`NewContactMessage`] itself (see `models.rs`); this module adds the
//! envelope checks around them:
//! - Content-Type must be `application/json`
//! - body must be a JSON object
//! - each field must be present and a string

use crate::models::NewContactMessage;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use validator::Validate;

/// Accepted request media type.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Fields of a submission, in form order.
pub const FIELDS: [&str; 3] = ["name", "email", "message"];

/// Validation failures, grouped by field.
///
/// Serializes as `{"_errors": [...], "<field>": {"_errors": [...]}}`, the
/// shape the site's form code already knows how to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    form: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error that is not tied to a single field.
    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }

    /// Form-level errors.
    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    /// Errors recorded against `field`.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Names of all failing fields.
    pub fn failed_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form.clone();
        for (field, messages) in &self.fields {
            parts.push(format!("{field}: {}", messages.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Nested<'a> {
            _errors: &'a [String],
        }

        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("_errors", &self.form)?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, &Nested { _errors: messages })?;
        }
        map.end()
    }
}

/// Check that `content_type` names JSON, ignoring parameters and case.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_ascii_lowercase())
        .is_some_and(|media| media == CONTENT_TYPE_JSON)
}

/// Validate a raw request body.
pub fn validate(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<NewContactMessage, FieldErrors> {
    let mut errors = FieldErrors::new();

    if !is_json_content_type(content_type) {
        debug!(content_type = ?content_type, "Rejected non-JSON submission");
        errors.add_form(format!("Content-Type must be {CONTENT_TYPE_JSON}"));
        return Err(errors);
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Malformed JSON body");
            errors.add_form("Malformed JSON body");
            return Err(errors);
        }
    };

    match value {
        Value::Object(map) => validate_object(&map),
        other => {
            errors.add_form(format!("Expected object, received {}", type_name(&other)));
            Err(errors)
        }
    }
}

/// Validate an already-parsed JSON object. Unknown keys are ignored.
pub fn validate_object(map: &Map<String, Value>) -> Result<NewContactMessage, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut typed = |field: &str| match map.get(field) {
        None => {
            errors.add(field, "Required");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.add(field, format!("Expected string, received {}", type_name(other)));
            None
        }
    };

    let name = typed("name");
    let email = typed("email");
    let message = typed("message");

    // Fields that failed the type check keep only that error; rule checks
    // run on whatever strings were supplied.
    let candidate = NewContactMessage {
        name: name.clone().unwrap_or_default(),
        email: email.clone().unwrap_or_default(),
        message: message.clone().unwrap_or_default(),
    };
    let present = [
        ("name", name.is_some()),
        ("email", email.is_some()),
        ("message", message.is_some()),
    ];

    if let Err(rule_errors) = candidate.validate() {
        for (field, failures) in rule_errors.field_errors() {
            let field = field.to_string();
            let supplied = present.iter().any(|(f, ok)| *f == field && *ok);
            if !supplied {
                continue;
            }
            for failure in failures.iter() {
                let text = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                errors.add(&field, text);
            }
        }
    }

    if errors.is_empty() {
        Ok(candidate)
    } else {
        debug!(
            fields = ?errors.failed_fields().collect::<Vec<_>>(),
            "Submission failed validation"
        );
        Err(errors)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accept/reject cases shared by the unit tests and the HTTP tests.
#[doc(hidden)]
pub mod cases {
    /// `(name, email, message, failing fields)`
    pub const TABLE: &[(&str, &str, &str, &[&str])] = &[
        ("Jo", "jo@x.com", "Hello there friend", &[]),
        ("Ada Lovelace", "ada@analytical.engine.org", "I would like a new website.", &[]),
        ("Zoë", "zoe+studio@example.co.uk", "Ten chars!", &[]),
        ("J", "jo@x.com", "Hello there friend", &["name"]),
        ("", "jo@x.com", "Hello there friend", &["name"]),
        ("Jo", "bad", "Hello there friend", &["email"]),
        ("Jo", "jo@", "Hello there friend", &["email"]),
        ("Jo", "@x.com", "Hello there friend", &["email"]),
        ("Jo", "jo x@x.com", "Hello there friend", &["email"]),
        ("Jo", "jo@x", "Hello there friend", &["email"]),
        ("Jo", "jo@localhost", "Hello there friend", &["email"]),
        ("Jo", "jo@x.com", "too short", &["message"]),
        ("Jo", "jo@x.com", "", &["message"]),
        ("J", "bad", "hi", &["name", "email", "message"]),
    ];
}
