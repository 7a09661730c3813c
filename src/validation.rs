// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request body validation.
//!
//! DTOs derive [`validator::Validate`]. Rules with no built-in attribute are
//! the `custom` functions below. A failed validation becomes a
//! `VALIDATION_ERROR` whose `details` maps each offending field (camelCase)
//! to the list of its messages.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;
use validator::{ValidationError, ValidationErrors};

use crate::stellar::keys;

/// Characters accepted as the "special" class of a strong password.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";
pub const PASSWORD_MIN_LEN: usize = 8;

/// Error param naming the field a struct-level rule reports against.
pub const FIELD_PARAM: &str = "field";

const SCHEMA_KEY: &str = "__all__";

/// Trim, NFKC-normalise and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

pub(crate) fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("not_blank", "should not be empty"));
    }
    Ok(())
}

/// At least 8 characters with lower, upper, digit and one of `@$!%*?&`.
pub fn strong_password(password: &str) -> Result<(), ValidationError> {
    let strong = password.chars().count() >= PASSWORD_MIN_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !strong {
        return Err(invalid(
            "strong_password",
            "must be at least 8 characters and contain an uppercase letter, a lowercase letter, a number and a special character (@$!%*?&)",
        ));
    }
    Ok(())
}

/// Restrict a URL to http(s). Unparseable input is left to `#[validate(url)]`.
pub fn http_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            Err(invalid("http_url", "must use http or https"))
        }
        _ => Ok(()),
    }
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
pub fn iso8601(value: &str) -> Result<(), ValidationError> {
    if DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
    {
        return Ok(());
    }
    Err(invalid("iso8601", "must be a valid ISO 8601 date string"))
}

pub fn stellar_public_key(value: &str) -> Result<(), ValidationError> {
    if keys::is_valid_public_key(value) {
        return Ok(());
    }
    Err(invalid("stellar_public_key", "must be a valid Stellar public key"))
}

/// `{field: [messages]}` for the error envelope.
pub fn field_details(errors: &ValidationErrors) -> Value {
    let mut fields: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (field, field_errors) in errors.field_errors() {
        let field: &str = &field;
        for error in field_errors.iter() {
            let name = if field == SCHEMA_KEY {
                error
                    .params
                    .get(FIELD_PARAM)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "body".to_string())
            } else {
                camel_case(field)
            };
            let message = format!("{name} {}", describe(error));
            fields.entry(name).or_default().push(Value::String(message));
        }
    }
    let details: Map<String, Value> = fields
        .into_iter()
        .map(|(field, messages)| (field, Value::Array(messages)))
        .collect();
    Value::Object(details)
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |name: &str| error.params.get(name).and_then(Value::as_u64);
    match &*error.code {
        "email" => "must be an email".to_string(),
        "url" => "must be a URL address".to_string(),
        "length" => match (param("min"), param("max")) {
            (Some(1), None) => "should not be empty".to_string(),
            (Some(min), None) => format!("must be longer than or equal to {min} characters"),
            (None, Some(max)) => format!("must be shorter than or equal to {max} characters"),
            (Some(min), Some(max)) => format!("must be between {min} and {max} characters"),
            (None, None) => "has an invalid length".to_string(),
        },
        _ => "is invalid".to_string(),
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
