// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email request bodies. These double as queue job payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{http_url, iso8601, not_blank};

/// Raw templated email. Only produced internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailDto {
    #[validate(email)]
    pub to: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub subject: String,
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub template: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendCertificateIssuedDto {
    #[validate(email)]
    pub to: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub certificate_id: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub recipient_name: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub certificate_name: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub issuer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendVerificationDto {
    #[validate(email)]
    pub to: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub user_name: String,
    #[validate(url, custom(function = "http_url"))]
    pub verification_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendPasswordResetDto {
    #[validate(email)]
    pub to: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub user_name: String,
    #[validate(url, custom(function = "http_url"))]
    pub reset_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendRevocationNoticeDto {
    #[validate(email)]
    pub to: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub recipient_name: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub certificate_id: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub certificate_name: String,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub reason: String,
    /// ISO-8601 date or timestamp.
    #[validate(custom(function = "iso8601"))]
    pub revocation_date: String,
}

/// Body returned by the email endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailQueuedResponse {
    pub success: bool,
    pub message: String,
}
