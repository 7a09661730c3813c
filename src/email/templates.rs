// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handlebars templates compiled into the binary.

use handlebars::Handlebars;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::EmailError;

pub const CERTIFICATE_ISSUED: &str = "certificate-issued";
pub const VERIFICATION_EMAIL: &str = "verification-email";
pub const PASSWORD_RESET: &str = "password-reset";
pub const REVOCATION_NOTICE: &str = "revocation-notice";

const SOURCES: &[(&str, &str)] = &[
    (CERTIFICATE_ISSUED, include_str!("templates/certificate-issued.hbs")),
    (VERIFICATION_EMAIL, include_str!("templates/verification-email.hbs")),
    (PASSWORD_RESET, include_str!("templates/password-reset.hbs")),
    (REVOCATION_NOTICE, include_str!("templates/revocation-notice.hbs")),
];

pub struct EmailTemplates {
    registry: Handlebars<'static>,
}

impl EmailTemplates {
    pub fn load() -> Result<Self, EmailError> {
        let mut registry = Handlebars::new();
        for &(name, source) in SOURCES {
            registry
                .register_template_string(name, source)
                .map_err(|e| EmailError::Template(format!("{name}: {e}")))?;
            debug!(template = name, "template loaded");
        }
        Ok(Self { registry })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Render `name` to HTML. Values are HTML-escaped.
    pub fn render(&self, name: &str, data: &Map<String, Value>) -> Result<String, EmailError> {
        if !self.contains(name) {
            return Err(EmailError::TemplateNotFound(name.to_string()));
        }
        Ok(self.registry.render(name, data)?)
    }
}
