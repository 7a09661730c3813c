// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::error::ApiError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Template {0} not found")]
    TemplateNotFound(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("message error: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Storage(inner) => inner.into(),
        }
    }
}
