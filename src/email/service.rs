// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Templated email delivery over SMTP.
//!
//! ## Transports
//!
//! - SendGrid: `smtp.sendgrid.net:587`, STARTTLS, user `apikey`
//! - SMTP: port 465 uses implicit TLS, `localhost` plain, anything else STARTTLS
//! - Log: no relay configured; messages are built and logged, not sent

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::dto::{
    SendCertificateIssuedDto, SendEmailDto, SendPasswordResetDto, SendRevocationNoticeDto,
    SendVerificationDto,
};
use super::error::EmailError;
use super::job::EmailJobData;
use super::templates::{
    EmailTemplates, CERTIFICATE_ISSUED, PASSWORD_RESET, REVOCATION_NOTICE, VERIFICATION_EMAIL,
};
use super::worker::EmailDispatch;
use crate::config::{EmailConfig, EmailProvider};

const SENDGRID_HOST: &str = "smtp.sendgrid.net";
const SENDGRID_PORT: u16 = 587;
const SENDGRID_USER: &str = "apikey";

/// "January 5, 2025"
const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Log,
}

pub struct EmailService {
    transport: Transport,
    from: Mailbox,
    app_url: String,
    templates: EmailTemplates,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let transport = build_transport(&config.provider)?;
        Ok(Self {
            transport,
            from: config.from.parse()?,
            app_url: config.app_url.trim_end_matches('/').to_string(),
            templates: EmailTemplates::load()?,
        })
    }

    pub async fn send_email(&self, dto: &SendEmailDto) -> Result<(), EmailError> {
        let result = self.deliver(dto).await;
        if let Err(e) = &result {
            error!(to = %dto.to, error = %e, "failed to send email");
        }
        result
    }

    async fn deliver(&self, dto: &SendEmailDto) -> Result<(), EmailError> {
        let html = self.templates.render(&dto.template, &dto.data)?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(dto.to.parse()?)
            .subject(dto.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                let response = smtp.send(message).await?;
                info!(
                    to = %dto.to,
                    code = %response.code(),
                    "email sent"
                );
            }
            Transport::Log => {
                info!(
                    to = %dto.to,
                    subject = %dto.subject,
                    template = %dto.template,
                    "email transport not configured; message logged instead of sent"
                );
            }
        }
        Ok(())
    }

    pub async fn send_certificate_issued(
        &self,
        dto: &SendCertificateIssuedDto,
    ) -> Result<(), EmailError> {
        let email = self.certificate_issued_email(dto, Utc::now());
        self.send_email(&email).await
    }

    pub async fn send_verification_email(
        &self,
        dto: &SendVerificationDto,
    ) -> Result<(), EmailError> {
        self.send_email(&verification_email(dto)).await
    }

    pub async fn send_password_reset(&self, dto: &SendPasswordResetDto) -> Result<(), EmailError> {
        self.send_email(&password_reset_email(dto)).await
    }

    pub async fn send_revocation_notice(
        &self,
        dto: &SendRevocationNoticeDto,
    ) -> Result<(), EmailError> {
        let email = revocation_notice_email(dto)?;
        self.send_email(&email).await
    }

    /// Probe the relay. The log transport always succeeds.
    pub async fn verify_connection(&self) -> bool {
        match &self.transport {
            Transport::Smtp(smtp) => match smtp.test_connection().await {
                Ok(true) => {
                    info!("Email service connection verified");
                    true
                }
                Ok(false) => {
                    error!("Email service connection failed: relay refused the connection");
                    false
                }
                Err(e) => {
                    error!(error = %e, "Email service connection failed");
                    false
                }
            },
            Transport::Log => {
                info!("Email service using log transport; nothing to verify");
                true
            }
        }
    }

    pub(crate) fn certificate_issued_email(
        &self,
        dto: &SendCertificateIssuedDto,
        issued_on: DateTime<Utc>,
    ) -> SendEmailDto {
        SendEmailDto {
            to: dto.to.clone(),
            subject: format!("Certificate Issued: {}", dto.certificate_name),
            template: CERTIFICATE_ISSUED.to_string(),
            data: object(json!({
                "recipientName": dto.recipient_name,
                "certificateName": dto.certificate_name,
                "issuerName": dto.issuer_name,
                "certificateId": dto.certificate_id,
                "issuedDate": issued_on.format(DISPLAY_DATE_FORMAT).to_string(),
                "certificateLink": format!("{}/certificates/{}", self.app_url, dto.certificate_id),
            })),
        }
    }
}

#[async_trait]
impl EmailDispatch for EmailService {
    async fn dispatch(&self, job: &EmailJobData) -> Result<(), EmailError> {
        match job {
            EmailJobData::SendEmail(dto) => self.send_email(dto).await,
            EmailJobData::SendCertificateIssued(dto) => self.send_certificate_issued(dto).await,
            EmailJobData::SendVerification(dto) => self.send_verification_email(dto).await,
            EmailJobData::SendPasswordReset(dto) => self.send_password_reset(dto).await,
            EmailJobData::SendRevocation(dto) => self.send_revocation_notice(dto).await,
        }
    }
}

fn build_transport(provider: &EmailProvider) -> Result<Transport, EmailError> {
    let transport = match provider {
        EmailProvider::SendGrid { api_key } => {
            info!("Email service configured with SendGrid");
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(SENDGRID_HOST)?
                .port(SENDGRID_PORT)
                .credentials(Credentials::new(SENDGRID_USER.to_string(), api_key.clone()))
                .build()
        }
        EmailProvider::Smtp {
            host,
            port,
            username,
            password,
        } => {
            let builder = if *port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            } else if host == "localhost" || host == "127.0.0.1" {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host.as_str())
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            };
            let mut smtp = builder.port(*port);

            match (username, password) {
                (Some(username), Some(password)) => {
                    smtp = smtp.credentials(Credentials::new(username.clone(), password.clone()));
                }
                _ => warn!("smtp credentials are missing; skipping auth"),
            }
            info!(host = %host, port = *port, "Email service configured with SMTP");
            smtp.build()
        }
        EmailProvider::Log => {
            warn!("no email relay configured; emails will be logged, not sent");
            return Ok(Transport::Log);
        }
    };
    Ok(Transport::Smtp(transport))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn verification_email(dto: &SendVerificationDto) -> SendEmailDto {
    SendEmailDto {
        to: dto.to.clone(),
        subject: "Verify Your Email Address".to_string(),
        template: VERIFICATION_EMAIL.to_string(),
        data: object(json!({
            "userName": dto.user_name,
            "verificationLink": dto.verification_link,
        })),
    }
}

fn password_reset_email(dto: &SendPasswordResetDto) -> SendEmailDto {
    SendEmailDto {
        to: dto.to.clone(),
        subject: "Reset Your Password".to_string(),
        template: PASSWORD_RESET.to_string(),
        data: object(json!({
            "userName": dto.user_name,
            "resetLink": dto.reset_link,
        })),
    }
}

fn revocation_notice_email(dto: &SendRevocationNoticeDto) -> Result<SendEmailDto, EmailError> {
    Ok(SendEmailDto {
        to: dto.to.clone(),
        subject: format!("Certificate Revoked: {}", dto.certificate_name),
        template: REVOCATION_NOTICE.to_string(),
        data: object(json!({
            "recipientName": dto.recipient_name,
            "certificateId": dto.certificate_id,
            "certificateName": dto.certificate_name,
            "reason": dto.reason,
            "revocationDate": display_date(&dto.revocation_date)?,
        })),
    })
}

/// Reformat an RFC 3339 timestamp or `YYYY-MM-DD` date as "Month D, YYYY".
fn display_date(raw: &str) -> Result<String, EmailError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc).format(DISPLAY_DATE_FORMAT).to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
        .map_err(|_| EmailError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EMAIL_FROM;
    use chrono::TimeZone;

    fn log_service() -> EmailService {
        EmailService::new(&EmailConfig {
            provider: EmailProvider::Log,
            from: DEFAULT_EMAIL_FROM.to_string(),
            app_url: "https://stellarcert.com/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn certificate_issued_email_has_subject_link_and_date() {
        let service = log_service();
        let dto = SendCertificateIssuedDto {
            to: "alice@example.com".to_string(),
            certificate_id: "CERT-1".to_string(),
            recipient_name: "Alice".to_string(),
            certificate_name: "Rust Fundamentals".to_string(),
            issuer_name: "Academy".to_string(),
        };
        let issued = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        let email = service.certificate_issued_email(&dto, issued);

        assert_eq!(email.subject, "Certificate Issued: Rust Fundamentals");
        assert_eq!(email.template, "certificate-issued");
        assert_eq!(email.data["issuedDate"], "January 5, 2025");
        assert_eq!(
            email.data["certificateLink"],
            "https://stellarcert.com/certificates/CERT-1"
        );
    }

    #[test]
    fn revocation_date_is_reformatted() {
        assert_eq!(display_date("2025-03-01T23:30:00Z").unwrap(), "March 1, 2025");
        assert_eq!(display_date("2024-12-25").unwrap(), "December 25, 2024");
        assert!(matches!(display_date("soon"), Err(EmailError::InvalidDate(_))));
    }

    #[test]
    fn fixed_subjects() {
        let verification = verification_email(&SendVerificationDto {
            to: "a@example.com".to_string(),
            user_name: "A".to_string(),
            verification_link: "https://stellarcert.com/v".to_string(),
        });
        assert_eq!(verification.subject, "Verify Your Email Address");

        let reset = password_reset_email(&SendPasswordResetDto {
            to: "a@example.com".to_string(),
            user_name: "A".to_string(),
            reset_link: "https://stellarcert.com/r".to_string(),
        });
        assert_eq!(reset.subject, "Reset Your Password");
        assert_eq!(reset.template, "password-reset");
    }

    #[tokio::test]
    async fn log_transport_renders_and_succeeds() {
        let service = log_service();
        assert!(service.verify_connection().await);

        let job = EmailJobData::SendRevocation(SendRevocationNoticeDto {
            to: "bob@example.com".to_string(),
            recipient_name: "Bob".to_string(),
            certificate_id: "CERT-9".to_string(),
            certificate_name: "Course".to_string(),
            reason: "Issued in error".to_string(),
            revocation_date: "2025-02-01".to_string(),
        });
        service.dispatch(&job).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_template_or_bad_address_fails() {
        let service = log_service();
        let mut dto = SendEmailDto {
            to: "a@example.com".to_string(),
            subject: "Hi".to_string(),
            template: "missing".to_string(),
            data: Map::new(),
        };
        assert!(matches!(
            service.send_email(&dto).await,
            Err(EmailError::TemplateNotFound(_))
        ));

        dto.template = "password-reset".to_string();
        dto.to = "not an address".to_string();
        assert!(matches!(
            service.send_email(&dto).await,
            Err(EmailError::Address(_))
        ));
    }
}
