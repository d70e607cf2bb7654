//! Minimal SendGrid v3 client for transactional template mail.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

#[derive(Debug, Error)]
pub enum SendGridError {
    #[error("SendGrid request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SendGrid rejected the mail ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct SendGridOptions {
    /// Missing key turns every send into a logged no-op.
    pub api_key: Option<String>,
    pub from_email: String,
    pub verify_template_id: String,
    pub reset_template_id: String,
}

#[derive(Debug, Clone)]
pub struct SendGridService {
    options: SendGridOptions,
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    template_id: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    dynamic_template_data: serde_json::Value,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

impl SendGridService {
    pub fn new(options: SendGridOptions) -> Self {
        Self {
            options,
            http: reqwest::Client::new(),
            base_url: SENDGRID_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send_templated(
        &self,
        to_email: &str,
        template_id: &str,
        subject: &str,
        template_data: serde_json::Value,
    ) -> Result<(), SendGridError> {
        let Some(api_key) = self.options.api_key.as_deref() else {
            warn!(to = to_email, subject, "SendGrid key not configured, skipping send");
            return Ok(());
        };

        let payload = MailSend {
            personalizations: vec![Personalization {
                to: vec![Address { email: to_email }],
                dynamic_template_data: template_data,
            }],
            from: Address {
                email: &self.options.from_email,
            },
            subject,
            template_id,
        };

        let response = self
            .http
            .post(format!("{}/mail/send", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendGridError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = to_email, subject, "mail accepted by SendGrid");
        Ok(())
    }

    /// Send the signup verification mail with a clickable verification link.
    pub async fn send_verification_email(
        &self,
        username: &str,
        to_email: &str,
        verification_link: &str,
    ) -> Result<(), SendGridError> {
        self.send_templated(
            to_email,
            &self.options.verify_template_id,
            "Verify Your Email Address",
            json!({
                "username": username,
                "verification_link": verification_link,
            }),
        )
        .await
    }

    /// Send the password reset mail with a reset link.
    pub async fn send_password_reset_email(
        &self,
        username: &str,
        to_email: &str,
        reset_password_link: &str,
    ) -> Result<(), SendGridError> {
        self.send_templated(
            to_email,
            &self.options.reset_template_id,
            "Reset Your Password",
            json!({
                "username": username,
                "reset_password_link": reset_password_link,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_service() -> SendGridService {
        SendGridService::new(SendGridOptions {
            api_key: None,
            from_email: "desk@example.com".into(),
            verify_template_id: "d-verify".into(),
            reset_template_id: "d-reset".into(),
        })
    }

    #[tokio::test]
    async fn missing_key_is_a_noop() {
        let service = disabled_service();
        let result = service
            .send_verification_email("sam", "sam@example.com", "https://app/verify?token=t")
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn mail_payload_shape() {
        let payload = MailSend {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: "sam@example.com",
                }],
                dynamic_template_data: json!({"username": "sam"}),
            }],
            from: Address {
                email: "desk@example.com",
            },
            subject: "Verify Your Email Address",
            template_id: "d-verify",
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["personalizations"][0]["to"][0]["email"], "sam@example.com");
        assert_eq!(value["template_id"], "d-verify");
    }
}
