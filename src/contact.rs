use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{self, ApiError};
use crate::config::ApiConfig;

pub const MAX_SUBJECT_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 500;

/// A public contact-form submission. Unauthenticated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
struct Accepted {
    #[serde(default)]
    message: Option<String>,
}

impl ContactForm {
    /// Same checks, in the same order and wording, as the server applies.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("subject", &self.subject),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("{} is required", field)));
            }
        }
        if self.subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(ApiError::Validation(
                "Subject must be less than 100 characters".to_string(),
            ));
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::Validation(
                "Message must be less than 500 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate locally, then POST to `/api/contact`. Returns the server's
    /// confirmation text.
    pub async fn submit(&self, config: &ApiConfig) -> Result<String, ApiError> {
        self.validate()?;
        let http = api::build_http_client(config)?;
        let url = api::endpoint(&api::parse_base_url(&config.base_url)?, &["api", "contact"])?;
        let response = api::send(http.post(url).json(self)).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            return Err(ApiError::Validation(api::error_message(&body)));
        }
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: api::error_message(&body),
            });
        }
        info!(email = %self.email, "contact form submitted");
        let accepted: Accepted = serde_json::from_str(&body).unwrap_or(Accepted { message: None });
        Ok(accepted
            .message
            .unwrap_or_else(|| "Message sent successfully".to_string()))
    }
}
