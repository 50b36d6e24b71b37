//! SmsClient - Twilio REST Adapter
//!
//! ## Responsibilities
//!
//! - Send fall alert SMS through the Twilio Messages API
//! - Report whether credentials are configured
//!
//! The service runs fine without credentials; sends then fail with a config
//! error that the FallMonitor logs.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Twilio API host; overridable for tests
const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// SMS delivery configuration
#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

/// Accepted message, as echoed back by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// SmsClient instance
pub struct SmsClient {
    client: reqwest::Client,
    config: SmsConfig,
    base_url: String,
}

impl SmsClient {
    /// Create new SmsClient
    pub fn new(config: SmsConfig) -> Self {
        Self::with_base_url(config, DEFAULT_BASE_URL.to_string())
    }

    /// Create new SmsClient against a custom API host
    pub fn with_base_url(config: SmsConfig, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            base_url,
        }
    }

    /// True when all credentials are present
    pub fn is_configured(&self) -> bool {
        self.config.account_sid.is_some()
            && self.config.auth_token.is_some()
            && self.config.from_number.is_some()
    }

    /// Messages endpoint for the configured account
    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, account_sid
        )
    }

    /// Send an SMS to `to` with the given body
    pub async fn send(&self, to: &str, body: &str) -> Result<MessageResponse> {
        let (sid, token, from) = match (
            &self.config.account_sid,
            &self.config.auth_token,
            &self.config.from_number,
        ) {
            (Some(sid), Some(token), Some(from)) => (sid, token, from),
            _ => {
                return Err(Error::Config(
                    "Twilio credentials not configured (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / TWILIO_FROM_NUMBER)"
                        .to_string(),
                ))
            }
        };

        let url = self.messages_url(sid);
        let resp = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("To", to), ("From", from.as_str()), ("Body", body)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Sms(format!(
                "Twilio send failed: {} - {}",
                status, body
            )));
        }

        let message: MessageResponse = resp.json().await?;
        tracing::info!(to = %to, message_sid = %message.sid, "SMS sent");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_client() -> SmsClient {
        SmsClient::new(SmsConfig {
            account_sid: Some("AC00000000000000000000000000000000".to_string()),
            auth_token: Some("secret".to_string()),
            from_number: Some("+15005550006".to_string()),
        })
    }

    #[test]
    fn test_is_configured() {
        assert!(configured_client().is_configured());
        assert!(!SmsClient::new(SmsConfig::default()).is_configured());
    }

    #[test]
    fn test_partial_credentials_not_configured() {
        let client = SmsClient::new(SmsConfig {
            account_sid: Some("AC0".to_string()),
            auth_token: None,
            from_number: Some("+15005550006".to_string()),
        });
        assert!(!client.is_configured());
    }

    #[test]
    fn test_messages_url() {
        let client = configured_client();
        assert_eq!(
            client.messages_url("AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_send_without_credentials_is_config_error() {
        let client = SmsClient::new(SmsConfig::default());
        let err = client.send("+821012345678", "test").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
