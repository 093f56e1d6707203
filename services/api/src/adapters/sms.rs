//! services/api/src/adapters/sms.rs
//!
//! This module contains the SMS gateway adapter. It implements the `SmsService`
//! port from the `core` crate against a Twilio-compatible REST API.

use async_trait::async_trait;
use doctor_finder_core::ports::{PortError, PortResult, SmsService};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SmsConfig;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SmsService` with a Basic-Auth, form-encoded REST call.
#[derive(Clone)]
pub struct TwilioSmsAdapter {
    client: reqwest::Client,
    config: SmsConfig,
}

/// The subset of the gateway's error body we surface in logs.
#[derive(Deserialize)]
struct GatewayError {
    message: Option<String>,
}

impl TwilioSmsAdapter {
    /// Creates a new `TwilioSmsAdapter`.
    pub fn new(client: reqwest::Client, config: SmsConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

//=========================================================================================
// `SmsService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SmsService for TwilioSmsAdapter {
    async fn send_sms(&self, to: &str, body: &str) -> PortResult<()> {
        let form = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("SMS gateway unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!(to, "SMS accepted by gateway");
            return Ok(());
        }

        let message = response
            .json::<GatewayError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| status.to_string());
        warn!(to, %status, "SMS gateway rejected message: {}", message);
        Err(PortError::Unexpected(format!("SMS gateway error: {}", message)))
    }
}
