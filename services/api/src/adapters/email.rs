//! services/api/src/adapters/email.rs
//!
//! This module contains the email relay adapter. It implements the `EmailService`
//! port by posting template identifiers and parameters as JSON to the relay.

use async_trait::async_trait;
use doctor_finder_core::domain::AcceptanceEmail;
use doctor_finder_core::ports::{EmailService, PortError, PortResult};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::EmailConfig;

/// The JSON envelope the relay expects.
#[derive(Serialize)]
struct RelayRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: Value,
}

/// An adapter that implements `EmailService` over a templated email relay.
#[derive(Clone)]
pub struct EmailRelayAdapter {
    client: reqwest::Client,
    config: EmailConfig,
}

impl EmailRelayAdapter {
    /// Creates a new `EmailRelayAdapter`.
    pub fn new(client: reqwest::Client, config: EmailConfig) -> Self {
        Self { client, config }
    }

    async fn send(&self, template_id: &str, params: Value) -> PortResult<()> {
        let request = RelayRequest {
            service_id: &self.config.service_id,
            template_id,
            user_id: &self.config.user_id,
            template_params: params,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Email relay unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!(template_id, "Email accepted by relay");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PortError::Unexpected(format!(
            "Email relay returned {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl EmailService for EmailRelayAdapter {
    async fn send_otp_email(
        &self,
        to: &str,
        name: &str,
        otp: &str,
        expires_in: &str,
    ) -> PortResult<()> {
        let params = json!({
            "to_email": to,
            "to_name": name,
            "otp": otp,
            "expires_in": expires_in,
        });
        self.send(&self.config.otp_template_id, params).await
    }

    async fn send_acceptance_email(&self, email: &AcceptanceEmail) -> PortResult<()> {
        let params = json!({
            "to_email": email.patient_email,
            "patient_name": email.patient_name,
            "doctor_name": email.doctor_name,
            "doctor_degree": email.doctor_degree,
            "department": email.department,
            "hospital": email.hospital,
            "appointment_date": email.appointment_date,
            "appointment_time": email.appointment_time,
            "appointment_duration": email.appointment_duration,
            "serial_number": email.serial_number,
            "accepted_at": email.accepted_at,
        });
        self.send(&self.config.acceptance_template_id, params).await
    }
}
