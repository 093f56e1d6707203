//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::OtpPolicy;
use chrono::FixedOffset;
use doctor_finder_core::ports::{
    DatabaseService, EmailService, SmsService, SymptomAssistantService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub sms: Arc<dyn SmsService>,
    pub email: Arc<dyn EmailService>,
    pub assistant: Arc<dyn SymptomAssistantService>,
    pub otp_policy: OtpPolicy,
    /// Local time of the clinics, used for dates in patient notices.
    pub clinic_offset: FixedOffset,
}
