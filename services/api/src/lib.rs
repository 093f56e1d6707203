//! services/api/src/lib.rs
//!
//! The HTTP service for Doctor Finder: adapters for the outside world, the
//! axum web layer, notifications and the background cleanup jobs.

pub mod adapters;
pub mod config;
pub mod error;
pub mod jobs;
pub mod notifications;
pub mod web;
