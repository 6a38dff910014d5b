//! Clinic Booking Server
//!
//! REST JSON API for booking consultation slots with a doctor: catalog and
//! availability for patients, atomic slot claims, and an admin dashboard for
//! managing booking status.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build services over `repository` from the configuration
    pub fn new(config: &AppConfig, repository: repository::Repository) -> AppResult<Self> {
        let services = services::Services::new(repository, config)?;
        Ok(Self {
            services: Arc::new(services),
        })
    }
}
