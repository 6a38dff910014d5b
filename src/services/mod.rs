//! Business logic services

pub mod admin;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod email;
pub mod notifications;
pub mod reference;
pub mod slots;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub availability: availability::AvailabilityService,
    pub bookings: bookings::BookingService,
    pub admin: admin::AdminService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let hours = Arc::new(slots::BusinessHours::from_config(&config.schedule)?);
        let notifier = notifications::build_notifier(config, &hours)?;
        let dispatcher = notifications::NotificationDispatcher::new(notifier, &config.notifications);

        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone(), config.clinic.whatsapp_number.clone()),
            availability: availability::AvailabilityService::new(repository.clone(), hours.clone()),
            bookings: bookings::BookingService::new(repository, dispatcher, hours, &config.booking),
            admin: admin::AdminService::new(&config.admin)?,
        })
    }
}
