//! Catalog service: doctors and their consultation services

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{service::ServiceListing, Doctor},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    whatsapp_number: Option<String>,
}

impl CatalogService {
    pub fn new(repository: Repository, whatsapp_number: Option<String>) -> Self {
        Self {
            repository,
            whatsapp_number,
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    pub async fn list_doctors(&self) -> AppResult<Vec<Doctor>> {
        self.repository.list_doctors().await
    }

    pub async fn get_doctor(&self, id: Uuid) -> AppResult<Doctor> {
        self.repository
            .get_doctor(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Doctor {} not found", id)))
    }

    /// Active services, cheapest first, with a contact link per service kind
    pub async fn list_services(&self, doctor_id: Option<Uuid>) -> AppResult<Vec<ServiceListing>> {
        let services = self.repository.list_services(doctor_id, true).await?;
        let doctors = self.repository.list_doctors().await?;

        Ok(services
            .into_iter()
            .map(|service| {
                let contact_link = self.whatsapp_number.as_deref().and_then(|number| {
                    doctors
                        .iter()
                        .find(|d| d.id == service.doctor_id)
                        .map(|doctor| service.kind.contact_link(number, doctor.first_name()))
                });
                ServiceListing {
                    service,
                    contact_link,
                }
            })
            .collect())
    }
}
