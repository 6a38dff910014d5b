//! Availability checking: generated slots annotated with existing bookings

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::slots::BusinessHours;
use crate::{
    error::{AppError, AppResult},
    models::{DayAvailability, SlotAvailability},
    repository::Repository,
};

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
    hours: Arc<BusinessHours>,
}

impl AvailabilityService {
    pub fn new(repository: Repository, hours: Arc<BusinessHours>) -> Self {
        Self { repository, hours }
    }

    /// Instants of a provider-local day held by pending or confirmed bookings
    pub async fn taken_instants(&self, doctor_id: Uuid, date: NaiveDate) -> AppResult<Vec<DateTime<Utc>>> {
        let (from, to) = self.hours.day_window(date);
        self.repository.taken_instants(doctor_id, from, to).await
    }

    /// Slots of `date` after `now`, each marked free or booked
    pub async fn day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        service_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<DayAvailability> {
        self.repository
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        let duration = match service_id {
            Some(id) => {
                let service = self
                    .repository
                    .get_service(id)
                    .await?
                    .filter(|s| s.doctor_id == doctor_id)
                    .ok_or_else(|| AppError::NotFound(format!("Service {} not found", id)))?;
                Some(service.duration())
            }
            None => None,
        };

        let closed = self.hours.is_closed(date);
        let slots = if closed {
            Vec::new()
        } else {
            let taken = self.taken_instants(doctor_id, date).await?;
            mark_booked(self.hours.slots(date, now), &taken, duration)
        };

        tracing::debug!(
            doctor_id = %doctor_id,
            date = %date,
            free = slots.iter().filter(|s| !s.booked).count(),
            total = slots.len(),
            "Computed availability"
        );

        Ok(DayAvailability {
            doctor_id,
            date,
            closed,
            slots,
        })
    }
}

/// Mark each slot booked iff a taken instant equals it at millisecond precision
pub fn mark_booked(
    slots: impl Iterator<Item = DateTime<Utc>>,
    taken: &[DateTime<Utc>],
    duration: Option<Duration>,
) -> Vec<SlotAvailability> {
    let taken: HashSet<i64> = taken.iter().map(|t| t.timestamp_millis()).collect();
    slots
        .map(|start| SlotAvailability {
            start,
            end: duration.map(|d| start + d),
            booked: taken.contains(&start.timestamp_millis()),
        })
        .collect()
}
