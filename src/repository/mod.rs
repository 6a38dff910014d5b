//! Repository layer: the persistent store behind every booking operation
//!
//! All coordination between concurrent requests happens here. In particular a
//! (doctor, appointment instant) slot is claimed by a single conditional write,
//! so two racing requests for the same slot can never both succeed.

pub mod bookings;
pub mod doctors;
pub mod memory;
pub mod services;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Booking, BookingStatus, BookingWithService, Doctor, NewBooking, Service},
};

pub use memory::MemoryRepository;

/// Shared handle to the configured store
pub type Repository = Arc<dyn ClinicStore>;

/// Operations the booking core needs from the store
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Connectivity check used by the readiness check
    async fn ping(&self) -> AppResult<()>;

    async fn list_doctors(&self) -> AppResult<Vec<Doctor>>;

    async fn get_doctor(&self, id: Uuid) -> AppResult<Option<Doctor>>;

    /// Services ordered by price ascending
    async fn list_services(&self, doctor_id: Option<Uuid>, active_only: bool) -> AppResult<Vec<Service>>;

    async fn get_service(&self, id: Uuid) -> AppResult<Option<Service>>;

    /// Instants in `[from, to]` held by pending or confirmed bookings of a doctor
    async fn taken_instants(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>>;

    /// Atomically claim the slot and persist a pending booking.
    ///
    /// Fails with `AppError::SlotConflict` when a pending or confirmed booking
    /// already holds (doctor_id, appointment_datetime), and with
    /// `AppError::DuplicateReference` when the reference is taken. Nothing is
    /// written in either case.
    async fn insert_booking(&self, booking: &NewBooking) -> AppResult<Booking>;

    /// Bookings with their service, ordered by appointment_datetime ascending
    async fn list_bookings(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>>;

    async fn get_booking(&self, id: Uuid) -> AppResult<Option<BookingWithService>>;

    /// Overwrite the status and bump updated_at. Moving a booking back onto a
    /// slot held by another active booking fails with `AppError::SlotConflict`.
    ///
    /// With `expected` set, the write only happens while the booking is still
    /// in that status; otherwise it fails with `AppError::InvalidTransition`.
    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        expected: Option<BookingStatus>,
    ) -> AppResult<Booking>;
}

/// PostgreSQL store
#[derive(Clone)]
pub struct PgRepository {
    pub pool: Pool<Postgres>,
}

impl PgRepository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClinicStore for PgRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_doctors(&self) -> AppResult<Vec<Doctor>> {
        self.doctors_list().await
    }

    async fn get_doctor(&self, id: Uuid) -> AppResult<Option<Doctor>> {
        self.doctors_get(id).await
    }

    async fn list_services(&self, doctor_id: Option<Uuid>, active_only: bool) -> AppResult<Vec<Service>> {
        self.services_list(doctor_id, active_only).await
    }

    async fn get_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        self.services_get(id).await
    }

    async fn taken_instants(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        self.bookings_taken_instants(doctor_id, from, to).await
    }

    async fn insert_booking(&self, booking: &NewBooking) -> AppResult<Booking> {
        self.bookings_insert(booking).await
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>> {
        self.bookings_list(status).await
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Option<BookingWithService>> {
        self.bookings_get(id).await
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        expected: Option<BookingStatus>,
    ) -> AppResult<Booking> {
        self.bookings_update_status(id, status, expected).await
    }
}
