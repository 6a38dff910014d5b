//! In-process store used for development (`database.url = "memory://"`) and tests
//!
//! Every write happens under one write lock, which serializes slot claims the
//! same way the partial unique index does in PostgreSQL.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{bookings::stale_status, ClinicStore};
use crate::{
    error::{AppError, AppResult},
    models::{Booking, BookingStatus, BookingWithService, Doctor, NewBooking, Service, ServiceKind},
};

/// Identifier of the seeded doctor (matches the initial migration)
pub const SEED_DOCTOR_ID: Uuid = Uuid::from_u128(0x6f1c2a9e_3b7d_4c1a_9e2f_5d8b7a6c4e01);

#[derive(Default)]
struct MemoryState {
    doctors: Vec<Doctor>,
    services: Vec<Service>,
    bookings: Vec<Booking>,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(doctors: Vec<Doctor>, services: Vec<Service>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                doctors,
                services,
                bookings: Vec::new(),
            })),
        }
    }

    /// One doctor with chat, phone and video consultations
    pub fn seeded() -> Self {
        let now = Utc::now();
        let doctor = Doctor {
            id: SEED_DOCTOR_ID,
            name: "Dr. Asha Verma".to_string(),
            email: "doctor@clinic.local".to_string(),
            specialty: "Homeopathy".to_string(),
            qualifications: "BHMS".to_string(),
            bio: "General and chronic care consultations.".to_string(),
            profile_image_url: None,
            created_at: now,
        };

        let service = |n: u128, name: &str, kind: ServiceKind, price: i64| Service {
            id: Uuid::from_u128(0x8a2d4f10_5c3e_4b2a_8f1d_0e9c7b6a5d00 + n),
            doctor_id: SEED_DOCTOR_ID,
            name: name.to_string(),
            description: None,
            kind,
            duration_minutes: 30,
            price: Decimal::new(price, 0),
            is_active: true,
            created_at: now,
        };

        Self::with_catalog(
            vec![doctor],
            vec![
                service(1, "Chat Consultation", ServiceKind::Chat, 300),
                service(2, "Phone Call Consultation", ServiceKind::Phone, 500),
                service(3, "Video Call Consultation", ServiceKind::Video, 700),
            ],
        )
    }
}

fn join_service(booking: &Booking, services: &[Service]) -> BookingWithService {
    BookingWithService {
        booking: booking.clone(),
        service: services.iter().find(|s| s.id == booking.service_id).cloned(),
    }
}

#[async_trait]
impl ClinicStore for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_doctors(&self) -> AppResult<Vec<Doctor>> {
        Ok(self.state.read().await.doctors.clone())
    }

    async fn get_doctor(&self, id: Uuid) -> AppResult<Option<Doctor>> {
        let state = self.state.read().await;
        Ok(state.doctors.iter().find(|d| d.id == id).cloned())
    }

    async fn list_services(&self, doctor_id: Option<Uuid>, active_only: bool) -> AppResult<Vec<Service>> {
        let state = self.state.read().await;
        let mut services: Vec<Service> = state
            .services
            .iter()
            .filter(|s| doctor_id.map_or(true, |id| s.doctor_id == id))
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(services)
    }

    async fn get_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        let state = self.state.read().await;
        Ok(state.services.iter().find(|s| s.id == id).cloned())
    }

    async fn taken_instants(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        let mut taken: Vec<DateTime<Utc>> = state
            .bookings
            .iter()
            .filter(|b| b.doctor_id == doctor_id && b.status.holds_slot())
            .map(|b| b.appointment_datetime)
            .filter(|at| *at >= from && *at <= to)
            .collect();
        taken.sort();
        Ok(taken)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> AppResult<Booking> {
        let mut state = self.state.write().await;

        let slot_taken = state.bookings.iter().any(|b| {
            b.doctor_id == booking.doctor_id
                && b.appointment_datetime == booking.appointment_datetime
                && b.status.holds_slot()
        });
        if slot_taken {
            return Err(AppError::SlotConflict);
        }

        if state
            .bookings
            .iter()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(AppError::DuplicateReference(booking.booking_reference.clone()));
        }

        let now = Utc::now();
        let created = Booking {
            id: Uuid::new_v4(),
            booking_reference: booking.booking_reference.clone(),
            doctor_id: booking.doctor_id,
            service_id: booking.service_id,
            patient_name: booking.patient_name.clone(),
            patient_email: booking.patient_email.clone(),
            patient_phone: booking.patient_phone.clone(),
            patient_address: booking.patient_address.clone(),
            patient_city: booking.patient_city.clone(),
            patient_state: booking.patient_state.clone(),
            patient_pincode: booking.patient_pincode.clone(),
            main_concern: booking.main_concern.clone(),
            comments: booking.comments.clone(),
            appointment_datetime: booking.appointment_datetime,
            timezone: booking.timezone.clone(),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.bookings.push(created.clone());
        Ok(created)
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>> {
        let state = self.state.read().await;
        let mut bookings: Vec<BookingWithService> = state
            .bookings
            .iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .map(|b| join_service(b, &state.services))
            .collect();
        bookings.sort_by_key(|b| (b.booking.appointment_datetime, b.booking.created_at));
        Ok(bookings)
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Option<BookingWithService>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .map(|b| join_service(b, &state.services)))
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        expected: Option<BookingStatus>,
    ) -> AppResult<Booking> {
        let mut state = self.state.write().await;

        let index = state
            .bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        if let Some(expected) = expected {
            if state.bookings[index].status != expected {
                return Err(stale_status(id, expected));
            }
        }

        if status.holds_slot() {
            let target = &state.bookings[index];
            let held_elsewhere = state.bookings.iter().any(|b| {
                b.id != id
                    && b.doctor_id == target.doctor_id
                    && b.appointment_datetime == target.appointment_datetime
                    && b.status.holds_slot()
            });
            if held_elsewhere {
                return Err(AppError::SlotConflict);
            }
        }

        let booking = &mut state.bookings[index];
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_booking(reference: &str, at: DateTime<Utc>) -> NewBooking {
        NewBooking {
            booking_reference: reference.to_string(),
            doctor_id: SEED_DOCTOR_ID,
            service_id: Uuid::from_u128(0x8a2d4f10_5c3e_4b2a_8f1d_0e9c7b6a5d01),
            patient_name: "Ravi Kumar".to_string(),
            patient_email: "ravi@example.com".to_string(),
            patient_phone: "+919811111111".to_string(),
            patient_address: None,
            patient_city: None,
            patient_state: None,
            patient_pincode: None,
            main_concern: "Skin allergy".to_string(),
            comments: None,
            appointment_datetime: at,
            timezone: "Asia/Kolkata".to_string(),
        }
    }

    #[tokio::test]
    async fn test_active_slot_is_claimed_once() {
        let repo = MemoryRepository::seeded();
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();

        let first = repo.insert_booking(&new_booking("AAAA1111", at)).await.unwrap();
        assert_eq!(first.status, BookingStatus::Pending);

        let second = repo.insert_booking(&new_booking("BBBB2222", at)).await;
        assert!(matches!(second, Err(AppError::SlotConflict)));
    }

    #[tokio::test]
    async fn test_cancelled_slot_is_free_again() {
        let repo = MemoryRepository::seeded();
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();

        let first = repo.insert_booking(&new_booking("AAAA1111", at)).await.unwrap();
        repo.update_booking_status(first.id, BookingStatus::Cancelled, None).await.unwrap();

        let again = repo.insert_booking(&new_booking("BBBB2222", at)).await.unwrap();
        assert_eq!(again.status, BookingStatus::Pending);

        // The cancelled booking cannot take the slot back while it is held
        let revived = repo.update_booking_status(first.id, BookingStatus::Confirmed, None).await;
        assert!(matches!(revived, Err(AppError::SlotConflict)));
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_rejected() {
        let repo = MemoryRepository::seeded();
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap();

        repo.insert_booking(&new_booking("SAME0001", at)).await.unwrap();
        let dup = repo.insert_booking(&new_booking("SAME0001", later)).await;
        assert!(matches!(dup, Err(AppError::DuplicateReference(r)) if r == "SAME0001"));
    }

    #[tokio::test]
    async fn test_taken_instants_respects_window_and_status() {
        let repo = MemoryRepository::seeded();
        let nine = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap();

        repo.insert_booking(&new_booking("R0000001", nine)).await.unwrap();
        let cancelled = repo.insert_booking(&new_booking("R0000002", ten)).await.unwrap();
        repo.insert_booking(&new_booking("R0000003", next_day)).await.unwrap();
        repo.update_booking_status(cancelled.id, BookingStatus::Cancelled, None).await.unwrap();

        let from = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 6, 10, 23, 59, 59).unwrap();
        let taken = repo.taken_instants(SEED_DOCTOR_ID, from, to).await.unwrap();
        assert_eq!(taken, vec![nine]);
    }

    #[tokio::test]
    async fn test_status_write_requires_expected_status() {
        let repo = MemoryRepository::seeded();
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let booking = repo.insert_booking(&new_booking("EXPC0001", at)).await.unwrap();

        // Another admin confirmed it after this one read "pending"
        repo.update_booking_status(booking.id, BookingStatus::Confirmed, Some(BookingStatus::Pending))
            .await
            .unwrap();
        let stale = repo
            .update_booking_status(booking.id, BookingStatus::Cancelled, Some(BookingStatus::Pending))
            .await;
        assert!(matches!(stale, Err(AppError::InvalidTransition(_))));

        let current = repo.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(current.booking.status, BookingStatus::Confirmed);

        let missing = repo
            .update_booking_status(Uuid::new_v4(), BookingStatus::Cancelled, Some(BookingStatus::Pending))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_services_sorted_by_price() {
        let repo = MemoryRepository::seeded();
        let services = repo.list_services(Some(SEED_DOCTOR_ID), true).await.unwrap();
        let prices: Vec<Decimal> = services.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![Decimal::new(300, 0), Decimal::new(500, 0), Decimal::new(700, 0)]);
    }
}
