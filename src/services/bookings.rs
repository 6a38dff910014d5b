//! Booking service: creation with an atomic slot claim, dashboard listing and status updates

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{
    notifications::{BookingNotification, NotificationDispatcher},
    reference::generate_booking_reference,
    slots::BusinessHours,
};
use crate::{
    config::BookingConfig,
    error::{AppError, AppResult},
    models::{
        Booking, BookingStatus, BookingWithService, BookingsOverview, CreateBookingRequest, StatusCounts,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BookingService {
    repository: Repository,
    notifications: NotificationDispatcher,
    hours: Arc<BusinessHours>,
    default_timezone: String,
    enforce_transitions: bool,
    reference_attempts: u32,
}

impl BookingService {
    pub fn new(
        repository: Repository,
        notifications: NotificationDispatcher,
        hours: Arc<BusinessHours>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            repository,
            notifications,
            hours,
            default_timezone: config.default_timezone.clone(),
            enforce_transitions: config.enforce_transitions,
            reference_attempts: config.reference_attempts.max(1),
        }
    }

    /// Validate, claim the slot and persist a pending booking, then notify in the background
    pub async fn create(&self, request: CreateBookingRequest) -> AppResult<Booking> {
        let (booking, _notification) = self.claim(request).await?;
        Ok(booking)
    }

    /// Same as `create`, also handing back the notification task
    pub async fn claim(&self, request: CreateBookingRequest) -> AppResult<(Booking, JoinHandle<bool>)> {
        let mut new_booking = request.into_new_booking(&self.default_timezone)?;

        let doctor = self
            .repository
            .get_doctor(new_booking.doctor_id)
            .await?
            .ok_or_else(|| AppError::Validation("Unknown doctorId".to_string()))?;
        let service = self
            .repository
            .get_service(new_booking.service_id)
            .await?
            .filter(|s| s.doctor_id == doctor.id && s.is_active)
            .ok_or_else(|| AppError::Validation("Unknown serviceId".to_string()))?;

        // Accepted as sent; clients normally pick from the availability grid
        if !self.hours.is_on_grid(new_booking.appointment_datetime) {
            tracing::warn!(
                appointment = %new_booking.appointment_datetime,
                "Appointment is outside the slot grid"
            );
        }

        let mut attempt = 1;
        let booking = loop {
            match self.repository.insert_booking(&new_booking).await {
                Ok(booking) => break booking,
                Err(AppError::DuplicateReference(reference)) if attempt < self.reference_attempts => {
                    new_booking.booking_reference = generate_booking_reference();
                    tracing::warn!(
                        rejected = %reference,
                        replacement = %new_booking.booking_reference,
                        "Booking reference already in use, regenerated"
                    );
                    attempt += 1;
                }
                Err(AppError::SlotConflict) => {
                    tracing::info!(
                        doctor_id = %new_booking.doctor_id,
                        appointment = %new_booking.appointment_datetime,
                        "Slot already booked"
                    );
                    return Err(AppError::SlotConflict);
                }
                Err(AppError::Database(e)) => {
                    tracing::error!(error = ?e, "Booking insert failed");
                    return Err(AppError::BookingNotPersisted);
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!(
            booking_id = %booking.id,
            booking_reference = %booking.booking_reference,
            doctor_id = %booking.doctor_id,
            appointment = %booking.appointment_datetime,
            "Booking created"
        );

        let notification = self.notifications.dispatch(BookingNotification {
            booking: booking.clone(),
            service,
            doctor,
        });

        Ok((booking, notification))
    }

    /// Bookings with their service, soonest appointment first
    pub async fn list(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>> {
        self.repository.list_bookings(status).await
    }

    /// Listing split into upcoming and past, with per-status counts
    pub async fn overview(&self, status: Option<BookingStatus>, now: DateTime<Utc>) -> AppResult<BookingsOverview> {
        let bookings = self.list(status).await?;
        let counts = StatusCounts::tally(bookings.iter().map(|b| &b.booking.status));
        let (upcoming, past) = partition_bookings(bookings, now);
        Ok(BookingsOverview { counts, upcoming, past })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<BookingWithService> {
        self.repository
            .get_booking(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    /// Set a booking's status. Any move is accepted unless transitions are enforced.
    /// An enforced move is only written while the booking still has the status it was checked against.
    pub async fn update_status(&self, id: Uuid, status: BookingStatus) -> AppResult<Booking> {
        let expected = if self.enforce_transitions {
            let current = self.get(id).await?.booking.status;
            if !current.can_transition_to(status) {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot move booking from {} to {}",
                    current, status
                )));
            }
            Some(current)
        } else {
            None
        };

        let booking = self.repository.update_booking_status(id, status, expected).await?;
        tracing::info!(
            booking_id = %booking.id,
            booking_reference = %booking.booking_reference,
            status = %booking.status,
            "Booking status updated"
        );
        Ok(booking)
    }
}

/// Upcoming: appointment at or after `now` and not cancelled. Past: the rest.
/// Input order is preserved in both halves.
pub fn partition_bookings(
    bookings: Vec<BookingWithService>,
    now: DateTime<Utc>,
) -> (Vec<BookingWithService>, Vec<BookingWithService>) {
    bookings.into_iter().partition(|b| {
        b.booking.appointment_datetime >= now && b.booking.status != BookingStatus::Cancelled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{NotificationsConfig, ScheduleConfig},
        repository::{memory::SEED_DOCTOR_ID, ClinicStore, MemoryRepository},
        services::notifications::{LogNotifier, MockNotifier},
    };
    use chrono::{Duration, TimeZone};

    const CHAT_SERVICE: Uuid = Uuid::from_u128(0x8a2d4f10_5c3e_4b2a_8f1d_0e9c7b6a5d01);

    fn hours() -> Arc<BusinessHours> {
        Arc::new(BusinessHours::from_config(&ScheduleConfig::default()).unwrap())
    }

    fn service_with(repository: MemoryRepository, config: BookingConfig) -> BookingService {
        let dispatcher = NotificationDispatcher::new(Arc::new(LogNotifier), &NotificationsConfig::default());
        BookingService::new(Arc::new(repository), dispatcher, hours(), &config)
    }

    fn service() -> BookingService {
        service_with(MemoryRepository::seeded(), BookingConfig::default())
    }

    fn request(reference: &str, at: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            booking_reference: Some(reference.to_string()),
            doctor_id: Some(SEED_DOCTOR_ID.to_string()),
            service_id: Some(CHAT_SERVICE.to_string()),
            patient_name: Some("Anil Joshi".to_string()),
            patient_email: Some("anil@example.com".to_string()),
            patient_phone: Some("+919833333333".to_string()),
            main_concern: Some("Back pain".to_string()),
            appointment_datetime: Some(at.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_conflict_then_cancel_frees_slot() {
        let bookings = service();
        let at = "2030-06-11T09:00:00.000Z";

        let first = bookings.create(request("AAAA0001", at)).await.unwrap();
        assert_eq!(first.status, BookingStatus::Pending);
        assert_eq!(first.timezone, "Asia/Kolkata");

        let clash = bookings.create(request("AAAA0002", at)).await;
        assert!(matches!(clash, Err(AppError::SlotConflict)));

        bookings.update_status(first.id, BookingStatus::Cancelled).await.unwrap();
        let again = bookings.create(request("AAAA0003", at)).await.unwrap();
        assert_eq!(again.booking_reference, "AAAA0003");
    }

    #[tokio::test]
    async fn test_colliding_reference_is_regenerated() {
        let bookings = service();
        bookings
            .create(request("SAMEREF1", "2030-06-11T09:00:00Z"))
            .await
            .unwrap();

        let second = bookings
            .create(request("SAMEREF1", "2030-06-11T09:30:00Z"))
            .await
            .unwrap();
        assert_ne!(second.booking_reference, "SAMEREF1");
        assert!(crate::services::reference::is_well_formed(&second.booking_reference));
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected_before_write() {
        let bookings = service();
        let mut req = request("AAAA0001", "2030-06-11T09:00:00Z");
        req.service_id = Some(Uuid::new_v4().to_string());

        assert!(matches!(bookings.create(req).await, Err(AppError::Validation(_))));
        assert!(bookings.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_receives_committed_booking() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.booking.booking_reference == "NOTIFY01" && n.service.id == CHAT_SERVICE)
            .times(1)
            .returning(|_| Err(AppError::Notification("smtp down".to_string())));

        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), &NotificationsConfig::default());
        let bookings = BookingService::new(
            Arc::new(MemoryRepository::seeded()),
            dispatcher,
            hours(),
            &BookingConfig::default(),
        );

        let (booking, notification) = bookings
            .claim(request("NOTIFY01", "2030-06-11T10:00:00Z"))
            .await
            .unwrap();
        assert!(!notification.await.unwrap());
        // the failed notification leaves the booking in place
        assert!(bookings.get(booking.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_lenient_status_updates() {
        let bookings = service();
        let booking = bookings
            .create(request("AAAA0001", "2030-06-11T09:00:00Z"))
            .await
            .unwrap();

        let completed = bookings.update_status(booking.id, BookingStatus::Completed).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert!(completed.updated_at >= booking.updated_at);

        let reopened = bookings.update_status(booking.id, BookingStatus::Pending).await.unwrap();
        assert_eq!(reopened.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_enforced_transitions() {
        let bookings = service_with(
            MemoryRepository::seeded(),
            BookingConfig {
                enforce_transitions: true,
                ..BookingConfig::default()
            },
        );
        let booking = bookings
            .create(request("AAAA0001", "2030-06-11T09:00:00Z"))
            .await
            .unwrap();

        let skipped = bookings.update_status(booking.id, BookingStatus::Completed).await;
        assert!(matches!(skipped, Err(AppError::InvalidTransition(_))));

        bookings.update_status(booking.id, BookingStatus::Confirmed).await.unwrap();
        bookings.update_status(booking.id, BookingStatus::Completed).await.unwrap();
        let back = bookings.update_status(booking.id, BookingStatus::Pending).await;
        assert!(matches!(back, Err(AppError::InvalidTransition(_))));
    }

    /// Store where another admin changes the status right after every read
    struct InterleavedStore {
        inner: MemoryRepository,
        other_admin_sets: BookingStatus,
    }

    #[async_trait::async_trait]
    impl ClinicStore for InterleavedStore {
        async fn ping(&self) -> AppResult<()> {
            self.inner.ping().await
        }
        async fn list_doctors(&self) -> AppResult<Vec<crate::models::Doctor>> {
            self.inner.list_doctors().await
        }
        async fn get_doctor(&self, id: Uuid) -> AppResult<Option<crate::models::Doctor>> {
            self.inner.get_doctor(id).await
        }
        async fn list_services(&self, doctor_id: Option<Uuid>, active_only: bool) -> AppResult<Vec<crate::models::Service>> {
            self.inner.list_services(doctor_id, active_only).await
        }
        async fn get_service(&self, id: Uuid) -> AppResult<Option<crate::models::Service>> {
            self.inner.get_service(id).await
        }
        async fn taken_instants(&self, doctor_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
            self.inner.taken_instants(doctor_id, from, to).await
        }
        async fn insert_booking(&self, booking: &crate::models::NewBooking) -> AppResult<Booking> {
            self.inner.insert_booking(booking).await
        }
        async fn list_bookings(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>> {
            self.inner.list_bookings(status).await
        }
        async fn get_booking(&self, id: Uuid) -> AppResult<Option<BookingWithService>> {
            let found = self.inner.get_booking(id).await?;
            self.inner.update_booking_status(id, self.other_admin_sets, None).await?;
            Ok(found)
        }
        async fn update_booking_status(
            &self,
            id: Uuid,
            status: BookingStatus,
            expected: Option<BookingStatus>,
        ) -> AppResult<Booking> {
            self.inner.update_booking_status(id, status, expected).await
        }
    }

    #[tokio::test]
    async fn test_enforced_update_loses_to_concurrent_change() {
        let inner = MemoryRepository::seeded();
        let seeded = service_with(inner.clone(), BookingConfig::default());
        let booking = seeded
            .create(request("RACE0001", "2030-06-11T09:00:00Z"))
            .await
            .unwrap();

        let dispatcher = NotificationDispatcher::new(Arc::new(LogNotifier), &NotificationsConfig::default());
        let bookings = BookingService::new(
            Arc::new(InterleavedStore {
                inner: inner.clone(),
                other_admin_sets: BookingStatus::Cancelled,
            }),
            dispatcher,
            hours(),
            &BookingConfig {
                enforce_transitions: true,
                ..BookingConfig::default()
            },
        );

        // pending -> confirmed passes the check, but the booking was cancelled meanwhile
        let result = bookings.update_status(booking.id, BookingStatus::Confirmed).await;
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));

        let stored = inner.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_unknown_booking_is_not_found() {
        let result = service().update_status(Uuid::new_v4(), BookingStatus::Confirmed).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_overview_partitions_and_counts() {
        let bookings = service();
        let now = Utc.with_ymd_and_hms(2030, 6, 11, 12, 0, 0).unwrap();

        let past = bookings.create(request("PAST0001", "2030-06-11T09:00:00Z")).await.unwrap();
        let future = bookings.create(request("NEXT0001", "2030-06-11T13:00:00Z")).await.unwrap();
        let cancelled = bookings.create(request("CANC0001", "2030-06-11T14:00:00Z")).await.unwrap();
        bookings.update_status(cancelled.id, BookingStatus::Cancelled).await.unwrap();
        bookings.update_status(past.id, BookingStatus::Completed).await.unwrap();

        let overview = bookings.overview(None, now).await.unwrap();
        assert_eq!(overview.counts.total, 3);
        assert_eq!(overview.counts.pending, 1);
        assert_eq!(overview.counts.completed, 1);
        assert_eq!(overview.counts.cancelled, 1);

        let upcoming: Vec<Uuid> = overview.upcoming.iter().map(|b| b.booking.id).collect();
        let earlier: Vec<Uuid> = overview.past.iter().map(|b| b.booking.id).collect();
        assert_eq!(upcoming, vec![future.id]);
        assert_eq!(earlier, vec![past.id, cancelled.id]);
    }

    #[tokio::test]
    async fn test_status_filter_keeps_ascending_order() {
        let bookings = service();
        let later = bookings.create(request("LATE0001", "2030-06-12T09:00:00Z")).await.unwrap();
        let sooner = bookings.create(request("SOON0001", "2030-06-11T09:00:00Z")).await.unwrap();
        let other = bookings.create(request("OTHR0001", "2030-06-11T10:00:00Z")).await.unwrap();
        bookings.update_status(other.id, BookingStatus::Confirmed).await.unwrap();

        let pending = bookings.list(Some(BookingStatus::Pending)).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|b| b.booking.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert!(pending.iter().all(|b| b.service.is_some()));
    }

    #[test]
    fn test_partition_boundary_counts_as_upcoming() {
        let now = Utc::now();
        let mut booking = crate::services::notifications::tests::sample_notification().booking;
        booking.appointment_datetime = now;
        let at_now = BookingWithService {
            booking: booking.clone(),
            service: None,
        };
        booking.appointment_datetime = now - Duration::minutes(1);
        let before = BookingWithService { booking, service: None };

        let (upcoming, past) = partition_bookings(vec![before, at_now], now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(past.len(), 1);
    }
}
