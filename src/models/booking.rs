//! Booking model, lifecycle status and booking requests

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::service::Service;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// BookingStatus
// ---------------------------------------------------------------------------

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// Whether a booking in this status holds its (doctor, instant) slot
    pub fn holds_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Transition graph applied when transitions are enforced.
    /// Setting the current status again is always accepted.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
            )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown booking status: {}", s)))
    }
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// Persisted booking record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    /// Human-facing 8-character reference
    pub booking_reference: String,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub patient_address: Option<String>,
    pub patient_city: Option<String>,
    pub patient_state: Option<String>,
    pub patient_pincode: Option<String>,
    pub main_concern: String,
    pub comments: Option<String>,
    /// Appointment start, UTC
    pub appointment_datetime: DateTime<Utc>,
    /// Patient display timezone, cosmetic only
    pub timezone: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking joined with its service, as listed on the dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingWithService {
    #[serde(flatten)]
    pub booking: Booking,
    pub service: Option<Service>,
}

/// Validated booking ready to be claimed in the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub booking_reference: String,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub patient_address: Option<String>,
    pub patient_city: Option<String>,
    pub patient_state: Option<String>,
    pub patient_pincode: Option<String>,
    pub main_concern: String,
    pub comments: Option<String>,
    pub appointment_datetime: DateTime<Utc>,
    pub timezone: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Booking creation request (`POST /bookings`)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(required, length(min = 1))]
    pub booking_reference: Option<String>,
    #[validate(required, length(min = 1))]
    pub doctor_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub service_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub patient_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub patient_email: Option<String>,
    #[validate(required, length(min = 1))]
    pub patient_phone: Option<String>,
    pub patient_address: Option<String>,
    pub patient_city: Option<String>,
    pub patient_state: Option<String>,
    pub patient_pincode: Option<String>,
    #[validate(required, length(min = 1))]
    pub main_concern: Option<String>,
    pub comments: Option<String>,
    /// ISO 8601 instant, e.g. 2025-06-10T09:00:00.000Z
    #[validate(required, length(min = 1))]
    pub appointment_datetime: Option<String>,
    /// Display timezone (defaults to the clinic's)
    pub timezone: Option<String>,
}

impl CreateBookingRequest {
    /// Check required fields and normalize the request into a storable booking.
    /// No store access happens here.
    pub fn into_new_booking(self, default_timezone: &str) -> AppResult<NewBooking> {
        self.validate().map_err(|_| AppError::missing_fields())?;

        let doctor_id = parse_id(self.doctor_id.as_deref(), "doctorId")?;
        let service_id = parse_id(self.service_id.as_deref(), "serviceId")?;
        let appointment_datetime = self
            .appointment_datetime
            .as_deref()
            .and_then(parse_appointment_instant)
            .ok_or_else(|| AppError::Validation("Invalid appointmentDatetime".to_string()))?;

        Ok(NewBooking {
            booking_reference: self.booking_reference.unwrap_or_default(),
            doctor_id,
            service_id,
            patient_name: self.patient_name.unwrap_or_default(),
            patient_email: self.patient_email.unwrap_or_default(),
            patient_phone: self.patient_phone.unwrap_or_default(),
            patient_address: non_empty(self.patient_address),
            patient_city: non_empty(self.patient_city),
            patient_state: non_empty(self.patient_state),
            patient_pincode: non_empty(self.patient_pincode),
            main_concern: self.main_concern.unwrap_or_default(),
            comments: non_empty(self.comments),
            appointment_datetime,
            timezone: non_empty(self.timezone).unwrap_or_else(|| default_timezone.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_id(value: Option<&str>, field: &str) -> AppResult<Uuid> {
    value
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| AppError::Validation(format!("Invalid {}", field)))
}

/// Calendar years accepted for appointments and availability lookups
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1970..=9999;

pub fn is_supported_date(date: NaiveDate) -> bool {
    SUPPORTED_YEARS.contains(&date.year())
}

/// Parse a client-supplied instant and normalize it to UTC with millisecond precision.
///
/// RFC 3339 strings keep their offset; a datetime without offset is read as UTC.
/// Instants outside `SUPPORTED_YEARS` are rejected.
pub fn parse_appointment_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let instant = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())?
            .and_utc(),
    };
    truncate_to_millis(instant).filter(|instant| is_supported_date(instant.date_naive()))
}

pub fn truncate_to_millis(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    instant.with_nanosecond(instant.nanosecond() / 1_000_000 * 1_000_000)
}

/// Status update request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingStatus {
    pub status: BookingStatus,
}

/// Query parameters for the dashboard listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookingQuery {
    /// Only bookings in this status
    pub status: Option<BookingStatus>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Number of listed bookings per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a BookingStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut counts, status| {
            counts.total += 1;
            match status {
                BookingStatus::Pending => counts.pending += 1,
                BookingStatus::Confirmed => counts.confirmed += 1,
                BookingStatus::Completed => counts.completed += 1,
                BookingStatus::Cancelled => counts.cancelled += 1,
            }
            counts
        })
    }
}

/// Dashboard listing split for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingsOverview {
    pub counts: StatusCounts,
    /// Appointment not yet started and not cancelled, soonest first
    pub upcoming: Vec<BookingWithService>,
    /// Everything else
    pub past: Vec<BookingWithService>,
}
