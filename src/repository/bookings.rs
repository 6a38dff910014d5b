//! Bookings domain methods on PgRepository

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::PgRepository;
use crate::{
    error::{AppError, AppResult},
    models::{Booking, BookingStatus, BookingWithService, NewBooking, Service},
};

/// Partial unique index over (doctor_id, appointment_datetime) for pending/confirmed rows
pub const ACTIVE_SLOT_INDEX: &str = "bookings_active_slot_key";

/// Unique constraint on booking_reference
pub const REFERENCE_KEY: &str = "bookings_reference_key";

const BOOKING_WITH_SERVICE: &str = r#"
    SELECT b.*,
           s.id AS s_id, s.doctor_id AS s_doctor_id, s.name AS s_name,
           s.description AS s_description, s.kind AS s_kind,
           s.duration_minutes AS s_duration_minutes, s.price AS s_price,
           s.is_active AS s_is_active, s.created_at AS s_created_at
    FROM bookings b
    LEFT JOIN services s ON s.id = b.service_id
"#;

impl PgRepository {
    /// Appointment instants held by active bookings of a doctor within [from, to]
    pub async fn bookings_taken_instants(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let rows = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT appointment_datetime FROM bookings
            WHERE doctor_id = $1
              AND appointment_datetime >= $2
              AND appointment_datetime <= $3
              AND status IN ('pending', 'confirmed')
            ORDER BY appointment_datetime
            "#,
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a pending booking. The partial unique index turns a taken slot
    /// into a constraint violation, so the check and the write are one statement.
    pub async fn bookings_insert(&self, booking: &NewBooking) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                booking_reference, doctor_id, service_id,
                patient_name, patient_email, patient_phone,
                patient_address, patient_city, patient_state, patient_pincode,
                main_concern, comments, appointment_datetime, timezone, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'pending')
            RETURNING *
            "#,
        )
        .bind(&booking.booking_reference)
        .bind(booking.doctor_id)
        .bind(booking.service_id)
        .bind(&booking.patient_name)
        .bind(&booking.patient_email)
        .bind(&booking.patient_phone)
        .bind(&booking.patient_address)
        .bind(&booking.patient_city)
        .bind(&booking.patient_state)
        .bind(&booking.patient_pincode)
        .bind(&booking.main_concern)
        .bind(&booking.comments)
        .bind(booking.appointment_datetime)
        .bind(&booking.timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &booking.booking_reference))
    }

    /// List bookings joined with their service
    pub async fn bookings_list(&self, status: Option<BookingStatus>) -> AppResult<Vec<BookingWithService>> {
        let query = format!(
            "{} WHERE ($1::booking_status IS NULL OR b.status = $1) ORDER BY b.appointment_datetime ASC, b.created_at ASC",
            BOOKING_WITH_SERVICE
        );
        let rows = sqlx::query(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(booking_with_service)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    pub async fn bookings_get(&self, id: Uuid) -> AppResult<Option<BookingWithService>> {
        let query = format!("{} WHERE b.id = $1", BOOKING_WITH_SERVICE);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(booking_with_service)
            .transpose()
            .map_err(AppError::from)
    }

    /// Overwrite status and bump updated_at
    pub async fn bookings_update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        expected: Option<BookingStatus>,
    ) -> AppResult<Booking> {
        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $2, updated_at = NOW()
            WHERE id = $1 AND ($3::booking_status IS NULL OR status = $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, ""))?;

        if let Some(booking) = updated {
            return Ok(booking);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        match expected {
            Some(expected) if exists => Err(stale_status(id, expected)),
            _ => Err(AppError::NotFound(format!("Booking {} not found", id))),
        }
    }
}

/// The booking left `expected` between the transition check and the write
pub(crate) fn stale_status(id: Uuid, expected: BookingStatus) -> AppError {
    AppError::InvalidTransition(format!(
        "Booking {} is no longer {}; reload and retry",
        id, expected
    ))
}

/// Map unique violations to the booking errors callers act on
fn classify_write_error(error: sqlx::Error, reference: &str) -> AppError {
    let constraint = match &error {
        sqlx::Error::Database(db) => db.constraint().map(str::to_owned),
        _ => None,
    };

    match constraint.as_deref() {
        Some(ACTIVE_SLOT_INDEX) => AppError::SlotConflict,
        Some(REFERENCE_KEY) => AppError::DuplicateReference(reference.to_string()),
        _ => AppError::Database(error),
    }
}

fn booking_with_service(row: &PgRow) -> Result<BookingWithService, sqlx::Error> {
    let booking = Booking::from_row(row)?;
    let service = match row.try_get::<Option<Uuid>, _>("s_id")? {
        Some(id) => Some(Service {
            id,
            doctor_id: row.try_get("s_doctor_id")?,
            name: row.try_get("s_name")?,
            description: row.try_get("s_description")?,
            kind: row.try_get("s_kind")?,
            duration_minutes: row.try_get("s_duration_minutes")?,
            price: row.try_get("s_price")?,
            is_active: row.try_get("s_is_active")?,
            created_at: row.try_get("s_created_at")?,
        }),
        None => None,
    };
    Ok(BookingWithService { booking, service })
}
