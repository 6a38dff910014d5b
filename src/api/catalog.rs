//! Catalog API endpoints: doctors, services and slot availability

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        availability::AvailabilityQuery,
        booking::is_supported_date,
        service::{ServiceListing, ServiceQuery},
        DayAvailability, Doctor,
    },
    AppState,
};

/// List doctors
#[utoipa::path(
    get,
    path = "/doctors",
    tag = "catalog",
    responses(
        (status = 200, description = "Doctors", body = Vec<Doctor>)
    )
)]
pub async fn list_doctors(State(state): State<AppState>) -> AppResult<Json<Vec<Doctor>>> {
    let doctors = state.services.catalog.list_doctors().await?;
    Ok(Json(doctors))
}

/// Get doctor by ID
#[utoipa::path(
    get,
    path = "/doctors/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Doctor ID")),
    responses(
        (status = 200, description = "Doctor profile", body = Doctor),
        (status = 404, description = "Unknown doctor", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_doctor(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Doctor>> {
    let doctor = state.services.catalog.get_doctor(id).await?;
    Ok(Json(doctor))
}

/// List active services, cheapest first
#[utoipa::path(
    get,
    path = "/services",
    tag = "catalog",
    params(ServiceQuery),
    responses(
        (status = 200, description = "Active services", body = Vec<ServiceListing>)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    query: Result<Query<ServiceQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ServiceListing>>> {
    let Query(query) = query?;
    let services = state.services.catalog.list_services(query.doctor_id).await?;
    Ok(Json(services))
}

/// Bookable slots of a doctor on one day, each flagged free or booked
#[utoipa::path(
    get,
    path = "/doctors/{id}/availability",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Doctor ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Slots of the day", body = DayAvailability),
        (status = 400, description = "Invalid date", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown doctor or service", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> AppResult<Json<DayAvailability>> {
    let Query(query) = query?;
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .ok()
        .filter(|date| is_supported_date(*date))
        .ok_or_else(|| AppError::Validation("Invalid date (use YYYY-MM-DD)".to_string()))?;

    let day = state
        .services
        .availability
        .day(id, date, query.service_id, Utc::now())
        .await?;
    Ok(Json(day))
}
