//! API handlers for the clinic booking REST endpoints

pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::admin::AdminClaims, AppState};

/// Extractor for an authenticated dashboard session
pub struct AdminSession(pub AdminClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing or invalid authorization header".to_string()))?;

        let claims = state.services.admin.verify_token(bearer.token())?;
        Ok(AdminSession(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/doctors", get(catalog::list_doctors))
        .route("/doctors/:id", get(catalog::get_doctor))
        .route("/doctors/:id/availability", get(catalog::get_availability))
        .route("/services", get(catalog::list_services))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/reference", get(bookings::new_reference))
        // Dashboard
        .route("/admin/login", post(admin::login))
        .route("/admin/bookings", get(admin::list_bookings))
        .route("/admin/bookings/:id", get(admin::get_booking))
        .route("/admin/bookings/:id/status", put(admin::update_booking_status))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
