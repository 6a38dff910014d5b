//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, bookings, catalog, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Booking API",
        version = "1.0.0",
        description = "Consultation booking and admin dashboard REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        catalog::list_doctors,
        catalog::get_doctor,
        catalog::get_availability,
        catalog::list_services,
        // Bookings
        bookings::create_booking,
        bookings::new_reference,
        // Dashboard
        admin::login,
        admin::list_bookings,
        admin::get_booking,
        admin::update_booking_status,
    ),
    components(
        schemas(
            // Catalog
            crate::models::Doctor,
            crate::models::Service,
            crate::models::ServiceKind,
            crate::models::service::ServiceListing,
            crate::models::DayAvailability,
            crate::models::SlotAvailability,
            // Bookings
            crate::models::Booking,
            crate::models::BookingStatus,
            crate::models::BookingWithService,
            crate::models::CreateBookingRequest,
            bookings::CreateBookingResponse,
            bookings::ReferenceResponse,
            // Dashboard
            crate::models::admin::LoginRequest,
            crate::models::admin::LoginResponse,
            crate::models::booking::UpdateBookingStatus,
            crate::models::BookingsOverview,
            crate::models::StatusCounts,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Doctors, services and availability"),
        (name = "bookings", description = "Consultation booking"),
        (name = "admin", description = "Admin dashboard")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by dashboard endpoints
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
