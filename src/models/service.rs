//! Consultation service model

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// How a consultation takes place. Chosen when the service is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Phone,
    Video,
    Chat,
    InPerson,
}

impl ServiceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Phone => "Phone Call Consultation",
            ServiceKind::Video => "Video Call Consultation",
            ServiceKind::Chat => "Chat Consultation",
            ServiceKind::InPerson => "In-Person Consultation",
        }
    }

    /// Pre-filled WhatsApp link asking the doctor for this kind of consultation
    pub fn contact_link(&self, whatsapp_number: &str, doctor_first_name: &str) -> String {
        let text = format!("Hi {}, I'd like a {}", doctor_first_name, self.label());
        format!(
            "https://wa.me/{}?text={}",
            whatsapp_number.trim_start_matches('+'),
            urlencoding::encode(&text)
        )
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Bookable consultation offered by one doctor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Service {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: ServiceKind,
    /// Duration in minutes (> 0)
    pub duration_minutes: i32,
    /// Fee, never negative
    #[schema(value_type = String)]
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }
}

/// Service as listed on the booking page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub service: Service,
    pub contact_link: Option<String>,
}

/// Query parameters for the service listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ServiceQuery {
    /// Only services of this doctor
    pub doctor_id: Option<Uuid>,
}
