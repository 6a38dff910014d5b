//! Doctor (provider) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Medical professional whose calendar is booked
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    /// Contact email, also the recipient of new-booking notifications
    pub email: String,
    pub specialty: String,
    pub qualifications: String,
    pub bio: String,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// First name as shown in service summaries ("with Jane")
    pub fn first_name(&self) -> &str {
        self.name
            .split_whitespace()
            .find(|part| !part.ends_with('.'))
            .unwrap_or(&self.name)
    }
}
