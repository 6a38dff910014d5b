//! Slot availability models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One candidate start time and whether it is taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlotAvailability {
    pub start: DateTime<Utc>,
    /// start + service duration, when a service was given
    pub end: Option<DateTime<Utc>>,
    pub booked: bool,
}

/// Availability of a doctor on one provider-local day
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayAvailability {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// The clinic does not open on this weekday
    pub closed: bool,
    pub slots: Vec<SlotAvailability>,
}

/// Query parameters for the availability endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AvailabilityQuery {
    /// Provider-local date (YYYY-MM-DD)
    pub date: String,
    /// Service used to compute slot end times
    pub service_id: Option<Uuid>,
}
