//! Slot generation from fixed business hours
//!
//! Pure computation: no store access, no caching. A day's slots are the grid
//! points `open, open + step, ...` strictly before closing time, in the
//! provider's local time, minus those at or before "now".

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc, Weekday};

use crate::{
    config::ScheduleConfig,
    error::{AppError, AppResult},
};

/// Clinic opening rules
#[derive(Debug, Clone)]
pub struct BusinessHours {
    open: NaiveTime,
    close: NaiveTime,
    step: Duration,
    closed_days: Vec<Weekday>,
    offset: FixedOffset,
}

impl BusinessHours {
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        slot_minutes: u32,
        closed_days: Vec<Weekday>,
        offset: FixedOffset,
    ) -> AppResult<Self> {
        if slot_minutes == 0 {
            return Err(AppError::Internal("schedule.slot_minutes must be positive".to_string()));
        }
        if close <= open {
            return Err(AppError::Internal(
                "schedule.close_time must be after schedule.open_time".to_string(),
            ));
        }
        Ok(Self {
            open,
            close,
            step: Duration::minutes(slot_minutes as i64),
            closed_days,
            offset,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> AppResult<Self> {
        let parse_time = |value: &str, key: &str| {
            NaiveTime::parse_from_str(value, "%H:%M")
                .map_err(|_| AppError::Internal(format!("Invalid schedule.{} (use HH:MM)", key)))
        };

        let closed_days = config
            .closed_weekdays
            .iter()
            .map(|day| {
                day.parse::<Weekday>()
                    .map_err(|_| AppError::Internal(format!("Invalid closed weekday: {}", day)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(
            parse_time(&config.open_time, "open_time")?,
            parse_time(&config.close_time, "close_time")?,
            config.slot_minutes,
            closed_days,
            parse_utc_offset(&config.utc_offset)?,
        )
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.closed_days.contains(&date.weekday())
    }

    /// Number of grid points in an open day
    pub fn grid_len(&self) -> usize {
        let span = self.close - self.open;
        let step = self.step.num_seconds();
        ((span.num_seconds() + step - 1) / step) as usize
    }

    /// Convert a provider-local wall-clock time to UTC
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        (local - Duration::seconds(self.offset.local_minus_utc() as i64)).and_utc()
    }

    /// UTC bounds of a provider-local day, 00:00:00.000 to 23:59:59.999 inclusive
    pub fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_utc(date.and_time(NaiveTime::default()));
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        (start, end)
    }

    /// Bookable start instants of `date` that lie strictly after `now`.
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn slots(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = DateTime<Utc>> + Clone {
        let count = if self.is_closed(date) { 0 } else { self.grid_len() };
        let first = self.to_utc(date.and_time(self.open));
        let step = self.step;

        (0..count)
            .map(move |i| first + step * i as i32)
            .filter(move |slot| *slot > now)
    }

    /// Whether an instant falls on the slot grid of an open day
    pub fn is_on_grid(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.offset).naive_local();
        if self.is_closed(local.date()) {
            return false;
        }
        let since_open = local.time() - self.open;
        local.time() >= self.open
            && local.time() < self.close
            && since_open.num_milliseconds() % self.step.num_milliseconds() == 0
    }
}

/// Parse "+05:30", "-04:00" or "Z"
pub fn parse_utc_offset(value: &str) -> AppResult<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    value
        .parse::<FixedOffset>()
        .map_err(|_| AppError::Internal(format!("Invalid UTC offset: {}", value)))
}
