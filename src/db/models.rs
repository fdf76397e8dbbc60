use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Row of `generation_daily_summary`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GenerationDaySummary {
    pub generation_date: NaiveDate,
    pub inverter_count: i32,
    pub energy_production_watthr: i64,
    pub energy_lifetime_watthr: i64,
}

/// Row of `generation_detail`, one per five-minute interval.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GenerationInterval {
    pub sample_datetime: DateTime<Utc>,
    pub generation_date: NaiveDate,
    pub power_watts: i32,
    pub energy_watthr: i32,
}
