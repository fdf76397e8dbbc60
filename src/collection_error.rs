use std::fmt;

use chrono::NaiveDate;

use crate::db::DbError;
use crate::fetch_error::FetchError;

/// Point in a day's collection at which work stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStage {
    SummaryFetch,
    SummaryLoad,
    DetailFetch,
    DetailLoad,
    Commit,
}

impl fmt::Display for DayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayStage::SummaryFetch => "summary fetch",
            DayStage::SummaryLoad => "summary load",
            DayStage::DetailFetch => "detail fetch",
            DayStage::DetailLoad => "detail load",
            DayStage::Commit => "commit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("There is already data loaded for the date range {start} to {end} ({existing} summary rows)")]
    RangeAlreadyLoaded {
        start: NaiveDate,
        end: NaiveDate,
        existing: i64,
    },

    #[error("Failed to check for loaded days: {0}")]
    RangeCheck(#[source] DbError),

    #[error("{stage} failed for {day}: {source}")]
    Fetch {
        day: NaiveDate,
        stage: DayStage,
        #[source]
        source: FetchError,
    },

    #[error("{stage} failed for {day}: {source}")]
    Persistence {
        day: NaiveDate,
        stage: DayStage,
        #[source]
        source: DbError,
    },
}

impl CollectionError {
    /// Day and stage of a failure that happened inside the loop.
    pub fn failed_at(&self) -> Option<(NaiveDate, DayStage)> {
        match self {
            CollectionError::Fetch { day, stage, .. }
            | CollectionError::Persistence { day, stage, .. } => Some((*day, *stage)),
            _ => None,
        }
    }
}
