use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::{DbError, GenerationDaySummary, GenerationInterval};

/// Persistence seen by the collection loop.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Summary rows with `generation_date` in `[start, end_exclusive)`.
    async fn count_summaries_between(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<i64, DbError>;

    /// Opens the unit of work for one day. Dropping the writer without
    /// calling `commit` discards everything written through it.
    async fn begin_day(&self, day: NaiveDate) -> Result<Box<dyn DayWriter>, DbError>;
}

/// Writes for a single day, made durable together by `commit`.
#[async_trait]
pub trait DayWriter: Send {
    async fn insert_summary(&mut self, row: &GenerationDaySummary) -> Result<(), DbError>;

    /// Inserts `rows` as one batch, returning the number of rows written.
    async fn insert_intervals(&mut self, rows: &[GenerationInterval]) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;
}
