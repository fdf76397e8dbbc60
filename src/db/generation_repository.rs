use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, error, instrument};

use crate::db::schema::SchemaMapping;
use crate::db::store::{DayWriter, GenerationStore};
use crate::db::{DbError, GenerationDaySummary, GenerationInterval};

#[derive(Clone)]
pub struct GenerationRepository {
    pool: PgPool,
    schema: SchemaMapping,
}

impl GenerationRepository {
    pub fn new(pool: PgPool, schema: SchemaMapping) -> Self {
        Self { pool, schema }
    }

    /// Summary rows in `[start, end_exclusive)`, oldest first
    #[instrument(skip(self))]
    pub async fn find_summaries(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<GenerationDaySummary>, DbError> {
        let sql = format!(
            r#"
            SELECT generation_date, inverter_count, energy_production_watthr, energy_lifetime_watthr
            FROM {}
            WHERE generation_date >= $1 AND generation_date < $2
            ORDER BY generation_date
            "#,
            self.schema.summary_table()
        );

        let rows = sqlx::query_as::<_, GenerationDaySummary>(&sql)
            .bind(start)
            .bind(end_exclusive)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} summary rows", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn find_intervals_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<GenerationInterval>, DbError> {
        let sql = format!(
            r#"
            SELECT sample_datetime, generation_date, power_watts, energy_watthr
            FROM {}
            WHERE generation_date = $1
            ORDER BY sample_datetime
            "#,
            self.schema.detail_table()
        );

        let rows = sqlx::query_as::<_, GenerationInterval>(&sql)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} interval rows", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl GenerationStore for GenerationRepository {
    #[instrument(skip(self))]
    async fn count_summaries_between(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<i64, DbError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE generation_date >= $1 AND generation_date < $2",
            self.schema.summary_table()
        );

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end_exclusive)
            .fetch_one(&self.pool)
            .await?;

        debug!("Found {} summary rows between {} and {}", count, start, end_exclusive);
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn begin_day(&self, day: NaiveDate) -> Result<Box<dyn DayWriter>, DbError> {
        debug!("Beginning transaction for {}", day);
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgDayWriter {
            tx,
            schema: self.schema.clone(),
            day,
        }))
    }
}

/// One day's transaction. sqlx rolls it back if it is dropped uncommitted.
struct PgDayWriter {
    tx: Transaction<'static, Postgres>,
    schema: SchemaMapping,
    day: NaiveDate,
}

#[async_trait]
impl DayWriter for PgDayWriter {
    async fn insert_summary(&mut self, row: &GenerationDaySummary) -> Result<(), DbError> {
        sqlx::query(&self.schema.summary_insert_sql())
            .bind(row.generation_date)
            .bind(row.inverter_count)
            .bind(row.energy_production_watthr)
            .bind(row.energy_lifetime_watthr)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                error!(
                    generation_date = %row.generation_date,
                    error = %e,
                    "Failed to insert daily summary"
                );
                e
            })?;
        Ok(())
    }

    async fn insert_intervals(&mut self, rows: &[GenerationInterval]) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(self.schema.detail_insert_prefix());
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.sample_datetime)
                .push_bind(row.generation_date)
                .push_bind(row.power_watts)
                .push_bind(row.energy_watthr);
        });

        let result = builder
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                error!(day = %self.day, count = rows.len(), error = %e, "Failed to insert intervals");
                e
            })?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let day = self.day;
        self.tx.commit().await?;
        debug!("Committed transaction for {}", day);
        Ok(())
    }
}
