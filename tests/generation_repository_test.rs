// Tests for GenerationRepository against Postgres.
// Skipped unless DATABASE_URL points at a test database.

mod common;

use chrono::{DateTime, NaiveDate, Utc};
use common::{date, test_pool};
use enphase_loader::db::{
    DayWriter, GenerationDaySummary, GenerationInterval, GenerationRepository, GenerationStore,
    SchemaMapping,
};
use serial_test::serial;
use sqlx::PgPool;

mod generation_fixtures {
    use super::*;

    pub async fn setup() -> Option<(PgPool, GenerationRepository)> {
        let pool = test_pool().await?;
        let repo = GenerationRepository::new(
            pool.clone(),
            SchemaMapping::in_schema("energy").unwrap(),
        );
        Some((pool, repo))
    }

    // Fixtures live in 1999 so they never collide with real loads
    pub async fn cleanup(pool: &PgPool) {
        sqlx::query("DELETE FROM energy.generation_detail WHERE generation_date < '2000-01-01'")
            .execute(pool)
            .await
            .ok();
        sqlx::query(
            "DELETE FROM energy.generation_daily_summary WHERE generation_date < '2000-01-01'",
        )
        .execute(pool)
        .await
        .ok();
    }

    pub fn summary(day: NaiveDate) -> GenerationDaySummary {
        GenerationDaySummary {
            generation_date: day,
            inverter_count: 24,
            energy_production_watthr: 31_250,
            energy_lifetime_watthr: 48_213_377,
        }
    }

    pub fn interval(day: NaiveDate, minutes: i64) -> GenerationInterval {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
        GenerationInterval {
            sample_datetime: midnight + chrono::Duration::minutes(minutes),
            generation_date: day,
            power_watts: 2_150,
            energy_watthr: 179,
        }
    }
}

use generation_fixtures::*;

#[tokio::test]
#[serial]
async fn test_committed_day_is_persisted() {
    let Some((pool, repo)) = setup().await else {
        return;
    };
    cleanup(&pool).await;
    let day = date(1999, 6, 1);

    let mut writer = repo.begin_day(day).await.unwrap();
    writer.insert_summary(&summary(day)).await.unwrap();
    let inserted = writer
        .insert_intervals(&[interval(day, 5), interval(day, 10), interval(day, 15)])
        .await
        .unwrap();
    writer.commit().await.unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(
        repo.count_summaries_between(day, date(1999, 6, 2)).await.unwrap(),
        1
    );
    assert_eq!(repo.find_summaries(day, date(1999, 6, 2)).await.unwrap(), vec![summary(day)]);

    let rows = repo.find_intervals_for_day(day).await.unwrap();
    assert_eq!(rows.len(), 3);
    let expected: DateTime<Utc> = interval(day, 5).sample_datetime;
    assert_eq!(rows[0].sample_datetime, expected);

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_dropped_writer_rolls_back() {
    let Some((pool, repo)) = setup().await else {
        return;
    };
    cleanup(&pool).await;
    let day = date(1999, 6, 2);

    {
        let mut writer = repo.begin_day(day).await.unwrap();
        writer.insert_summary(&summary(day)).await.unwrap();
        writer.insert_intervals(&[interval(day, 5)]).await.unwrap();
    }

    assert_eq!(
        repo.count_summaries_between(day, date(1999, 6, 3)).await.unwrap(),
        0
    );
    assert!(repo.find_intervals_for_day(day).await.unwrap().is_empty());

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_empty_interval_batch_is_noop() {
    let Some((pool, repo)) = setup().await else {
        return;
    };
    cleanup(&pool).await;
    let day = date(1999, 6, 3);

    let mut writer = repo.begin_day(day).await.unwrap();
    writer.insert_summary(&summary(day)).await.unwrap();
    assert_eq!(writer.insert_intervals(&[]).await.unwrap(), 0);
    writer.commit().await.unwrap();

    assert!(repo.find_intervals_for_day(day).await.unwrap().is_empty());

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_duplicate_summary_violates_unique_date() {
    let Some((pool, repo)) = setup().await else {
        return;
    };
    cleanup(&pool).await;
    let day = date(1999, 6, 4);

    let mut writer = repo.begin_day(day).await.unwrap();
    writer.insert_summary(&summary(day)).await.unwrap();
    writer.commit().await.unwrap();

    let mut writer = repo.begin_day(day).await.unwrap();
    assert!(writer.insert_summary(&summary(day)).await.is_err());
    drop(writer);

    assert_eq!(
        repo.count_summaries_between(day, date(1999, 6, 5)).await.unwrap(),
        1
    );

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_count_is_half_open() {
    let Some((pool, repo)) = setup().await else {
        return;
    };
    cleanup(&pool).await;

    for day in [date(1999, 7, 1), date(1999, 7, 3)] {
        let mut writer = repo.begin_day(day).await.unwrap();
        writer.insert_summary(&summary(day)).await.unwrap();
        writer.commit().await.unwrap();
    }

    assert_eq!(
        repo.count_summaries_between(date(1999, 7, 1), date(1999, 7, 3)).await.unwrap(),
        1
    );
    assert_eq!(
        repo.count_summaries_between(date(1999, 7, 2), date(1999, 7, 3)).await.unwrap(),
        0
    );
    assert_eq!(
        repo.count_summaries_between(date(1999, 7, 1), date(1999, 7, 4)).await.unwrap(),
        2
    );

    cleanup(&pool).await;
}
