#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use enphase_loader::db::{
    DayWriter, DbError, GenerationDaySummary, GenerationInterval, GenerationStore,
};
use enphase_loader::rate_gate::Clock;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Connect to the test database named by DATABASE_URL, or None when it is
/// not configured so Postgres-backed tests can be skipped.
pub async fn test_pool() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Clock that only moves when told to or when something sleeps on it.
#[derive(Clone)]
pub struct FakeClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock().unwrap() += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Summary,
    Intervals,
    Commit,
}

#[derive(Default)]
pub struct MemoryState {
    pub summaries: Vec<GenerationDaySummary>,
    pub intervals: Vec<GenerationInterval>,
    pub commits: Vec<NaiveDate>,
    pub interval_batches: usize,
    pub fail_at: Option<FailPoint>,
}

/// In-memory stand-in for the Postgres repository with the same
/// all-or-nothing commit per day.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(point: FailPoint) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().fail_at = Some(point);
        store
    }

    pub fn with_summary(self, row: GenerationDaySummary) -> Self {
        self.state.lock().unwrap().summaries.push(row);
        self
    }

    pub fn summaries(&self) -> Vec<GenerationDaySummary> {
        self.state.lock().unwrap().summaries.clone()
    }

    pub fn intervals(&self) -> Vec<GenerationInterval> {
        self.state.lock().unwrap().intervals.clone()
    }

    pub fn commits(&self) -> Vec<NaiveDate> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn interval_batches(&self) -> usize {
        self.state.lock().unwrap().interval_batches
    }
}

fn injected_failure(what: &str) -> DbError {
    DbError::SqlxError(sqlx::Error::Protocol(format!("injected {what} failure")))
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn count_summaries_between(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<i64, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .summaries
            .iter()
            .filter(|row| row.generation_date >= start && row.generation_date < end_exclusive)
            .count() as i64)
    }

    async fn begin_day(&self, day: NaiveDate) -> Result<Box<dyn DayWriter>, DbError> {
        Ok(Box::new(MemoryDayWriter {
            state: self.state.clone(),
            day,
            summary: None,
            intervals: Vec::new(),
            batches: 0,
        }))
    }
}

struct MemoryDayWriter {
    state: Arc<Mutex<MemoryState>>,
    day: NaiveDate,
    summary: Option<GenerationDaySummary>,
    intervals: Vec<GenerationInterval>,
    batches: usize,
}

impl MemoryDayWriter {
    fn fail_at(&self) -> Option<FailPoint> {
        self.state.lock().unwrap().fail_at
    }
}

#[async_trait]
impl DayWriter for MemoryDayWriter {
    async fn insert_summary(&mut self, row: &GenerationDaySummary) -> Result<(), DbError> {
        if self.fail_at() == Some(FailPoint::Summary) {
            return Err(injected_failure("summary insert"));
        }
        let duplicate = self
            .state
            .lock()
            .unwrap()
            .summaries
            .iter()
            .any(|existing| existing.generation_date == row.generation_date);
        if duplicate || self.summary.is_some() {
            return Err(DbError::SqlxError(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint".to_string(),
            )));
        }
        self.summary = Some(row.clone());
        Ok(())
    }

    async fn insert_intervals(&mut self, rows: &[GenerationInterval]) -> Result<u64, DbError> {
        if self.fail_at() == Some(FailPoint::Intervals) {
            return Err(injected_failure("interval insert"));
        }
        self.intervals.extend_from_slice(rows);
        self.batches += 1;
        Ok(rows.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        if self.fail_at() == Some(FailPoint::Commit) {
            return Err(injected_failure("commit"));
        }
        let writer = *self;
        let mut state = writer.state.lock().unwrap();
        state.summaries.extend(writer.summary);
        state.intervals.extend(writer.intervals);
        state.interval_batches += writer.batches;
        state.commits.push(writer.day);
        Ok(())
    }
}
