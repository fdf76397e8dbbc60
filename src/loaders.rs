//! Mapping from Enphase records to target rows.
//!
//! Loaders only write through a [`DayWriter`]; committing is up to the
//! caller so a day's summary and intervals land together.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::db::{DayWriter, DbError, GenerationDaySummary, GenerationInterval};
use crate::fetcher::{DailySummary, IntervalSample};
use crate::window::local_datetime;

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryLoader;

impl SummaryLoader {
    pub fn new() -> Self {
        Self
    }

    /// The row is keyed by the requested day, not by whatever date the
    /// provider echoes back.
    pub fn to_row(&self, day: NaiveDate, summary: &DailySummary) -> GenerationDaySummary {
        if let Some(reported) = summary.summary_date.filter(|reported| *reported != day) {
            warn!(%day, %reported, "Summary date reported by the API differs from the requested day");
        }

        GenerationDaySummary {
            generation_date: day,
            inverter_count: summary.modules,
            energy_production_watthr: summary.energy_today,
            energy_lifetime_watthr: summary.energy_lifetime,
        }
    }

    pub async fn load(
        &self,
        writer: &mut dyn DayWriter,
        day: NaiveDate,
        summary: &DailySummary,
    ) -> Result<GenerationDaySummary, DbError> {
        let row = self.to_row(day, summary);
        writer.insert_summary(&row).await?;
        Ok(row)
    }
}

/// Interval rows that belong to one day, plus how many samples did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailBatch {
    pub rows: Vec<GenerationInterval>,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailOutcome {
    pub inserted: u64,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct DetailLoader {
    timezone: Tz,
}

impl DetailLoader {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Keeps the samples whose `end_at` falls on `day` in the system
    /// timezone. The stats endpoint's last interval can end at the next
    /// midnight; those samples belong to the following day and are dropped.
    pub fn prepare(&self, day: NaiveDate, samples: &[IntervalSample]) -> DetailBatch {
        let mut rows = Vec::with_capacity(samples.len());
        let mut dropped = 0;

        for sample in samples {
            let Some(local) = local_datetime(sample.end_at, &self.timezone) else {
                warn!(end_at = sample.end_at, "Interval end_at is not a valid timestamp");
                dropped += 1;
                continue;
            };

            if local.date_naive() != day {
                debug!(end_at = sample.end_at, local = %local, %day, "Dropping interval outside day");
                dropped += 1;
                continue;
            }

            rows.push(GenerationInterval {
                sample_datetime: local.with_timezone(&Utc),
                generation_date: local.date_naive(),
                power_watts: sample.powr,
                energy_watthr: sample.enwh,
            });
        }

        DetailBatch { rows, dropped }
    }

    pub async fn load(
        &self,
        writer: &mut dyn DayWriter,
        day: NaiveDate,
        samples: &[IntervalSample],
    ) -> Result<DetailOutcome, DbError> {
        let batch = self.prepare(day, samples);
        if batch.rows.is_empty() {
            debug!(%day, dropped = batch.dropped, "No intervals to insert");
            return Ok(DetailOutcome {
                inserted: 0,
                dropped: batch.dropped,
            });
        }

        let inserted = writer.insert_intervals(&batch.rows).await?;
        Ok(DetailOutcome {
            inserted,
            dropped: batch.dropped,
        })
    }
}
