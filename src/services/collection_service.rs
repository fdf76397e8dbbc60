use chrono::NaiveDate;
use indicatif::ProgressBar;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::collection_error::{CollectionError, DayStage};
use crate::db::{DayWriter, DbError, GenerationStore};
use crate::fetcher::GenerationSource;
use crate::loaders::{DetailLoader, DetailOutcome, SummaryLoader};
use crate::rate_gate::{Clock, RateGate, SystemClock};
use crate::window::{start_of_day_epoch, CollectionWindow};

/// What a finished (or cleanly stopped) run loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub days_loaded: Vec<NaiveDate>,
    pub intervals_loaded: u64,
    pub intervals_dropped: usize,
    pub cancelled: bool,
}

/// Walks a collection window one day at a time: fetch the summary, load
/// it, fetch the intervals, load them, commit, then wait out the rate gate.
pub struct CollectionService<S, G, C = SystemClock> {
    source: S,
    store: G,
    gate: RateGate<C>,
    summary_loader: SummaryLoader,
    detail_loader: DetailLoader,
    progress: ProgressBar,
}

impl<S, G, C> CollectionService<S, G, C>
where
    S: GenerationSource,
    G: GenerationStore,
    C: Clock,
{
    pub fn new(source: S, store: G, gate: RateGate<C>, detail_loader: DetailLoader) -> Self {
        Self {
            source,
            store,
            gate,
            summary_loader: SummaryLoader::new(),
            detail_loader,
            progress: ProgressBar::hidden(),
        }
    }

    /// Advanced once per committed day.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Refuses a window that already has summary rows in it.
    #[instrument(skip(self, window), fields(window = %window))]
    pub async fn ensure_range_unloaded(
        &self,
        window: &CollectionWindow,
    ) -> Result<(), CollectionError> {
        let existing = self
            .store
            .count_summaries_between(window.start(), window.end_exclusive())
            .await
            .map_err(CollectionError::RangeCheck)?;

        if existing > 0 {
            return Err(CollectionError::RangeAlreadyLoaded {
                start: window.start(),
                end: window.last_day(),
                existing,
            });
        }
        Ok(())
    }

    /// Collects every day of `window` in order. The stop signal is checked
    /// before each day starts; a day already in progress always finishes.
    #[instrument(skip(self, window, stop), fields(window = %window))]
    pub async fn run(
        &mut self,
        window: &CollectionWindow,
        stop: watch::Receiver<bool>,
    ) -> Result<CollectionReport, CollectionError> {
        self.ensure_range_unloaded(window).await?;

        let mut report = CollectionReport::default();
        let mut day = window.start();

        while day < window.end_exclusive() {
            if *stop.borrow() {
                warn!(next_day = %day, "Stop requested, ending collection early");
                report.cancelled = true;
                break;
            }

            self.gate.open();
            let outcome = self.collect_day(day).await?;

            report.days_loaded.push(day);
            report.intervals_loaded += outcome.inserted;
            report.intervals_dropped += outcome.dropped;
            self.progress.inc(1);

            let Some(next) = day.succ_opt() else {
                break;
            };
            if next < window.end_exclusive() {
                self.gate.wait().await;
            }
            day = next;
        }

        info!(
            days = report.days_loaded.len(),
            intervals = report.intervals_loaded,
            dropped = report.intervals_dropped,
            cancelled = report.cancelled,
            "Collection run finished"
        );
        Ok(report)
    }

    /// One day in a single transaction. Any error drops the writer, which
    /// rolls back whatever was written for the day.
    async fn collect_day(&self, day: NaiveDate) -> Result<DetailOutcome, CollectionError> {
        info!(%day, "Collecting generation day");
        self.progress.set_message(day.to_string());

        let summary = self
            .source
            .fetch_summary(day)
            .await
            .map_err(|source| CollectionError::Fetch {
                day,
                stage: DayStage::SummaryFetch,
                source,
            })?;
        debug!(%day, "Summary fetched");

        let persistence = |stage: DayStage| {
            move |source: DbError| CollectionError::Persistence { day, stage, source }
        };

        let mut writer: Box<dyn DayWriter> = self
            .store
            .begin_day(day)
            .await
            .map_err(persistence(DayStage::SummaryLoad))?;

        self.summary_loader
            .load(writer.as_mut(), day, &summary)
            .await
            .map_err(persistence(DayStage::SummaryLoad))?;
        debug!(%day, "Summary loaded");

        let start_at = start_of_day_epoch(day, &self.detail_loader.timezone());
        let samples = self
            .source
            .fetch_intervals(start_at)
            .await
            .map_err(|source| CollectionError::Fetch {
                day,
                stage: DayStage::DetailFetch,
                source,
            })?;
        debug!(%day, count = samples.len(), "Intervals fetched");

        let outcome = self
            .detail_loader
            .load(writer.as_mut(), day, &samples)
            .await
            .map_err(persistence(DayStage::DetailLoad))?;

        writer
            .commit()
            .await
            .map_err(persistence(DayStage::Commit))?;

        info!(
            %day,
            intervals = outcome.inserted,
            dropped = outcome.dropped,
            "Committed generation day"
        );
        Ok(outcome)
    }
}
