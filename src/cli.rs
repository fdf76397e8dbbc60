use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::{Arg, ArgAction, Parser};

use crate::collection_error::CollectionError;
use crate::window::{CollectionWindow, DateWindow};

#[derive(Parser, Debug)]
#[command(name = "enphase-load", version, disable_version_flag = true)]
#[command(arg(
    Arg::new("version")
        .short('v')
        .long("version")
        .action(ArgAction::Version)
        .help("Print version")
))]
#[command(about = "Retrieve solar production data from Enphase and load it into the database", long_about = None)]
pub struct Cli {
    /// First data date to collect, defaults to yesterday
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start_date: Option<NaiveDate>,

    /// Last data date to collect (inclusive). Cannot be used with --date-window
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "date_window")]
    pub end_date: Option<NaiveDate>,

    /// Number of days or weeks to collect starting at the start date, e.g.
    /// "2 weeks". UNITS is day, days, week or weeks. Defaults to "1 day"
    #[arg(long, num_args = 2, value_names = ["N", "UNITS"])]
    pub date_window: Option<Vec<String>>,
}

impl Cli {
    /// Checks the arguments before any configuration is loaded, against the
    /// latest calendar date anywhere at `now`. No zone runs more than a day
    /// ahead of UTC, so anything rejected here is rejected in every zone.
    pub fn preflight(&self, now: DateTime<Utc>) -> Result<(), CollectionError> {
        let latest_today = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap_or_else(|| now.date_naive());
        self.collection_window(latest_today).map(|_| ())
    }

    /// Resolves the arguments into the days to collect, relative to `today`.
    /// Nothing here touches the network or the database.
    pub fn collection_window(&self, today: NaiveDate) -> Result<CollectionWindow, CollectionError> {
        let yesterday = today.pred_opt().ok_or_else(|| {
            CollectionError::InvalidArgument(format!("today ({today}) is out of range"))
        })?;
        let start = self.start_date.unwrap_or(yesterday);

        if start > today {
            return Err(CollectionError::InvalidArgument(format!(
                "Invalid start date {start}, must be earlier than today"
            )));
        }

        if let Some(end) = self.end_date {
            if end < start || end >= today {
                return Err(CollectionError::InvalidArgument(format!(
                    "End date {end} must be between {start} and {yesterday} inclusive"
                )));
            }
            return CollectionWindow::inclusive(start, end);
        }

        let window = match self.date_window.as_deref() {
            Some([count, unit]) => DateWindow::parse(count, unit)?,
            Some(other) => {
                return Err(CollectionError::InvalidArgument(format!(
                    "date-window takes exactly two values, got {}",
                    other.len()
                )))
            }
            None => DateWindow::ONE_DAY,
        };

        let range = CollectionWindow::from_date_window(start, window)?;
        if range.end_exclusive() > today {
            return Err(CollectionError::InvalidArgument(format!(
                "date-window of {} days added to start date {start} goes past today into the future",
                window.days()
            )));
        }
        Ok(range)
    }
}
