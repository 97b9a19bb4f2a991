//! Feed scraper loop.
//!
//! Every tick the scraper picks the feed fetched longest ago, marks it fetched,
//! downloads it and stores its items as posts. One feed per tick, one cycle at
//! a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::db::Database;
use crate::error::{GatorError, Result};
use crate::feed::fetcher::FetchFeed;
use crate::feed::ingest::{IngestReport, Ingestor};
use crate::feed::interval::format_interval;
use crate::feed::repository::FeedRepository;
use crate::feed::types::{Feed, FeedDocument};
use crate::shutdown::Shutdown;

/// Line logged after every completed cycle.
pub const CYCLE_SEPARATOR: &str = "=====================================";

/// Step of a scrape cycle.
#[derive(Debug)]
pub enum CycleState {
    /// Waiting for the cycle to start.
    Idle,
    /// Choosing the next feed.
    Selecting,
    /// Feed chosen and marked; downloading it.
    Fetching(Feed),
    /// Document downloaded; storing its items.
    Ingesting(Feed, FeedDocument),
    /// Cycle finished.
    CycleComplete(CycleReport),
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Feed that was scraped.
    pub feed_id: i64,
    /// Its name.
    pub feed_name: String,
    /// Ingestion counts.
    pub ingest: IngestReport,
}

/// Result of running one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Feed scraped and items ingested.
    Completed(CycleReport),
    /// Cycle aborted; the loop carries on at the next tick.
    Failed(GatorError),
}

impl CycleOutcome {
    /// Whether the cycle completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

/// Periodic feed scraper.
pub struct Scraper<F> {
    db: Arc<Database>,
    fetcher: F,
    interval: Duration,
    shutdown: Shutdown,
}

impl<F: FetchFeed> Scraper<F> {
    /// Create a new scraper running every `interval`.
    pub fn new(
        db: Arc<Database>,
        fetcher: F,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::InvalidArgument(
                "interval must be positive".to_string(),
            ));
        }

        Ok(Self {
            db,
            fetcher,
            interval,
            shutdown,
        })
    }

    /// Run cycles until shutdown.
    ///
    /// The first cycle runs immediately. Missed ticks are skipped, never
    /// caught up.
    pub async fn run(&self) {
        info!("Collecting feeds every {}", format_interval(self.interval));

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            self.run_cycle().await;
        }

        info!("Scraper stopped");
    }

    /// Run a single scrape cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut state = CycleState::Idle;

        loop {
            state = match self.advance(state).await {
                Ok(CycleState::CycleComplete(report)) => {
                    debug!(
                        "Feed {} done: {} new, {} duplicate, {} failed",
                        report.feed_name,
                        report.ingest.inserted,
                        report.ingest.duplicates,
                        report.ingest.failed
                    );
                    info!("{}", CYCLE_SEPARATOR);
                    return CycleOutcome::Completed(report);
                }
                Ok(next) => next,
                Err(e) => {
                    match &e {
                        GatorError::Cancelled => info!("Scrape cycle cancelled"),
                        _ => error!("Scrape cycle failed: {}", e),
                    }
                    return CycleOutcome::Failed(e);
                }
            };
        }
    }

    /// Move the cycle one step forward.
    pub async fn advance(&self, state: CycleState) -> Result<CycleState> {
        let pool = self.db.pool();

        match state {
            CycleState::Idle => Ok(CycleState::Selecting),
            CycleState::Selecting => {
                let feeds = FeedRepository::new(pool);
                let feed = feeds
                    .next_to_fetch()
                    .await
                    .map_err(|e| GatorError::SelectionFailed(e.to_string()))?
                    .ok_or_else(|| GatorError::SelectionFailed("no feeds to fetch".to_string()))?;

                let fetched_at = Utc::now();
                if feeds.mark_fetched(feed.id, fetched_at).await? {
                    debug!("Marked feed {} fetched at {}", feed.id, fetched_at);
                    Ok(CycleState::Fetching(Feed {
                        last_fetched_at: Some(fetched_at),
                        ..feed
                    }))
                } else {
                    // Stored value is newer than the clock; it stays as is.
                    debug!(
                        "Feed {} not marked at {}, keeping {:?}",
                        feed.id, fetched_at, feed.last_fetched_at
                    );
                    Ok(CycleState::Fetching(feed))
                }
            }
            CycleState::Fetching(feed) => {
                let document = self.fetcher.fetch(&feed.url, &self.shutdown).await?;
                debug!(
                    "Fetched {} items from {}",
                    document.items.len(),
                    feed.url
                );
                Ok(CycleState::Ingesting(feed, document))
            }
            CycleState::Ingesting(feed, document) => {
                let ingest = Ingestor::new(pool).ingest(feed.id, &document.items).await;
                Ok(CycleState::CycleComplete(CycleReport {
                    feed_id: feed.id,
                    feed_name: feed.name,
                    ingest,
                }))
            }
            CycleState::CycleComplete(_) => Ok(CycleState::Idle),
        }
    }
}
