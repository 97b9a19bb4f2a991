//! Gator - a personal RSS aggregator.
//!
//! Users follow RSS feeds; the scraper periodically fetches the feed that was
//! fetched longest ago and stores its new items as posts for browsing.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod shutdown;
pub mod state;

pub use cli::Command;
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    CycleOutcome, CycleState, Feed, FeedDocument, FeedFetcher, FeedItem, FetchFeed,
    IngestReport, Ingestor, NewFeed, NewPost, Post, Scraper,
};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use state::AppState;
