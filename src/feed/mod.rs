//! Feed module for Gator.
//!
//! Feeds, follows and posts, plus the pipeline that keeps posts up to date:
//! the scraper picks a feed, the fetcher downloads it and the ingestor stores
//! its items.

pub mod fetcher;
pub mod ingest;
pub mod interval;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use fetcher::{parse_document, unescape_html, validate_url, FeedFetcher, FetchFeed};
pub use ingest::{parse_published_at, IngestReport, Ingestor};
pub use interval::{format_interval, parse_interval};
pub use repository::{FeedRepository, FollowRepository, PostRepository};
pub use scheduler::{CycleOutcome, CycleReport, CycleState, Scraper, CYCLE_SEPARATOR};
pub use types::{
    Feed, FeedDocument, FeedFollow, FeedItem, FeedWithOwner, NewFeed, NewPost, Post,
};
