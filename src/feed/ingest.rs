//! Ingestion of fetched feed items into stored posts.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::db::DbPool;
use crate::error::{GatorError, Result};
use crate::feed::repository::PostRepository;
use crate::feed::types::{FeedItem, NewPost, Post};

/// Layout of the Unix `date` command output, without the zone name.
const UNIX_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Outcome of ingesting one batch of items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Items seen.
    pub processed: usize,
    /// Posts stored.
    pub inserted: usize,
    /// Items skipped because their URL was already stored.
    pub duplicates: usize,
    /// Items that failed for any other reason.
    pub failed: usize,
    /// Stored posts whose publish date could not be parsed.
    pub undated: usize,
}

/// Parse an item's publish date.
///
/// Accepts RFC 2822 (the RSS format), RFC 3339, and the Unix `date` layout
/// `Mon Jan _2 15:04:05 MST 2006` with the zone read as UTC. Anything else
/// yields `None`.
pub fn parse_published_at(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_unix_date(text)
}

fn parse_unix_date(text: &str) -> Option<DateTime<Utc>> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [weekday, month, day, time, _zone, year] = fields.as_slice() else {
        return None;
    };
    let without_zone = format!("{} {} {} {} {}", weekday, month, day, time, year);
    NaiveDateTime::parse_from_str(&without_zone, UNIX_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Turns feed items into posts.
pub struct Ingestor<'a> {
    posts: PostRepository<'a>,
}

impl<'a> Ingestor<'a> {
    /// Create an ingestor writing to the given pool.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            posts: PostRepository::new(pool),
        }
    }

    /// Store every item as a post of `feed_id`.
    ///
    /// Items are handled independently: a duplicate or failing item is logged
    /// and the rest of the batch still runs.
    pub async fn ingest(&self, feed_id: i64, items: &[FeedItem]) -> IngestReport {
        let mut report = IngestReport::default();

        for item in items {
            report.processed += 1;

            match self.ingest_item(feed_id, item).await {
                Ok(post) => {
                    info!("- Title: {}", item.title);
                    report.inserted += 1;
                    if post.published_at.is_none() {
                        report.undated += 1;
                    }
                }
                Err(GatorError::DuplicateUrl(url)) => {
                    warn!("Skipping duplicate post {}", url);
                    report.duplicates += 1;
                }
                Err(e) => {
                    warn!("Failed to store item {:?} of feed {}: {}", item.title, feed_id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn ingest_item(&self, feed_id: i64, item: &FeedItem) -> Result<Post> {
        if item.link.trim().is_empty() {
            return Err(GatorError::InsertFailed("item has no link".to_string()));
        }

        let new_post = NewPost::new(feed_id, item.link.trim())
            .with_title(item.title.as_str())
            .with_description(item.description.as_str())
            .with_published_at(parse_published_at(&item.pub_date));

        self.posts.create(&new_post).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRepository;
    use crate::feed::repository::FeedRepository;
    use crate::feed::types::NewFeed;
    use crate::Database;
    use chrono::TimeZone;

    async fn setup_feed() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .get_or_create("testuser")
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Feed", "https://example.com/feed", user.id))
            .await
            .unwrap();
        (db, feed.id)
    }

    #[test]
    fn test_parse_published_at_rfc2822() {
        let expected = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(
            parse_published_at("Mon, 02 Jan 2006 15:04:05 GMT"),
            Some(expected)
        );
        assert_eq!(
            parse_published_at("Mon, 02 Jan 2006 10:04:05 -0500"),
            Some(expected)
        );
        assert_eq!(
            parse_published_at("Mon, 02 Jan 2006 10:04:05 EST"),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_published_at_rfc3339() {
        assert_eq!(
            parse_published_at("2006-01-02T15:04:05Z"),
            Some(Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_parse_published_at_unix_date() {
        let expected = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(
            parse_published_at("Mon Jan  2 15:04:05 UTC 2006"),
            Some(expected)
        );
        assert_eq!(
            parse_published_at("Mon Jan 02 15:04:05 MST 2006"),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_published_at_unparseable() {
        assert!(parse_published_at("").is_none());
        assert!(parse_published_at("yesterday").is_none());
        assert!(parse_published_at("2006/01/02").is_none());
    }

    #[tokio::test]
    async fn test_ingest_stores_posts() {
        let (db, feed_id) = setup_feed().await;
        let ingestor = Ingestor::new(db.pool());

        let items = vec![
            FeedItem::new("One", "http://x/1")
                .with_description("first")
                .with_pub_date("Mon, 02 Jan 2006 15:04:05 GMT"),
            FeedItem::new("Two", "http://x/2"),
        ];

        let report = ingestor.ingest(feed_id, &items).await;
        assert_eq!(report.processed, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.undated, 1);

        let post = PostRepository::new(db.pool())
            .get_by_url("http://x/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.title.as_deref(), Some("One"));
        assert_eq!(post.description.as_deref(), Some("first"));
        assert_eq!(post.feed_id, feed_id);
        assert!(post.published_at.is_some());
    }

    #[tokio::test]
    async fn test_ingest_duplicate_urls_stores_once() {
        let (db, feed_id) = setup_feed().await;
        let ingestor = Ingestor::new(db.pool());

        let items = vec![
            FeedItem::new("First copy", "http://x/1"),
            FeedItem::new("Second copy", "http://x/1"),
            FeedItem::new("Other", "http://x/2"),
        ];

        let report = ingestor.ingest(feed_id, &items).await;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 0);

        let posts = PostRepository::new(db.pool());
        assert_eq!(posts.count_by_feed(feed_id).await.unwrap(), 2);
        let stored = posts.get_by_url("http://x/1").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("First copy"));
    }

    #[tokio::test]
    async fn test_ingest_again_skips_everything() {
        let (db, feed_id) = setup_feed().await;
        let ingestor = Ingestor::new(db.pool());
        let items = vec![
            FeedItem::new("One", "http://x/1"),
            FeedItem::new("Two", "http://x/2"),
        ];

        ingestor.ingest(feed_id, &items).await;
        let report = ingestor.ingest(feed_id, &items).await;

        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 2);
    }

    #[tokio::test]
    async fn test_ingest_unparseable_dates_still_stored() {
        let (db, feed_id) = setup_feed().await;
        let ingestor = Ingestor::new(db.pool());

        let items: Vec<FeedItem> = (0..5)
            .map(|i| {
                let item = FeedItem::new(format!("Item {}", i), format!("http://x/{}", i));
                if i % 2 == 0 {
                    item.with_pub_date("not a date")
                } else {
                    item.with_pub_date("Tue, 03 Jan 2006 10:00:00 +0000")
                }
            })
            .collect();

        let report = ingestor.ingest(feed_id, &items).await;
        assert_eq!(report.inserted, 5);
        assert_eq!(report.undated, 3);

        let post = PostRepository::new(db.pool())
            .get_by_url("http://x/0")
            .await
            .unwrap()
            .unwrap();
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_ingest_item_without_link_fails_alone() {
        let (db, feed_id) = setup_feed().await;
        let ingestor = Ingestor::new(db.pool());

        let items = vec![
            FeedItem::new("No link", ""),
            FeedItem::new("Has link", "http://x/1"),
        ];

        let report = ingestor.ingest(feed_id, &items).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn test_ingest_empty_batch() {
        let (db, feed_id) = setup_feed().await;
        let report = Ingestor::new(db.pool()).ingest(feed_id, &[]).await;
        assert_eq!(report, IngestReport::default());
    }
}
