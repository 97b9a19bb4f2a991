//! Feed types for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A followable feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID (insertion ordered).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// User who added the feed.
    pub user_id: i64,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the scraper last selected the feed. `None` means never.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// User adding the feed.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// Feed listing row with the owner's name.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the user who added it.
    pub owner_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// Name of the following user.
    pub user_name: String,
    /// Name of the followed feed.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
    /// Item title.
    pub title: Option<String>,
    /// Item link (unique across posts).
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish time, `None` when the feed's date could not be parsed.
    pub published_at: Option<DateTime<Utc>>,
    /// Owning feed.
    pub feed_id: i64,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Post ID.
    pub id: Uuid,
    /// Creation time, also used as the update time.
    pub created_at: DateTime<Utc>,
    /// Item title.
    pub title: Option<String>,
    /// Item link.
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish time.
    pub published_at: Option<DateTime<Utc>>,
    /// Owning feed.
    pub feed_id: i64,
}

impl NewPost {
    /// Create a new post with a fresh ID, stamped now.
    pub fn new(feed_id: i64, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: None,
            url: url.into(),
            description: None,
            published_at: None,
            feed_id,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// Parsed feed document from one fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// One item of a feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub link: String,
    /// Item description.
    pub description: String,
    /// Raw publish date text as found in the feed.
    pub pub_date: String,
}

impl FeedItem {
    /// Create an item with a title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw publish date.
    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }
}
