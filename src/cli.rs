//! Command-line commands.
//!
//! Every command acts as the configured user (`[user] name`), which is created
//! on first use.

use std::io::Write;
use std::time::Duration;

use tracing::info;

use crate::db::{User, UserRepository};
use crate::error::{GatorError, Result};
use crate::feed::{
    parse_interval, validate_url, FeedFetcher, FeedRepository, FollowRepository, NewFeed,
    PostRepository, Scraper,
};
use crate::shutdown::Shutdown;
use crate::state::AppState;

/// Number of posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

const COMMANDS: &[(&str, &str, &str)] = &[
    ("agg", "<interval>", "scrape followed feeds every interval (e.g. 30s, 1m)"),
    ("addfeed", "<name> <url>", "add a feed and follow it"),
    ("feeds", "", "list all feeds"),
    ("follow", "<url>", "follow an existing feed"),
    ("following", "", "list followed feeds"),
    ("unfollow", "<url>", "stop following a feed"),
    ("browse", "[limit]", "show the newest posts from followed feeds"),
    ("reset", "", "delete all users, feeds, follows and posts"),
    ("help", "", "show this help"),
];

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the scraper loop.
    Agg { interval: Duration },
    /// Add a feed and follow it.
    AddFeed { name: String, url: String },
    /// List all feeds.
    Feeds,
    /// Follow a feed by URL.
    Follow { url: String },
    /// List followed feeds.
    Following,
    /// Unfollow a feed by URL.
    Unfollow { url: String },
    /// Show posts from followed feeds.
    Browse { limit: i64 },
    /// Empty the database.
    Reset,
    /// Print usage.
    Help,
}

impl Command {
    /// Parse the arguments following the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let Some((name, rest)) = args.split_first() else {
            return Err(GatorError::InvalidArgument(
                "not enough arguments, try `gator help`".to_string(),
            ));
        };

        let arity = |expected: usize| {
            if rest.len() == expected {
                Ok(())
            } else {
                Err(GatorError::InvalidArgument(format!(
                    "{} expects {} argument(s), got {}",
                    name,
                    expected,
                    rest.len()
                )))
            }
        };

        match name.as_str() {
            "agg" => {
                arity(1)?;
                Ok(Command::Agg {
                    interval: parse_interval(&rest[0])?,
                })
            }
            "addfeed" => {
                arity(2)?;
                Ok(Command::AddFeed {
                    name: rest[0].clone(),
                    url: rest[1].clone(),
                })
            }
            "feeds" => arity(0).map(|_| Command::Feeds),
            "follow" => {
                arity(1)?;
                Ok(Command::Follow {
                    url: rest[0].clone(),
                })
            }
            "following" => arity(0).map(|_| Command::Following),
            "unfollow" => {
                arity(1)?;
                Ok(Command::Unfollow {
                    url: rest[0].clone(),
                })
            }
            "browse" => {
                if rest.len() > 1 {
                    return Err(GatorError::InvalidArgument(format!(
                        "browse expects at most 1 argument, got {}",
                        rest.len()
                    )));
                }
                let limit = rest
                    .first()
                    .and_then(|s| s.parse::<i64>().ok())
                    .filter(|limit| *limit > 0)
                    .unwrap_or(DEFAULT_BROWSE_LIMIT);
                Ok(Command::Browse { limit })
            }
            "reset" => arity(0).map(|_| Command::Reset),
            "help" => Ok(Command::Help),
            other => Err(GatorError::InvalidArgument(format!(
                "unknown command: {}",
                other
            ))),
        }
    }
}

/// Run a command, writing its output to `out`.
pub async fn run<W: Write>(
    state: &AppState,
    command: Command,
    shutdown: Shutdown,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Agg { interval } => agg(state, interval, shutdown).await,
        Command::AddFeed { name, url } => add_feed(state, &name, &url, out).await,
        Command::Feeds => feeds(state, out).await,
        Command::Follow { url } => follow(state, &url, out).await,
        Command::Following => following(state, out).await,
        Command::Unfollow { url } => unfollow(state, &url, out).await,
        Command::Browse { limit } => browse(state, limit, out).await,
        Command::Reset => reset(state, out).await,
        Command::Help => help(out),
    }
}

async fn current_user(state: &AppState) -> Result<User> {
    UserRepository::new(state.db.pool())
        .get_or_create(&state.config.user.name)
        .await
}

async fn agg(state: &AppState, interval: Duration, shutdown: Shutdown) -> Result<()> {
    let fetcher = FeedFetcher::new(&state.config.scraper)?;
    let scraper = Scraper::new(state.db.clone(), fetcher, interval, shutdown)?;
    scraper.run().await;
    Ok(())
}

async fn add_feed<W: Write>(state: &AppState, name: &str, url: &str, out: &mut W) -> Result<()> {
    validate_url(url)?;
    let user = current_user(state).await?;
    let pool = state.db.pool();

    let feed = FeedRepository::new(pool)
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    FollowRepository::new(pool).create(user.id, feed.id).await?;
    info!("User {} added feed {} ({})", user.name, feed.name, feed.url);

    writeln!(out, "Feed created:")?;
    writeln!(out, "* ID:   {}", feed.id)?;
    writeln!(out, "* Name: {}", feed.name)?;
    writeln!(out, "* URL:  {}", feed.url)?;
    writeln!(out, "* User: {}", user.name)?;
    Ok(())
}

async fn feeds<W: Write>(state: &AppState, out: &mut W) -> Result<()> {
    let feeds = FeedRepository::new(state.db.pool()).list_all().await?;
    if feeds.is_empty() {
        writeln!(out, "No feeds.")?;
        return Ok(());
    }

    for entry in feeds {
        let last_fetched = entry
            .feed
            .last_fetched_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        writeln!(out, "* {} ({})", entry.feed.name, entry.feed.url)?;
        writeln!(out, "  added by {}, last fetched {}", entry.owner_name, last_fetched)?;
    }
    Ok(())
}

async fn follow<W: Write>(state: &AppState, url: &str, out: &mut W) -> Result<()> {
    let user = current_user(state).await?;
    let pool = state.db.pool();

    let feed = FeedRepository::new(pool)
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {}", url)))?;
    let follow = FollowRepository::new(pool).create(user.id, feed.id).await?;

    writeln!(out, "{} now follows {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

async fn following<W: Write>(state: &AppState, out: &mut W) -> Result<()> {
    let user = current_user(state).await?;
    let follows = FollowRepository::new(state.db.pool())
        .list_for_user(user.id)
        .await?;

    if follows.is_empty() {
        writeln!(out, "{} follows no feeds.", user.name)?;
        return Ok(());
    }
    for follow in follows {
        writeln!(out, "- {}", follow.feed_name)?;
    }
    Ok(())
}

async fn unfollow<W: Write>(state: &AppState, url: &str, out: &mut W) -> Result<()> {
    let user = current_user(state).await?;
    let pool = state.db.pool();

    let feed = FeedRepository::new(pool)
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {}", url)))?;

    if FollowRepository::new(pool).delete(user.id, feed.id).await? {
        writeln!(out, "{} unfollowed {}", user.name, feed.name)?;
    } else {
        writeln!(out, "{} was not following {}", user.name, feed.name)?;
    }
    Ok(())
}

async fn browse<W: Write>(state: &AppState, limit: i64, out: &mut W) -> Result<()> {
    let user = current_user(state).await?;
    let posts = PostRepository::new(state.db.pool())
        .list_for_user(user.id, limit)
        .await?;

    if posts.is_empty() {
        writeln!(out, "No posts yet. Run `gator agg <interval>` to collect some.")?;
        return Ok(());
    }

    for post in posts {
        let published = post
            .published_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "undated".to_string());
        writeln!(
            out,
            "- {} [{}]",
            post.title.as_deref().unwrap_or("(untitled)"),
            published
        )?;
        writeln!(out, "  {}", post.url)?;
        if let Some(description) = post.description.as_deref().filter(|d| !d.is_empty()) {
            writeln!(out, "  {}", description)?;
        }
    }
    Ok(())
}

async fn reset<W: Write>(state: &AppState, out: &mut W) -> Result<()> {
    state.db.reset().await?;
    writeln!(out, "Database reset.")?;
    Ok(())
}

fn help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Usage: gator <command> [args]")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    for (name, args, description) in COMMANDS {
        let usage = if args.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, args)
        };
        writeln!(out, "  {:<24} {}", usage, description)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::feed::NewPost;
    use chrono::{TimeZone, Utc};

    async fn setup_state() -> AppState {
        let db = Database::open_in_memory().await.unwrap();
        AppState::new(Config::default(), db)
    }

    async fn run_to_string(state: &AppState, command: Command) -> Result<String> {
        let mut out = Vec::new();
        run(state, command, Shutdown::never(), &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_agg() {
        assert_eq!(
            Command::parse(["agg", "1m"]).unwrap(),
            Command::Agg {
                interval: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_parse_agg_bad_interval() {
        for interval in ["0s", "-5s", "soon"] {
            assert!(matches!(
                Command::parse(["agg", interval]),
                Err(GatorError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_parse_arity() {
        assert!(matches!(
            Command::parse(["agg"]),
            Err(GatorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse(["addfeed", "only-name"]),
            Err(GatorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse(["feeds", "extra"]),
            Err(GatorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse(["browse", "1", "2"]),
            Err(GatorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert!(matches!(
            Command::parse(["frobnicate"]),
            Err(GatorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse(Vec::<String>::new()),
            Err(GatorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_browse_limit() {
        assert_eq!(
            Command::parse(["browse"]).unwrap(),
            Command::Browse {
                limit: DEFAULT_BROWSE_LIMIT
            }
        );
        assert_eq!(
            Command::parse(["browse", "10"]).unwrap(),
            Command::Browse { limit: 10 }
        );
        assert_eq!(
            Command::parse(["browse", "lots"]).unwrap(),
            Command::Browse {
                limit: DEFAULT_BROWSE_LIMIT
            }
        );
        assert_eq!(
            Command::parse(["browse", "-3"]).unwrap(),
            Command::Browse {
                limit: DEFAULT_BROWSE_LIMIT
            }
        );
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let state = setup_state().await;
        let output = run_to_string(&state, Command::Help).await.unwrap();
        for (name, _, _) in COMMANDS {
            assert!(output.contains(name));
        }
    }

    #[tokio::test]
    async fn test_addfeed_creates_feed_and_follow() {
        let state = setup_state().await;
        let output = run_to_string(
            &state,
            Command::AddFeed {
                name: "Blog".to_string(),
                url: "https://example.com/feed".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(output.contains("Blog"));

        let pool = state.db.pool();
        let feed = FeedRepository::new(pool)
            .get_by_url("https://example.com/feed")
            .await
            .unwrap()
            .unwrap();
        assert!(feed.last_fetched_at.is_none());

        let user = UserRepository::new(pool)
            .get_by_name("gator")
            .await
            .unwrap()
            .unwrap();
        let follows = FollowRepository::new(pool)
            .list_for_user(user.id)
            .await
            .unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_id, feed.id);
    }

    #[tokio::test]
    async fn test_addfeed_rejects_bad_url() {
        let state = setup_state().await;
        let result = run_to_string(
            &state,
            Command::AddFeed {
                name: "Bad".to_string(),
                url: "ftp://example.com/feed".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(GatorError::Validation(_))));
        assert_eq!(FeedRepository::new(state.db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_feeds_listing() {
        let state = setup_state().await;
        let output = run_to_string(&state, Command::Feeds).await.unwrap();
        assert!(output.contains("No feeds"));

        run_to_string(
            &state,
            Command::AddFeed {
                name: "Blog".to_string(),
                url: "https://example.com/feed".to_string(),
            },
        )
        .await
        .unwrap();

        let output = run_to_string(&state, Command::Feeds).await.unwrap();
        assert!(output.contains("Blog (https://example.com/feed)"));
        assert!(output.contains("added by gator, last fetched never"));
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let state = setup_state().await;
        let result = run_to_string(
            &state,
            Command::Follow {
                url: "https://nowhere.example.com/feed".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(GatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_following_unfollow() {
        let state = setup_state().await;
        let pool = state.db.pool();
        let owner = UserRepository::new(pool)
            .get_or_create("someone")
            .await
            .unwrap();
        FeedRepository::new(pool)
            .create(&NewFeed::new("Other", "https://other.example.com/feed", owner.id))
            .await
            .unwrap();

        let url = "https://other.example.com/feed".to_string();
        let output = run_to_string(&state, Command::Follow { url: url.clone() })
            .await
            .unwrap();
        assert!(output.contains("gator now follows Other"));

        let output = run_to_string(&state, Command::Following).await.unwrap();
        assert!(output.contains("- Other"));

        let output = run_to_string(&state, Command::Unfollow { url }).await.unwrap();
        assert!(output.contains("unfollowed Other"));

        let output = run_to_string(&state, Command::Following).await.unwrap();
        assert!(output.contains("follows no feeds"));
    }

    #[tokio::test]
    async fn test_browse_newest_first_with_limit() {
        let state = setup_state().await;
        run_to_string(
            &state,
            Command::AddFeed {
                name: "Blog".to_string(),
                url: "https://example.com/feed".to_string(),
            },
        )
        .await
        .unwrap();
        let pool = state.db.pool();
        let feed = FeedRepository::new(pool)
            .get_by_url("https://example.com/feed")
            .await
            .unwrap()
            .unwrap();

        let posts = PostRepository::new(pool);
        for day in 1..=3 {
            let published = Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap();
            posts
                .create(
                    &NewPost::new(feed.id, format!("https://example.com/{}", day))
                        .with_title(format!("Day {}", day))
                        .with_published_at(Some(published)),
                )
                .await
                .unwrap();
        }

        let output = run_to_string(&state, Command::Browse { limit: 2 })
            .await
            .unwrap();
        assert!(output.contains("Day 3"));
        assert!(output.contains("Day 2"));
        assert!(!output.contains("Day 1"));
        assert!(output.find("Day 3") < output.find("Day 2"));
    }

    #[test]
    fn test_parse_reset() {
        assert_eq!(Command::parse(["reset"]).unwrap(), Command::Reset);
        assert!(matches!(
            Command::parse(["reset", "now"]),
            Err(GatorError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_empties_store() {
        let state = setup_state().await;
        run_to_string(
            &state,
            Command::AddFeed {
                name: "Blog".to_string(),
                url: "https://example.com/feed".to_string(),
            },
        )
        .await
        .unwrap();

        let output = run_to_string(&state, Command::Reset).await.unwrap();
        assert!(output.contains("Database reset"));

        let pool = state.db.pool();
        assert_eq!(FeedRepository::new(pool).count().await.unwrap(), 0);
        assert!(UserRepository::new(pool)
            .get_by_name("gator")
            .await
            .unwrap()
            .is_none());

        // Feeds can be added again after a reset
        run_to_string(
            &state,
            Command::AddFeed {
                name: "Blog".to_string(),
                url: "https://example.com/feed".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(FeedRepository::new(pool).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_browse_without_posts() {
        let state = setup_state().await;
        let output = run_to_string(&state, Command::Browse { limit: 2 })
            .await
            .unwrap();
        assert!(output.contains("No posts yet"));
    }
}
