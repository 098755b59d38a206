use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use comments::{Author, Comment, CommentNode, CommentStatus, LikeAction, NewComment};
pub use posts::{Category, Post, PostDraft, PostStatus};
pub use settings::{ModerationPolicy, SiteSettings};
pub use user::{Profile, Role, Viewer};

/// Data structures for comments and the reply tree built from them.
pub mod comments;

/// Data structures for blog posts and their categories.
pub mod posts;

/// Data structures for the settings rows that configure the site.
pub mod settings;

/// Data structures for user profiles and signed-in viewers.
pub mod user;

/// Row counts shown on the admin dashboard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub users: u64,
    pub posts: u64,
    pub comments: u64,
    pub published_posts: u64,
}

/// Turn a title into a URL slug.
pub fn create_slug(title: &str) -> String {
    let title: String = title
        .replace('&', "and")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let separators = Regex::new(r"[\s-]+").unwrap();
    separators
        .replace_all(title.trim(), "-")
        .trim_matches('-')
        .to_owned()
}

/// Short date, omitting the year for dates in the current year.
pub fn date(date: &DateTime<Utc>) -> String {
    if date.year() == Utc::now().year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// Date and time, as shown next to a comment.
pub fn date_time(date: &DateTime<Utc>) -> String {
    format!("{} {}", self::date(date), date.format("%H:%M"))
}
