use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryName {
    pub name: String,
    pub slug: String,
}

/// A blog post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,

    /// The post body as HTML.
    pub content: String,

    #[serde(default)]
    pub excerpt: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub author_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, rename = "profiles", skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorName>,

    #[serde(default, rename = "categories", skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryName>,
}

impl Post {
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }

    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    /// Whether any searchable field contains the lowercase query.
    pub fn matches(&self, query: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(query);
        contains(&self.title)
            || contains(&self.content)
            || self.excerpt.as_deref().is_some_and(contains)
            || self.author_name().is_some_and(contains)
            || self.category_name().is_some_and(contains)
    }
}

/// The editable fields of a post. Without an id, saving inserts a new post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl PostDraft {
    /// Stamp the publication time if the draft is being published for the first time.
    pub fn stamp(mut self, now: DateTime<Utc>) -> Self {
        if self.status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        if self.slug.trim().is_empty() {
            self.slug = super::create_slug(&self.title);
        }
        self
    }
}

impl From<&Post> for PostDraft {
    fn from(post: &Post) -> Self {
        Self {
            id: Some(post.id.clone()),
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            slug: post.slug.clone(),
            cover_image: post.cover_image.clone(),
            status: post.status,
            category_id: post.category_id.clone(),
            published_at: post.published_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn draft(status: PostStatus) -> PostDraft {
        PostDraft {
            id: None,
            title: "First Light".to_owned(),
            content: "<p>Hi</p>".to_owned(),
            excerpt: None,
            slug: String::new(),
            cover_image: None,
            status,
            category_id: None,
            published_at: None,
        }
    }

    #[test]
    fn publishing_stamps_the_date_once() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let stamped = draft(PostStatus::Published).stamp(now);
        assert_eq!(stamped.published_at, Some(now));
        assert_eq!(stamped.slug, "first-light");

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(stamped.stamp(later).published_at, Some(now));
    }

    #[test]
    fn drafts_are_not_stamped() {
        let now = Utc::now();
        assert_eq!(draft(PostStatus::Draft).stamp(now).published_at, None);
    }
}
