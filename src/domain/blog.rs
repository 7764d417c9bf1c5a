//! Blog summary entity.
//!
//! Mirrors the public projection of a blog document returned by the blog
//! listing API (the `content` body is never carried).

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

/// Public projection of a blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummary {
    /// Document id
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "blog id is required"))]
    pub id: String,

    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    #[serde(default)]
    pub excerpt: String,

    #[validate(length(min = 1, message = "slug is required"))]
    pub slug: String,

    #[serde(default)]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl BlogSummary {
    /// Payload for a `new_blog` event.
    pub fn published_notice(&self) -> Self {
        Self {
            updated_at: None,
            ..self.clone()
        }
    }

    /// Payload for a `blog_updated` event: no publish date and no tags.
    pub fn update_notice(&self) -> Self {
        Self {
            published_at: None,
            tags: Vec::new(),
            ..self.clone()
        }
    }

    /// Featured image, treating the empty string as absent.
    pub fn image(&self) -> Option<&str> {
        self.featured_image.as_deref().filter(|s| !s.is_empty())
    }

    /// Site-relative link to the post.
    pub fn path(&self) -> String {
        format!("/blog/{}", self.slug)
    }
}

/// One page of the blog listing endpoint.
///
/// The counters are echoed from the query string by some deployments, so
/// they are read from numbers, numeric strings or `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage {
    #[serde(default)]
    pub blogs: Vec<BlogSummary>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_pages: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub current_page: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| de::Error::custom(format!("invalid count {}", n))),
        Value::String(raw) => raw
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid count '{}'", raw))),
        other => Err(de::Error::custom(format!("invalid count {}", other))),
    }
}
