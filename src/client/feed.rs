//! Blog listing used by the polling fallback.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};

use super::error::ClientError;
use crate::domain::{should_send_notification, BlogPage, BlogSummary, Preferences};

/// Source of the most recently published posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogFeed: Send + Sync {
    /// Up to `limit` posts, newest first.
    async fn latest(&self, limit: u32) -> Result<Vec<BlogSummary>, ClientError>;
}

/// [`BlogFeed`] over the blog REST API.
#[derive(Debug, Clone)]
pub struct HttpBlogFeed {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBlogFeed {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlogFeed for HttpBlogFeed {
    async fn latest(&self, limit: u32) -> Result<Vec<BlogSummary>, ClientError> {
        let page = self
            .client
            .get(format!("{}/blogs", self.api_url))
            .query(&[("page", "1"), ("sortBy", "publishedAt"), ("sortOrder", "desc")])
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json::<BlogPage>()
            .await?;
        Ok(page.blogs)
    }
}

/// Posts published strictly after `last_check` that pass the filter at `now`.
pub fn select_new_posts(
    blogs: Vec<BlogSummary>,
    last_check: DateTime<Utc>,
    preferences: &Preferences,
    now: NaiveTime,
) -> Vec<BlogSummary> {
    blogs
        .into_iter()
        .filter(|blog| blog.published_at.is_some_and(|at| at > last_check))
        .filter(|blog| should_send_notification(preferences, &blog.category, now))
        .collect()
}
