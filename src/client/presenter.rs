//! Rendering delivered posts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::platform::NotificationPlatform;
use crate::config::ClientSettings;
use crate::domain::BlogSummary;

const EXCERPT_PREVIEW_CHARS: usize = 100;
const FALLBACK_ICON: &str = "/favicon.ico";

/// Why a post is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    NewPost,
    UpdatedPost,
}

/// First 100 characters of `excerpt` followed by an ellipsis.
pub fn excerpt_preview(excerpt: &str) -> String {
    let preview: String = excerpt.chars().take(EXCERPT_PREVIEW_CHARS).collect();
    format!("{}...", preview)
}

/// A native (OS / browser) notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Collapses repeated notifications for the same post
    pub tag: String,
    /// Opened on click
    pub url: String,
    pub dismiss_after: Duration,
}

impl NativeNotification {
    pub fn for_blog(blog: &BlogSummary, kind: NoticeKind, dismiss_after: Duration) -> Self {
        let title = match kind {
            NoticeKind::NewPost => "New Blog Post Published!",
            NoticeKind::UpdatedPost => "Blog Post Updated",
        };
        Self {
            title: title.into(),
            body: format!("{}\n{}", blog.title, excerpt_preview(&blog.excerpt)),
            icon: blog.image().unwrap_or(FALLBACK_ICON).into(),
            badge: FALLBACK_ICON.into(),
            tag: format!("blog-{}", blog.id),
            url: blog.path(),
            dismiss_after,
        }
    }
}

/// An in-app toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub heading: String,
    pub title: String,
    pub url: String,
    pub dismiss_after: Duration,
}

impl Toast {
    pub fn for_blog(blog: &BlogSummary, kind: NoticeKind, dismiss_after: Duration) -> Self {
        let heading = match kind {
            NoticeKind::NewPost => "New Blog Post!",
            NoticeKind::UpdatedPost => "Blog Post Updated!",
        };
        Self {
            heading: heading.into(),
            title: blog.title.clone(),
            url: blog.path(),
            dismiss_after,
        }
    }
}

/// Which surfaces a delivery uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub native: bool,
    pub toast: bool,
}

/// Shows batches of posts, one every `stagger`.
#[derive(Clone)]
pub struct Presenter {
    platform: Arc<dyn NotificationPlatform>,
    stagger: Duration,
    native_dismiss: Duration,
    toast_dismiss: Duration,
}

impl Presenter {
    pub fn new(platform: Arc<dyn NotificationPlatform>, settings: &ClientSettings) -> Self {
        Self {
            platform,
            stagger: settings.stagger(),
            native_dismiss: Duration::from_secs(settings.native_dismiss_secs),
            toast_dismiss: Duration::from_secs(settings.toast_dismiss_secs),
        }
    }

    /// Show `blogs` in the background; item `i` appears after `i * stagger`.
    pub fn present(&self, blogs: Vec<BlogSummary>, kind: NoticeKind, delivery: Delivery) -> JoinHandle<()> {
        let presenter = self.clone();
        tokio::spawn(async move {
            for (index, blog) in blogs.iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(presenter.stagger).await;
                }
                if delivery.native {
                    presenter
                        .platform
                        .show_native(&NativeNotification::for_blog(blog, kind, presenter.native_dismiss));
                }
                if delivery.toast {
                    presenter
                        .platform
                        .show_toast(&Toast::for_blog(blog, kind, presenter.toast_dismiss));
                }
            }
        })
    }
}
