//! Where notifications are shown.

use async_trait::async_trait;

use super::permission::Permission;
use super::presenter::{NativeNotification, Toast};

/// Informational messages surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusNotice {
    Unsupported,
    Blocked,
    PermissionGranted,
    PermissionDenied,
    Subscribed,
    Unsubscribed,
}

impl StatusNotice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unsupported => "This browser does not support notifications",
            Self::Blocked => {
                "Notifications are blocked. Please enable them in your browser settings."
            }
            Self::PermissionGranted => "Notifications enabled! You'll be notified of new blog posts.",
            Self::PermissionDenied => "Notification permission denied",
            Self::Subscribed => "Successfully subscribed to blog notifications!",
            Self::Unsubscribed => "Unsubscribed from blog notifications",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Unsupported | Self::Blocked | Self::PermissionDenied)
    }
}

/// Native notification API plus in-app toasts.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    fn is_supported(&self) -> bool;

    fn permission(&self) -> Permission;

    /// Prompt the user.
    async fn request_permission(&self) -> Permission;

    fn show_native(&self, notification: &NativeNotification);

    fn show_toast(&self, toast: &Toast);

    fn notice(&self, notice: StatusNotice);
}

/// Terminal platform: everything is printed, permission is always granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePlatform;

#[async_trait]
impl NotificationPlatform for ConsolePlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show_native(&self, notification: &NativeNotification) {
        println!("[{}] {}", notification.title, notification.body.replace('\n', " - "));
        println!("    {}", notification.url);
    }

    fn show_toast(&self, toast: &Toast) {
        println!("* {} {} ({})", toast.heading, toast.title, toast.url);
    }

    fn notice(&self, notice: StatusNotice) {
        if notice.is_error() {
            eprintln!("{}", notice.message());
        } else {
            println!("{}", notice.message());
        }
    }
}
