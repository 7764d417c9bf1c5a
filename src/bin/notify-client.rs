//! # notify-client
//!
//! Terminal follower for blog notifications. Subscribes, keeps a realtime
//! channel to the notification server (polling the blog API when that is not
//! possible) and prints every delivered post.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand};

use blog_notifier::client::{
    ClientPreferencesPatch, ConsolePlatform, FileStore, HttpBlogFeed, LayeredStore,
    NotificationClient, StateStore,
};
use blog_notifier::config::ClientSettings;
use blog_notifier::domain::QuietHours;
use blog_notifier::shared::clock::{Clock, SystemClock};

#[derive(Parser)]
#[command(name = "notify-client", version, about = "Follow new blog posts from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe and print notifications until Ctrl-C
    Run(RunArgs),
    /// Turn notifications off
    Unsubscribe,
    /// Show subscription status
    Status,
    /// List delivered notifications
    History,
    /// Mark a delivered post as read
    MarkRead {
        /// Blog id
        blog_id: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Only notify for these categories (repeatable)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Quiet hours start, HH:MM
    #[arg(long, requires = "quiet_end", value_parser = parse_hhmm)]
    quiet_start: Option<NaiveTime>,

    /// Quiet hours end, HH:MM
    #[arg(long, requires = "quiet_start", value_parser = parse_hhmm)]
    quiet_end: Option<NaiveTime>,

    /// Disable the desktop-style notification and only print toasts
    #[arg(long)]
    no_native: bool,
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| format!("expected HH:MM: {}", e))
}

impl RunArgs {
    fn patch(&self) -> ClientPreferencesPatch {
        ClientPreferencesPatch {
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            quiet_hours: self
                .quiet_start
                .zip(self.quiet_end)
                .map(|(start, end)| QuietHours::between(start, end)),
            browser_notifications: self.no_native.then_some(false),
            ..Default::default()
        }
    }
}

fn build_client(settings: ClientSettings) -> Arc<NotificationClient> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // Cookie-jar analogue first, local-storage analogue as fallback
    let store = StateStore::new(LayeredStore::new(
        FileStore::with_clock(settings.state_dir.join("cookies.json"), Arc::clone(&clock)),
        FileStore::with_clock(settings.state_dir.join("local_storage.json"), Arc::clone(&clock)),
    ));
    let feed = Arc::new(HttpBlogFeed::new(settings.api_url.clone()));

    NotificationClient::new(settings, store, Arc::new(ConsolePlatform), feed, clock)
}

#[tokio::main]
async fn main() -> Result<()> {
    blog_notifier::telemetry::init_tracing_with("warn,blog_notifier=info");

    let cli = Cli::parse();
    let settings = ClientSettings::load()?;
    let client = build_client(settings);

    match cli.command {
        Command::Run(args) => {
            client.subscribe(args.patch()).await?;
            println!("Listening for new posts as {} (Ctrl-C to stop)", client.user_id());
            tokio::signal::ctrl_c().await?;
            client.cleanup();
        }
        Command::Unsubscribe => client.unsubscribe(),
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&client.status())?);
        }
        Command::History => {
            for entry in client.history() {
                let marker = if entry.read { " " } else { "*" };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.blog_id,
                    entry.title
                );
            }
            println!("{} unread", client.unread_count());
        }
        Command::MarkRead { blog_id } => {
            if !client.mark_read(&blog_id) {
                anyhow::bail!("No notification for blog {}", blog_id);
            }
        }
    }

    Ok(())
}
