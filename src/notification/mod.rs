//! Reminders. [schedule::next_notification] decides when, a [Notifier] decides how.

pub mod schedule;

use std::io::Write;

use ansi_term::Colour;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub use schedule::next_notification;

pub const REMINDER_TITLE: &str = "Day2Day reminder";
pub const REMINDER_BODY: &str = "Time to log your activity!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: &'static str,
    pub body: &'static str,
}

impl Notification {
    /// The only notification the application shows.
    pub fn reminder() -> Self {
        Self {
            title: REMINDER_TITLE,
            body: REMINDER_BODY,
        }
    }
}

/// Platform specific way of showing a notification to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Shows notifications in the terminal the application runs in. Rings the terminal bell.
pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!("Showing notification {:?}", notification);
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "\x07{} {}",
            Colour::Yellow.bold().paint(notification.title),
            notification.body
        )?;
        stdout.flush()?;
        Ok(())
    }
}
