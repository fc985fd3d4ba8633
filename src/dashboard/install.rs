use std::fmt::{Debug, Display};

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

impl Display for InstallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallOutcome::Accepted => write!(f, "accepted"),
            InstallOutcome::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// A platform offer to install the application. Prompting resolves to the user's choice. A handle
/// is prompted at most once; [InstallPrompt] gives it away on the first use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstallPromptHandle: Send + Sync {
    async fn prompt(&mut self) -> Result<InstallOutcome>;
}

/// Install prompt retained by the dashboard until the user asks for it.
#[derive(Default)]
pub enum InstallPrompt {
    #[default]
    Unavailable,
    Available(Box<dyn InstallPromptHandle>),
}

impl InstallPrompt {
    pub fn is_available(&self) -> bool {
        matches!(self, InstallPrompt::Available(_))
    }

    /// Takes the handle out, leaving the prompt unavailable until a new one arrives.
    pub fn take(&mut self) -> Option<Box<dyn InstallPromptHandle>> {
        match std::mem::take(self) {
            InstallPrompt::Available(handle) => Some(handle),
            InstallPrompt::Unavailable => None,
        }
    }
}

impl Debug for InstallPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallPrompt::Unavailable => write!(f, "Unavailable"),
            InstallPrompt::Available(_) => write!(f, "Available"),
        }
    }
}
