use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::dashboard::install::{InstallOutcome, InstallPromptHandle};

const DESKTOP_ENTRY: &str = "day2day.desktop";

/// Installs a desktop entry that starts `day2day watch` in a terminal. Offered while the entry
/// doesn't exist.
pub struct DesktopEntryPrompt {
    entry_path: PathBuf,
    executable: PathBuf,
}

impl DesktopEntryPrompt {
    /// Returns a prompt if day2day isn't installed in `data_dir` yet.
    pub fn detect(data_dir: &Path, executable: PathBuf) -> Option<Self> {
        let entry_path = data_dir.join("applications").join(DESKTOP_ENTRY);
        if entry_path.exists() {
            None
        } else {
            Some(Self {
                entry_path,
                executable,
            })
        }
    }

    fn entry(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Day2Day\n\
             Comment=Log your daily activities\n\
             Exec=\"{}\" watch\n\
             Terminal=true\n\
             Categories=Utility;\n",
            self.executable.display()
        )
    }
}

#[async_trait]
impl InstallPromptHandle for DesktopEntryPrompt {
    async fn prompt(&mut self) -> Result<InstallOutcome> {
        // Someone else installed it since the prompt was offered.
        if tokio::fs::try_exists(&self.entry_path).await? {
            return Ok(InstallOutcome::Dismissed);
        }
        if let Some(parent) = self.entry_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.entry_path, self.entry()).await?;
        info!("Installed desktop entry {:?}", self.entry_path);
        Ok(InstallOutcome::Accepted)
    }
}
