use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

const APPLICATION_DIR: &str = "day2day";

/// Directory for the store and logs. `$XDG_STATE_HOME/day2day` or `$HOME/.local/state/day2day`.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = xdg_dir("XDG_STATE_HOME", ".local/state")?;
    path.push(APPLICATION_DIR);
    create_dir(path)
}

/// Directory with user data shared between applications, for example desktop entries.
/// `$XDG_DATA_HOME` or `$HOME/.local/share`.
pub fn user_data_path() -> Result<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(variable: &str, home_fallback: &str) -> Result<PathBuf> {
    env::var(variable)
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(home_fallback);
                path
            })
        })
        .map_err(|_| anyhow!("Couldn't find neither {variable} nor HOME"))
}

pub fn create_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

pub fn store_path(application_dir: &Path) -> PathBuf {
    application_dir.join("store")
}
