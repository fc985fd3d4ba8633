use std::{io::ErrorKind, path::Path};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads the whole file while holding a shared lock. A missing file is reported as `None`.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    async fn read(path: &Path) -> Result<String, io::Error> {
        debug!("Reading {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        result.map(|_| contents)
    }

    match read(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Replaces contents of a file while holding an exclusive lock. The file is truncated only after
/// the lock is taken so that readers never observe a half-empty file from another writer.
pub async fn write_locked(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    debug!("Writing {path:?}");
    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;
    file.lock_exclusive()?;
    let result = overwrite(&mut file, contents).await;
    file.unlock_async().await?;
    result
}

async fn overwrite(file: &mut File, contents: &[u8]) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.rewind().await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Removes a file. Removing a missing file is not an error.
pub async fn remove_if_exists(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::remove_file(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::fs::operations::{read_locked, remove_if_exists, write_locked};

    #[tokio::test]
    async fn test_read_missing() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(read_locked(&dir.path().join("missing")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_shorter_contents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("value.json");

        write_locked(&path, b"a much longer value than the next one").await?;
        write_locked(&path, b"short").await?;

        assert_eq!(read_locked(&path).await?.as_deref(), Some("short"));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("value.json");

        write_locked(&path, b"true").await?;
        remove_if_exists(&path).await?;
        remove_if_exists(&path).await?;

        assert_eq!(read_locked(&path).await?, None);
        Ok(())
    }
}
