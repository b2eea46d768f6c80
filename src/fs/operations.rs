use std::path::Path;

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};

/// Reads the whole file while holding a shared lock. A missing file is reported as [None] so the
/// caller can fall back to defaults.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut contents = String::new();
    let result = file.read_to_string(&mut contents).await;
    file.unlock_async().await?;
    result?;

    Ok(Some(contents))
}

/// Replaces the contents of a file while holding an exclusive lock, so readers never observe a
/// half written document.
pub async fn write_locked(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;

    file.lock_exclusive()?;
    let result = async {
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_data().await
    }
    .await;
    file.unlock_async().await?;
    result
}
