use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;

const REMOVE_ATTEMPTS: u32 = 3;

/// Move `temp` onto `target`.
///
/// A plain rename replaces the target in one step. When that is refused
/// (the old model is held open by a running engine on Windows), the old
/// file is moved aside to a timestamped backup first so it is never lost.
/// A `temp` that has vanished leaves `target` untouched.
pub(crate) async fn swap_into_place(temp: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(temp, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e)
            if fs::try_exists(temp).await.unwrap_or(false)
                && fs::try_exists(target).await.unwrap_or(false) =>
        {
            let backup = backup_path(target);
            tracing::warn!(
                "Could not replace {}: {}, moving it to {}",
                target.display(),
                e,
                backup.display()
            );
            fs::rename(target, &backup).await?;
            fs::rename(temp, target).await
        }
        Err(e) => Err(e),
    }
}

/// Swap a finished download into place, or clean up both files.
///
/// A failed swap may have left `target` moved aside or half replaced, so it
/// is removed along with `temp`. Returns whether `target` now holds the
/// download.
pub(crate) async fn commit_download(temp: &Path, target: &Path) -> bool {
    match swap_into_place(temp, target).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Could not move {} into place: {}", temp.display(), e);
            remove_with_retry(temp).await;
            remove_with_retry(target).await;
            false
        }
    }
}

/// `eng.traineddata` -> `eng.traineddata.backup_20240131235959`
pub(crate) fn backup_path(target: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut name = target.as_os_str().to_owned();
    name.push(format!(".backup_{stamp}"));
    PathBuf::from(name)
}

/// Best-effort delete with short back-off; returns whether the file is gone
pub(crate) async fn remove_with_retry(path: &Path) -> bool {
    for attempt in 1..=REMOVE_ATTEMPTS {
        match fs::remove_file(path).await {
            Ok(()) => return true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => {
                tracing::debug!(
                    "Delete of {} failed (attempt {}): {}",
                    path.display(),
                    attempt,
                    e
                );
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
            }
        }
    }

    tracing::warn!("Giving up on deleting {}", path.display());
    false
}
