use std::future::Future;
use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::AssetError;

/// Await `io`, giving up as soon as `cancel` fires
async fn or_cancel<T, E>(
    cancel: &CancellationToken,
    io: impl Future<Output = Result<T, E>>,
) -> Result<T, AssetError>
where
    AssetError: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AssetError::Cancelled),
        result = io => Ok(result?),
    }
}

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// The token is raced against the request and every read, write and sync. `dest`
/// is closed before this returns, whatever the outcome, so the caller can
/// rename or delete it.
pub(crate) async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<u64, AssetError> {
    if cancel.is_cancelled() {
        return Err(AssetError::Cancelled);
    }

    tracing::debug!("GET {}", url);
    let response = or_cancel(cancel, client.get(url).send()).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::Status {
            url: url.to_string(),
            status,
        });
    }

    let expected = response.content_length();
    let mut file = or_cancel(cancel, tokio::fs::File::create(dest)).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    let mut next_report = 10;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssetError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;

        or_cancel(cancel, file.write_all(&chunk)).await?;
        written += chunk.len() as u64;

        if let Some(total) = expected.filter(|t| *t > 0) {
            let percent = written * 100 / total;
            if percent >= next_report {
                tracing::debug!("{}: {}% ({}/{} bytes)", url, percent, written, total);
                next_report = percent - percent % 10 + 10;
            }
        }
    }

    or_cancel(cancel, file.flush()).await?;
    or_cancel(cancel, file.sync_all()).await?;
    drop(file);

    if cancel.is_cancelled() {
        return Err(AssetError::Cancelled);
    }
    if written == 0 {
        return Err(AssetError::EmptyPayload);
    }
    match expected {
        Some(expected) if expected != written => Err(AssetError::SizeMismatch {
            expected,
            actual: written,
        }),
        _ => Ok(written),
    }
}
