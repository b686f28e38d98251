use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use url::Url;

use crate::error::FetchError;

/// One completed download.
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub filename: String,
    pub url: String,
    pub size_bytes: u64,
    pub download_start: DateTime<Utc>,
    pub download_end: DateTime<Utc>,
}

/// Last non-empty path segment of `url`, used as the local filename.
pub fn target_filename(url: &Url) -> Result<String, FetchError> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|name| name.to_string())
        .ok_or_else(|| FetchError::NoFilename(url.to_string()))
}

/// Download `url` into `dest_dir` under its original filename.
///
/// The body is streamed to `<name>.part` and renamed once complete, so an
/// interrupted run never leaves a file that the skip check would accept.
pub async fn download_file(client: &Client, url: &Url, dest_dir: impl AsRef<Path>) -> Result<(PathBuf, Downloaded)> {
    let dest_dir = dest_dir.as_ref();
    let filename = target_filename(url)?;
    let dest_path = dest_dir.join(&filename);
    let part_path = dest_dir.join(format!("{}.part", filename));

    fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let download_start = Utc::now();
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;

    let mut out = fs::File::create(&part_path)
        .await
        .with_context(|| format!("creating {}", part_path.display()))?;
    let mut size_bytes = 0u64;
    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.with_context(|| format!("reading body from {}", url))?;
        out.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
    }
    out.flush().await?;
    drop(out);

    fs::rename(&part_path, &dest_path)
        .await
        .with_context(|| format!("renaming {} -> {}", part_path.display(), dest_path.display()))?;

    Ok((
        dest_path,
        Downloaded {
            filename,
            url: url.to_string(),
            size_bytes,
            download_start,
            download_end: Utc::now(),
        },
    ))
}
