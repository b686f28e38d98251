// src/fetch/mod.rs

use anyhow::{Context, Result};
use rayon::prelude::*;
use reqwest::Client;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{sync::Semaphore, time::Instant};
use tracing::{error, info, warn};
use url::Url;

use crate::error::FetchError;

pub mod checksum;
pub mod download;

pub use checksum::{file_digest, parse_checksum_manifest, Algorithm, ChecksumManifest};
pub use download::{download_file, target_filename, Downloaded};

pub const DEFAULT_CONCURRENCY: usize = 3;

/// Parse the URL manifest: one URL per line, blank lines and `#` comments ignored.
pub fn parse_url_manifest(text: &str) -> Result<Vec<Url>> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(idx, line)| {
            Url::parse(line).with_context(|| format!("URL manifest line {}: `{}`", idx + 1, line))
        })
        .collect()
}

/// Outcome of one fetch run.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub downloaded: Vec<Downloaded>,
    /// Targets that were already present and left untouched.
    pub skipped: Vec<String>,
    /// `(url, error)` for every failed download.
    pub failed: Vec<(String, String)>,
}

/// Download every target in `urls` that is not already in `dest_dir`.
///
/// Downloads are independent; at most `concurrency` run at once. A failure
/// is recorded and the remaining downloads continue.
pub async fn fetch_all(
    client: &Client,
    urls: &[Url],
    dest_dir: impl AsRef<Path>,
    concurrency: usize,
) -> Result<FetchReport> {
    let dest_dir = dest_dir.as_ref().to_path_buf();
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let mut report = FetchReport::default();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(urls.len());

    for url in urls {
        let name = target_filename(url)?;
        if dest_dir.join(&name).is_file() {
            info!(name = %name, "already present; skipping");
            report.skipped.push(name);
            continue;
        }

        let client = client.clone();
        let dest_dir = dest_dir.clone();
        let url = url.clone();
        let sem = sem.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await?;
            info!(name = %name, "downloading");
            let start = Instant::now();
            let result = download_file(&client, &url, &dest_dir).await;
            match &result {
                Ok((_, d)) => info!(name = %name, bytes = d.size_bytes, elapsed = ?start.elapsed(), "downloaded"),
                Err(err) => error!("{} failed: {:#}", url, err),
            }
            Ok::<_, anyhow::Error>((url.to_string(), result))
        }));
    }

    for handle in handles {
        let (url, result) = handle.await??;
        match result {
            Ok((_, downloaded)) => report.downloaded.push(downloaded),
            Err(err) => report.failed.push((url, format!("{:#}", err))),
        }
    }

    Ok(report)
}

/// A file whose digest matched the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub filename: String,
    pub path: PathBuf,
    pub digest: String,
}

/// Check every manifest entry against the file in `dir`, and require a
/// manifest entry for every target in `urls`.
///
/// Digests are computed in parallel; the first problem found (in filename
/// order) is returned.
pub fn verify_all(manifest: &ChecksumManifest, urls: &[Url], dir: impl AsRef<Path>) -> Result<Vec<Verified>> {
    let dir = dir.as_ref();

    for url in urls {
        let name = target_filename(url)?;
        if manifest.get(&name).is_none() {
            return Err(FetchError::MissingChecksum { filename: name }.into());
        }
    }

    let results: Vec<Result<Verified>> = manifest
        .entries
        .par_iter()
        .map(|(filename, expected)| {
            let path = dir.join(filename);
            if !path.is_file() {
                return Err(FetchError::MissingFile {
                    filename: filename.clone(),
                    dir: dir.to_path_buf(),
                }
                .into());
            }
            let actual = file_digest(&path, expected.algorithm)?;
            if actual != expected.digest {
                return Err(FetchError::ChecksumMismatch {
                    filename: filename.clone(),
                    expected: expected.digest.clone(),
                    actual,
                }
                .into());
            }
            Ok(Verified {
                filename: filename.clone(),
                path,
                digest: actual,
            })
        })
        .collect();

    let mut verified = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(v) => {
                info!(file = %v.filename, "checksum ok");
                verified.push(v);
            }
            Err(err) => {
                warn!("verification failed: {:#}", err);
                return Err(err);
            }
        }
    }
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::fs;
    use tempfile::tempdir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    fn manifest_for(files: &[(&str, &[u8])]) -> ChecksumManifest {
        let text: String = files
            .iter()
            .map(|(name, body)| format!("{}  {}\n", sha256_hex(body), name))
            .collect();
        parse_checksum_manifest(&text).expect("manifest")
    }

    /// Serve each request with `body`, closing the connection afterwards.
    async fn serve(body: &'static [u8], requests: usize) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..requests {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                sock.write_all(head.as_bytes()).await.unwrap();
                sock.write_all(body).await.unwrap();
                sock.shutdown().await.unwrap();
            }
        });
        addr
    }

    #[test]
    fn url_manifest_skips_comments_and_blanks() -> Result<()> {
        let urls = parse_url_manifest(
            "# fiscal years\nhttps://example.org/perm_2020.xlsx\n\n  https://example.org/perm_2021.xlsx  \n",
        )?;
        assert_eq!(urls.len(), 2);
        assert_eq!(target_filename(&urls[1])?, "perm_2021.xlsx");
        assert!(parse_url_manifest("not a url\n").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn rerun_on_complete_set_downloads_nothing() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("perm_2020.xlsx"), b"fy2020")?;
        fs::write(dir.path().join("perm_2021.xlsx"), b"fy2021")?;
        // Nothing listens here; any download attempt would fail.
        let urls = parse_url_manifest("http://127.0.0.1:9/perm_2020.xlsx\nhttp://127.0.0.1:9/perm_2021.xlsx\n")?;

        let report = fetch_all(&Client::new(), &urls, dir.path(), DEFAULT_CONCURRENCY).await?;
        assert!(report.downloaded.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.skipped.len(), 2);

        let manifest = manifest_for(&[("perm_2020.xlsx", b"fy2020"), ("perm_2021.xlsx", b"fy2021")]);
        let verified = verify_all(&manifest, &urls, dir.path())?;
        assert_eq!(verified.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn downloads_missing_file_and_verifies() -> Result<()> {
        let addr = serve(b"spreadsheet bytes", 1).await;
        let dir = tempdir()?;
        let urls = parse_url_manifest(&format!("http://{}/files/perm_2020.xlsx\n", addr))?;

        let report = fetch_all(&Client::new(), &urls, dir.path(), 1).await?;
        assert!(report.failed.is_empty(), "{:?}", report.failed);
        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(report.downloaded[0].size_bytes, 17);
        assert_eq!(fs::read(dir.path().join("perm_2020.xlsx"))?, b"spreadsheet bytes");
        assert!(!dir.path().join("perm_2020.xlsx.part").exists());

        let manifest = manifest_for(&[("perm_2020.xlsx", b"spreadsheet bytes")]);
        verify_all(&manifest, &urls, dir.path())?;
        Ok(())
    }

    #[tokio::test]
    async fn failed_download_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let urls = parse_url_manifest("http://127.0.0.1:9/perm_2019.xlsx\n")?;
        let report = fetch_all(&Client::new(), &urls, dir.path(), 2).await?;
        assert_eq!(report.failed.len(), 1);
        assert!(!dir.path().join("perm_2019.xlsx").exists());
        Ok(())
    }

    #[test]
    fn mismatch_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("perm_2020.xlsx"), b"truncated")?;
        let manifest = manifest_for(&[("perm_2020.xlsx", b"complete file")]);

        let err = verify_all(&manifest, &[], dir.path()).unwrap_err();
        match err.downcast_ref::<FetchError>() {
            Some(FetchError::ChecksumMismatch { filename, .. }) => assert_eq!(filename, "perm_2020.xlsx"),
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn missing_file_and_missing_checksum() -> Result<()> {
        let dir = tempdir()?;
        let manifest = manifest_for(&[("perm_2020.xlsx", b"x")]);
        let err = verify_all(&manifest, &[], dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::MissingFile { .. })));

        fs::write(dir.path().join("perm_2020.xlsx"), b"x")?;
        let urls = parse_url_manifest("https://example.org/perm_2022.xlsx\n")?;
        let err = verify_all(&manifest, &urls, dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::MissingChecksum { .. })));
        Ok(())
    }
}
