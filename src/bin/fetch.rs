use anyhow::{Context, Result};
use clap::Parser;
use permmaps::{
    config::DEFAULT_DATA_DIR,
    fetch::{self, parse_checksum_manifest, parse_url_manifest},
    FetchError,
};
use reqwest::Client;
use std::{fs, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Download PERM disclosure files and verify their checksums")]
struct Args {
    /// Plain-text list of URLs, one per line.
    #[arg(long, default_value = "data/dol_perm/urls.txt")]
    urls: PathBuf,
    /// sha256sum-style checksum manifest.
    #[arg(long, default_value = "data/dol_perm/SHA256SUMS")]
    checksums: PathBuf,
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    dest: PathBuf,
    #[arg(long, default_value_t = fetch::DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Only check files already on disk.
    #[arg(long)]
    verify_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();

    let urls_text =
        fs::read_to_string(&args.urls).with_context(|| format!("reading {}", args.urls.display()))?;
    let urls = parse_url_manifest(&urls_text)?;
    let sums_text = fs::read_to_string(&args.checksums)
        .with_context(|| format!("reading {}", args.checksums.display()))?;
    let manifest = parse_checksum_manifest(&sums_text)?;
    info!(
        urls = urls.len(),
        checksums = manifest.len(),
        dest = %args.dest.display(),
        "loaded manifests"
    );

    if !args.verify_only {
        let report = fetch::fetch_all(&Client::new(), &urls, &args.dest, args.concurrency).await?;
        info!(
            downloaded = report.downloaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "fetch finished"
        );
        if !report.failed.is_empty() {
            for (url, err) in &report.failed {
                error!("{}: {}", url, err);
            }
            return Err(FetchError::DownloadsFailed {
                failed: report.failed.len(),
                total: urls.len(),
            }
            .into());
        }
    }

    let verified = fetch::verify_all(&manifest, &urls, &args.dest)?;
    info!("{} files verified", verified.len());
    Ok(())
}
