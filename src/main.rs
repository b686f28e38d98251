use anyhow::Result;
use permmaps::{
    config::Config,
    preprocess::{self, ColumnPolicy},
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure dirs and column policy ─────────────────────────
    let cfg = Config::from_env();
    let policy = ColumnPolicy::load_or_default(cfg.policy_path.as_deref())?;
    info!(
        data_dir = %cfg.data_dir.display(),
        output_dir = %cfg.output_dir.display(),
        policy_version = policy.version,
        "configured"
    );

    // ─── 3) preprocess every fiscal year ─────────────────────────────
    let summary = preprocess::preprocess_directory(&cfg.data_dir, &cfg.output_dir, &policy)?;
    info!(
        files = summary.files_read.len(),
        skipped = summary.files_skipped.len(),
        rows = summary.rows_written,
        duplicates = summary.duplicates_removed,
        table = %summary.table_path.display(),
        "all done"
    );
    Ok(())
}
