use anyhow::{bail, Context, Result};
use clap::Parser;
use permmaps::{
    cartography::{draw_us_map, Colorbar, MapOptions},
    config::Config,
    preprocess::{load_table, PermTable},
};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DOCTORATE: &str = "DOCTORATE";

#[derive(Parser)]
#[command(author, version, about = "Map the share of doctorates among PERM workers by worksite state")]
struct Args {
    /// Canonical table; defaults to perm.parquet in the output directory.
    #[arg(long)]
    table: Option<PathBuf>,
    #[arg(long, default_value = "doctor_ratios.svg")]
    output: PathBuf,
}

/// Percentage of `DOCTORATE` among rows with a known education level, per job state.
fn doctorate_percentages(table: &PermTable) -> Result<BTreeMap<String, f64>> {
    let (Some(states), Some(education)) = (table.text("job_state"), table.text("worker_education_level"))
    else {
        bail!("table lacks job_state or worker_education_level");
    };

    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (state, edu) in states.iter().zip(education) {
        if let (Some(state), Some(edu)) = (state, edu) {
            let entry = counts.entry(state.as_str()).or_default();
            entry.1 += 1;
            if edu == DOCTORATE {
                entry.0 += 1;
            }
        }
    }
    Ok(counts
        .into_iter()
        .map(|(state, (doctors, known))| (state.to_string(), 100.0 * doctors as f64 / known as f64))
        .collect())
}

/// Fiscal years of the rows that feed the statistic, i.e. with a known education level.
fn fiscal_year_range(table: &PermTable) -> Option<(i32, i32)> {
    let years = table.number("fiscal_year")?;
    let education = table.text("worker_education_level")?;
    let mut it = years
        .iter()
        .zip(education)
        .filter(|(_, edu)| edu.is_some())
        .filter_map(|(y, _)| y.map(|y| y as i32));
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let path = args.table.unwrap_or_else(|| Config::from_env().table_path());
    let table = load_table(&path).with_context(|| format!("loading {}", path.display()))?;
    info!(rows = table.num_rows(), table = %path.display(), "table loaded");

    let ratios = doctorate_percentages(&table)?;
    let opts = MapOptions {
        cmap: "BuPu".into(),
        ..MapOptions::default()
    };
    let (mut map, scale) = draw_us_map(&ratios, &opts)?;
    map.title = Some(match fiscal_year_range(&table) {
        Some((lo, hi)) if lo == hi => format!("Doctorates among PERM workers, FY{}", lo),
        Some((lo, hi)) => format!("Doctorates among PERM workers, FY{}-FY{}", lo, hi),
        None => "Doctorates among PERM workers".to_string(),
    });
    map.note = Some("Share of workers with a known education level, by worksite state".into());
    map.colorbar = Some(Colorbar::new(scale).with_label("% doctorate"));
    map.save_svg(&args.output)?;

    info!(states = ratios.len(), output = %args.output.display(), "map written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use permmaps::preprocess::ColumnData;

    fn text(values: &[Option<&str>]) -> ColumnData {
        ColumnData::Text(values.iter().map(|v| v.map(str::to_string)).collect())
    }

    #[test]
    fn percentages_ignore_unknown_education() {
        let table = PermTable {
            names: vec!["fiscal_year".into(), "job_state".into(), "worker_education_level".into()],
            columns: vec![
                ColumnData::Number(vec![Some(2019.0), Some(2021.0), Some(2020.0), Some(2020.0), None, Some(2023.0)]),
                text(&[Some("CA"), Some("CA"), Some("CA"), Some("TX"), None, Some("WA")]),
                text(&[Some("DOCTORATE"), Some("MASTER'S"), None, Some("BACHELOR'S"), Some("DOCTORATE"), None]),
            ],
            non_nullable: vec![],
        };
        let ratios = doctorate_percentages(&table).unwrap();
        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios["CA"], 50.0);
        assert_eq!(ratios["TX"], 0.0);
        // FY2023 has no known education level, so it stays out of the title.
        assert_eq!(fiscal_year_range(&table), Some((2019, 2021)));
    }
}
