use anyhow::Result;
use clap::Parser;
use permmaps::{
    cartography::{draw_us_map, Colorbar, MapOptions},
    geography,
};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Color each state by the first letter of its name")]
struct Args {
    #[arg(long, default_value = "map_demo.svg")]
    output: PathBuf,
    #[arg(long, default_value = "coolwarm")]
    cmap: String,
}

/// A = 0 through Z = 25.
fn letter_index(name: &str) -> Option<f64> {
    let c = name.chars().next()?.to_ascii_uppercase();
    c.is_ascii_uppercase().then(|| (c as u8 - b'A') as f64)
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();

    let values: BTreeMap<String, f64> = geography::us_states()
        .iter()
        .filter_map(|(code, name)| letter_index(name).map(|v| (code.to_string(), v)))
        .collect();

    let opts = MapOptions {
        cmap: args.cmap,
        clim: Some((0.0, 25.0)),
        ..MapOptions::default()
    };
    let (mut map, scale) = draw_us_map(&values, &opts)?;
    map.title = Some("First letter of state name".into());
    map.note = Some("A = 0, Z = 25".into());
    map.colorbar = Some(Colorbar::new(scale).with_label("letter"));
    map.save_svg(&args.output)?;

    info!(regions = values.len(), output = %args.output.display(), "map written");
    Ok(())
}
