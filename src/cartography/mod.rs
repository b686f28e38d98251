// src/cartography/mod.rs

pub mod colormap;
pub mod layout;
mod svg;

pub use colormap::{ColorScale, Colormap, Normalize, Rgba, DEFAULT_COLORMAP};
pub use layout::Shape;

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, warn};

use crate::{error::CartographyError, geography};

/// Fill for regions without a value when neither `default_color` nor
/// `default_value` is set.
pub const NEUTRAL_GREY: Rgba = Rgba::rgb(0xd9, 0xd9, 0xd9);

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub cmap: String,
    /// Color bounds; derived from the data when `None`.
    pub clim: Option<(f64, f64)>,
    pub default_value: Option<f64>,
    pub default_color: Option<Rgba>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            cmap: DEFAULT_COLORMAP.to_string(),
            clim: None,
            default_value: None,
            default_color: None,
        }
    }
}

/// One drawn region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPatch {
    pub code: &'static str,
    pub name: &'static str,
    pub value: Option<f64>,
    pub fill: Rgba,
    pub shape: Shape,
    pub row: u8,
    pub col: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colorbar {
    pub scale: ColorScale,
    pub label: Option<String>,
    pub ticks: usize,
}

impl Colorbar {
    pub fn new(scale: ColorScale) -> Self {
        Self {
            scale,
            label: None,
            ticks: 6,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The drawable figure returned by [`draw_us_map`]. Fields are public so
/// callers can restyle patches or add a title before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct UsMap {
    pub patches: Vec<RegionPatch>,
    pub title: Option<String>,
    pub note: Option<String>,
    pub colorbar: Option<Colorbar>,
}

impl UsMap {
    pub fn patch(&self, code: &str) -> Option<&RegionPatch> {
        self.patches.iter().find(|p| p.code == code)
    }

    pub fn patch_mut(&mut self, code: &str) -> Option<&mut RegionPatch> {
        self.patches.iter_mut().find(|p| p.code == code)
    }

    pub fn to_svg(&self) -> String {
        svg::render(self)
    }

    #[tracing::instrument(level = "info", skip(self, path), fields(path = %path.display()))]
    pub fn save_svg(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, self.to_svg()).with_context(|| format!("writing {}", path.display()))
    }
}

/// Color the U.S. states and territories by `values`.
///
/// Keys may be postal codes or names in any case; unknown keys are logged
/// and ignored, as are non-finite values. Returns the figure and the color
/// scale it was drawn with.
pub fn draw_us_map(
    values: &BTreeMap<String, f64>,
    opts: &MapOptions,
) -> Result<(UsMap, ColorScale), CartographyError> {
    let cmap = Colormap::by_name(&opts.cmap)?;

    let mut resolved: BTreeMap<&'static str, f64> = BTreeMap::new();
    for (key, &value) in values {
        match geography::postal_code(key) {
            Some(code) if value.is_finite() => {
                if let Some(previous) = resolved.insert(code, value) {
                    warn!(
                        key = %key,
                        code,
                        previous,
                        value,
                        "region given more than once, keeping the later key"
                    );
                }
            }
            Some(code) => debug!(code, value, "skipping non-finite value"),
            None => warn!(key = %key, "not a U.S. state or territory, ignoring"),
        }
    }

    let (vmin, vmax) = opts.clim.unwrap_or_else(|| data_bounds(resolved.values().copied()));
    let scale = ColorScale::new(Normalize::new(vmin, vmax), cmap);

    let default_fill = match (opts.default_color, opts.default_value) {
        (Some(color), _) => color,
        (None, Some(value)) => scale.to_rgba(value),
        (None, None) => NEUTRAL_GREY,
    };

    let patches = layout::TILES
        .iter()
        .map(|tile| {
            let value = resolved.get(tile.code).copied();
            RegionPatch {
                code: tile.code,
                name: geography::state_name(tile.code).unwrap_or(tile.code),
                value,
                fill: value.map_or(default_fill, |v| scale.to_rgba(v)),
                shape: tile.shape,
                row: tile.row,
                col: tile.col,
            }
        })
        .collect();

    debug!(regions = resolved.len(), vmin, vmax, cmap = %scale.cmap.name, "drew map");
    Ok((
        UsMap {
            patches,
            title: None,
            note: None,
            colorbar: None,
        },
        scale,
    ))
}

fn data_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 1.0))
}
