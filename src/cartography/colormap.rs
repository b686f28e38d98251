use std::fmt;

use crate::error::CartographyError;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Result<Self, CartographyError> {
        let bad = || CartographyError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(bad)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        Ok(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if hex.len() == 8 { byte(6)? } else { 255 },
        })
    }

    /// `#rrggbb`, used as an SVG fill.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(&self) -> f64 {
        self.a as f64 / 255.0
    }

    /// Relative luminance in [0, 1] (sRGB weights, no gamma correction).
    pub fn luminance(&self) -> f64 {
        (0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64) / 255.0
    }

    fn lerp(a: Rgba, b: Rgba, t: f64) -> Rgba {
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
        Rgba {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
            a: mix(a.a, b.a),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Evenly spaced anchor colors, sampled from the matplotlib colormaps of the same name.
const COLORMAPS: &[(&str, &[&str])] = &[
    ("viridis", &["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"]),
    (
        "BuPu",
        &["#f7fcfd", "#e0ecf4", "#bfd3e6", "#9ebcda", "#8c96c6", "#8c6bb1", "#88419d", "#810f7c", "#4d004b"],
    ),
    (
        "Blues",
        &["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b"],
    ),
    (
        "Reds",
        &["#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d"],
    ),
    (
        "Greys",
        &["#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252", "#252525", "#000000"],
    ),
    ("coolwarm", &["#3b4cc0", "#8db0fe", "#dddcdc", "#f49a7b", "#b40426"]),
];

pub const DEFAULT_COLORMAP: &str = "viridis";

/// Piecewise-linear colormap over [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    pub name: String,
    anchors: Vec<Rgba>,
}

impl Colormap {
    /// Look up a colormap by name; a `_r` suffix reverses it.
    pub fn by_name(name: &str) -> Result<Self, CartographyError> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let (_, hexes) = COLORMAPS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(base))
            .ok_or_else(|| CartographyError::UnknownColormap(name.to_string()))?;
        let mut anchors = hexes
            .iter()
            .map(|h| Rgba::from_hex(h))
            .collect::<Result<Vec<_>, _>>()?;
        if reversed {
            anchors.reverse();
        }
        Ok(Self {
            name: name.to_string(),
            anchors,
        })
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        COLORMAPS.iter().map(|(n, _)| *n)
    }

    /// Color at `t`, clipped to [0, 1]. NaN maps to the low end.
    pub fn at(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = self.anchors.len() - 1;
        let pos = t * segments as f64;
        let i = (pos.floor() as usize).min(segments - 1);
        Rgba::lerp(self.anchors[i], self.anchors[i + 1], pos - i as f64)
    }
}

/// Linear map of `[vmin, vmax]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// Unclipped position of `value`; equal bounds give 0.
    pub fn apply(&self, value: f64) -> f64 {
        if self.vmax == self.vmin {
            0.0
        } else {
            (value - self.vmin) / (self.vmax - self.vmin)
        }
    }
}

/// A colormap paired with its value bounds; the companion of a drawn map
/// used to build a legend.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub norm: Normalize,
    pub cmap: Colormap,
}

impl ColorScale {
    pub fn new(norm: Normalize, cmap: Colormap) -> Self {
        Self { norm, cmap }
    }

    pub fn to_rgba(&self, value: f64) -> Rgba {
        self.cmap.at(self.norm.apply(value))
    }

    /// `n` evenly spaced values from `vmin` to `vmax` (inclusive).
    pub fn ticks(&self, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![self.norm.vmin],
            _ => (0..n)
                .map(|i| self.norm.vmin + (self.norm.vmax - self.norm.vmin) * i as f64 / (n - 1) as f64)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let c = Rgba::from_hex("#4d004b").unwrap();
        assert_eq!(c, Rgba::rgb(0x4d, 0x00, 0x4b));
        assert_eq!(c.to_hex(), "#4d004b");
        assert_eq!(Rgba::from_hex("#00000080").unwrap().a, 0x80);
        assert!(Rgba::from_hex("4d004b").is_err());
        assert!(Rgba::from_hex("#zz0000").is_err());
    }

    #[test]
    fn endpoints_and_clipping() {
        let greys = Colormap::by_name("Greys").unwrap();
        assert_eq!(greys.at(0.0), Rgba::rgb(255, 255, 255));
        assert_eq!(greys.at(1.0), Rgba::rgb(0, 0, 0));
        assert_eq!(greys.at(-3.0), greys.at(0.0));
        assert_eq!(greys.at(7.0), greys.at(1.0));
    }

    #[test]
    fn reversed_and_unknown() {
        let cmap = Colormap::by_name("BuPu_r").unwrap();
        assert_eq!(cmap.at(0.0), Rgba::from_hex("#4d004b").unwrap());
        assert!(matches!(
            Colormap::by_name("jet"),
            Err(CartographyError::UnknownColormap(name)) if name == "jet"
        ));
    }

    #[test]
    fn every_named_map_and_its_reverse_resolve() {
        for name in Colormap::names() {
            let fwd = Colormap::by_name(name).unwrap();
            let rev = Colormap::by_name(&format!("{}_r", name)).unwrap();
            assert_eq!(fwd.at(0.0), rev.at(1.0), "{}", name);
        }
    }

    #[test]
    fn normalize_and_ticks() {
        let scale = ColorScale::new(Normalize::new(10.0, 20.0), Colormap::by_name(DEFAULT_COLORMAP).unwrap());
        assert_eq!(scale.norm.apply(15.0), 0.5);
        assert_eq!(Normalize::new(3.0, 3.0).apply(100.0), 0.0);
        assert_eq!(scale.ticks(3), vec![10.0, 15.0, 20.0]);
        assert_eq!(scale.to_rgba(20.0), Rgba::from_hex("#fde725").unwrap());
    }
}
