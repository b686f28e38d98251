// src/cartography/svg.rs

use std::fmt::Write;

use super::{
    layout::{Shape, GRID_COLS, GRID_ROWS},
    Colorbar, RegionPatch, UsMap,
};

const CELL: f64 = 44.0;
const GAP: f64 = 4.0;
const MARGIN: f64 = 20.0;
const TITLE_H: f64 = 36.0;
const NOTE_H: f64 = 28.0;
const BAR_W: f64 = 16.0;
const BAR_SPACE: f64 = 90.0;
const GRADIENT_STOPS: usize = 16;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn tick_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

pub(super) fn render(map: &UsMap) -> String {
    let grid_w = GRID_COLS as f64 * (CELL + GAP);
    let grid_h = GRID_ROWS as f64 * (CELL + GAP);
    let top = MARGIN + if map.title.is_some() { TITLE_H } else { 0.0 };
    let width = 2.0 * MARGIN + grid_w + if map.colorbar.is_some() { BAR_SPACE } else { 0.0 };
    let height = top + grid_h + MARGIN + if map.note.is_some() { NOTE_H } else { 0.0 };

    // Writing into a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="sans-serif">"#,
        w = width,
        h = height
    );
    let _ = writeln!(out, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);

    if let Some(title) = &map.title {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="18" text-anchor="middle">{}</text>"#,
            MARGIN + grid_w / 2.0,
            MARGIN + 18.0,
            escape(title)
        );
    }

    let _ = writeln!(out, r##"<g id="regions" stroke="#ffffff" stroke-width="1">"##);
    for patch in &map.patches {
        write_patch(&mut out, patch, MARGIN, top);
    }
    let _ = writeln!(out, "</g>");

    if let Some(bar) = &map.colorbar {
        write_colorbar(&mut out, bar, MARGIN + grid_w + 24.0, top, grid_h - GAP);
    }

    if let Some(note) = &map.note {
        let _ = writeln!(
            out,
            r##"<text x="{:.1}" y="{:.1}" font-size="11" fill="#555555">{}</text>"##,
            MARGIN,
            top + grid_h + 16.0,
            escape(note)
        );
    }

    out.push_str("</svg>\n");
    out
}

fn write_patch(out: &mut String, patch: &RegionPatch, left: f64, top: f64) {
    let x = left + patch.col as f64 * (CELL + GAP);
    let y = top + patch.row as f64 * (CELL + GAP);
    let (cx, cy) = (x + CELL / 2.0, y + CELL / 2.0);
    let value = patch.value.map(tick_label).unwrap_or_else(|| "no data".into());

    let _ = writeln!(out, r#"<g id="{}">"#, patch.code);
    let _ = writeln!(out, "<title>{}: {}</title>", escape(patch.name), escape(&value));
    let (font, dy) = match patch.shape {
        Shape::Square => {
            let _ = writeln!(
                out,
                r#"<rect x="{:.1}" y="{:.1}" width="{CELL:.1}" height="{CELL:.1}" rx="3" fill="{}" fill-opacity="{:.3}"/>"#,
                x,
                y,
                patch.fill,
                patch.fill.opacity()
            );
            (12, 4.0)
        }
        Shape::Circle => {
            let _ = writeln!(
                out,
                r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" fill-opacity="{:.3}"/>"#,
                cx,
                cy,
                CELL * 0.3,
                patch.fill,
                patch.fill.opacity()
            );
            (9, 3.0)
        }
    };
    let ink = if patch.fill.luminance() < 0.5 { "#ffffff" } else { "#222222" };
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" font-size="{}" text-anchor="middle" fill="{}" stroke="none">{}</text>"#,
        cx,
        cy + dy,
        font,
        ink,
        patch.code
    );
    let _ = writeln!(out, "</g>");
}

fn write_colorbar(out: &mut String, bar: &Colorbar, x: f64, y: f64, h: f64) {
    let _ = writeln!(out, r#"<defs><linearGradient id="colorbar" x1="0" y1="1" x2="0" y2="0">"#);
    for i in 0..=GRADIENT_STOPS {
        let t = i as f64 / GRADIENT_STOPS as f64;
        let _ = writeln!(
            out,
            r#"<stop offset="{:.3}" stop-color="{}"/>"#,
            t,
            bar.scale.cmap.at(t)
        );
    }
    let _ = writeln!(out, "</linearGradient></defs>");
    let _ = writeln!(
        out,
        r##"<rect id="colorbar-fill" x="{:.1}" y="{:.1}" width="{BAR_W:.1}" height="{:.1}" fill="url(#colorbar)" stroke="#444444" stroke-width="0.5"/>"##,
        x,
        y,
        h
    );

    let (vmin, vmax) = (bar.scale.norm.vmin, bar.scale.norm.vmax);
    for v in bar.scale.ticks(bar.ticks) {
        let t = bar.scale.norm.apply(v);
        let t = if vmin == vmax { 0.0 } else { t.clamp(0.0, 1.0) };
        let ty = y + h * (1.0 - t);
        let _ = writeln!(
            out,
            r##"<line x1="{:.1}" y1="{ty:.1}" x2="{:.1}" y2="{ty:.1}" stroke="#444444"/><text x="{:.1}" y="{:.1}" font-size="11">{}</text>"##,
            x + BAR_W,
            x + BAR_W + 4.0,
            x + BAR_W + 7.0,
            ty + 4.0,
            tick_label(v)
        );
    }

    if let Some(label) = &bar.label {
        let lx = x + BAR_W + 52.0;
        let ly = y + h / 2.0;
        let _ = writeln!(
            out,
            r#"<text x="{lx:.1}" y="{ly:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 {lx:.1} {ly:.1})">{}</text>"#,
            escape(label)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartography::{draw_us_map, MapOptions};
    use std::collections::BTreeMap;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn circles_for_small_regions_and_a_gradient_for_the_bar() {
        let (mut map, scale) = draw_us_map(&BTreeMap::new(), &MapOptions::default()).unwrap();
        map.colorbar = Some(Colorbar::new(scale));
        map.note = Some("source: DOL".into());
        let svg = render(&map);

        assert_eq!(svg.matches("<circle").count(), 5);
        assert_eq!(svg.matches("<stop ").count(), GRADIENT_STOPS + 1);
        assert!(svg.contains("source: DOL"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn tick_labels() {
        assert_eq!(tick_label(25.0), "25");
        assert_eq!(tick_label(0.126), "0.13");
    }
}
