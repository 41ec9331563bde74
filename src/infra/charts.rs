// ============================================================
// Layer 6: Line Charts
// ============================================================
// Renders per-epoch means as a standalone SVG polyline chart:
// epoch on the x-axis, the averaged quantity on the y-axis.
//
//   ┌──────────────────────────────┐
//   │ title                        │
//   │ max ┤╲                       │
//   │     │ ╲__                    │
//   │ min ┤    ╲______             │
//   │     └┬──────────────┬        │
//   │      first epoch   last      │
//   └──────────────────────────────┘

use anyhow::{Context, Result};
use std::{
    fmt::{self, Write as _},
    fs,
    path::Path,
};

use crate::domain::records::EpochMean;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 60.0;

pub struct LineChart {
    title:   String,
    y_label: String,
}

impl LineChart {
    pub fn new(title: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self { title: title.into(), y_label: y_label.into() }
    }

    /// SVG document for `points`, or None when there is nothing to draw.
    pub fn render(&self, points: &[EpochMean]) -> Result<Option<String>, fmt::Error> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Ok(None);
        };

        let (x_min, x_max) = (first.epoch as f64, last.epoch as f64);
        let (y_min, y_max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });
        let x_span = (x_max - x_min).max(1.0);
        let y_span = if y_max > y_min { y_max - y_min } else { 1.0 };

        let plot_w = WIDTH - 2.0 * MARGIN;
        let plot_h = HEIGHT - 2.0 * MARGIN;
        let to_x = |epoch: usize| MARGIN + (epoch as f64 - x_min) / x_span * plot_w;
        let to_y = |value: f64| HEIGHT - MARGIN - (value - y_min) / y_span * plot_h;

        let polyline = points
            .iter()
            .map(|p| format!("{:.2},{:.2}", to_x(p.epoch), to_y(p.value)))
            .collect::<Vec<_>>()
            .join(" ");

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
        )?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            WIDTH / 2.0,
            MARGIN / 2.0,
            escape(&self.title)
        )?;
        writeln!(
            svg,
            r#"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/><line x1="{m}" y1="{t}" x2="{m}" y2="{b}" stroke="black"/>"#,
            m = MARGIN,
            t = MARGIN,
            b = HEIGHT - MARGIN,
            r = WIDTH - MARGIN
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">epoch</text>"#,
            WIDTH / 2.0,
            HEIGHT - MARGIN / 4.0
        )?;
        writeln!(
            svg,
            r#"<text x="{x}" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 {x} {y})">{}</text>"#,
            escape(&self.y_label),
            x = MARGIN / 4.0,
            y = HEIGHT / 2.0
        )?;
        for (value, y) in [(y_max, MARGIN), (y_min, HEIGHT - MARGIN)] {
            writeln!(
                svg,
                r#"<text x="{}" y="{:.2}" text-anchor="end" font-size="10">{:.4}</text>"#,
                MARGIN - 4.0,
                y,
                value
            )?;
        }
        for (epoch, x) in [(first.epoch, MARGIN), (last.epoch, to_x(last.epoch))] {
            writeln!(
                svg,
                r#"<text x="{:.2}" y="{}" text-anchor="middle" font-size="10">{}</text>"#,
                x,
                HEIGHT - MARGIN + 14.0,
                epoch
            )?;
        }
        writeln!(
            svg,
            r#"<polyline fill="none" stroke="steelblue" stroke-width="2" points="{polyline}"/>"#
        )?;
        svg.push_str("</svg>\n");
        Ok(Some(svg))
    }

    /// Render and write to `path`. Empty series are skipped with a warning.
    pub fn write(&self, path: &Path, points: &[EpochMean]) -> Result<()> {
        match self.render(points)? {
            Some(svg) => fs::write(path, svg)
                .with_context(|| format!("Cannot write chart '{}'", path.display())),
            None => {
                tracing::warn!("No data for '{}', chart not written", self.title);
                Ok(())
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
