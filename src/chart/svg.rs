//! SVG Rendering
//!
//! Draws one frame with `plotters`: a left value axis, a bottom time axis
//! and the data line. The finished document is then tagged for the viewer
//! with the surface id, a clip region, the slide offset on the line group
//! and an optional status label.

use chrono::{DateTime, Utc};
use plotters::prelude::*;
use std::ops::Range;

use super::error::{ChartError, ChartResult};
use super::scale::{LinearScale, TimeScale};
use super::types::{Layout, Sample};

/// Stroke of the data line (steelblue)
const LINE_COLOR: RGBColor = RGBColor(70, 130, 180);
const LINE_WIDTH: u32 = 2;

/// Approximate label counts per axis
pub const TIME_LABELS: usize = 10;
pub const VALUE_LABELS: usize = 10;

/// Everything needed to draw one frame
pub struct FrameContent<'a> {
    pub element_id: &'a str,
    pub layout: &'a Layout,
    pub samples: &'a [Sample],
    pub x: &'a TimeScale,
    pub y: &'a LinearScale,
    /// Offset recorded on the line for the viewer's slide transition
    pub translate_x: f64,
    /// Optional connection label
    pub status: Option<&'a str>,
}

/// Render a complete `<svg>` document
pub fn render_document(content: &FrameContent<'_>) -> ChartResult<String> {
    let layout = content.layout;
    let (t0, t1) = widen(content.x.domain());
    let (v0, v1) = content.y.domain();
    let values = widen_values(v0, v1);

    let mut svg = String::with_capacity(8192);
    {
        let size = (px(layout.width) as u32, px(layout.height) as u32);
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();

        let mut chart = ChartBuilder::on(&root)
            .margin_top(px(layout.margins.top))
            .margin_right(px(layout.margins.right))
            .x_label_area_size(px(layout.margins.bottom))
            .y_label_area_size(px(layout.margins.left))
            .build_cartesian_2d(t0..t1, values)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(TIME_LABELS)
            .y_labels(VALUE_LABELS)
            .axis_style(BLACK)
            .label_style(("sans-serif", 10))
            .x_label_formatter(&|t| format_time_label(*t))
            .y_label_formatter(&|v| format_value_label(*v))
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(LineSeries::new(
                content.samples.iter().map(|s| (s.timestamp, s.value)),
                LINE_COLOR.stroke_width(LINE_WIDTH),
            ))
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    Ok(decorate(svg, content))
}

/// Tag the plotted document for the viewer
fn decorate(mut svg: String, content: &FrameContent<'_>) -> String {
    let layout = content.layout;

    svg = svg.replacen(
        "<svg ",
        &format!(r#"<svg id="{}" "#, escape(content.element_id)),
        1,
    );

    let open_end = svg
        .find("<svg ")
        .and_then(|start| svg[start..].find('>').map(|end| start + end));
    if let Some(open_end) = open_end {
        let clip = format!(
            r#"<defs><clipPath id="clip"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath></defs>"#,
            fmt_num(layout.margins.left),
            fmt_num(layout.margins.top),
            fmt_num(layout.inner_width()),
            fmt_num(layout.inner_height()),
        );
        svg.insert_str(open_end + 1, &clip);
    }

    let group_open = format!(
        r#"<g clip-path="url(#clip)"><g class="line" data-translate-x="{}">"#,
        fmt_num(content.translate_x),
    );
    match find_line(&svg) {
        Some(line) => {
            let wrapped = format!("{}{}</g></g>", group_open, &svg[line.clone()]);
            svg.replace_range(line, &wrapped);
        }
        // Too few samples for a polyline; keep the hook for the viewer
        None => insert_before_close(&mut svg, &format!("{}</g></g>", group_open)),
    }

    if let Some(status) = content.status {
        let label = format!(
            r#"<text class="status" x="{}" y="{}" text-anchor="end" fill="firebrick" font-size="12" font-family="sans-serif">{}</text>"#,
            fmt_num(layout.margins.left + layout.inner_width()),
            fmt_num(layout.margins.top + 12.0),
            escape(status),
        );
        insert_before_close(&mut svg, &label);
    }

    svg
}

/// Byte range of the data line's `<polyline .../>` element
fn find_line(svg: &str) -> Option<Range<usize>> {
    let marker = format!(
        r##"stroke="#{:02X}{:02X}{:02X}""##,
        LINE_COLOR.0, LINE_COLOR.1, LINE_COLOR.2
    );
    let at = svg.find(&marker)?;
    let start = svg[..at].rfind("<polyline")?;
    let end = at + svg[at..].find("/>")? + 2;
    Some(start..end)
}

fn insert_before_close(svg: &mut String, fragment: &str) {
    match svg.rfind("</svg>") {
        Some(at) => svg.insert_str(at, fragment),
        None => svg.push_str(fragment),
    }
}

/// Degenerate domains are plotted around their single value, which puts
/// every point in the middle of the axis
fn widen((d0, d1): (i64, i64)) -> (i64, i64) {
    if d0 == d1 {
        (d0 - 1, d1 + 1)
    } else {
        (d0, d1)
    }
}

fn widen_values(d0: f64, d1: f64) -> Range<f64> {
    if d0 == d1 {
        (d0 - 1.0)..(d1 + 1.0)
    } else {
        d0..d1
    }
}

/// Whole non-negative pixels
fn px(value: f64) -> i32 {
    value.round().max(0.0) as i32
}

fn render_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Time axis label (UTC wall clock)
pub fn format_time_label(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp) {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

/// Value axis label with at most two decimals
pub fn format_value_label(value: f64) -> String {
    fmt_num((value * 100.0).round() / 100.0)
}

/// Format a number with at most three decimals and no trailing zeros
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let rounded = (value * 1000.0).round() / 1000.0;
    let text = format!("{:.3}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');

    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Escape text for use in attributes and text nodes
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Pixel points of the data line in a rendered document
#[cfg(test)]
pub(crate) fn line_points(svg: &str) -> Vec<(f64, f64)> {
    let Some(group) = svg.find(r#"class="line""#) else {
        return Vec::new();
    };
    let rest = &svg[group..];
    let Some(start) = rest.find(r#"points=""#) else {
        return Vec::new();
    };
    let rest = &rest[start + 8..];
    let end = rest.find('"').unwrap_or(rest.len());

    rest[..end]
        .split_whitespace()
        .filter_map(|point| {
            let (x, y) = point.split_once(',')?;
            Some((x.parse().ok()?, y.parse().ok()?))
        })
        .collect()
}
