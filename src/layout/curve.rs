use std::fmt::Write as _;

use crate::config::LinkStyle;

use super::types::Link;

/// Corner radius of the rounded style, per orientation.
const CORNER_RADIUS_VERTICAL: f32 = 36.0;
const CORNER_RADIUS_HORIZONTAL: f32 = 28.0;
/// Corners tighter than this are drawn sharp.
const MIN_CORNER_RADIUS: f32 = 0.5;
/// Share of the fan offset carried by bezier control points.
const CONTROL_FAN_WEIGHT: f32 = 0.6;
/// Peak share of the fan offset applied to interior polyline points.
const POINT_FAN_WEIGHT: f32 = 0.6;
/// Interior points never move further than this.
const POINT_FAN_LIMIT: f32 = 18.0;
/// Segments flatter than this on the lateral axis count as axis-aligned.
const AXIS_EPSILON: f32 = 0.001;

/// SVG path data for `link` in the requested style.
///
/// Straight links are always polylines. The link's fan offset moves interior
/// points along the lateral axis, except where a neighbouring segment runs
/// parallel to the level axis, so right-angle elbows stay right-angled.
/// Endpoints stay put.
pub fn build_path(link: &Link, style: LinkStyle, horizontal: bool) -> String {
    let mut points = dedupe_points(&link.points);
    if !link.is_curved {
        return polyline_path(&points);
    }
    shift_interior(&mut points, link.fan_offset, horizontal);
    match style {
        LinkStyle::Elbow => polyline_path(&points),
        LinkStyle::Smooth => smooth_path(&points, link.fan_offset, horizontal),
        LinkStyle::Legacy => rounded_path(&points, horizontal),
    }
}

/// Drops consecutive repeated points.
pub fn dedupe_points(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if out.last() != Some(&point) {
            out.push(point);
        }
    }
    out
}

/// Rounds to three decimals; non-finite values print as `0`.
pub fn format_number(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (f64::from(value) * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

fn coord(point: (f32, f32)) -> String {
    format!("{},{}", format_number(point.0), format_number(point.1))
}

fn shift_interior(points: &mut [(f32, f32)], offset: f32, horizontal: bool) {
    let offset = offset.clamp(-POINT_FAN_LIMIT, POINT_FAN_LIMIT);
    if offset.abs() < 0.01 || points.len() < 3 {
        return;
    }
    let lateral = |point: (f32, f32)| if horizontal { point.1 } else { point.0 };
    let source = points.to_vec();
    let segments = source.len() - 1;
    for idx in 1..segments {
        let (prev, curr, next) = (source[idx - 1], source[idx], source[idx + 1]);
        // A segment with no lateral extent is a level-axis leg of an elbow.
        if (lateral(curr) - lateral(prev)).abs() < AXIS_EPSILON
            || (lateral(next) - lateral(curr)).abs() < AXIS_EPSILON
        {
            continue;
        }
        let t = idx as f32 / segments as f32;
        let shift = offset * (std::f32::consts::PI * t).sin() * POINT_FAN_WEIGHT;
        if horizontal {
            points[idx].1 += shift;
        } else {
            points[idx].0 += shift;
        }
    }
}

pub fn polyline_path(points: &[(f32, f32)]) -> String {
    let mut out = String::new();
    for (idx, &point) in points.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}{}", if idx == 0 { 'M' } else { 'L' }, coord(point));
    }
    out
}

/// One cubic from the first to the last point, bending halfway between the
/// two levels.
fn smooth_path(points: &[(f32, f32)], fan_offset: f32, horizontal: bool) -> String {
    let (Some(&start), Some(&end)) = (points.first(), points.last()) else {
        return String::new();
    };
    if points.len() < 2 {
        return polyline_path(points);
    }
    let shift = fan_offset * CONTROL_FAN_WEIGHT;
    let (c1, c2) = if horizontal {
        let mid = start.0 + (end.0 - start.0) / 2.0;
        ((mid, start.1 + shift), (mid, end.1 + shift))
    } else {
        let mid = start.1 + (end.1 - start.1) / 2.0;
        ((start.0 + shift, mid), (end.0 + shift, mid))
    };
    format!("M{} C{} {} {}", coord(start), coord(c1), coord(c2), coord(end))
}

/// Polyline whose corners are replaced by quadratic arcs.
fn rounded_path(points: &[(f32, f32)], horizontal: bool) -> String {
    if points.len() < 2 {
        return polyline_path(points);
    }
    let max_radius = if horizontal {
        CORNER_RADIUS_HORIZONTAL
    } else {
        CORNER_RADIUS_VERTICAL
    };

    let mut parts = vec![format!("M{}", coord(points[0]))];
    for idx in 1..points.len() {
        let current = points[idx];
        if idx == points.len() - 1 {
            parts.push(format!("L{}", coord(current)));
            continue;
        }
        let prev = points[idx - 1];
        let next = points[idx + 1];
        let incoming = (current.0 - prev.0, current.1 - prev.1);
        let outgoing = (next.0 - current.0, next.1 - current.1);
        let in_len = incoming.0.hypot(incoming.1);
        let out_len = outgoing.0.hypot(outgoing.1);
        let radius = max_radius.min(in_len / 2.0).min(out_len / 2.0);
        if in_len == 0.0 || out_len == 0.0 || radius <= MIN_CORNER_RADIUS {
            parts.push(format!("L{}", coord(current)));
            continue;
        }
        let enter = (
            current.0 - incoming.0 / in_len * radius,
            current.1 - incoming.1 / in_len * radius,
        );
        let leave = (
            current.0 + outgoing.0 / out_len * radius,
            current.1 + outgoing.1 / out_len * radius,
        );
        parts.push(format!("L{}", coord(enter)));
        parts.push(format!("Q{} {}", coord(current), coord(leave)));
    }
    parts.join(" ")
}
