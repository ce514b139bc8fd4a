//! Shape tessellation for 2D primitives
//!
//! Every function appends triangle-list vertices to `out` in arena pixels.

use glam::Vec2;
use std::f32::consts::TAU;

use super::vertex::Vertex;

/// Segment count that keeps a circle of this radius smooth
pub fn segments_for(radius: f32) -> u32 {
    ((radius * 0.75) as u32).clamp(12, 64)
}

#[inline]
fn tri(out: &mut Vec<Vertex>, a: Vec2, b: Vec2, c: Vec2, color: [f32; 4]) {
    out.push(Vertex::new(a.x, a.y, color));
    out.push(Vertex::new(b.x, b.y, color));
    out.push(Vertex::new(c.x, c.y, color));
}

#[inline]
fn quad(out: &mut Vec<Vertex>, a: Vec2, b: Vec2, c: Vec2, d: Vec2, color: [f32; 4]) {
    tri(out, a, b, c, color);
    tri(out, c, b, d, color);
}

#[inline]
fn on_circle(center: Vec2, radius: f32, theta: f32) -> Vec2 {
    center + Vec2::new(theta.cos(), theta.sin()) * radius
}

/// Filled circle
pub fn circle(out: &mut Vec<Vertex>, center: Vec2, radius: f32, color: [f32; 4]) {
    if radius <= 0.0 {
        return;
    }
    let segments = segments_for(radius);
    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * TAU;
        let theta2 = ((i + 1) as f32 / segments as f32) * TAU;
        tri(
            out,
            center,
            on_circle(center, radius, theta1),
            on_circle(center, radius, theta2),
            color,
        );
    }
}

/// Hollow circle with the given line width inside `radius`
pub fn ring(out: &mut Vec<Vertex>, center: Vec2, radius: f32, width: f32, color: [f32; 4]) {
    if radius <= 0.0 || width <= 0.0 {
        return;
    }
    let inner_radius = (radius - width).max(0.0);
    let segments = segments_for(radius);
    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * TAU;
        let theta2 = ((i + 1) as f32 / segments as f32) * TAU;
        quad(
            out,
            on_circle(center, inner_radius, theta1),
            on_circle(center, radius, theta1),
            on_circle(center, inner_radius, theta2),
            on_circle(center, radius, theta2),
            color,
        );
    }
}

/// Filled convex polygon (fan from the first vertex)
pub fn polygon(out: &mut Vec<Vertex>, points: &[Vec2], color: [f32; 4]) {
    for i in 1..points.len().saturating_sub(1) {
        tri(out, points[0], points[i], points[i + 1], color);
    }
}

/// Closed polygon outline of the given width
pub fn polygon_outline(out: &mut Vec<Vertex>, points: &[Vec2], width: f32, color: [f32; 4]) {
    let n = points.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        line(out, points[i], points[(i + 1) % n], width, color);
    }
}

/// Thick line segment centered on `a`-`b`
pub fn line(out: &mut Vec<Vertex>, a: Vec2, b: Vec2, width: f32, color: [f32; 4]) {
    let dir = (b - a).normalize_or_zero();
    if dir == Vec2::ZERO || width <= 0.0 {
        return;
    }
    let half = width * 0.5;
    let perp = dir.perp() * half;
    // Extend past the ends so outline corners close up
    let a = a - dir * half;
    let b = b + dir * half;
    quad(out, a + perp, a - perp, b + perp, b - perp, color);
}

/// Axis-aligned filled rectangle
pub fn rect(out: &mut Vec<Vertex>, min: Vec2, size: Vec2, color: [f32; 4]) {
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }
    let max = min + size;
    quad(
        out,
        min,
        Vec2::new(max.x, min.y),
        Vec2::new(min.x, max.y),
        max,
        color,
    );
}

/// Full-screen vertical gradient
pub fn vertical_gradient(out: &mut Vec<Vertex>, size: Vec2, top: [f32; 4], bottom: [f32; 4]) {
    let tl = Vertex::new(0.0, 0.0, top);
    let tr = Vertex::new(size.x, 0.0, top);
    let bl = Vertex::new(0.0, size.y, bottom);
    let br = Vertex::new(size.x, size.y, bottom);
    out.extend_from_slice(&[tl, tr, bl, bl, tr, br]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [f32; 4] = [1.0; 4];

    #[test]
    fn test_circle_vertices_on_radius() {
        let mut out = Vec::new();
        circle(&mut out, Vec2::new(10.0, 20.0), 40.0, WHITE);
        assert_eq!(out.len() as u32, segments_for(40.0) * 3);
        for v in out.iter().skip(1).step_by(3) {
            let p = Vec2::from(v.position);
            assert!((p.distance(Vec2::new(10.0, 20.0)) - 40.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_degenerate_shapes_emit_nothing() {
        let mut out = Vec::new();
        circle(&mut out, Vec2::ZERO, 0.0, WHITE);
        ring(&mut out, Vec2::ZERO, 10.0, 0.0, WHITE);
        line(&mut out, Vec2::ONE, Vec2::ONE, 3.0, WHITE);
        rect(&mut out, Vec2::ZERO, Vec2::new(5.0, 0.0), WHITE);
        polygon(&mut out, &[Vec2::ZERO, Vec2::ONE], WHITE);
        assert!(out.is_empty());
    }

    #[test]
    fn test_ring_stays_within_band() {
        let mut out = Vec::new();
        ring(&mut out, Vec2::ZERO, 30.0, 4.0, WHITE);
        assert!(out.iter().all(|v| {
            let d = Vec2::from(v.position).length();
            d > 25.99 && d < 30.01
        }));
    }

    #[test]
    fn test_polygon_fan_counts() {
        let mut out = Vec::new();
        let hex: Vec<Vec2> = (0..6)
            .map(|i| on_circle(Vec2::ZERO, 10.0, i as f32 * TAU / 6.0))
            .collect();
        polygon(&mut out, &hex, WHITE);
        assert_eq!(out.len(), 4 * 3);
        out.clear();
        polygon_outline(&mut out, &hex, 2.0, WHITE);
        assert_eq!(out.len(), 6 * 6);
    }

    #[test]
    fn test_line_width() {
        let mut out = Vec::new();
        line(&mut out, Vec2::ZERO, Vec2::new(10.0, 0.0), 4.0, WHITE);
        let ys: Vec<f32> = out.iter().map(|v| v.position[1]).collect();
        assert!(ys.iter().all(|y| (y.abs() - 2.0).abs() < 1e-5));
    }

    #[test]
    fn test_rect_bounds() {
        let mut out = Vec::new();
        rect(&mut out, Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0), WHITE);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|v| {
            (1.0..=4.0).contains(&v.position[0]) && (2.0..=6.0).contains(&v.position[1])
        }));
    }
}
