//! Collision detection and response
//!
//! Circle/circle separation for the live targets, plus the polygon helpers
//! hexagon hit testing and obstacle contact need.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

use glam::Vec2;

use super::circle::Circle;

/// Contact distance multiplier inside which circles gently push apart
pub const COMFORT_FACTOR: f32 = 1.15;
/// Fraction of the approach speed returned by a collision impulse
const RESTITUTION: f32 = 0.75;
const IMPULSE_DAMPING: f32 = 0.85;

/// The six corners of a hexagon with a vertex pointing straight down (+y)
pub fn hexagon_vertices(center: Vec2, radius: f32) -> [Vec2; 6] {
    std::array::from_fn(|i| {
        let angle = i as f32 * FRAC_PI_3 + FRAC_PI_2;
        center + Vec2::new(angle.cos(), angle.sin()) * radius
    })
}

/// Even-odd ray casting containment test
pub fn point_in_polygon(p: Vec2, vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point to `p` on segment `a`-`b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-3 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[inline]
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    p.distance(closest_point_on_segment(p, a, b))
}

/// Does a circle at `center` touch the axis-aligned rectangle
pub fn circle_touches_rect(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> bool {
    let nearest = center.clamp(min, max);
    center.distance_squared(nearest) <= radius * radius
}

/// Clamp one coordinate to `[margin, extent - margin]`, or the middle when that range is empty
#[inline]
pub fn clamp_axis(v: f32, margin: f32, extent: f32) -> f32 {
    if extent <= margin * 2.0 {
        extent * 0.5
    } else {
        v.max(margin).min(extent - margin)
    }
}

/// Keep a point inside the screen, `margin` from every edge
///
/// Degenerate screens smaller than two margins pin to the center.
pub fn clamp_to_screen(pos: Vec2, margin: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        clamp_axis(pos.x, margin, width),
        clamp_axis(pos.y, margin, height),
    )
}

/// Scale a velocity down to `max` if it is faster
#[inline]
pub fn cap_speed(vel: Vec2, max: f32) -> Vec2 {
    let len = vel.length();
    if len > max && len > 0.0 {
        vel / len * max
    } else {
        vel
    }
}

/// Separate overlapping circles and keep crowds from clumping
///
/// Every non-dying pair is visited once, in list order. Overlaps are pushed
/// apart evenly; approaching pairs exchange a damped impulse; near misses
/// get a soft push. Both circles are then speed-capped and kept on screen.
pub fn resolve_circle_collisions(circles: &mut [Circle], width: f32, height: f32, scale: f32) {
    let n = circles.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (left, right) = circles.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];
            if a.dying || b.dying {
                continue;
            }

            let delta = b.pos - a.pos;
            let distance = delta.length();
            if distance <= 0.0 {
                continue;
            }
            let normal = delta / distance;
            let min_distance = a.radius + b.radius;
            let comfort = min_distance * COMFORT_FACTOR;

            if distance < min_distance {
                let push = (min_distance - distance) * 0.5;
                a.pos -= normal * push;
                b.pos += normal * push;

                let dvn = (b.vel - a.vel).dot(normal);
                if dvn < 0.0 {
                    let impulse = normal * (RESTITUTION * dvn * IMPULSE_DAMPING);
                    a.vel += impulse;
                    b.vel -= impulse;
                    a.vel -= normal * scale;
                    b.vel += normal * scale;
                }
            } else if distance < comfort {
                let proximity = (comfort - distance) / (comfort - min_distance);
                let strength = 0.5 * scale * proximity * 0.05;
                a.vel -= normal * strength;
                b.vel += normal * strength;
            }

            let max_speed = a.speed.max(b.speed) * 1.5;
            a.vel = cap_speed(a.vel, max_speed);
            b.vel = cap_speed(b.vel, max_speed);
            a.pos = clamp_to_screen(a.pos, a.radius, width, height);
            b.pos = clamp_to_screen(b.pos, b.radius, width, height);
        }
    }
}
