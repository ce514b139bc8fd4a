//! Hazards that cost lives or hide the cursor
//!
//! Spinners drift and bounce around the arena, pipes sweep left to right
//! with a drifting gap, and triangles are the projectiles shooters fire.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::{Difficulty, PipeSettings};
use crate::consts::{OBSTACLE_HIT_COOLDOWN, PIPE_MAX_LIFETIME_MS};
use crate::from_angle;

/// Spinner rotation speed (rad/frame)
pub const SPINNER_SPIN_SPEED: f32 = 0.15;
/// Extra reach on either side of a pipe that still counts as touching
pub const PIPE_HIT_MARGIN: f32 = 5.0;

/// Three-bladed rotating hazard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spinner {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Screen scale times the spinner's own size variation
    pub size: f32,
    pub blade_len: f32,
    pub blade_width: f32,
    pub rotation: f32,
    /// Contact radius
    pub radius: f32,
    pub hit_cooldown: u32,
}

impl Spinner {
    pub fn new(pos: Vec2, scale: f32, difficulty: Difficulty, rng: &mut impl Rng) -> Self {
        let angle = rng.random_range(0.0..TAU);
        let speed = 1.5
            * rng.random_range(0.8..1.5)
            * difficulty.pick([1.0, 1.15, 1.3, 1.5]);
        let size = scale * rng.random_range(0.8..1.4);
        let blade_len = 40.0 * size;
        Self {
            pos,
            vel: from_angle(angle) * speed * scale,
            size,
            blade_len,
            blade_width: (6.0 * size).floor().max(3.0),
            rotation: rng.random_range(0.0..TAU),
            radius: blade_len,
            hit_cooldown: 0,
        }
    }

    /// Move, spin, and reverse direction at the screen edges
    pub fn update(&mut self, width: f32, height: f32) {
        self.pos += self.vel;
        self.rotation += SPINNER_SPIN_SPEED;
        if self.pos.x - self.radius < 0.0 || self.pos.x + self.radius > width {
            self.vel.x = -self.vel.x;
        }
        if self.pos.y - self.radius < 0.0 || self.pos.y + self.radius > height {
            self.vel.y = -self.vel.y;
        }
    }

    pub fn hits(&self, cursor: Vec2) -> bool {
        self.pos.distance_squared(cursor) < self.radius * self.radius
    }

    /// Blade tips, one per 120 degrees
    pub fn blade_tips(&self) -> [Vec2; 3] {
        std::array::from_fn(|i| {
            let angle = self.rotation + i as f32 * TAU / 3.0;
            self.pos + from_angle(angle) * self.blade_len
        })
    }
}

/// Vertical bar with a drifting gap, sweeping left to right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Left edge
    pub x: f32,
    pub width: f32,
    pub speed: f32,
    pub gap_y: f32,
    pub gap_height: f32,
    pub vertical_speed: f32,
    /// +1 drifting down, -1 drifting up
    pub direction: f32,
    pub spawn_ms: u64,
    pub hit_cooldown: u32,
}

impl Pipe {
    /// Build a pipe just off the left edge using a difficulty's pipe tuning
    pub fn new(
        height: f32,
        scale: f32,
        settings: &PipeSettings,
        now_ms: u64,
        rng: &mut impl Rng,
    ) -> Self {
        let base_gap = settings.gap_height * scale;
        let gap_height = rng.random_range(0.8 * base_gap..=1.2 * base_gap);
        let width = rng.random_range(40.0 * scale..=80.0 * scale);
        let half = gap_height * 0.5;
        let gap_y = if height > gap_height {
            rng.random_range(half..=height - half)
        } else {
            height * 0.5
        };
        let (lo, hi) = settings.vertical_speed;
        Self {
            x: -width,
            width,
            speed: 2.5 * scale * settings.speed_multiplier,
            gap_y,
            gap_height,
            vertical_speed: rng.random_range(lo..=hi),
            direction: 1.0,
            spawn_ms: now_ms,
            hit_cooldown: 0,
        }
    }

    pub fn update(&mut self, height: f32) {
        self.x += self.speed;
        self.gap_y += self.vertical_speed * self.direction;
        let half = self.gap_height * 0.5;
        if self.gap_y - half < 0.0 || self.gap_y + half > height {
            self.direction = -self.direction;
        }
    }

    #[inline]
    pub fn gap_top(&self) -> f32 {
        self.gap_y - self.gap_height * 0.5
    }

    #[inline]
    pub fn gap_bottom(&self) -> f32 {
        self.gap_y + self.gap_height * 0.5
    }

    /// Past the right edge or alive too long
    pub fn is_expired(&self, width: f32, now_ms: u64) -> bool {
        self.x > width || now_ms.saturating_sub(self.spawn_ms) > PIPE_MAX_LIFETIME_MS
    }

    /// Cursor inside the bar but outside the gap
    pub fn hits(&self, cursor: Vec2) -> bool {
        let in_bar = cursor.x >= self.x - PIPE_HIT_MARGIN
            && cursor.x <= self.x + self.width + PIPE_HIT_MARGIN;
        in_bar && !(self.gap_top()..=self.gap_bottom()).contains(&cursor.y)
    }
}

/// Shooter projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub spawn_ms: u64,
    pub lifetime_ms: u64,
    pub fade_ms: u64,
    pub fade_start_ms: Option<u64>,
    pub alpha: f32,
    /// Id of the shooter that fired it
    pub shooter: u32,
}

impl Triangle {
    pub fn new(pos: Vec2, vel: Vec2, scale: f32, size_variation: f32, now_ms: u64, shooter: u32) -> Self {
        Self {
            pos,
            vel,
            size: 15.0 * scale * size_variation,
            spawn_ms: now_ms,
            lifetime_ms: 10_000,
            fade_ms: 1_000,
            fade_start_ms: None,
            alpha: 255.0,
            shooter,
        }
    }

    /// Advance one frame; returns false once fully faded
    pub fn update(&mut self, width: f32, height: f32, now_ms: u64) -> bool {
        match self.fade_start_ms {
            None => {
                if now_ms.saturating_sub(self.spawn_ms) > self.lifetime_ms - self.fade_ms {
                    self.fade_start_ms = Some(now_ms);
                }
            }
            Some(start) => {
                let progress = now_ms.saturating_sub(start) as f32 / self.fade_ms.max(1) as f32;
                if progress >= 1.0 {
                    return false;
                }
                self.alpha = (255.0 * (1.0 - progress)).floor();
            }
        }

        self.pos += self.vel;
        let s = self.size;
        if self.pos.x <= s || self.pos.x >= width - s {
            self.vel.x = -self.vel.x;
            self.pos.x = self.pos.x.min(width - s).max(s);
        }
        if self.pos.y <= s || self.pos.y >= height - s {
            self.vel.y = -self.vel.y;
            self.pos.y = self.pos.y.min(height - s).max(s);
        }
        true
    }

    pub fn hits(&self, cursor: Vec2) -> bool {
        self.pos.distance(cursor) < self.size
    }

    /// Begin fading now unless already fading
    pub fn start_fade(&mut self, now_ms: u64, fade_ms: u64) {
        if self.fade_start_ms.is_none() {
            self.fade_start_ms = Some(now_ms);
            self.fade_ms = fade_ms;
        }
    }

    /// Tip and two rear corners, pointing along the velocity
    pub fn corners(&self) -> [Vec2; 3] {
        let length = self.size * 1.2;
        let half_width = self.size * 0.4;
        let dir = self.vel.normalize_or(Vec2::X);
        let rotate = |p: Vec2| self.pos + dir.rotate(p);
        [
            rotate(Vec2::new(length, 0.0)),
            rotate(Vec2::new(-length * 0.4, -half_width)),
            rotate(Vec2::new(-length * 0.4, half_width)),
        ]
    }
}

/// Shared obstacle contact handling: returns true when the cursor takes a hit
///
/// `cooldown_first` decrements an active cooldown before testing (normal
/// play); otherwise the cooldown ticks down after the test (sandbox).
pub fn check_hit(hit_cooldown: &mut u32, touching: bool, cooldown_first: bool) -> bool {
    if cooldown_first {
        if *hit_cooldown > 0 {
            *hit_cooldown -= 1;
            return false;
        }
        if touching {
            *hit_cooldown = OBSTACLE_HIT_COOLDOWN;
            return true;
        }
        false
    } else {
        let hit = touching && *hit_cooldown == 0;
        if hit {
            *hit_cooldown = OBSTACLE_HIT_COOLDOWN;
        }
        if *hit_cooldown > 0 {
            *hit_cooldown -= 1;
        }
        hit
    }
}
