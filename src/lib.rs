//! Circle Clicker - an arcade target clicking game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (circles, obstacles, rounds, scoring)
//! - `audio`: Procedural sound effects and the music transition manager
//! - `app`: Screen state machine and keyboard handling
//! - `renderer`: WebGPU rendering pipeline
//! - `persistence`: Key/value storage for settings and high scores
//! - `ui`: HUD and menu text layout

pub mod app;
pub mod audio;
pub mod highscores;
pub mod persistence;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod ui;

pub use app::App;
pub use highscores::HighScores;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation rate. All per-frame tuning assumes 60 updates per second.
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Reference resolution that all distances are tuned against
    pub const BASE_WIDTH: f32 = 1200.0;
    pub const BASE_HEIGHT: f32 = 800.0;

    /// Starting lives for a normal game
    pub const STARTING_LIVES: i32 = 4;
    /// Starting lives in sandbox mode
    pub const SANDBOX_LIVES: i32 = 3;
    /// Round sandbox mode runs at (unlocks every circle kind)
    pub const SANDBOX_ROUND: u32 = 15;
    /// Frames between circle spawns
    pub const SPAWN_DELAY_TICKS: u32 = 60;
    /// How long a triangle hit hides the cursor
    pub const CURSOR_HIDE_MS: u64 = 3000;
    /// Frames an obstacle ignores the cursor after hitting it
    pub const OBSTACLE_HIT_COOLDOWN: u32 = 30;
    /// Pipes are removed after this long regardless of position
    pub const PIPE_MAX_LIFETIME_MS: u64 = 30_000;
    /// Warning flash lead time before a pipe spawns
    pub const PIPE_WARNING_LEAD_MS: u64 = 500;

    /// Click radius helper bounds
    pub const DEFAULT_CLICK_RADIUS: u32 = 30;
    pub const MIN_CLICK_RADIUS: u32 = 10;
    pub const MAX_CLICK_RADIUS: u32 = 100;

    /// Timed mode limits (seconds)
    pub const DEFAULT_TIME_LIMIT: u32 = 60;
    pub const MIN_TIME_LIMIT: u32 = 30;
    pub const MAX_TIME_LIMIT: u32 = 300;
    pub const TIME_LIMIT_STEP: u32 = 30;
}

/// Resolution scale relative to the reference 1200x800 layout
#[inline]
pub fn scale_for(width: f32, height: f32) -> f32 {
    (width / consts::BASE_WIDTH).min(height / consts::BASE_HEIGHT)
}

/// Convert a tick count to milliseconds of game time
#[inline]
pub fn ticks_to_ms(ticks: u64) -> u64 {
    ticks * 1000 / consts::TICKS_PER_SECOND as u64
}

/// Convert seconds to whole ticks
#[inline]
pub fn secs_to_ticks(secs: f32) -> u32 {
    (secs * consts::TICKS_PER_SECOND as f32) as u32
}

/// Unit vector for an angle in radians
#[inline]
pub fn from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Rotate a direction by an angle and blend it toward the result, renormalized
#[inline]
pub fn steer(dir: Vec2, turn: f32, keep: f32) -> Vec2 {
    let angle = dir.y.atan2(dir.x) + turn;
    (dir * keep + from_angle(angle) * (1.0 - keep)).normalize_or(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_uses_limiting_axis() {
        assert!((scale_for(1200.0, 800.0) - 1.0).abs() < 1e-6);
        assert!((scale_for(2400.0, 800.0) - 1.0).abs() < 1e-6);
        assert!((scale_for(600.0, 800.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tick_conversions() {
        assert_eq!(ticks_to_ms(60), 1000);
        assert_eq!(ticks_to_ms(30), 500);
        assert_eq!(secs_to_ticks(2.5), 150);
    }

    #[test]
    fn test_steer_stays_normalized() {
        let d = steer(Vec2::X, 0.6, 0.7);
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert!(d.y > 0.0);
    }
}
