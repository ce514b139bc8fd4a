//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod behavior;
pub mod circle;
pub mod collision;
pub mod difficulty;
pub mod obstacle;
pub mod state;
pub mod tick;

pub use behavior::{UpdateContext, UpdateOutcome};
pub use circle::{Circle, CircleKind, DamageOutcome, Hit, KindState, MovementPattern, SpawnParams};
pub use collision::resolve_circle_collisions;
pub use difficulty::{Difficulty, PipeSettings};
pub use obstacle::{Pipe, Spinner, Triangle};
pub use state::{GameEvent, GameMode, GameState, PlayOptions, Screen};
pub use tick::{
    TickInput, end_game, handle_click, next_round, sandbox_clear, sandbox_spawn_circle, sandbox_spawn_pipe,
    sandbox_spawn_spinner, schedule_next_pipe_spawn, spawn_circle, start_new_game, start_sandbox,
    tick,
};

/// Gameplay colors as 8-bit RGB
pub mod palette {
    pub type Rgb = [u8; 3];

    pub const RED: Rgb = [255, 0, 0];
    pub const GREEN: Rgb = [0, 255, 0];
    pub const BLUE: Rgb = [0, 0, 255];
    pub const YELLOW: Rgb = [255, 255, 0];
    pub const PURPLE: Rgb = [128, 0, 128];
    pub const ORANGE: Rgb = [255, 165, 0];
    pub const PINK: Rgb = [255, 192, 203];
    pub const GRAY: Rgb = [128, 128, 128];
    pub const DARK_GRAY: Rgb = [64, 64, 64];
    pub const WHITE: Rgb = [255, 255, 255];
    pub const BLACK: Rgb = [0, 0, 0];
    pub const DARK_BLUE: Rgb = [8, 24, 58];
    pub const DARK_GREEN: Rgb = [0, 128, 0];
    pub const MAGENTA: Rgb = [255, 100, 255];
    pub const SNAKE_GREEN: Rgb = [0, 150, 0];
    pub const ANGRY_RED: Rgb = [255, 100, 100];

    /// Background gradient stops
    pub const DEEP_PURPLE: Rgb = [16, 6, 54];
    pub const NAVY_BLUE: Rgb = [4, 14, 35];
    pub const MIDNIGHT_BLUE: Rgb = [2, 6, 23];

    /// Full-screen flash tints
    pub const HIT_FLASH: Rgb = [255, 100, 100];
    pub const PIPE_WARNING_FLASH: Rgb = [100, 100, 255];
    pub const EXPLOSION_FLASH: Rgb = [255, 200, 0];
}
