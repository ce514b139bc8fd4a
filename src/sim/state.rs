//! Game state and core simulation types
//!
//! Everything that decides what happens next lives here, including the RNG,
//! so two states built from the same seed replay identically.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::circle::Circle;
use super::difficulty::Difficulty;
use super::obstacle::{Pipe, Spinner, Triangle};
use crate::audio::SoundEffect;
use crate::consts::*;
use crate::{scale_for, ticks_to_ms};

/// Which screen the game is showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    MainMenu,
    DifficultySelect,
    TimeSelect,
    /// Normal rounds, endless or timed
    Playing,
    /// Name entry and final score
    GameOver,
    /// Free-play testing arena, no rounds and no game over
    Sandbox,
}

impl Screen {
    /// Screens where the simulation runs and clicks land on circles
    pub fn is_active(self) -> bool {
        matches!(self, Screen::Playing | Screen::Sandbox)
    }
}

/// How a run ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Play until out of lives
    #[default]
    Endless,
    /// Play until out of lives or out of time
    Timed,
}

/// Something the platform layer should react to (sounds, music, logging)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(SoundEffect),
    /// A new round began (carries the round number)
    RoundStarted(u32),
    /// A hazard or supertank explosion cost a life
    LifeLost { lives: i32 },
    /// A circle was destroyed by a click
    CircleKilled { points: u32 },
    GameOver,
}

/// Player options the simulation needs, copied from the settings each run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayOptions {
    pub pipe_warning_flash: bool,
    pub click_radius_helper: bool,
    /// Extra click reach while the helper is on
    pub click_radius: f32,
    pub disable_pipes: bool,
    pub disable_spinners: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            pipe_warning_flash: true,
            click_radius_helper: false,
            click_radius: DEFAULT_CLICK_RADIUS as f32,
            disable_pipes: false,
            disable_spinners: false,
        }
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Gameplay RNG
    pub rng: Pcg32,
    pub screen: Screen,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    /// Timed mode length in seconds
    pub time_limit: u32,
    /// Seconds left in timed mode
    pub time_remaining: f32,
    /// When the current timed run started
    pub game_start_ms: u64,
    /// Arena size in pixels
    pub width: f32,
    pub height: f32,
    /// Resolution scale relative to 1200x800
    pub scale: f32,
    /// Live targets, oldest first
    pub circles: Vec<Circle>,
    /// Shooter projectiles
    pub triangles: Vec<Triangle>,
    pub spinners: Vec<Spinner>,
    pub pipes: Vec<Pipe>,
    pub lives: i32,
    pub score: u32,
    pub round: u32,
    /// Circles still to appear this round
    pub circles_to_spawn: u32,
    /// Frames since the last spawn
    pub spawn_timer: u32,
    /// Spinners rolled for this round
    pub spinners_this_round: u32,
    pub spinners_spawned_this_round: bool,
    /// Pipes spawned this round
    pub pipes_this_round: u32,
    /// A pipe is scheduled
    pub pending_pipe_spawn: bool,
    pub next_pipe_spawn_ms: u64,
    /// Debug mode: every pipe follows quickly
    pub force_quick_pipes: bool,
    pub in_quick_burst: bool,
    pub quick_burst_remaining: u32,
    pub pipe_flash_armed: bool,
    pub pipe_flash_ms: u64,
    /// Sandbox pipe waiting out its warning flash
    pub delayed_pipe_ms: Option<u64>,
    /// A triangle hit hides the cursor and blocks clicks
    pub cursor_hidden: bool,
    pub cursor_hide_start_ms: u64,
    /// A grabber is holding the cursor
    pub cursor_grabbed: bool,
    /// Cursor position used by the simulation (the grab target while grabbed)
    pub virtual_mouse: Vec2,
    /// Game over screen is accepting a name
    pub name_input_active: bool,
    pub sandbox_paused: bool,
    /// Flash intensities (0-255), decaying every frame
    pub screen_flash: f32,
    pub pipe_flash: f32,
    pub explosion_flash: f32,
    pub options: PlayOptions,
    /// Events raised since the platform layer last drained them
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new game state at the reference resolution
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            screen: Screen::MainMenu,
            mode: GameMode::Endless,
            difficulty: Difficulty::default(),
            time_limit: DEFAULT_TIME_LIMIT,
            time_remaining: DEFAULT_TIME_LIMIT as f32,
            game_start_ms: 0,
            width: BASE_WIDTH,
            height: BASE_HEIGHT,
            scale: 1.0,
            circles: Vec::new(),
            triangles: Vec::new(),
            spinners: Vec::new(),
            pipes: Vec::new(),
            lives: STARTING_LIVES,
            score: 0,
            round: 1,
            circles_to_spawn: 1,
            spawn_timer: 0,
            spinners_this_round: 0,
            spinners_spawned_this_round: false,
            pipes_this_round: 0,
            pending_pipe_spawn: false,
            next_pipe_spawn_ms: 0,
            force_quick_pipes: false,
            in_quick_burst: false,
            quick_burst_remaining: 0,
            pipe_flash_armed: false,
            pipe_flash_ms: 0,
            delayed_pipe_ms: None,
            cursor_hidden: false,
            cursor_hide_start_ms: 0,
            cursor_grabbed: false,
            virtual_mouse: Vec2::new(BASE_WIDTH * 0.5, BASE_HEIGHT * 0.5),
            name_input_active: false,
            sandbox_paused: false,
            screen_flash: 0.0,
            pipe_flash: 0.0,
            explosion_flash: 0.0,
            options: PlayOptions::default(),
            events: Vec::new(),
            time_ticks: 0,
            next_id: 1,
        }
    }

    /// Game time in milliseconds
    #[inline]
    pub fn now_ms(&self) -> u64 {
        ticks_to_ms(self.time_ticks)
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Current round's speed multiplier
    pub fn speed_multiplier(&self) -> f32 {
        self.difficulty.speed_multiplier(self.round)
    }

    /// Adopt a new arena size; entities keep their positions
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.scale = scale_for(self.width, self.height);
    }

    /// Queue an event for the platform layer
    #[inline]
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand the queued events to the caller
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Circles that are not playing their death animation
    pub fn live_circle_count(&self) -> usize {
        self.circles.iter().filter(|c| !c.dying).count()
    }

    /// Is a tank or supertank alive (drives the hum loops)
    pub fn tank_alive(&self, kind: super::circle::CircleKind) -> bool {
        self.circles.iter().any(|c| c.kind == kind && !c.dying)
    }

    /// Label stored with a high score, e.g. "Hard (Timed) 90s"
    pub fn mode_label(&self) -> String {
        match self.mode {
            GameMode::Endless => format!("{} (Endless)", self.difficulty.name()),
            GameMode::Timed => format!("{} (Timed) {}s", self.difficulty.name(), self.time_limit),
        }
    }

    /// Clear every entity and transient flag shared by new games and sandbox
    pub(crate) fn reset_arena(&mut self) {
        self.circles.clear();
        self.triangles.clear();
        self.spinners.clear();
        self.pipes.clear();
        self.cursor_hidden = false;
        self.cursor_grabbed = false;
        self.score = 0;
        self.spawn_timer = 0;
        self.spinners_this_round = 0;
        self.spinners_spawned_this_round = false;
        self.reset_pipe_schedule();
        self.delayed_pipe_ms = None;
        self.screen_flash = 0.0;
        self.pipe_flash = 0.0;
        self.explosion_flash = 0.0;
    }

    pub(crate) fn reset_pipe_schedule(&mut self) {
        self.pipes_this_round = 0;
        self.pending_pipe_spawn = false;
        self.in_quick_burst = false;
        self.quick_burst_remaining = 0;
        self.pipe_flash_armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = GameState::new(1);
        assert_eq!(state.screen, Screen::MainMenu);
        assert_eq!(state.lives, STARTING_LIVES);
        assert_eq!(state.round, 1);
        assert_eq!(state.circles_to_spawn, 1);
        assert_eq!(state.difficulty, Difficulty::Medium);
        assert_eq!(state.time_limit, 60);
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = GameState::new(1);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_resize_updates_scale() {
        let mut state = GameState::new(1);
        state.resize(600.0, 800.0);
        assert!((state.scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mode_label() {
        let mut state = GameState::new(1);
        state.difficulty = Difficulty::Hard;
        assert_eq!(state.mode_label(), "Hard (Endless)");
        state.mode = GameMode::Timed;
        state.time_limit = 90;
        assert_eq!(state.mode_label(), "Hard (Timed) 90s");
    }

    #[test]
    fn test_state_roundtrips_through_json() {
        let mut state = GameState::new(77);
        state.score = 420;
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score, 420);
        assert_eq!(back.seed, 77);
    }
}
