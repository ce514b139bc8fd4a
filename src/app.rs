//! Application layer: screens, keyboard, name entry and audio routing
//!
//! [`App`] owns the simulation plus everything around it that is not
//! gameplay: menus, persisted settings and scores, the tutorial overlay and
//! the music player. It is platform independent; the browser loop and the
//! headless runner both drive it through [`App::frame`] and the input methods.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::audio::{MusicBackend, MusicPlayer, SoundEffect, VOLUME_STEP};
use crate::consts::*;
use crate::highscores::{HighScores, MAX_NAME_LEN, ScoreFlags, Submission};
use crate::persistence::Store;
use crate::settings::{AccessibilityOption, Settings};
use crate::sim::{self, CircleKind, GameEvent, GameMode, GameState, Screen, TickInput};

/// How long the click helper tutorial stays up (seconds)
pub const TUTORIAL_SECS: f32 = 10.0;
/// Longest frame delta fed to the simulation
const MAX_FRAME_DT: f32 = 0.1;

/// Keyboard keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_key_name(name: &str) -> Key {
        match name {
            " " | "Spacebar" => Key::Space,
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "ArrowUp" | "Up" => Key::Up,
            "ArrowDown" | "Down" => Key::Down,
            "ArrowLeft" | "Left" => Key::Left,
            "ArrowRight" | "Right" => Key::Right,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }

    /// Lowercase letter/digit for hotkey matching
    fn hotkey(self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        }
    }
}

/// Panel shown over the main menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overlay {
    #[default]
    None,
    HighScores,
    Accessibility,
}

/// Which music the current screen wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mood {
    Menu,
    Game,
}

/// Sandbox hotkeys for spawning circle kinds
fn sandbox_kind(c: char) -> Option<CircleKind> {
    Some(match c {
        '1' => CircleKind::Normal,
        '2' => CircleKind::Fast,
        '3' => CircleKind::Teleport,
        '4' => CircleKind::Shrinking,
        '5' => CircleKind::Small,
        '6' => CircleKind::Ghost,
        '7' => CircleKind::Tank,
        '8' => CircleKind::Supertank,
        '9' => CircleKind::Hexagon,
        '0' => CircleKind::Grabber,
        's' => CircleKind::Snake,
        'r' => CircleKind::Shooter,
        _ => return None,
    })
}

/// The whole game around the simulation
pub struct App<M: MusicBackend> {
    pub state: GameState,
    pub settings: Settings,
    pub high_scores: HighScores,
    store: Box<dyn Store>,
    music: MusicPlayer<M>,
    pub overlay: Overlay,
    /// Selected row in the accessibility menu
    pub accessibility_index: usize,
    /// HUD visible (Tab)
    pub show_ui: bool,
    /// Volume panel visible (V)
    pub show_volume_help: bool,
    /// Name typed on the game over screen
    pub player_name: String,
    /// Seconds left on the click helper tutorial
    tutorial_remaining: Option<f32>,
    /// Outcome of the last name submission
    pub last_submission: Option<Submission>,
    quit_requested: bool,
    mouse: Vec2,
    click_pending: bool,
    accumulator: f32,
    sounds: Vec<SoundEffect>,
    mood: Option<Mood>,
}

impl<M: MusicBackend> App<M> {
    /// Load settings and scores from `store` and open the main menu
    pub fn new(seed: u64, store: Box<dyn Store>, music: M) -> Self {
        let settings = Settings::load(store.as_ref());
        let high_scores = HighScores::load(store.as_ref());

        let mut state = GameState::new(seed);
        state.options = settings.play_options();

        let mut shuffle_rng = Pcg32::seed_from_u64(seed.rotate_left(32));
        let mut music = MusicPlayer::new(music, &mut shuffle_rng);
        music.set_enabled(settings.accessibility.music_enabled);

        Self {
            mouse: Vec2::new(state.width * 0.5, state.height * 0.5),
            state,
            settings,
            high_scores,
            store,
            music,
            overlay: Overlay::None,
            accessibility_index: 0,
            show_ui: true,
            show_volume_help: false,
            player_name: String::new(),
            tutorial_remaining: None,
            last_submission: None,
            quit_requested: false,
            click_pending: false,
            accumulator: 0.0,
            sounds: Vec::new(),
            mood: None,
        }
    }

    pub fn music(&self) -> &MusicPlayer<M> {
        &self.music
    }

    /// Q on the main menu
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn tutorial_visible(&self) -> bool {
        self.tutorial_remaining.is_some()
    }

    pub fn tutorial_remaining(&self) -> f32 {
        self.tutorial_remaining.unwrap_or(0.0)
    }

    /// Cursor position in arena pixels
    pub fn mouse(&self) -> Vec2 {
        self.mouse
    }

    /// Where the simulation thinks the cursor is (moved by grabbers)
    pub fn effective_mouse(&self) -> Vec2 {
        if self.state.cursor_grabbed {
            self.state.virtual_mouse
        } else {
            self.mouse
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.state.resize(width, height);
    }

    pub fn mouse_move(&mut self, pos: Vec2) {
        self.mouse = pos;
    }

    /// Primary button press; lands on the next tick
    pub fn mouse_down(&mut self, pos: Vec2) {
        self.mouse = pos;
        if self.tutorial_remaining.is_some() {
            return;
        }
        if self.state.screen.is_active() {
            self.click_pending = true;
        }
    }

    /// Effects raised since the last call, for the platform to play
    pub fn drain_sounds(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.sounds)
    }

    /// Hum loops that should be running right now
    pub fn hums(&self) -> [(SoundEffect, bool); 2] {
        let active = self.state.screen.is_active();
        [
            (
                SoundEffect::TankHum,
                active && self.state.tank_alive(CircleKind::Tank),
            ),
            (
                SoundEffect::SupertankHum,
                active && self.state.tank_alive(CircleKind::Supertank),
            ),
        ]
    }

    /// Advance by `dt` seconds of wall time
    pub fn frame(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);

        if let Some(remaining) = self.tutorial_remaining.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.tutorial_remaining = None;
            }
        }

        // The tutorial pauses gameplay underneath it
        if self.tutorial_remaining.is_none() {
            self.accumulator += dt;
            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = TickInput {
                    mouse: self.mouse,
                    click: std::mem::take(&mut self.click_pending),
                };
                sim::tick(&mut self.state, &input);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }
        }

        self.route_events();
        self.sync_music();
        self.music.update(dt);
    }

    /// Handle a key press
    pub fn key_down(&mut self, key: Key, ctrl: bool) {
        // Any key closes the tutorial and does nothing else
        if self.tutorial_remaining.take().is_some() {
            return;
        }

        // Debug chords are swallowed on every screen and only act in gameplay
        if ctrl && matches!(key.hotkey(), Some('=' | '+' | '-' | 'q')) {
            if self.state.screen.is_active() {
                match key.hotkey() {
                    Some('=' | '+') => {
                        sim::next_round(&mut self.state);
                        self.route_events();
                    }
                    Some('q') => {
                        self.state.force_quick_pipes = !self.state.force_quick_pipes;
                        log::info!(
                            "Quick pipe mode: {}",
                            if self.state.force_quick_pipes { "ON" } else { "OFF" }
                        );
                    }
                    _ => {}
                }
            }
            return;
        }

        match self.state.screen {
            Screen::MainMenu => self.main_menu_key(key),
            Screen::DifficultySelect => self.difficulty_key(key),
            Screen::TimeSelect => self.time_select_key(key),
            Screen::Playing => self.playing_key(key),
            Screen::Sandbox => self.sandbox_key(key),
            Screen::GameOver => self.game_over_key(key),
        }
        self.route_events();
        self.sync_music();
    }

    fn main_menu_key(&mut self, key: Key) {
        match self.overlay {
            Overlay::HighScores => {
                if key == Key::Escape {
                    self.overlay = Overlay::None;
                }
            }
            Overlay::Accessibility => self.accessibility_key(key),
            Overlay::None => match (key, key.hotkey()) {
                (Key::Space, _) => self.state.screen = Screen::DifficultySelect,
                (_, Some('s')) => {
                    self.state.options = self.settings.play_options();
                    sim::start_sandbox(&mut self.state);
                    self.reset_run_view();
                }
                (_, Some('h')) => self.overlay = Overlay::HighScores,
                (_, Some('a')) => self.overlay = Overlay::Accessibility,
                (_, Some('q')) => self.quit_requested = true,
                _ => {}
            },
        }
    }

    fn accessibility_key(&mut self, key: Key) {
        let count = AccessibilityOption::ALL.len();
        match (key, key.hotkey()) {
            (Key::Escape, _) => self.overlay = Overlay::None,
            (Key::Up, _) | (_, Some('w')) => {
                self.accessibility_index = (self.accessibility_index + count - 1) % count;
            }
            (Key::Down, _) | (_, Some('s')) => {
                self.accessibility_index = (self.accessibility_index + 1) % count;
            }
            (Key::Enter | Key::Space, _) => {
                let option = AccessibilityOption::ALL[self.accessibility_index % count];
                self.toggle_option(option);
            }
            _ => {}
        }
    }

    /// Flip an accessibility option, save, and apply its side effects
    pub fn toggle_option(&mut self, option: AccessibilityOption) {
        let on = self.settings.accessibility.toggle(option);
        self.settings.save(self.store.as_mut());
        self.state.options = self.settings.play_options();

        match option {
            AccessibilityOption::ClickRadiusHelper if on => {
                self.tutorial_remaining = Some(TUTORIAL_SECS);
            }
            AccessibilityOption::MusicEnabled => {
                self.music.set_enabled(on);
                // Ask again for whatever music this screen wants
                self.mood = None;
                self.sync_music();
            }
            _ => {}
        }
    }

    fn difficulty_key(&mut self, key: Key) {
        match key {
            Key::Up => self.state.difficulty = self.state.difficulty.prev(),
            Key::Down => self.state.difficulty = self.state.difficulty.next(),
            Key::Enter => self.state.screen = Screen::TimeSelect,
            Key::Escape => self.state.screen = Screen::MainMenu,
            _ => {}
        }
    }

    fn time_select_key(&mut self, key: Key) {
        let timed = self.state.mode == GameMode::Timed;
        match key {
            Key::Up | Key::Down => {
                self.state.mode = if timed {
                    GameMode::Endless
                } else {
                    GameMode::Timed
                };
            }
            Key::Left if timed => {
                self.state.time_limit = self
                    .state
                    .time_limit
                    .saturating_sub(TIME_LIMIT_STEP)
                    .max(MIN_TIME_LIMIT);
            }
            Key::Right if timed => {
                self.state.time_limit = (self.state.time_limit + TIME_LIMIT_STEP).min(MAX_TIME_LIMIT);
            }
            Key::Enter => {
                self.state.options = self.settings.play_options();
                sim::start_new_game(&mut self.state);
                self.reset_run_view();
            }
            Key::Escape => self.state.screen = Screen::DifficultySelect,
            _ => {}
        }
    }

    /// Keys shared by gameplay and sandbox; returns true when handled
    fn in_game_key(&mut self, key: Key) -> bool {
        match (key, key.hotkey()) {
            (Key::Tab, _) => self.show_ui = !self.show_ui,
            (_, Some('v')) => self.show_volume_help = !self.show_volume_help,
            (Key::Up, _) => self.change_volume(|v| v.adjust_master(VOLUME_STEP)),
            (Key::Down, _) => self.change_volume(|v| v.adjust_master(-VOLUME_STEP)),
            (Key::Left, _) => self.change_volume(|v| v.adjust_tank(-VOLUME_STEP)),
            (Key::Right, _) => self.change_volume(|v| v.adjust_tank(VOLUME_STEP)),
            (_, Some('=')) | (_, Some('+')) => self.change_click_radius(true),
            (_, Some('-')) => self.change_click_radius(false),
            _ => return false,
        }
        true
    }

    fn playing_key(&mut self, key: Key) {
        if key == Key::Escape {
            log::info!("run ended by player at round {}", self.state.round);
            sim::end_game(&mut self.state);
            self.player_name.clear();
            return;
        }
        self.in_game_key(key);
    }

    fn sandbox_key(&mut self, key: Key) {
        if key == Key::Escape {
            self.state.screen = Screen::MainMenu;
            return;
        }
        if self.in_game_key(key) {
            return;
        }
        let mouse = self.effective_mouse();
        match (key, key.hotkey()) {
            (Key::Space, _) => self.state.sandbox_paused = !self.state.sandbox_paused,
            (_, Some('o')) => sim::sandbox_spawn_spinner(&mut self.state, mouse),
            (_, Some('p')) => sim::sandbox_spawn_pipe(&mut self.state),
            (_, Some('c')) => sim::sandbox_clear(&mut self.state),
            (_, Some(c)) => {
                if let Some(kind) = sandbox_kind(c) {
                    sim::sandbox_spawn_circle(&mut self.state, kind, mouse);
                }
            }
            _ => {}
        }
    }

    fn game_over_key(&mut self, key: Key) {
        if !self.state.name_input_active {
            if key == Key::Escape || key.hotkey() == Some('m') {
                self.state.screen = Screen::MainMenu;
            }
            return;
        }
        match key {
            Key::Enter => {
                let name = self.player_name.trim().to_string();
                if !name.is_empty() {
                    self.submit_score(&name);
                    self.player_name.clear();
                    self.state.name_input_active = false;
                    self.state.screen = Screen::MainMenu;
                }
            }
            Key::Backspace => {
                self.player_name.pop();
            }
            Key::Escape => self.state.name_input_active = false,
            Key::Space => self.push_name_char(' '),
            Key::Char(c) => self.push_name_char(c),
            _ => {}
        }
    }

    fn push_name_char(&mut self, c: char) {
        if !c.is_control() && self.player_name.chars().count() < MAX_NAME_LEN {
            self.player_name.push(c);
        }
    }

    /// Record the finished run under `name`
    fn submit_score(&mut self, name: &str) {
        let flags = ScoreFlags {
            click_radius_helper: self.settings.accessibility.click_radius_helper,
            pipes_disabled: self.settings.accessibility.disable_pipes,
            spinners_disabled: self.settings.accessibility.disable_spinners,
        };
        let label = self.state.mode_label();
        let round_reached = self.state.round.saturating_sub(1);
        let result =
            self.high_scores
                .add_score(name, self.state.score, round_reached, &label, flags);
        if !matches!(result, Submission::Kept { .. }) {
            self.high_scores.save(self.store.as_mut());
        }
        self.last_submission = Some(result);
    }

    fn change_volume(&mut self, f: impl FnOnce(&mut crate::audio::Volumes)) {
        f(&mut self.settings.volumes);
        self.settings.save(self.store.as_mut());
    }

    fn change_click_radius(&mut self, grow: bool) {
        if !self.settings.accessibility.click_radius_helper {
            return;
        }
        self.settings.adjust_click_radius(grow);
        self.settings.save(self.store.as_mut());
        self.state.options = self.settings.play_options();
        log::info!("Click radius: {}px", self.settings.click_radius);
    }

    fn reset_run_view(&mut self) {
        self.click_pending = false;
        self.accumulator = 0.0;
        self.overlay = Overlay::None;
    }

    /// Turn simulation events into sounds and log lines
    fn route_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::Sound(effect) => self.sounds.push(effect),
                GameEvent::RoundStarted(round) => log::info!("Round {round}"),
                GameEvent::LifeLost { lives } => log::debug!("Life lost, {lives} left"),
                GameEvent::CircleKilled { points } => log::trace!("+{points}"),
                GameEvent::GameOver => {
                    log::info!("Game over: {} points", self.state.score);
                    self.player_name.clear();
                }
            }
        }
    }

    /// Request menu or game music when the screen category changes
    fn sync_music(&mut self) {
        let mood = if self.state.screen.is_active() {
            Mood::Game
        } else {
            Mood::Menu
        };
        if self.mood == Some(mood) {
            return;
        }
        self.mood = Some(mood);
        match mood {
            Mood::Menu => self.music.play_menu(),
            Mood::Game => self.music.play_game(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentMusic;
    use crate::audio::music::MENU_TRACK;
    use crate::persistence::MemoryStore;
    use crate::sim::Difficulty;

    fn app() -> App<SilentMusic> {
        App::new(7, Box::new(MemoryStore::new()), SilentMusic::default())
    }

    fn press(app: &mut App<SilentMusic>, keys: &[Key]) {
        for &k in keys {
            app.key_down(k, false);
        }
    }

    fn start_game(app: &mut App<SilentMusic>) {
        press(app, &[Key::Space, Key::Enter, Key::Enter]);
        assert_eq!(app.state.screen, Screen::Playing);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_key_name(" "), Key::Space);
        assert_eq!(Key::from_key_name("ArrowUp"), Key::Up);
        assert_eq!(Key::from_key_name("q"), Key::Char('q'));
        assert_eq!(Key::from_key_name("Shift"), Key::Other);
    }

    #[test]
    fn test_menu_navigation() {
        let mut app = app();
        press(&mut app, &[Key::Space]);
        assert_eq!(app.state.screen, Screen::DifficultySelect);
        press(&mut app, &[Key::Down, Key::Down, Key::Down]);
        assert_eq!(app.state.difficulty, Difficulty::Easy);
        press(&mut app, &[Key::Up]);
        assert_eq!(app.state.difficulty, Difficulty::Nightmare);
        press(&mut app, &[Key::Enter]);
        assert_eq!(app.state.screen, Screen::TimeSelect);
        press(&mut app, &[Key::Escape]);
        assert_eq!(app.state.screen, Screen::DifficultySelect);
        press(&mut app, &[Key::Escape]);
        assert_eq!(app.state.screen, Screen::MainMenu);
    }

    #[test]
    fn test_time_select_limits() {
        let mut app = app();
        press(&mut app, &[Key::Space, Key::Enter]);
        // Left/Right do nothing in endless mode
        press(&mut app, &[Key::Right]);
        assert_eq!(app.state.time_limit, DEFAULT_TIME_LIMIT);

        press(&mut app, &[Key::Down]);
        assert_eq!(app.state.mode, GameMode::Timed);
        for _ in 0..20 {
            press(&mut app, &[Key::Right]);
        }
        assert_eq!(app.state.time_limit, MAX_TIME_LIMIT);
        for _ in 0..20 {
            press(&mut app, &[Key::Left]);
        }
        assert_eq!(app.state.time_limit, MIN_TIME_LIMIT);
        press(&mut app, &[Key::Enter]);
        assert_eq!(app.state.screen, Screen::Playing);
        assert_eq!(app.state.mode_label(), "Medium (Timed) 30s");
    }

    #[test]
    fn test_escape_ends_game_and_name_is_saved() {
        let mut app = app();
        start_game(&mut app);
        app.state.score = 250;
        app.state.round = 6;
        press(&mut app, &[Key::Escape]);
        assert_eq!(app.state.screen, Screen::GameOver);
        assert!(app.state.name_input_active);
        assert!(app.drain_sounds().contains(&SoundEffect::GameOver));

        // Empty names are not submitted
        press(&mut app, &[Key::Enter]);
        assert_eq!(app.state.screen, Screen::GameOver);

        press(&mut app, &[Key::Char('B'), Key::Char('o'), Key::Char('x'), Key::Backspace]);
        press(&mut app, &[Key::Char('b'), Key::Enter]);
        assert_eq!(app.state.screen, Screen::MainMenu);
        let entry = &app.high_scores.entries[0];
        assert_eq!(entry.name, "Bob");
        assert_eq!(entry.score, 250);
        assert_eq!(entry.round_reached, 5);
        assert_eq!(entry.difficulty, "Medium (Endless)");
        assert_eq!(app.last_submission, Some(Submission::Added));
        assert!(app.store.load(HighScores::STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_name_length_capped() {
        let mut app = app();
        start_game(&mut app);
        press(&mut app, &[Key::Escape]);
        for _ in 0..30 {
            press(&mut app, &[Key::Char('z')]);
        }
        assert_eq!(app.player_name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_game_over_escape_then_menu() {
        let mut app = app();
        start_game(&mut app);
        press(&mut app, &[Key::Escape, Key::Escape]);
        assert!(!app.state.name_input_active);
        assert_eq!(app.state.screen, Screen::GameOver);
        press(&mut app, &[Key::Char('m')]);
        assert_eq!(app.state.screen, Screen::MainMenu);
    }

    #[test]
    fn test_accessibility_menu_toggles_and_saves() {
        let mut app = app();
        press(&mut app, &[Key::Char('a')]);
        assert_eq!(app.overlay, Overlay::Accessibility);
        // Down wraps from the bottom back to the top
        press(&mut app, &[Key::Up]);
        assert_eq!(app.accessibility_index, AccessibilityOption::ALL.len() - 1);
        press(&mut app, &[Key::Down, Key::Down, Key::Down, Key::Down]);
        assert_eq!(
            AccessibilityOption::ALL[app.accessibility_index],
            AccessibilityOption::DisablePipes
        );
        press(&mut app, &[Key::Enter]);
        assert!(app.settings.accessibility.disable_pipes);
        assert!(app.state.options.disable_pipes);
        let saved = app.store.load(Settings::STORAGE_KEY).unwrap().unwrap();
        assert!(saved.contains("\"disable_pipes\":true"));

        // S moves the selection instead of starting the sandbox
        press(&mut app, &[Key::Char('s')]);
        assert_eq!(app.state.screen, Screen::MainMenu);
        press(&mut app, &[Key::Escape]);
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn test_click_helper_tutorial() {
        let mut app = app();
        app.toggle_option(AccessibilityOption::ClickRadiusHelper);
        assert!(app.tutorial_visible());
        // Any key only closes it
        press(&mut app, &[Key::Char('q')]);
        assert!(!app.tutorial_visible());
        assert!(!app.quit_requested());

        app.toggle_option(AccessibilityOption::ClickRadiusHelper);
        app.toggle_option(AccessibilityOption::ClickRadiusHelper);
        for _ in 0..110 {
            app.frame(0.1);
        }
        assert!(!app.tutorial_visible());
    }

    #[test]
    fn test_volume_keys_clamp() {
        let mut app = app();
        start_game(&mut app);
        for _ in 0..30 {
            press(&mut app, &[Key::Up, Key::Right]);
        }
        assert_eq!(app.settings.volumes.master, 2.0);
        assert_eq!(app.settings.volumes.tank, 3.0);
        for _ in 0..40 {
            press(&mut app, &[Key::Down, Key::Left]);
        }
        assert_eq!(app.settings.volumes.master, 0.0);
        assert_eq!(app.settings.volumes.tank, 0.0);
    }

    #[test]
    fn test_click_radius_needs_helper() {
        let mut app = app();
        start_game(&mut app);
        press(&mut app, &[Key::Char('=')]);
        assert_eq!(app.settings.click_radius, DEFAULT_CLICK_RADIUS);

        app.settings.accessibility.click_radius_helper = true;
        press(&mut app, &[Key::Char('='), Key::Char('=')]);
        assert_eq!(app.settings.click_radius, 40);
        assert_eq!(app.state.options.click_radius, 40.0);
        for _ in 0..30 {
            press(&mut app, &[Key::Char('-')]);
        }
        assert_eq!(app.settings.click_radius, MIN_CLICK_RADIUS);
    }

    #[test]
    fn test_tab_and_v_toggle_panels() {
        let mut app = app();
        start_game(&mut app);
        press(&mut app, &[Key::Tab, Key::Char('v')]);
        assert!(!app.show_ui);
        assert!(app.show_volume_help);
    }

    #[test]
    fn test_sandbox_hotkeys() {
        let mut app = app();
        press(&mut app, &[Key::Char('s')]);
        assert_eq!(app.state.screen, Screen::Sandbox);
        assert_eq!(app.state.round, SANDBOX_ROUND);

        press(&mut app, &[Key::Char('7'), Key::Char('s'), Key::Char('R')]);
        let kinds: Vec<CircleKind> = app.state.circles.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CircleKind::Tank, CircleKind::Snake, CircleKind::Shooter]
        );

        press(&mut app, &[Key::Char('o')]);
        assert_eq!(app.state.spinners.len(), 1);

        press(&mut app, &[Key::Space]);
        assert!(app.state.sandbox_paused);

        press(&mut app, &[Key::Char('c')]);
        assert!(app.state.circles.is_empty());
        assert!(app.state.spinners.is_empty());

        press(&mut app, &[Key::Escape]);
        assert_eq!(app.state.screen, Screen::MainMenu);
    }

    #[test]
    fn test_ctrl_shortcuts() {
        let mut app = app();
        start_game(&mut app);
        app.key_down(Key::Char('='), true);
        assert_eq!(app.state.round, 2);
        app.key_down(Key::Char('q'), true);
        assert!(app.state.force_quick_pipes);
        // Ctrl shortcuts do nothing outside gameplay
        press(&mut app, &[Key::Escape, Key::Escape, Key::Char('m')]);
        app.key_down(Key::Char('='), true);
        assert_eq!(app.state.round, 2);
    }

    #[test]
    fn test_ctrl_chords_swallowed_off_gameplay() {
        let mut app = app();
        app.key_down(Key::Char('q'), true);
        assert!(!app.quit_requested());
        assert_eq!(app.state.screen, Screen::MainMenu);
        assert!(!app.state.force_quick_pipes);

        start_game(&mut app);
        press(&mut app, &[Key::Escape]);
        assert!(app.state.name_input_active);
        for c in ['=', '+', '-', 'q', 'Q'] {
            app.key_down(Key::Char(c), true);
        }
        assert!(app.player_name.is_empty());
        assert_eq!(app.state.screen, Screen::GameOver);

        // Plain keys still type
        press(&mut app, &[Key::Char('q')]);
        assert_eq!(app.player_name, "q");
    }

    #[test]
    fn test_tank_hum_follows_tank() {
        let mut app = app();
        press(&mut app, &[Key::Char('s')]);
        assert!(app.hums().iter().all(|(_, on)| !on));
        press(&mut app, &[Key::Char('7')]);
        assert_eq!(app.hums()[0], (SoundEffect::TankHum, true));
        assert_eq!(app.hums()[1], (SoundEffect::SupertankHum, false));
        press(&mut app, &[Key::Escape]);
        assert!(app.hums().iter().all(|(_, on)| !on));
    }

    #[test]
    fn test_music_follows_screens() {
        let mut app = app();
        app.frame(0.016);
        assert_eq!(app.music().current_track(), Some(MENU_TRACK));
        start_game(&mut app);
        // Menu music fades out before the game track starts
        assert!(app.music().is_fading_out());
        for _ in 0..60 {
            app.frame(0.1);
        }
        let track = app.music().current_track();
        assert!(track.is_some_and(|t| app.music().game_tracks().contains(&t)));
    }

    #[test]
    fn test_disabling_music_stops_it() {
        let mut app = app();
        app.frame(0.016);
        app.toggle_option(AccessibilityOption::MusicEnabled);
        assert!(app.music().backend().playing().is_none());
        app.toggle_option(AccessibilityOption::MusicEnabled);
        assert_eq!(app.music().backend().playing(), Some(MENU_TRACK));
    }

    #[test]
    fn test_frames_drive_the_simulation() {
        let mut app = app();
        start_game(&mut app);
        for _ in 0..20 {
            app.frame(0.1);
        }
        assert!(app.state.time_ticks >= 100);
        assert_eq!(app.state.live_circle_count(), 1);
        assert!(app.drain_sounds().contains(&SoundEffect::Spawn));
    }
}
