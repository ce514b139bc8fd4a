//! Text layout for menus and the HUD
//!
//! Produces positioned text lines in arena pixels. The renderer draws shapes
//! only; the web layer turns these lines into DOM overlay elements.

use glam::Vec2;

use crate::app::{App, Overlay};
use crate::audio::MusicBackend;
use crate::highscores::HighScores;
use crate::settings::AccessibilityOption;
use crate::sim::palette::{self, Rgb};
use crate::sim::{CircleKind, Difficulty, GameMode, GameState, Screen};

const LIGHT_GRAY: Rgb = [200, 200, 200];
const LIGHT_BLUE: Rgb = [173, 216, 230];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Font size classes at the reference resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Big,
    Normal,
    Small,
}

impl TextSize {
    /// Pixel height at the given resolution scale
    pub fn px(self, scale: f32) -> f32 {
        let base = match self {
            TextSize::Big => 48.0,
            TextSize::Normal => 36.0,
            TextSize::Small => 24.0,
        };
        (base * scale).max(10.0)
    }
}

/// One line of positioned text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Top-left (or top-center when centered) in arena pixels
    pub pos: Vec2,
    pub size: TextSize,
    /// Font height in arena pixels
    pub px: f32,
    pub color: Rgb,
    pub align: Align,
    /// Draw a selection frame around the line
    pub selected: bool,
}

/// Accumulates lines top to bottom at the reference layout, scaled on push
struct Layout {
    scale: f32,
    width: f32,
    height: f32,
    lines: Vec<TextLine>,
}

impl Layout {
    fn new(state: &GameState) -> Self {
        Self {
            scale: state.scale,
            width: state.width,
            height: state.height,
            lines: Vec::new(),
        }
    }

    fn left(&mut self, text: impl Into<String>, y: f32, size: TextSize, color: Rgb) {
        self.push(text.into(), Vec2::new(10.0 * self.scale, y * self.scale), size, color, Align::Left);
    }

    /// Left-aligned, measured up from the bottom edge
    fn bottom_left(&mut self, text: impl Into<String>, from_bottom: f32, size: TextSize, color: Rgb) {
        let y = self.height - from_bottom * self.scale;
        self.push(text.into(), Vec2::new(10.0 * self.scale, y), size, color, Align::Left);
    }

    fn center(&mut self, text: impl Into<String>, y: f32, size: TextSize, color: Rgb) {
        let pos = Vec2::new(self.width * 0.5, y * self.scale);
        self.push(text.into(), pos, size, color, Align::Center);
    }

    fn push(&mut self, text: String, pos: Vec2, size: TextSize, color: Rgb, align: Align) {
        self.lines.push(TextLine {
            text,
            pos,
            size,
            px: size.px(self.scale),
            color,
            align,
            selected: false,
        });
    }

    /// Mark the last pushed line as the selection
    fn select_last(&mut self, selected: bool) {
        if let Some(line) = self.lines.last_mut() {
            line.selected = selected;
        }
    }
}

/// All text for the current frame
pub fn layout<M: MusicBackend>(app: &App<M>) -> Vec<TextLine> {
    let state = &app.state;
    let mut l = Layout::new(state);
    match state.screen {
        Screen::MainMenu => match app.overlay {
            Overlay::None => main_menu(&mut l),
            Overlay::HighScores => high_scores(&mut l, &app.high_scores),
            Overlay::Accessibility => accessibility(&mut l, app),
        },
        Screen::DifficultySelect => difficulty_select(&mut l, state.difficulty),
        Screen::TimeSelect => time_select(&mut l, state),
        Screen::Playing => hud(&mut l, app),
        Screen::Sandbox => sandbox(&mut l, app),
        Screen::GameOver => game_over(&mut l, app),
    }
    if app.tutorial_visible() {
        tutorial(&mut l, app.tutorial_remaining());
    }
    l.lines
}

fn main_menu(l: &mut Layout) {
    l.center("CIRCLE CLICKER", 60.0, TextSize::Big, LIGHT_BLUE);
    l.center("Fast-Paced Circle Destruction Game", 110.0, TextSize::Normal, palette::YELLOW);

    let items = [
        "SPACE - Start Game",
        "S - Sandbox Mode",
        "H - High Scores",
        "A - Accessibility Options",
        "TAB - Toggle UI (In-Game)",
        "Q - Quit Game",
    ];
    for (i, item) in items.iter().enumerate() {
        l.center(*item, 180.0 + i as f32 * 32.0, TextSize::Small, palette::WHITE);
    }

    l.center("CIRCLE TYPES", 390.0, TextSize::Normal, palette::ORANGE);
    for (i, kind) in CircleKind::unlocked(u32::MAX).enumerate() {
        let text = format!("{} (round {})", kind.name(), kind.unlock_round());
        l.center(text, 430.0 + i as f32 * 22.0, TextSize::Small, palette::WHITE);
    }
}

fn difficulty_select(l: &mut Layout, current: Difficulty) {
    l.center("Select Difficulty", 100.0, TextSize::Big, palette::WHITE);
    for (i, d) in Difficulty::ALL.iter().enumerate() {
        let selected = *d == current;
        let color = if selected { palette::YELLOW } else { palette::WHITE };
        l.center(
            format!("{}: {}", d.name(), d.description()),
            220.0 + i as f32 * 60.0,
            TextSize::Normal,
            color,
        );
        l.select_last(selected);
    }
    l.center(
        "UP/DOWN - Select    ENTER - Continue    ESC - Back",
        520.0,
        TextSize::Small,
        LIGHT_GRAY,
    );
}

fn time_select(l: &mut Layout, state: &GameState) {
    l.center("Select Game Mode", 100.0, TextSize::Big, palette::WHITE);
    let timed = state.mode == GameMode::Timed;
    let color = |on: bool| if on { palette::YELLOW } else { palette::WHITE };

    l.center("Endless Mode", 230.0, TextSize::Normal, color(!timed));
    l.select_last(!timed);
    l.center(
        format!("Timed Mode: {}s", state.time_limit),
        290.0,
        TextSize::Normal,
        color(timed),
    );
    l.select_last(timed);

    if timed {
        l.center("Adjust Time Limit:", 380.0, TextSize::Normal, palette::YELLOW);
        l.center(
            "Use LEFT/RIGHT arrows to adjust time (30s - 300s)",
            420.0,
            TextSize::Small,
            palette::WHITE,
        );
    }
    l.center(
        "UP/DOWN - Mode    ENTER - Start    ESC - Back",
        520.0,
        TextSize::Small,
        LIGHT_GRAY,
    );
}

fn lives_text(state: &GameState) -> String {
    let hearts = "\u{2665}".repeat(state.lives.max(0) as usize);
    format!("Lives: {hearts}")
}

fn grabbed_taunt<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    if app.state.cursor_grabbed {
        let pos = app.state.virtual_mouse - Vec2::new(0.0, 40.0 * l.scale);
        l.push("GRABBED!".into(), pos, TextSize::Small, palette::WHITE, Align::Center);
    }
}

fn volume_panel<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    if !app.show_volume_help {
        return;
    }
    let v = app.settings.volumes;
    let x = l.width - 320.0 * l.scale;
    let rows = [
        ("VOLUME CONTROLS".to_string(), TextSize::Normal, palette::YELLOW),
        (format!("Master: {:.1} (UP/DOWN)", v.master), TextSize::Small, palette::WHITE),
        (format!("Tank: {:.1} (LEFT/RIGHT)", v.tank), TextSize::Small, palette::WHITE),
        (format!("Effects: {:.1}", v.effects), TextSize::Small, palette::WHITE),
        ("Press V to close".to_string(), TextSize::Small, LIGHT_GRAY),
    ];
    for (i, (text, size, color)) in rows.into_iter().enumerate() {
        let pos = Vec2::new(x, (20.0 + i as f32 * 28.0) * l.scale);
        l.push(text, pos, size, color, Align::Left);
    }
}

fn hud<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    let state = &app.state;
    l.center(lives_text(state), 10.0, TextSize::Normal, palette::RED);
    grabbed_taunt(l, app);

    if !app.show_ui {
        l.center("Press TAB to show UI", 50.0, TextSize::Small, LIGHT_GRAY);
        return;
    }

    l.left(format!("Score: {}", state.score), 10.0, TextSize::Big, palette::YELLOW);
    let timed = state.mode == GameMode::Timed;
    if timed {
        let color = if state.time_remaining <= 10.0 {
            palette::RED
        } else {
            palette::YELLOW
        };
        l.left(format!("Time: {:.1}s", state.time_remaining), 60.0, TextSize::Big, color);
        l.left("Timed Mode", 110.0, TextSize::Small, palette::YELLOW);
    } else {
        l.left(format!("Round: {}", state.round), 60.0, TextSize::Normal, palette::WHITE);
        l.left("Endless Mode", 90.0, TextSize::Small, palette::WHITE);
    }

    let base = if timed { 140.0 } else { 120.0 };
    l.left(
        format!("Difficulty: {}", state.difficulty.name()),
        base,
        TextSize::Small,
        palette::WHITE,
    );
    l.left(
        format!("Speed: {:.2}x", state.speed_multiplier()),
        base + 20.0,
        TextSize::Small,
        palette::YELLOW,
    );
    let mut y = base + 50.0;
    if state.force_quick_pipes {
        l.left("QUICK PIPE MODE", base + 40.0, TextSize::Small, palette::RED);
        y += 20.0;
    }
    let circles_left = state.live_circle_count() as u32 + state.circles_to_spawn;
    l.left(format!("Circles Left: {circles_left}"), y, TextSize::Normal, palette::WHITE);

    l.bottom_left(
        "ESC: End Game | TAB: Toggle UI | V: Volume Controls",
        90.0,
        TextSize::Small,
        LIGHT_GRAY,
    );
    if state.round <= 3 {
        l.bottom_left("Speed increases each round!", 50.0, TextSize::Small, palette::YELLOW);
    }
    volume_panel(l, app);
}

fn sandbox<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    let state = &app.state;
    grabbed_taunt(l, app);
    if state.sandbox_paused {
        l.center("PAUSED", 360.0, TextSize::Big, palette::RED);
        l.center("Press SPACE to resume", 410.0, TextSize::Small, palette::WHITE);
    }

    if !app.show_ui {
        l.center("Press TAB to show controls", 30.0, TextSize::Small, LIGHT_GRAY);
        l.center("SANDBOX MODE", 60.0, TextSize::Normal, palette::YELLOW);
        return;
    }

    l.left("SANDBOX MODE", 10.0, TextSize::Big, palette::YELLOW);
    l.left(format!("Score: {}", state.score), 60.0, TextSize::Normal, palette::WHITE);
    let mut y = 110.0;
    if state.force_quick_pipes {
        l.left("QUICK PIPE MODE", 85.0, TextSize::Small, palette::RED);
        y += 25.0;
    }

    l.left("Spawn Circles:", y, TextSize::Normal, palette::YELLOW);
    y += 30.0;
    let keybinds = [
        "1 - Normal (Red)",
        "2 - Fast (Blue)",
        "3 - Teleporting (Purple)",
        "4 - Shrinking (Orange)",
        "5 - Small (Yellow)",
        "6 - Ghost (Gray)",
        "7 - Tank (Dark Gray)",
        "8 - Supertank (Red Glow)",
        "9 - Hexagon (Magenta)",
        "0 - Cursor Grabber (Pink)",
        "S - Snake (Green)",
        "R - Shooter",
        "O - Spinning Obstacle (Red)",
        "P - Pipe Obstacle (Green)",
    ];
    for keybind in keybinds {
        l.left(keybind, y, TextSize::Small, palette::WHITE);
        y += 20.0;
    }

    y += 20.0;
    l.left("Controls:", y, TextSize::Normal, palette::YELLOW);
    y += 30.0;
    let mut controls = vec![
        "C - Clear all (circles & obstacles)",
        "SPACE - Pause/Resume movement",
        "CTRL+Q - Toggle Quick Pipe Mode",
        "TAB - Toggle UI",
        "ESC - Return to main menu",
    ];
    if app.settings.accessibility.click_radius_helper {
        controls.insert(controls.len() - 2, "+/- - Adjust Click Radius");
    }
    for control in controls {
        l.left(control, y, TextSize::Small, palette::WHITE);
        y += 20.0;
    }

    l.bottom_left(
        format!("Active Circles: {}", state.live_circle_count()),
        120.0,
        TextSize::Normal,
        palette::GREEN,
    );
    let (status, color) = if state.sandbox_paused {
        ("PAUSED", palette::RED)
    } else {
        ("RUNNING", palette::GREEN)
    };
    l.bottom_left(format!("Status: {status}"), 100.0, TextSize::Normal, color);
    l.bottom_left("Click circles to destroy them!", 60.0, TextSize::Small, LIGHT_GRAY);
    volume_panel(l, app);
}

/// Rating shown on the game over screen
pub fn performance_rating(state: &GameState) -> (&'static str, Rgb) {
    let performance = match state.mode {
        GameMode::Timed => state.score as f32 / (state.time_limit.max(1) * 10) as f32,
        GameMode::Endless if state.round > 1 => {
            state.score as f32 / ((state.round - 1) * 100) as f32
        }
        GameMode::Endless => 0.0,
    };
    if performance > 3.0 {
        ("LEGENDARY!", palette::YELLOW)
    } else if performance > 2.0 {
        ("EXCELLENT!", palette::GREEN)
    } else if performance > 1.0 {
        ("GOOD!", palette::BLUE)
    } else if performance > 0.5 {
        ("Not Bad!", palette::WHITE)
    } else {
        ("Keep Trying!", palette::GRAY)
    }
}

fn game_over<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    let state = &app.state;
    l.center("GAME OVER", 80.0, TextSize::Big, palette::RED);
    l.center("FINAL RESULTS", 150.0, TextSize::Normal, palette::YELLOW);
    l.center(format!("SCORE: {}", state.score), 190.0, TextSize::Big, palette::YELLOW);
    match state.mode {
        GameMode::Timed => {
            l.center(format!("Time Limit: {}s", state.time_limit), 250.0, TextSize::Normal, palette::WHITE);
            l.center("Mode: Timed", 285.0, TextSize::Normal, palette::BLUE);
        }
        GameMode::Endless => {
            let rounds = state.round.saturating_sub(1);
            l.center(format!("Rounds: {rounds}"), 250.0, TextSize::Normal, palette::WHITE);
            l.center("Mode: Endless", 285.0, TextSize::Normal, palette::GREEN);
        }
    }
    l.center(
        format!("Difficulty: {}", state.difficulty.name()),
        320.0,
        TextSize::Normal,
        palette::WHITE,
    );
    l.center(
        format!("Speed: {:.2}x", state.speed_multiplier()),
        355.0,
        TextSize::Normal,
        palette::PINK,
    );
    let (rating, color) = performance_rating(state);
    l.center(format!("Performance: {rating}"), 400.0, TextSize::Normal, color);

    if state.name_input_active {
        l.center("Save Your Score", 460.0, TextSize::Normal, palette::WHITE);
        l.center(format!("{}_", app.player_name), 500.0, TextSize::Normal, palette::YELLOW);
        l.select_last(true);
        if app.player_name.trim().is_empty() {
            l.center("Type your name", 550.0, TextSize::Small, palette::WHITE);
        } else {
            l.center("Press ENTER to save score", 550.0, TextSize::Small, palette::GREEN);
        }
    }
    l.center("Press M to return to main menu", 600.0, TextSize::Small, LIGHT_GRAY);
}

fn high_scores(l: &mut Layout, scores: &HighScores) {
    l.center("HIGH SCORES", 60.0, TextSize::Big, palette::YELLOW);
    l.center("Top Players", 110.0, TextSize::Normal, palette::WHITE);

    if scores.is_empty() {
        l.center("No high scores yet!", 300.0, TextSize::Normal, palette::WHITE);
        l.center("Play a game to set your first record!", 340.0, TextSize::Small, palette::YELLOW);
    } else {
        l.center(
            format!("{:<5}{:<22}{:>8}{:>8}   {}", "#", "Name", "Score", "Round", "Mode"),
            160.0,
            TextSize::Small,
            LIGHT_GRAY,
        );
        for (i, e) in scores.entries.iter().enumerate() {
            let mut assists = Vec::new();
            if e.click_radius_helper {
                assists.push("helper");
            }
            if e.pipes_disabled {
                assists.push("no pipes");
            }
            if e.spinners_disabled {
                assists.push("no spinners");
            }
            let assists = if assists.is_empty() {
                String::new()
            } else {
                format!(" [{}]", assists.join(", "))
            };
            let color = match i {
                0 => palette::YELLOW,
                1 => LIGHT_GRAY,
                2 => palette::ORANGE,
                _ => palette::WHITE,
            };
            l.center(
                format!(
                    "{:<5}{:<22}{:>8}{:>8}   {}{}",
                    format!("{}.", i + 1),
                    e.name,
                    e.score,
                    e.round_reached,
                    e.difficulty,
                    assists
                ),
                190.0 + i as f32 * 26.0,
                TextSize::Small,
                color,
            );
        }
    }
    l.bottom_left("Press ESC to return to main menu", 40.0, TextSize::Small, palette::GREEN);
}

fn accessibility<M: MusicBackend>(l: &mut Layout, app: &App<M>) {
    l.center("Accessibility Options", 100.0, TextSize::Big, palette::WHITE);
    let a = &app.settings.accessibility;
    for (i, opt) in AccessibilityOption::ALL.iter().enumerate() {
        let on = a.get(*opt);
        let color = if on { palette::GREEN } else { palette::RED };
        let status = if on { "ON" } else { "OFF" };
        l.center(
            format!("{}: {status}", opt.label()),
            200.0 + i as f32 * 50.0,
            TextSize::Normal,
            color,
        );
        l.select_last(i == app.accessibility_index);
    }
    if let Some(opt) = AccessibilityOption::ALL.get(app.accessibility_index) {
        l.center(opt.description(), 520.0, TextSize::Small, LIGHT_BLUE);
    }
    if a.click_radius_helper {
        l.center(
            format!("Click radius: {}px", app.settings.click_radius),
            550.0,
            TextSize::Small,
            palette::WHITE,
        );
    }
    l.center(
        "UP/DOWN - Navigate    ENTER/SPACE - Toggle",
        600.0,
        TextSize::Small,
        LIGHT_GRAY,
    );
    l.center("ESC - Return to Menu", 625.0, TextSize::Small, LIGHT_GRAY);
}

fn tutorial(l: &mut Layout, remaining: f32) {
    l.center("Click Radius Helper Enabled!", 235.0, TextSize::Big, LIGHT_BLUE);
    let lines = [
        ("How to use the Click Radius Helper:", palette::YELLOW),
        ("A semi-transparent circle shows around your cursor", palette::WHITE),
        ("This circle shows your effective click area", palette::WHITE),
        ("You can click circles when they touch this area", palette::WHITE),
        ("Controls:", palette::YELLOW),
        ("Press + (equals key) to increase radius", palette::WHITE),
        ("Press - (minus key) to decrease radius", palette::WHITE),
        ("Radius ranges from 10px to 100px", palette::WHITE),
    ];
    for (i, (text, color)) in lines.into_iter().enumerate() {
        l.center(text, 285.0 + i as f32 * 28.0, TextSize::Small, color);
    }
    l.center("Press any key to close this popup", 530.0, TextSize::Small, LIGHT_BLUE);
    l.center(
        format!("Auto-close in {remaining:.1} seconds"),
        555.0,
        TextSize::Small,
        palette::GRAY,
    );
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Absolutely positioned HTML for the text overlay
///
/// `css_per_px` converts arena pixels to CSS pixels (1 / devicePixelRatio).
pub fn overlay_html(lines: &[TextLine], css_per_px: f32) -> String {
    let mut html = String::new();
    for line in lines {
        let class = match (line.align, line.selected) {
            (Align::Left, false) => "line",
            (Align::Left, true) => "line selected",
            (Align::Center, false) => "line center",
            (Align::Center, true) => "line center selected",
        };
        let [r, g, b] = line.color;
        html.push_str(&format!(
            "<div class=\"{class}\" style=\"left:{:.0}px;top:{:.0}px;font-size:{:.0}px;color:rgb({r},{g},{b})\">{}</div>",
            line.pos.x * css_per_px,
            line.pos.y * css_per_px,
            line.px * css_per_px,
            escape_html(&line.text),
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Key;
    use crate::audio::SilentMusic;
    use crate::persistence::MemoryStore;

    fn app() -> App<SilentMusic> {
        App::new(1, Box::new(MemoryStore::new()), SilentMusic::default())
    }

    fn texts(app: &App<SilentMusic>) -> Vec<String> {
        layout(app).into_iter().map(|l| l.text).collect()
    }

    fn has(app: &App<SilentMusic>, needle: &str) -> bool {
        texts(app).iter().any(|t| t.contains(needle))
    }

    #[test]
    fn test_main_menu_lists_options() {
        let app = app();
        assert!(has(&app, "CIRCLE CLICKER"));
        assert!(has(&app, "S - Sandbox Mode"));
        assert!(has(&app, "Shooter"));
    }

    #[test]
    fn test_hud_endless_and_timed() {
        let mut app = app();
        crate::sim::start_new_game(&mut app.state);
        assert!(has(&app, "Score: 0"));
        assert!(has(&app, "Round: 1"));
        assert!(has(&app, "Endless Mode"));
        assert!(has(&app, "Circles Left: 1"));
        assert!(has(&app, "Speed: "));
        assert!(has(&app, "ESC: End Game | TAB: Toggle UI | V: Volume Controls"));
        assert!(!has(&app, "QUICK PIPE MODE"));

        app.state.mode = GameMode::Timed;
        app.state.time_remaining = 8.3;
        app.state.force_quick_pipes = true;
        let lines = layout(&app);
        let time = lines.iter().find(|l| l.text.starts_with("Time: ")).unwrap();
        assert_eq!(time.text, "Time: 8.3s");
        assert_eq!(time.color, palette::RED);
        assert!(has(&app, "Timed Mode"));
        assert!(has(&app, "QUICK PIPE MODE"));
    }

    #[test]
    fn test_hidden_ui_shows_hint_only() {
        let mut app = app();
        crate::sim::start_new_game(&mut app.state);
        app.show_ui = false;
        assert!(has(&app, "Press TAB to show UI"));
        assert!(!has(&app, "Score:"));
    }

    #[test]
    fn test_grabbed_taunt() {
        let mut app = app();
        crate::sim::start_new_game(&mut app.state);
        app.state.cursor_grabbed = true;
        assert!(has(&app, "GRABBED!"));
    }

    #[test]
    fn test_volume_panel() {
        let mut app = app();
        crate::sim::start_new_game(&mut app.state);
        app.show_volume_help = true;
        assert!(has(&app, "Master: 1.0 (UP/DOWN)"));
        assert!(has(&app, "Tank: 3.5 (LEFT/RIGHT)"));
    }

    #[test]
    fn test_difficulty_selection_highlighted() {
        let mut app = app();
        app.key_down(Key::Space, false);
        let lines = layout(&app);
        let selected: Vec<&TextLine> = lines.iter().filter(|l| l.selected).collect();
        assert_eq!(selected.len(), 1);
        assert!(selected[0].text.starts_with("Medium"));
    }

    #[test]
    fn test_accessibility_rows() {
        let mut app = app();
        app.key_down(Key::Char('a'), false);
        assert!(has(&app, "Pipe Warning Flash: ON"));
        assert!(has(&app, "Click Radius Helper: OFF"));
        assert!(has(&app, "Background Music: ON"));
    }

    #[test]
    fn test_high_score_table() {
        let mut app = app();
        app.key_down(Key::Char('h'), false);
        assert!(has(&app, "No high scores yet!"));
        app.high_scores.add_score(
            "Ann",
            320,
            7,
            "Hard (Endless)",
            crate::highscores::ScoreFlags::default(),
        );
        let row = texts(&app).into_iter().find(|t| t.contains("Ann")).unwrap();
        assert!(row.starts_with("1."));
        assert!(row.contains("320"));
        assert!(row.contains("Hard (Endless)"));
    }

    #[test]
    fn test_game_over_prompt() {
        let mut app = app();
        crate::sim::start_new_game(&mut app.state);
        app.key_down(Key::Escape, false);
        assert!(has(&app, "GAME OVER"));
        assert!(has(&app, "Type your name"));
        app.key_down(Key::Char('x'), false);
        assert!(has(&app, "x_"));
        assert!(has(&app, "Press ENTER to save score"));
    }

    #[test]
    fn test_ratings() {
        let mut state = GameState::new(1);
        state.round = 5;
        state.score = 1300;
        assert_eq!(performance_rating(&state).0, "LEGENDARY!");
        state.score = 100;
        assert_eq!(performance_rating(&state).0, "Keep Trying!");
        state.mode = GameMode::Timed;
        state.time_limit = 60;
        state.score = 1300;
        assert_eq!(performance_rating(&state).0, "EXCELLENT!");
    }

    #[test]
    fn test_tutorial_overlay() {
        let mut app = app();
        app.toggle_option(AccessibilityOption::ClickRadiusHelper);
        assert!(has(&app, "Click Radius Helper Enabled!"));
        assert!(has(&app, "Auto-close in 10.0 seconds"));
    }

    #[test]
    fn test_overlay_html_escapes_and_scales() {
        let lines = vec![TextLine {
            text: "<b>&\"x\"".to_string(),
            pos: Vec2::new(200.0, 100.0),
            size: TextSize::Small,
            px: 24.0,
            color: [1, 2, 3],
            align: Align::Center,
            selected: true,
        }];
        let html = overlay_html(&lines, 0.5);
        assert!(html.contains("&lt;b&gt;&amp;&quot;x&quot;"));
        assert!(html.contains("left:100px;top:50px;font-size:12px"));
        assert!(html.contains("rgb(1,2,3)"));
        assert!(html.contains("class=\"line center selected\""));
    }

    #[test]
    fn test_text_scales() {
        assert_eq!(TextSize::Normal.px(1.0), 36.0);
        assert_eq!(TextSize::Big.px(0.5), 24.0);
        assert_eq!(TextSize::Small.px(0.1), 10.0);
    }
}
