//! Fixed timestep simulation tick
//!
//! Advances the game by one frame: clicks, obstacles, circles, collisions,
//! projectiles, spawning and round progression. Sandbox runs the same
//! systems without spawning, rounds or game over.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::behavior::{UpdateContext, UpdateOutcome, random_point};
use super::circle::{Circle, CircleKind, Hit, KindState, SpawnParams};
use super::collision::resolve_circle_collisions;
use super::obstacle::{Pipe, Spinner, check_hit};
use super::state::{GameEvent, GameMode, GameState, Screen};
use crate::audio::SoundEffect;
use crate::consts::*;

/// Flash intensity lost per frame
const SCREEN_FLASH_DECAY: f32 = 15.0;
const PIPE_FLASH_DECAY: f32 = 10.0;
const EXPLOSION_FLASH_DECAY: f32 = 20.0;
/// Starting intensity of the pipe warning flash
const PIPE_FLASH_ALPHA: f32 = 100.0;
/// Delay range for quick and burst pipes (ms)
const QUICK_PIPE_DELAY_MS: std::ops::RangeInclusive<u64> = 500..=1200;
/// Chance a scheduled pipe starts a burst
const PIPE_BURST_CHANCE: f32 = 0.3;
/// Spinners keep this far apart
const SPINNER_SPACING: f32 = 220.0;
/// Kinds a surplus grabber is swapped for
const BASIC_KINDS: [CircleKind; 6] = [
    CircleKind::Normal,
    CircleKind::Fast,
    CircleKind::Small,
    CircleKind::Shrinking,
    CircleKind::Teleport,
    CircleKind::Ghost,
];
/// Grabbers allowed alive at once
const MAX_GRABBERS: usize = 2;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Real cursor position in arena pixels
    pub mouse: Vec2,
    /// Primary button pressed this frame
    pub click: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if input.click {
        handle_click(state, input.mouse);
    }

    match state.screen {
        Screen::Playing => update_playing(state, input.mouse),
        Screen::Sandbox if !state.sandbox_paused => update_sandbox(state, input.mouse),
        _ => {}
    }

    if state.mode == GameMode::Timed && state.screen == Screen::Playing {
        let elapsed = state.now_ms().saturating_sub(state.game_start_ms) as f32 / 1000.0;
        state.time_remaining = (state.time_limit as f32 - elapsed).max(0.0);
        if state.time_remaining <= 0.0 {
            log::info!("time up at round {} with {} points", state.round, state.score);
            end_game(state);
        }
    }

    state.screen_flash = (state.screen_flash - SCREEN_FLASH_DECAY).max(0.0);
    state.pipe_flash = (state.pipe_flash - PIPE_FLASH_DECAY).max(0.0);
    state.explosion_flash = (state.explosion_flash - EXPLOSION_FLASH_DECAY).max(0.0);
    state.time_ticks += 1;
}

/// Begin a fresh run on the selected difficulty and mode
pub fn start_new_game(state: &mut GameState) {
    state.screen = Screen::Playing;
    state.reset_arena();
    state.round = 1;
    state.circles_to_spawn = 1;
    state.lives = STARTING_LIVES;
    state.name_input_active = false;
    state.sandbox_paused = false;
    if state.mode == GameMode::Timed {
        state.game_start_ms = state.now_ms();
        state.time_remaining = state.time_limit as f32;
    }
    log::info!(
        "new game: {} {:?}, seed {}",
        state.difficulty.name(),
        state.mode,
        state.seed
    );
    state.emit(GameEvent::RoundStarted(1));
}

/// Advance to the next round and roll its obstacles
pub fn next_round(state: &mut GameState) {
    state.round += 1;
    state.circles_to_spawn = if state.round > 20 {
        state.difficulty.late_round_circle_cap()
    } else {
        state.round
    };
    state.spawn_timer = 0;

    state.spinners.clear();
    state.pipes.clear();
    state.spinners_spawned_this_round = false;
    state.spinners_this_round = state
        .difficulty
        .roll_spinner_count(state.round, &mut state.rng);

    state.reset_pipe_schedule();
    let settings = state.difficulty.pipe_settings();
    if state.round >= settings.min_round && state.rng.random::<f32>() < settings.spawn_chance {
        state.pending_pipe_spawn = true;
        schedule_next_pipe_spawn(state);
    }

    log::debug!(
        "round {}: {} circles, {} spinners, pipes {}",
        state.round,
        state.circles_to_spawn,
        state.spinners_this_round,
        state.pending_pipe_spawn
    );
    state.emit(GameEvent::RoundStarted(state.round));
}

/// Pick the delay until the next pipe and arm its warning flash
pub fn schedule_next_pipe_spawn(state: &mut GameState) {
    if !state.pending_pipe_spawn {
        return;
    }
    let settings = state.difficulty.pipe_settings();

    let delay = if state.force_quick_pipes {
        state.rng.random_range(QUICK_PIPE_DELAY_MS)
    } else if state.in_quick_burst && state.quick_burst_remaining > 0 {
        state.quick_burst_remaining -= 1;
        if state.quick_burst_remaining == 0 {
            state.in_quick_burst = false;
        }
        state.rng.random_range(QUICK_PIPE_DELAY_MS)
    } else {
        let mut delay = state
            .rng
            .random_range(settings.min_spawn_delay_ms..=settings.max_spawn_delay_ms);
        let free_slots = settings
            .max_pipes_per_round
            .saturating_sub(state.pipes_this_round);
        if free_slots > 1 && state.rng.random::<f32>() < PIPE_BURST_CHANCE {
            let largest = state.difficulty.max_burst().min(free_slots);
            let burst = state.rng.random_range(2..=largest);
            state.in_quick_burst = true;
            state.quick_burst_remaining = burst - 1;
            delay = state.rng.random_range(QUICK_PIPE_DELAY_MS);
        }
        delay
    };

    state.next_pipe_spawn_ms = state.now_ms() + delay;
    if state.options.pipe_warning_flash {
        state.pipe_flash_armed = true;
        state.pipe_flash_ms = state.next_pipe_spawn_ms.saturating_sub(PIPE_WARNING_LEAD_MS);
    }
}

/// Spawn the next circle of the round away from the cursor
pub fn spawn_circle(state: &mut GameState, mouse: Vec2) {
    let s = state.scale;
    let (margin, min_distance) = (50.0 * s, 150.0 * s);
    let pos = spawn_position(state, mouse, margin, min_distance, 50, false);

    let round = state.round;
    let mut kind = CircleKind::for_round(round, &mut state.rng);
    if kind == CircleKind::Grabber {
        let grabbers = state
            .circles
            .iter()
            .filter(|c| c.kind == CircleKind::Grabber)
            .count();
        if grabbers >= MAX_GRABBERS {
            let basics: Vec<CircleKind> = BASIC_KINDS
                .into_iter()
                .filter(|k| k.unlock_round() <= round)
                .collect();
            kind = basics
                .choose(&mut state.rng)
                .copied()
                .unwrap_or(CircleKind::Normal);
        }
    }

    let mut size_variation = 1.0;
    if round >= 8 && kind != CircleKind::Small {
        let roll: f32 = state.rng.random();
        if roll < 0.2 {
            size_variation = 0.8;
        } else if roll < 0.4 {
            size_variation = 1.2;
        }
    }

    let mut params = round_params(state, pos, kind);
    params.size_variation = size_variation;
    add_circle(state, &params);
    state.emit(GameEvent::Sound(SoundEffect::Spawn));
}

/// Enter sandbox mode with every circle kind unlocked
pub fn start_sandbox(state: &mut GameState) {
    state.screen = Screen::Sandbox;
    state.reset_arena();
    state.round = SANDBOX_ROUND;
    state.circles_to_spawn = 0;
    state.sandbox_paused = false;
    state.lives = SANDBOX_LIVES;
    state.name_input_active = false;
    log::info!("sandbox started on {}", state.difficulty.name());
}

/// Spawn one circle of a chosen kind (sandbox hotkeys)
pub fn sandbox_spawn_circle(state: &mut GameState, kind: CircleKind, mouse: Vec2) {
    let s = state.scale;
    let pos = spawn_position(state, mouse, 50.0 * s, 150.0 * s, 20, true);
    let size_variation = if kind == CircleKind::Small {
        1.0
    } else {
        [0.8, 1.0, 1.2]
            .choose(&mut state.rng)
            .copied()
            .unwrap_or(1.0)
    };
    let mut params = round_params(state, pos, kind);
    params.size_variation = size_variation;
    params.sandbox = true;
    add_circle(state, &params);
}

/// Spawn a spinner away from the cursor and other spinners (sandbox hotkey)
pub fn sandbox_spawn_spinner(state: &mut GameState, mouse: Vec2) {
    if state.options.disable_spinners {
        return;
    }
    spawn_spinner(state, mouse);
}

/// Spawn a pipe, after a warning flash when those are enabled (sandbox hotkey)
pub fn sandbox_spawn_pipe(state: &mut GameState) {
    if state.options.disable_pipes {
        return;
    }
    if state.options.pipe_warning_flash {
        state.pipe_flash = PIPE_FLASH_ALPHA;
        state.delayed_pipe_ms = Some(state.now_ms() + PIPE_WARNING_LEAD_MS);
    } else {
        spawn_manual_pipe(state);
    }
}

/// Remove every circle and obstacle from the sandbox
pub fn sandbox_clear(state: &mut GameState) {
    state.circles.clear();
    state.spinners.clear();
    state.pipes.clear();
    state.cursor_grabbed = false;
}

/// Damage the best circle under a click
///
/// Clicks are ignored while a triangle has hidden the cursor; while a
/// grabber holds it they land where the grabber put it. Overlapping
/// candidates are ranked by distance plus a per-kind bonus and only the
/// lowest takes damage.
pub fn handle_click(state: &mut GameState, pos: Vec2) {
    if state.cursor_hidden || !state.screen.is_active() {
        return;
    }
    let pos = if state.cursor_grabbed {
        state.virtual_mouse
    } else {
        pos
    };
    let reach = state
        .options
        .click_radius_helper
        .then_some(state.options.click_radius);

    let mut best: Option<(usize, f32)> = None;
    for (i, circle) in state.circles.iter_mut().enumerate() {
        if circle.dying || circle.is_invisible() {
            continue;
        }
        if try_click(circle, pos, reach) {
            let priority = circle.pos.distance(pos) + circle.kind.click_priority_bonus();
            if best.is_none_or(|(_, p)| priority < p) {
                best = Some((i, priority));
            }
        }
    }
    let Some((index, _)) = best else {
        return;
    };

    let now = state.now_ms();
    let sandbox = state.screen == Screen::Sandbox;
    let circle = &mut state.circles[index];
    if let KindState::Supertank(st) = &mut circle.state {
        st.last_clicked_ms = Some(now);
        st.regen_active = false;
    }
    let outcome = circle.take_damage(sandbox, &mut state.rng);
    let points = circle.points;
    let children = outcome
        .split
        .then(|| circle.split_children(&mut state.rng));

    state.emit(GameEvent::Sound(outcome.sound));
    if let Some(children) = children {
        for params in &children {
            add_circle(state, params);
        }
        state.circles_to_spawn += 1;
    }
    if outcome.killed {
        state.score += points;
        state.emit(GameEvent::Sound(SoundEffect::Coin));
        state.emit(GameEvent::CircleKilled { points });
    }
}

/// Does a click at `pos` count for this circle
///
/// Landing on a snake's next tail segment removes it on the spot; the
/// snake itself only becomes a target once every segment is gone.
fn try_click(circle: &mut Circle, pos: Vec2, reach: Option<f32>) -> bool {
    let expected = match &circle.state {
        KindState::Snake(snake) => snake.expected_segment(),
        _ => None,
    };
    match circle.hit_test(pos) {
        Hit::Body => return true,
        Hit::Segment(i) if Some(i) == expected => {
            circle.kill_tail_segment();
            return false;
        }
        _ => {}
    }

    let Some(reach) = reach else {
        return false;
    };
    if circle.is_grabbing() {
        return false;
    }
    if let Some(expected) = expected {
        if circle.pos.distance(pos) <= reach + circle.radius {
            return false;
        }
        let seg_radius = circle.segment_radius();
        let near_tail = match &circle.state {
            KindState::Snake(snake) => snake.segments[expected].distance(pos) <= reach + seg_radius,
            _ => false,
        };
        if near_tail {
            circle.kill_tail_segment();
        }
        return false;
    }
    circle.pos.distance(pos) <= reach + circle.radius
}

fn update_playing(state: &mut GameState, real_mouse: Vec2) {
    let mouse = resolve_cursor(state, real_mouse);
    let now = state.now_ms();

    if !state.options.disable_spinners
        && !state.spinners_spawned_this_round
        && state.spinners_this_round > 0
    {
        state.spinners_spawned_this_round = true;
        state.spinners.clear();
        for _ in 0..state.spinners_this_round {
            spawn_spinner(state, mouse);
        }
    }

    if state.pending_pipe_spawn {
        let settings = state.difficulty.pipe_settings();
        let room = state.pipes_this_round < settings.max_pipes_per_round;
        if state.options.pipe_warning_flash
            && state.pipe_flash_armed
            && now >= state.pipe_flash_ms
            && room
        {
            state.pipe_flash = PIPE_FLASH_ALPHA;
            state.pipe_flash_armed = false;
        }
        if !state.options.disable_pipes && now >= state.next_pipe_spawn_ms && room {
            push_pipe(state);
            state.pipes_this_round += 1;
            if state.pipes_this_round < settings.max_pipes_per_round {
                schedule_next_pipe_spawn(state);
            } else {
                state.pending_pipe_spawn = false;
            }
        }
    }

    let (width, height) = (state.width, state.height);
    for spinner in &mut state.spinners {
        spinner.update(width, height);
    }
    for pipe in &mut state.pipes {
        pipe.update(height);
    }
    state.pipes.retain(|p| !p.is_expired(width, now));

    if obstacle_hits(state, mouse, true) {
        return;
    }

    if update_circles(state, mouse) {
        return;
    }
    resolve_circle_collisions(&mut state.circles, width, height, state.scale);
    update_triangles(state, mouse);

    if state.circles_to_spawn > 0 {
        state.spawn_timer += 1;
        if state.spawn_timer >= SPAWN_DELAY_TICKS {
            spawn_circle(state, real_mouse);
            state.circles_to_spawn -= 1;
            state.spawn_timer = 0;
        }
    }

    if state.circles_to_spawn == 0 && state.live_circle_count() == 0 {
        next_round(state);
    }
}

fn update_sandbox(state: &mut GameState, real_mouse: Vec2) {
    let mouse = resolve_cursor(state, real_mouse);
    let now = state.now_ms();
    let (width, height) = (state.width, state.height);

    update_circles(state, mouse);
    resolve_circle_collisions(&mut state.circles, width, height, state.scale);
    update_triangles(state, mouse);

    for spinner in &mut state.spinners {
        spinner.update(width, height);
    }
    for pipe in &mut state.pipes {
        pipe.update(height);
    }
    state.pipes.retain(|p| p.x <= width);

    if let Some(due) = state.delayed_pipe_ms {
        if now >= due {
            state.delayed_pipe_ms = None;
            if !state.options.disable_pipes {
                spawn_manual_pipe(state);
            }
        }
    }
    if !state.options.disable_pipes && state.pending_pipe_spawn && now >= state.next_pipe_spawn_ms {
        state.pending_pipe_spawn = false;
        push_pipe(state);
        if state.force_quick_pipes || state.in_quick_burst {
            state.pending_pipe_spawn = true;
            schedule_next_pipe_spawn(state);
        }
    }

    obstacle_hits(state, mouse, false);
}

/// Follow a grabbing grabber's target instead of the real cursor
fn resolve_cursor(state: &mut GameState, mouse: Vec2) -> Vec2 {
    let grabbed = state.circles.iter().find_map(|c| match &c.state {
        KindState::Grabber(g) if g.grabbing => g.cursor_target,
        _ => None,
    });
    state.cursor_grabbed = grabbed.is_some();
    state.virtual_mouse = grabbed.unwrap_or(mouse);
    state.virtual_mouse
}

/// Run every circle's update; returns true if an explosion ended the game
fn update_circles(state: &mut GameState, mouse: Vec2) -> bool {
    let mut shooters_with_triangles: Vec<u32> = state.triangles.iter().map(|t| t.shooter).collect();
    shooters_with_triangles.sort_unstable();
    shooters_with_triangles.dedup();
    let active_grabbers: Vec<u32> = state
        .circles
        .iter()
        .filter(|c| matches!(&c.state, KindState::Grabber(g) if g.grabbing || (g.stalking && g.will_attack)))
        .map(|c| c.id)
        .collect();

    let mut ctx = UpdateContext {
        mouse,
        width: state.width,
        height: state.height,
        now_ms: state.now_ms(),
        rng: &mut state.rng,
        events: &mut state.events,
        triangles: &mut state.triangles,
        shooters_with_triangles: &shooters_with_triangles,
        active_grabbers: &active_grabbers,
    };
    let mut explosions = 0;
    state.circles.retain_mut(|c| match c.update(&mut ctx) {
        UpdateOutcome::Keep => true,
        UpdateOutcome::Remove => false,
        UpdateOutcome::Exploded => {
            explosions += 1;
            false
        }
    });

    for _ in 0..explosions {
        state.explosion_flash = 255.0;
        if lose_life(state) {
            return true;
        }
    }
    false
}

/// Move shooter triangles; touching one hides the cursor
fn update_triangles(state: &mut GameState, mouse: Vec2) {
    let now = state.now_ms();
    let (width, height) = (state.width, state.height);
    let mut hit = false;
    let already_hidden = state.cursor_hidden;
    state.triangles.retain_mut(|t| {
        if !t.update(width, height, now) {
            return false;
        }
        if !already_hidden && !hit && t.hits(mouse) {
            hit = true;
            t.start_fade(now, 100);
        }
        true
    });
    if hit {
        log::debug!("triangle hit the cursor at {mouse}");
        state.cursor_hidden = true;
        state.cursor_hide_start_ms = now;
    }
    if state.cursor_hidden && now.saturating_sub(state.cursor_hide_start_ms) >= CURSOR_HIDE_MS {
        state.cursor_hidden = false;
    }
}

/// Check spinner and pipe contact; returns true if a hit ended the game
fn obstacle_hits(state: &mut GameState, cursor: Vec2, cooldown_first: bool) -> bool {
    for i in 0..state.spinners.len() {
        let spinner = &mut state.spinners[i];
        let touching = spinner.hits(cursor);
        if check_hit(&mut spinner.hit_cooldown, touching, cooldown_first) && obstacle_hit(state) {
            return true;
        }
    }
    for i in 0..state.pipes.len() {
        let pipe = &mut state.pipes[i];
        let touching = pipe.hits(cursor);
        if check_hit(&mut pipe.hit_cooldown, touching, cooldown_first) && obstacle_hit(state) {
            return true;
        }
    }
    false
}

fn obstacle_hit(state: &mut GameState) -> bool {
    state.screen_flash = 255.0;
    state.emit(GameEvent::Sound(SoundEffect::Hit));
    lose_life(state)
}

/// Take a life; returns true when that ended the game
fn lose_life(state: &mut GameState) -> bool {
    state.lives -= 1;
    state.emit(GameEvent::LifeLost { lives: state.lives });
    if state.lives > 0 {
        return false;
    }
    if state.screen == Screen::Sandbox {
        state.lives = 1;
        return false;
    }
    log::info!("out of lives at round {} with {} points", state.round, state.score);
    end_game(state);
    true
}

/// End the run and open name entry
pub fn end_game(state: &mut GameState) {
    state.screen = Screen::GameOver;
    state.name_input_active = true;
    state.cursor_grabbed = false;
    state.cursor_hidden = false;
    state.emit(GameEvent::Sound(SoundEffect::GameOver));
    state.emit(GameEvent::GameOver);
}

/// Sample a spawn point at least `min_distance` from the cursor
///
/// Lenient placement accepts whatever was sampled after ten tries; strict
/// placement falls back to an unchecked point when every try fails.
fn spawn_position(
    state: &mut GameState,
    mouse: Vec2,
    margin: f32,
    min_distance: f32,
    attempts: u32,
    lenient: bool,
) -> Vec2 {
    let (width, height) = (state.width, state.height);
    let mut pos = random_point(&mut state.rng, margin, width, height);
    for attempt in 0..attempts {
        if pos.distance(mouse) > min_distance || (lenient && attempt > 10) {
            return pos;
        }
        pos = random_point(&mut state.rng, margin, width, height);
    }
    pos
}

/// Spawn parameters carrying the current round's speed-up
fn round_params(state: &GameState, pos: Vec2, kind: CircleKind) -> SpawnParams {
    let mut params = SpawnParams::new(pos, kind, state.difficulty, state.round, state.scale);
    params.round_speed_mult = state.speed_multiplier() / state.difficulty.base_speed_multiplier();
    params
}

fn add_circle(state: &mut GameState, params: &SpawnParams) {
    let id = state.next_entity_id();
    let circle = Circle::new(id, params, &mut state.rng);
    state.circles.push(circle);
}

/// Place a spinner away from the cursor and other spinners
///
/// Falls back to the sampled spot farthest from the cursor when none is
/// far enough.
fn spawn_spinner(state: &mut GameState, cursor: Vec2) {
    let (width, height) = (state.width, state.height);
    let min_cursor = 240.0 * state.scale;
    let mut best: Option<(Vec2, f32)> = None;
    let mut chosen = None;
    for _ in 0..30 {
        let p = random_point(&mut state.rng, 100.0, width, height);
        if state.spinners.iter().any(|s| s.pos.distance(p) < SPINNER_SPACING) {
            continue;
        }
        let d = p.distance(cursor);
        if d >= min_cursor {
            chosen = Some(p);
            break;
        }
        if best.is_none_or(|(_, bd)| d > bd) {
            best = Some((p, d));
        }
    }
    if let Some(pos) = chosen.or(best.map(|(p, _)| p)) {
        let spinner = Spinner::new(pos, state.scale, state.difficulty, &mut state.rng);
        state.spinners.push(spinner);
    }
}

fn push_pipe(state: &mut GameState) {
    let settings = state.difficulty.pipe_settings();
    let pipe = Pipe::new(
        state.height,
        state.scale,
        &settings,
        state.now_ms(),
        &mut state.rng,
    );
    state.pipes.push(pipe);
}

/// Hand-spawned sandbox pipe, possibly followed by a burst
fn spawn_manual_pipe(state: &mut GameState) {
    push_pipe(state);
    if state.force_quick_pipes {
        state.pending_pipe_spawn = true;
        schedule_next_pipe_spawn(state);
    } else if !state.in_quick_burst && state.rng.random::<f32>() < PIPE_BURST_CHANCE {
        let burst = state.rng.random_range(2..=state.difficulty.max_burst());
        state.in_quick_burst = true;
        state.quick_burst_remaining = burst - 1;
        state.pending_pipe_spawn = true;
        schedule_next_pipe_spawn(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::difficulty::Difficulty;
    use crate::sim::obstacle::Triangle;

    const CORNER: Vec2 = Vec2::new(5.0, 5.0);

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        start_new_game(&mut state);
        state.drain_events();
        state
    }

    fn place(state: &mut GameState, kind: CircleKind, pos: Vec2) -> usize {
        let params = SpawnParams::new(pos, kind, state.difficulty, state.round, state.scale);
        add_circle(state, &params);
        let circle = state.circles.last_mut().unwrap();
        circle.vel = Vec2::ZERO;
        state.circles.len() - 1
    }

    fn click(pos: Vec2) -> TickInput {
        TickInput {
            mouse: pos,
            click: true,
        }
    }

    #[test]
    fn test_start_new_game_resets() {
        let mut state = GameState::new(1);
        state.score = 99;
        state.lives = 1;
        state.round = 12;
        state.cursor_hidden = true;
        start_new_game(&mut state);
        assert_eq!(state.screen, Screen::Playing);
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 4);
        assert_eq!(state.round, 1);
        assert_eq!(state.circles_to_spawn, 1);
        assert!(!state.cursor_hidden);
        assert!(state.circles.is_empty());
    }

    #[test]
    fn test_first_circle_spawns_after_delay() {
        let mut state = playing(2);
        let input = TickInput {
            mouse: CORNER,
            click: false,
        };
        for _ in 0..SPAWN_DELAY_TICKS - 1 {
            tick(&mut state, &input);
        }
        assert!(state.circles.is_empty());
        tick(&mut state, &input);
        assert_eq!(state.circles.len(), 1);
        assert_eq!(state.circles_to_spawn, 0);
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::Sound(SoundEffect::Spawn))
        );
    }

    #[test]
    fn test_spawn_keeps_away_from_cursor() {
        let mut state = playing(3);
        let mouse = Vec2::new(600.0, 400.0);
        for _ in 0..20 {
            spawn_circle(&mut state, mouse);
        }
        let close = state
            .circles
            .iter()
            .filter(|c| c.pos.distance(mouse) <= 150.0)
            .count();
        assert!(close <= 1, "{close} circles spawned on the cursor");
    }

    #[test]
    fn test_round_advances_when_cleared() {
        let mut state = playing(4);
        state.circles_to_spawn = 0;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.round, 2);
        assert_eq!(state.circles_to_spawn, 2);
        assert!(state.events.contains(&GameEvent::RoundStarted(2)));
    }

    #[test]
    fn test_dying_circles_do_not_hold_the_round() {
        let mut state = playing(5);
        state.circles_to_spawn = 0;
        let i = place(&mut state, CircleKind::Normal, Vec2::new(600.0, 400.0));
        state.circles[i].dying = true;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.round, 2);
    }

    #[test]
    fn test_late_rounds_cap_spawn_count() {
        let mut state = playing(6);
        state.difficulty = Difficulty::Hard;
        state.round = 24;
        next_round(&mut state);
        assert_eq!(state.circles_to_spawn, 27);
        state.round = 10;
        next_round(&mut state);
        assert_eq!(state.circles_to_spawn, 11);
    }

    #[test]
    fn test_next_round_clears_obstacles() {
        let mut state = playing(7);
        spawn_spinner(&mut state, CORNER);
        push_pipe(&mut state);
        next_round(&mut state);
        assert!(state.spinners.is_empty());
        assert!(state.pipes.is_empty());
        assert!(!state.spinners_spawned_this_round);
        assert_eq!(state.pipes_this_round, 0);
    }

    #[test]
    fn test_spinners_spawn_once_per_round() {
        let mut state = playing(8);
        state.circles_to_spawn = 30;
        state.spinners_this_round = 2;
        let input = TickInput {
            mouse: CORNER,
            click: false,
        };
        tick(&mut state, &input);
        assert_eq!(state.spinners.len(), 2);
        state.spinners.clear();
        tick(&mut state, &input);
        assert!(state.spinners.is_empty());
    }

    #[test]
    fn test_spinners_respect_disable_option() {
        let mut state = playing(9);
        state.options.disable_spinners = true;
        state.spinners_this_round = 3;
        tick(&mut state, &TickInput::default());
        assert!(state.spinners.is_empty());
    }

    #[test]
    fn test_spinner_placement_spacing() {
        let mut state = playing(10);
        let cursor = Vec2::new(600.0, 400.0);
        for _ in 0..3 {
            spawn_spinner(&mut state, cursor);
        }
        for (i, a) in state.spinners.iter().enumerate() {
            for b in &state.spinners[i + 1..] {
                assert!(a.pos.distance(b.pos) >= SPINNER_SPACING);
            }
        }
    }

    #[test]
    fn test_click_kills_and_scores() {
        let mut state = playing(11);
        let pos = Vec2::new(600.0, 400.0);
        let i = place(&mut state, CircleKind::Normal, pos);
        handle_click(&mut state, pos);
        assert!(state.circles[i].dying);
        assert_eq!(state.score, 10);
        assert!(state.events.contains(&GameEvent::Sound(SoundEffect::Death)));
        assert!(state.events.contains(&GameEvent::Sound(SoundEffect::Coin)));
    }

    #[test]
    fn test_click_ignored_while_cursor_hidden() {
        let mut state = playing(12);
        let pos = Vec2::new(600.0, 400.0);
        let i = place(&mut state, CircleKind::Normal, pos);
        state.cursor_hidden = true;
        handle_click(&mut state, pos);
        assert!(!state.circles[i].dying);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_click_prefers_lower_priority() {
        let mut state = playing(13);
        let normal = place(&mut state, CircleKind::Normal, Vec2::new(500.0, 400.0));
        let small = place(&mut state, CircleKind::Small, Vec2::new(505.0, 400.0));
        // Normal: distance 2; Small: distance 3 - 2 bonus
        handle_click(&mut state, Vec2::new(502.0, 400.0));
        assert!(state.circles[small].dying);
        assert!(!state.circles[normal].dying);
    }

    #[test]
    fn test_click_radius_helper_extends_reach() {
        let mut state = playing(14);
        let i = place(&mut state, CircleKind::Normal, Vec2::new(500.0, 400.0));
        let near_miss = Vec2::new(550.0, 400.0);
        handle_click(&mut state, near_miss);
        assert!(!state.circles[i].dying);

        state.options.click_radius_helper = true;
        state.options.click_radius = 30.0;
        handle_click(&mut state, near_miss);
        assert!(state.circles[i].dying);
    }

    #[test]
    fn test_tank_takes_several_clicks() {
        let mut state = playing(15);
        state.round = 7;
        let pos = Vec2::new(600.0, 400.0);
        let i = place(&mut state, CircleKind::Tank, pos);
        let health = state.circles[i].health;
        assert!(health > 1);
        handle_click(&mut state, pos);
        assert!(!state.circles[i].dying);
        assert!(state.events.contains(&GameEvent::Sound(SoundEffect::TankHit)));
        for _ in 1..health {
            handle_click(&mut state, pos);
        }
        assert!(state.circles[i].dying);
        assert!(state.events.contains(&GameEvent::Sound(SoundEffect::TankDeath)));
    }

    #[test]
    fn test_snake_segments_die_tail_first() {
        let mut state = playing(16);
        state.round = 9;
        let head = Vec2::new(600.0, 400.0);
        let i = place(&mut state, CircleKind::Snake, head);
        if let KindState::Snake(snake) = &mut state.circles[i].state {
            snake.segments = vec![
                Vec2::new(640.0, 400.0),
                Vec2::new(680.0, 400.0),
                Vec2::new(720.0, 400.0),
            ];
            snake.segments_killed = 0;
        }

        // Head and front segments are shielded
        handle_click(&mut state, head);
        handle_click(&mut state, Vec2::new(640.0, 400.0));
        assert!(!state.circles[i].dying);

        handle_click(&mut state, Vec2::new(720.0, 400.0));
        handle_click(&mut state, Vec2::new(680.0, 400.0));
        handle_click(&mut state, Vec2::new(640.0, 400.0));
        let KindState::Snake(snake) = &state.circles[i].state else {
            unreachable!()
        };
        assert_eq!(snake.alive_segments(), 0);
        assert!(!state.circles[i].dying);

        handle_click(&mut state, head);
        assert!(state.circles[i].dying);
    }

    #[test]
    fn test_obstacle_hit_costs_life_then_ends_game() {
        let mut state = playing(17);
        state.circles_to_spawn = 5;
        state.lives = 2;
        let cursor = Vec2::new(600.0, 400.0);
        let mut spinner = Spinner::new(cursor, 1.0, state.difficulty, &mut state.rng);
        spinner.vel = Vec2::ZERO;
        state.spinners.push(spinner);
        state.spinners_spawned_this_round = true;
        let input = TickInput {
            mouse: cursor,
            click: false,
        };

        tick(&mut state, &input);
        assert_eq!(state.lives, 1);
        assert!(state.screen_flash > 0.0);
        assert!(state.events.contains(&GameEvent::Sound(SoundEffect::Hit)));

        // Cooldown protects for a while
        tick(&mut state, &input);
        assert_eq!(state.lives, 1);

        for _ in 0..OBSTACLE_HIT_COOLDOWN {
            tick(&mut state, &input);
        }
        assert_eq!(state.lives, 0);
        assert_eq!(state.screen, Screen::GameOver);
        assert!(state.name_input_active);
        assert!(state.events.contains(&GameEvent::GameOver));
    }

    #[test]
    fn test_sandbox_never_ends() {
        let mut state = GameState::new(18);
        start_sandbox(&mut state);
        assert_eq!(state.round, SANDBOX_ROUND);
        assert_eq!(state.lives, SANDBOX_LIVES);
        let cursor = Vec2::new(600.0, 400.0);
        let mut spinner = Spinner::new(cursor, 1.0, state.difficulty, &mut state.rng);
        spinner.vel = Vec2::ZERO;
        state.spinners.push(spinner);
        let input = TickInput {
            mouse: cursor,
            click: false,
        };
        for _ in 0..200 {
            tick(&mut state, &input);
        }
        assert_eq!(state.screen, Screen::Sandbox);
        assert_eq!(state.lives, 1);
        assert_eq!(state.round, SANDBOX_ROUND);
        assert!(state.circles.is_empty());
    }

    #[test]
    fn test_sandbox_pause_freezes_circles() {
        let mut state = GameState::new(19);
        start_sandbox(&mut state);
        sandbox_spawn_circle(&mut state, CircleKind::Fast, CORNER);
        state.circles[0].vel = Vec2::new(2.0, 0.0);
        state.sandbox_paused = true;
        let before = state.circles[0].pos;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.circles[0].pos, before);
    }

    #[test]
    fn test_sandbox_pipe_waits_for_warning() {
        let mut state = GameState::new(20);
        start_sandbox(&mut state);
        sandbox_spawn_pipe(&mut state);
        assert!(state.pipes.is_empty());
        assert!(state.pipe_flash > 0.0);
        for _ in 0..31 {
            tick(&mut state, &TickInput::default());
        }
        assert_eq!(state.pipes.len(), 1);

        state.options.pipe_warning_flash = false;
        sandbox_clear(&mut state);
        sandbox_spawn_pipe(&mut state);
        assert_eq!(state.pipes.len(), 1);

        state.options.disable_pipes = true;
        sandbox_clear(&mut state);
        sandbox_spawn_pipe(&mut state);
        assert!(state.pipes.is_empty());
    }

    #[test]
    fn test_pipe_schedule_delays() {
        let mut state = playing(21);
        state.difficulty = Difficulty::Easy;
        for _ in 0..100 {
            state.reset_pipe_schedule();
            state.pending_pipe_spawn = true;
            schedule_next_pipe_spawn(&mut state);
            let delay = state.next_pipe_spawn_ms - state.now_ms();
            if state.in_quick_burst {
                assert!(QUICK_PIPE_DELAY_MS.contains(&delay));
                assert!((1..=2).contains(&state.quick_burst_remaining));
            } else {
                assert!((5000..=15000).contains(&delay));
            }
            assert!(state.pipe_flash_armed);
            assert_eq!(state.pipe_flash_ms, state.next_pipe_spawn_ms - PIPE_WARNING_LEAD_MS);
        }
    }

    fn arm_pipe(state: &mut GameState) -> (u64, u64) {
        state.reset_pipe_schedule();
        state.pending_pipe_spawn = true;
        schedule_next_pipe_spawn(state);
        (state.pipe_flash_ms, state.next_pipe_spawn_ms)
    }

    #[test]
    fn test_pipe_warning_flash_fires_before_spawn() {
        let mut state = playing(27);
        let (flash_at, spawn_at) = arm_pipe(&mut state);
        assert_eq!(spawn_at - flash_at, PIPE_WARNING_LEAD_MS);

        let input = TickInput::default();
        while state.now_ms() < flash_at {
            tick(&mut state, &input);
            assert!(state.pipe_flash_armed);
            assert_eq!(state.pipe_flash, 0.0);
        }
        tick(&mut state, &input);
        assert!(!state.pipe_flash_armed);
        assert_eq!(state.pipe_flash, PIPE_FLASH_ALPHA - PIPE_FLASH_DECAY);
        assert!(state.pipes.is_empty());
        assert!(state.now_ms() < spawn_at);

        while state.now_ms() <= spawn_at {
            tick(&mut state, &input);
        }
        assert_eq!(state.pipes.len(), 1);
    }

    #[test]
    fn test_pipe_warning_flash_disabled() {
        let mut state = playing(28);
        state.options.pipe_warning_flash = false;
        let (_, spawn_at) = arm_pipe(&mut state);
        assert!(!state.pipe_flash_armed);

        let input = TickInput::default();
        while state.now_ms() <= spawn_at {
            tick(&mut state, &input);
            assert_eq!(state.pipe_flash, 0.0);
        }
        assert_eq!(state.pipes.len(), 1);
    }

    #[test]
    fn test_pipe_warning_flash_needs_room() {
        let mut state = playing(29);
        let (_, spawn_at) = arm_pipe(&mut state);
        state.pipes_this_round = state.difficulty.pipe_settings().max_pipes_per_round;

        let input = TickInput::default();
        while state.now_ms() <= spawn_at {
            tick(&mut state, &input);
            assert_eq!(state.pipe_flash, 0.0);
        }
        assert!(state.pipe_flash_armed);
        assert!(state.pipes.is_empty());
    }

    #[test]
    fn test_quick_pipes_and_bursts() {
        let mut state = playing(22);
        state.pending_pipe_spawn = true;
        state.force_quick_pipes = true;
        schedule_next_pipe_spawn(&mut state);
        assert!(QUICK_PIPE_DELAY_MS.contains(&(state.next_pipe_spawn_ms - state.now_ms())));

        state.force_quick_pipes = false;
        state.in_quick_burst = true;
        state.quick_burst_remaining = 1;
        schedule_next_pipe_spawn(&mut state);
        assert!(QUICK_PIPE_DELAY_MS.contains(&(state.next_pipe_spawn_ms - state.now_ms())));
        assert!(!state.in_quick_burst);

        state.pending_pipe_spawn = false;
        let before = state.next_pipe_spawn_ms;
        schedule_next_pipe_spawn(&mut state);
        assert_eq!(state.next_pipe_spawn_ms, before);
    }

    #[test]
    fn test_pipes_stop_at_round_max() {
        let mut state = playing(23);
        state.difficulty = Difficulty::Easy;
        state.circles_to_spawn = 1000;
        state.force_quick_pipes = true;
        state.pending_pipe_spawn = true;
        schedule_next_pipe_spawn(&mut state);
        let input = TickInput {
            mouse: Vec2::new(1190.0, 400.0),
            click: false,
        };
        for _ in 0..60 * 4 {
            tick(&mut state, &input);
        }
        assert_eq!(state.pipes_this_round, 2);
        assert!(!state.pending_pipe_spawn);
    }

    #[test]
    fn test_timed_mode_runs_out() {
        let mut state = GameState::new(24);
        state.mode = GameMode::Timed;
        state.time_limit = 30;
        start_new_game(&mut state);
        let input = TickInput {
            mouse: CORNER,
            click: false,
        };
        tick(&mut state, &input);
        assert!((state.time_remaining - 30.0).abs() < 0.1);

        state.time_ticks = 29 * TICKS_PER_SECOND as u64;
        tick(&mut state, &input);
        assert_eq!(state.screen, Screen::Playing);
        assert!((state.time_remaining - 1.0).abs() < 0.01);

        state.time_ticks = 30 * TICKS_PER_SECOND as u64;
        tick(&mut state, &input);
        assert_eq!(state.screen, Screen::GameOver);
        assert_eq!(state.time_remaining, 0.0);
        assert!(state.name_input_active);
    }

    #[test]
    fn test_triangle_hides_cursor() {
        let mut state = playing(25);
        state.circles_to_spawn = 5;
        let cursor = Vec2::new(600.0, 400.0);
        let now = state.now_ms();
        state
            .triangles
            .push(Triangle::new(cursor, Vec2::ZERO, 1.0, 1.0, now, 99));
        tick(
            &mut state,
            &TickInput {
                mouse: cursor,
                click: false,
            },
        );
        assert!(state.cursor_hidden);

        let i = place(&mut state, CircleKind::Normal, Vec2::new(300.0, 300.0));
        let target = state.circles[i].pos;
        tick(&mut state, &click(target));
        assert!(!state.circles[i].dying);

        for _ in 0..CURSOR_HIDE_MS / 16 + 5 {
            tick(&mut state, &TickInput::default());
        }
        assert!(!state.cursor_hidden);
    }

    #[test]
    fn test_flashes_decay() {
        let mut state = GameState::new(26);
        state.screen_flash = 255.0;
        state.pipe_flash = 100.0;
        state.explosion_flash = 30.0;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.screen_flash, 240.0);
        assert_eq!(state.pipe_flash, 90.0);
        assert_eq!(state.explosion_flash, 10.0);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.explosion_flash, 0.0);
    }

    #[test]
    fn test_grabber_cap() {
        let mut state = playing(27);
        state.round = 10;
        place(&mut state, CircleKind::Grabber, Vec2::new(100.0, 100.0));
        place(&mut state, CircleKind::Grabber, Vec2::new(1100.0, 100.0));
        for _ in 0..200 {
            spawn_circle(&mut state, CORNER);
        }
        let grabbers = state
            .circles
            .iter()
            .filter(|c| c.kind == CircleKind::Grabber)
            .count();
        assert_eq!(grabbers, 2);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);
        state1.difficulty = Difficulty::Nightmare;
        state2.difficulty = Difficulty::Nightmare;
        start_new_game(&mut state1);
        start_new_game(&mut state2);
        state1.round = 14;
        state2.round = 14;
        state1.circles_to_spawn = 14;
        state2.circles_to_spawn = 14;

        for frame in 0..1200u32 {
            let angle = frame as f32 * 0.01;
            let input = TickInput {
                mouse: Vec2::new(600.0 + angle.cos() * 300.0, 400.0 + angle.sin() * 200.0),
                click: frame % 7 == 0,
            };
            tick(&mut state1, &input);
            tick(&mut state2, &input);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.round, state2.round);
        assert_eq!(state1.circles, state2.circles);
        assert_eq!(state1.events, state2.events);
    }
}
