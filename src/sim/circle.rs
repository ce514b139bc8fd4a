//! Circle entities
//!
//! A circle is a clickable target. Every kind shares position, velocity,
//! health and points; kind-specific state lives in [`KindState`] so a
//! snake never carries shooter fields and vice versa.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::collision::{distance_to_segment, hexagon_vertices, point_in_polygon};
use super::difficulty::Difficulty;
use super::palette::{self, Rgb};
use crate::audio::SoundEffect;
use crate::secs_to_ticks;

/// Frames the death animation lasts
pub const DEATH_DURATION: u32 = 30;
/// Reference radius before scale and size variation
pub const BASE_RADIUS: f32 = 30.0;
/// Radius a shrinking circle resets to
pub const SHRINK_RESET_RADIUS: f32 = 30.0;
/// Smallest radius a split child may have (times scale)
pub const MIN_SPLIT_RADIUS: f32 = 8.0;

/// Circle kinds, each with its own look and behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircleKind {
    /// Plain red target
    Normal,
    /// Quicker blue target
    Fast,
    /// Jumps away when the cursor lingers nearby, may split on death
    Teleport,
    /// Shrinks steadily, then pops back to full size
    Shrinking,
    /// Tiny yellow target worth extra points
    Small,
    /// Fades and shrinks as the cursor approaches
    Ghost,
    /// Takes several hits; may glow
    Tank,
    /// Heavy tank that regenerates and self-destructs
    Supertank,
    /// Hexagon that turns hollow and follows the cursor
    Hexagon,
    /// Disguised circle that captures the cursor
    Grabber,
    /// Segmented snake killed tail-first
    Snake,
    /// Spins up and fires triangle volleys
    Shooter,
}

impl CircleKind {
    /// Kinds in the order they unlock
    pub const UNLOCK_ORDER: [CircleKind; 12] = [
        CircleKind::Normal,
        CircleKind::Fast,
        CircleKind::Small,
        CircleKind::Shrinking,
        CircleKind::Teleport,
        CircleKind::Ghost,
        CircleKind::Tank,
        CircleKind::Hexagon,
        CircleKind::Snake,
        CircleKind::Grabber,
        CircleKind::Shooter,
        CircleKind::Supertank,
    ];

    /// First round this kind can spawn in
    pub fn unlock_round(self) -> u32 {
        match self {
            CircleKind::Normal => 1,
            CircleKind::Fast => 2,
            CircleKind::Small => 3,
            CircleKind::Shrinking => 4,
            CircleKind::Teleport => 5,
            CircleKind::Ghost => 6,
            CircleKind::Tank => 7,
            CircleKind::Hexagon => 8,
            CircleKind::Snake => 9,
            CircleKind::Grabber => 10,
            CircleKind::Shooter => 12,
            CircleKind::Supertank => 14,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CircleKind::Normal => "Normal",
            CircleKind::Fast => "Fast",
            CircleKind::Teleport => "Teleport",
            CircleKind::Shrinking => "Shrinking",
            CircleKind::Small => "Small",
            CircleKind::Ghost => "Ghost",
            CircleKind::Tank => "Tank",
            CircleKind::Supertank => "Supertank",
            CircleKind::Hexagon => "Hexagon",
            CircleKind::Grabber => "Grabber",
            CircleKind::Snake => "Snake",
            CircleKind::Shooter => "Shooter",
        }
    }

    #[inline]
    pub fn is_tank(self) -> bool {
        matches!(self, CircleKind::Tank | CircleKind::Supertank)
    }

    /// Kinds available in a round
    pub fn unlocked(round: u32) -> impl Iterator<Item = CircleKind> {
        Self::UNLOCK_ORDER
            .into_iter()
            .filter(move |k| k.unlock_round() <= round)
    }

    /// Relative spawn weight once weighted selection kicks in (round 5+)
    fn spawn_weight(self, round: u32) -> f32 {
        let r = round as f32;
        match self {
            CircleKind::Normal => (10.0 - r).max(1.0),
            CircleKind::Tank => (r - 5.0).min(4.0),
            CircleKind::Ghost | CircleKind::Teleport => (r - 3.0).min(5.0),
            CircleKind::Hexagon => (r - 6.0).min(4.0),
            CircleKind::Snake => (r - 8.0).min(3.0),
            CircleKind::Supertank => ((r - 14.0) * 0.2).max(1.0).min(3.0),
            CircleKind::Grabber => ((r - 10.0) * 0.2).max(2.0).min(4.0),
            CircleKind::Shooter => ((r - 12.0) * 0.15).max(1.0).min(2.5),
            _ => 3.0,
        }
    }

    /// Pick a kind for a new circle: uniform before round 5, weighted afterwards
    pub fn for_round(round: u32, rng: &mut impl Rng) -> CircleKind {
        let available: Vec<CircleKind> = Self::unlocked(round.max(1)).collect();
        if round < 5 {
            return available
                .choose(rng)
                .copied()
                .unwrap_or(CircleKind::Normal);
        }
        let weights: Vec<f32> = available
            .iter()
            .map(|k| k.spawn_weight(round).max(0.0))
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => available[rng.sample(dist)],
            Err(_) => CircleKind::Normal,
        }
    }

    /// Click priority adjustment; lower wins when targets overlap
    pub fn click_priority_bonus(self) -> f32 {
        match self {
            CircleKind::Hexagon => -5.0,
            CircleKind::Tank | CircleKind::Supertank => -3.0,
            CircleKind::Small => -2.0,
            _ => 0.0,
        }
    }
}

/// Movement patterns layered on top of the base drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementPattern {
    Wandering,
    Zigzag,
    Orbital,
    Predictive,
    Bouncy,
    Serpentine,
    Evasive,
}

impl MovementPattern {
    /// Choose a pattern; later rounds unlock more of them
    pub fn for_round(round: u32, rng: &mut impl Rng) -> Self {
        use MovementPattern::*;
        let mut pool: Vec<MovementPattern> = if round < 3 {
            vec![Wandering, Wandering, Wandering, Zigzag]
        } else if round < 6 {
            vec![Wandering, Wandering, Zigzag, Orbital, Bouncy]
        } else if round < 10 {
            vec![Wandering, Zigzag, Orbital, Bouncy, Serpentine]
        } else {
            vec![
                Wandering, Zigzag, Orbital, Predictive, Bouncy, Serpentine, Evasive,
            ]
        };
        if round >= 12 {
            pool.extend([Evasive, Predictive, Evasive, Predictive]);
        }
        pool.choose(rng).copied().unwrap_or(Wandering)
    }
}

/// Per-pattern parameters and timers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternState {
    Wandering,
    Zigzag {
        timer: u32,
        interval: u32,
        angle: f32,
        speed_mult: f32,
    },
    Orbital {
        center: Vec2,
        radius: f32,
        angle: f32,
        speed: f32,
        eccentricity: f32,
    },
    Predictive {
        strength: f32,
        last_mouse: Option<Vec2>,
    },
    Bouncy {
        strength: f32,
        damping: f32,
        threshold: f32,
        timer: u32,
    },
    Serpentine {
        amplitude: f32,
        frequency: f32,
        phase: f32,
        base_dir: Vec2,
    },
    Evasive {
        sensitivity: f32,
        reaction_frames: u32,
        panic_distance: f32,
        alarm: u32,
    },
}

/// Movement state shared by every pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub pattern: MovementPattern,
    pub state: PatternState,
    pub wander_angle: f32,
    pub wander_timer: u32,
    pub wander_duration: u32,
    /// Frames left in a corner escape
    pub escape_timer: u32,
    pub escape_intense: bool,
}

impl Motion {
    pub fn new(pattern: MovementPattern, pos: Vec2, scale: f32, rng: &mut impl Rng) -> Self {
        let wander_angle = rng.random_range(0.0..TAU);
        let wander_duration = rng.random_range(60..=180);
        let state = match pattern {
            MovementPattern::Wandering => PatternState::Wandering,
            MovementPattern::Zigzag => {
                let interval = rng.random_range(30..=90);
                let dx: f32 = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                let dy: f32 = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                PatternState::Zigzag {
                    timer: 0,
                    interval,
                    angle: dy.atan2(dx),
                    speed_mult: rng.random_range(0.8..1.4),
                }
            }
            MovementPattern::Orbital => {
                let radius = rng.random_range(40.0..120.0) * scale;
                let angle = rng.random_range(0.0..TAU);
                let speed = rng.random_range(0.02..0.08) * random_sign(rng);
                PatternState::Orbital {
                    center: pos,
                    radius,
                    angle,
                    speed,
                    eccentricity: rng.random_range(0.7..1.3),
                }
            }
            MovementPattern::Predictive => PatternState::Predictive {
                strength: rng.random_range(0.3..0.8),
                last_mouse: None,
            },
            MovementPattern::Bouncy => PatternState::Bouncy {
                strength: rng.random_range(0.7..1.3),
                damping: rng.random_range(0.85..0.95),
                threshold: rng.random_range(0.5..1.0),
                timer: 0,
            },
            MovementPattern::Serpentine => {
                let raw = Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
                PatternState::Serpentine {
                    amplitude: rng.random_range(20.0..60.0) * scale,
                    frequency: rng.random_range(0.02..0.06),
                    phase: 0.0,
                    base_dir: raw.normalize_or(Vec2::X),
                }
            }
            MovementPattern::Evasive => PatternState::Evasive {
                sensitivity: rng.random_range(1.2..2.0),
                reaction_frames: rng.random_range(5..=15),
                panic_distance: 60.0 * scale,
                alarm: 0,
            },
        };
        Self {
            pattern,
            state,
            wander_angle,
            wander_timer: 0,
            wander_duration,
            escape_timer: 0,
            escape_intense: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeleportState {
    /// Frames until the next jump while the cursor is in range
    pub cooldown: i32,
    pub range: f32,
    pub interval_frames: u32,
    pub split_generation: u32,
    pub max_split_generations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhostState {
    /// Base radius before proximity shrinking
    pub full_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankState {
    pub glowing: bool,
    pub hyper: bool,
    pub glow_timer: u32,
    pub glow_alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDestruct {
    pub timer: u32,
    pub last_beep: u32,
    pub beep_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupertankState {
    pub glow_timer: u32,
    pub glow_alpha: f32,
    /// Game time of the last click, cleared once regeneration starts
    pub last_clicked_ms: Option<u64>,
    pub regen_active: bool,
    pub regen_tick_ms: u64,
    pub self_destruct: Option<SelfDestruct>,
    pub self_destruct_frames: u32,
}

/// Hexagon size behavior rolled at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HexBehavior {
    Normal,
    RandomPulse,
    RandomSize,
    RandomHollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpansionPhase {
    Expanding,
    Hollowing,
    Cooldown,
}

/// Expand-then-hollow cycle of some hexagons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub phase: ExpansionPhase,
    pub progress: f32,
    pub fast: bool,
    pub speed: f32,
    /// Scale reached at full expansion
    pub max_scale: f32,
    pub hollow_speed: f32,
    pub hollow_timer: f32,
    pub thin_outline: bool,
    pub base_scale: f32,
    pub reset_cooldown: i32,
    pub reset_cooldown_duration: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexagonState {
    pub filled: bool,
    pub target_alpha: f32,
    pub hollow_transition_speed: f32,
    pub growing: bool,
    pub growth: f32,
    pub target_growth: f32,
    pub growth_transition_speed: f32,
    /// Size relative to the base radius
    pub size_mult: f32,
    pub behavior: HexBehavior,
    pub behavior_timer: u32,
    pub behavior_interval: u32,
    pub random_target_size: f32,
    pub random_target_alpha: f32,
    pub proximity_threshold: f32,
    pub min_distance: f32,
    pub expansion: Option<Expansion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrabberState {
    pub grabbing: bool,
    pub grab_start_ms: u64,
    pub grab_duration_s: f32,
    pub grab_distance: f32,
    pub grab_offset: Vec2,
    pub pre_grab_delay_s: f32,
    pub pre_grab_start_ms: Option<u64>,
    pub stalking: bool,
    pub will_attack: bool,
    pub wait_s: f32,
    pub wait_start_ms: Option<u64>,
    pub show_taunt: bool,
    pub taunt_alpha: f32,
    /// Where the grabbed cursor is dragged to
    pub cursor_target: Option<Vec2>,
}

/// Snake behavior modes layered on wandering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeState {
    pub length: usize,
    pub segments: Vec<Vec2>,
    pub segments_killed: usize,
    pub spacing: f32,
    pub dir: Vec2,
    pub rainbow: bool,
    pub rainbow_timer: u32,
    pub boost_timer: u32,
    pub boost_cooldown: u32,
    pub detection_range: f32,
    pub panic_range: f32,
    pub turn_timer: u32,
    pub turn_interval: u32,
    pub circle_mode: bool,
    pub circle_timer: u32,
    pub circle_duration: u32,
    pub circle_direction: f32,
    pub erratic_timer: u32,
    pub zigzag_mode: bool,
    pub zigzag_timer: u32,
    pub zigzag_direction: f32,
    pub position_history: VecDeque<Vec2>,
    pub movement_history: VecDeque<f32>,
    pub turn_history: VecDeque<f32>,
    pub last_dir: Vec2,
    pub stuck_timer: u32,
    pub escape_timer: u32,
    pub ignore_cursor: u32,
}

impl SnakeState {
    /// Segments still alive (tail segments are removed first)
    #[inline]
    pub fn alive_segments(&self) -> usize {
        self.segments.len().saturating_sub(self.segments_killed)
    }

    /// Index of the only segment that can currently be hit
    #[inline]
    pub fn expected_segment(&self) -> Option<usize> {
        self.alive_segments().checked_sub(1)
    }

    #[inline]
    pub fn is_boosting(&self) -> bool {
        self.boost_timer > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShooterState {
    pub detection_range: f32,
    pub last_shot_ms: Option<u64>,
    pub shot_cooldown_ms: u64,
    pub has_fired: bool,
    pub spin_angle: f32,
    pub spin_speed: f32,
    pub spinning: bool,
    pub spin_start_ms: u64,
    pub spin_up_ms: u64,
    pub invisible: bool,
    pub invisible_start_ms: u64,
    pub invisible_duration_ms: u64,
    pub needs_teleport: bool,
    pub shot_fired_ms: Option<u64>,
    pub visible_after_shot_ms: u64,
}

/// Shooter spin speed at full spin-up (rad/frame)
pub const SHOOTER_MAX_SPIN: f32 = 0.2;

/// Kind-specific state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KindState {
    Plain,
    Shrinking { rate: f32 },
    Teleport(TeleportState),
    Ghost(GhostState),
    Tank(TankState),
    Supertank(SupertankState),
    Hexagon(Box<HexagonState>),
    Grabber(GrabberState),
    Snake(Box<SnakeState>),
    Shooter(ShooterState),
}

/// Everything needed to build a circle
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    pub pos: Vec2,
    pub kind: CircleKind,
    pub base_speed_mult: f32,
    pub round_speed_mult: f32,
    pub scale: f32,
    pub difficulty: Difficulty,
    pub size_variation: f32,
    pub round: u32,
    pub sandbox: bool,
    pub split_generation: u32,
    /// Inherited by split children; rolled when `None`
    pub max_split_generations: Option<u32>,
}

impl SpawnParams {
    pub fn new(pos: Vec2, kind: CircleKind, difficulty: Difficulty, round: u32, scale: f32) -> Self {
        Self {
            pos,
            kind,
            base_speed_mult: difficulty.base_speed_multiplier(),
            round_speed_mult: 1.0,
            scale,
            difficulty,
            size_variation: 1.0,
            round,
            sandbox: false,
            split_generation: 0,
            max_split_generations: None,
        }
    }
}

/// Result of a click landing on a circle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    pub killed: bool,
    pub sound: SoundEffect,
    /// The circle split into two children on death
    pub split: bool,
}

/// Which part of a circle a point hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Miss,
    /// The killable body
    Body,
    /// A snake segment (the first one under the point)
    Segment(usize),
}

/// A clickable target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub id: u32,
    pub kind: CircleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Unscaled radius (includes size variation)
    pub base_radius: f32,
    /// Current on-screen radius
    pub radius: f32,
    /// Per-circle scale; expanding hexagons grow this
    pub scale: f32,
    pub base_speed: f32,
    /// Effective max speed in pixels per frame
    pub speed: f32,
    pub base_speed_mult: f32,
    pub round_speed_mult: f32,
    pub color: Rgb,
    pub points: u32,
    pub health: i32,
    pub max_health: i32,
    pub dying: bool,
    pub death_timer: u32,
    /// Opacity 0-255 (ghost fade, hexagon hollowness)
    pub alpha: f32,
    pub size_variation: f32,
    pub avoid_distance: f32,
    pub avoid_strength: f32,
    pub difficulty: Difficulty,
    pub round: u32,
    pub motion: Motion,
    pub state: KindState,
}

fn random_sign(rng: &mut impl Rng) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

/// Snake lengths and their relative odds
const SNAKE_LENGTH_WEIGHTS: [(usize, f32); 12] = [
    (3, 22.0),
    (4, 20.0),
    (5, 16.0),
    (6, 14.0),
    (7, 10.0),
    (8, 7.0),
    (9, 5.0),
    (10, 3.0),
    (11, 2.0),
    (12, 1.0),
    (13, 0.5),
    (14, 0.5),
];

/// Colors a grabber may wear as a disguise
const GRABBER_DISGUISES: [Rgb; 8] = [
    palette::RED,
    palette::BLUE,
    palette::PURPLE,
    palette::ORANGE,
    palette::YELLOW,
    palette::GRAY,
    palette::DARK_GRAY,
    palette::MAGENTA,
];

fn snake_points(length: usize, rainbow: bool) -> f32 {
    let l = length as f32;
    match (rainbow, length <= 9) {
        (false, true) => 60.0 + l * 15.0,
        (false, false) => 195.0 + (l - 9.0) * 25.0,
        (true, true) => 80.0 + l * 20.0,
        (true, false) => 260.0 + (l - 9.0) * 35.0,
    }
}

/// Extra health for circles spawned past round 20
fn late_round_health_bonus(round: u32) -> i32 {
    if round <= 20 {
        return 0;
    }
    let past = round - 20;
    2 + [10, 20, 30].iter().filter(|&&t| past >= t).count() as i32
}

impl Circle {
    pub fn new(id: u32, params: &SpawnParams, rng: &mut impl Rng) -> Self {
        let d = params.difficulty;
        let s = params.scale;
        let sv = params.size_variation;
        let health_mult = d.pick([0.8, 1.0, 1.2, 1.5]);
        let shrink_mult = d.pick([0.4, 0.6, 0.8, 1.0]);
        let points_mult = d.pick([1.2, 1.0, 0.9, 0.8]);
        let avoid_mult = d.pick([0.8, 1.0, 1.2, 1.4]);

        let vel = Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
        let pattern = MovementPattern::for_round(params.round, rng);
        let motion = Motion::new(pattern, params.pos, s, rng);

        let mut circle = Self {
            id,
            kind: params.kind,
            pos: params.pos,
            vel,
            base_radius: BASE_RADIUS,
            radius: BASE_RADIUS * s,
            scale: s,
            base_speed: 2.0,
            speed: 0.0,
            base_speed_mult: params.base_speed_mult,
            round_speed_mult: params.round_speed_mult,
            color: palette::RED,
            points: 10,
            health: 1,
            max_health: 1,
            dying: false,
            death_timer: 0,
            alpha: 255.0,
            size_variation: sv,
            avoid_distance: 100.0 * s * avoid_mult,
            avoid_strength: 3.0 * s * avoid_mult,
            difficulty: d,
            round: params.round,
            motion,
            state: KindState::Plain,
        };

        let mut points = 10.0;
        match params.kind {
            CircleKind::Normal => {
                circle.base_radius = BASE_RADIUS * sv;
            }
            CircleKind::Fast => {
                circle.base_speed = 2.5;
                circle.color = palette::BLUE;
                circle.base_radius = BASE_RADIUS * sv;
                points = 15.0;
            }
            CircleKind::Teleport => {
                circle.color = palette::PURPLE;
                circle.base_radius = BASE_RADIUS * sv;
                points = 25.0;
                let max_split_generations = params
                    .max_split_generations
                    .unwrap_or_else(|| if rng.random::<f32>() < 0.6 { 1 } else { 2 });
                let interval_s: f32 = d.pick([3.5, 2.5, 2.0, 1.5]);
                circle.state = KindState::Teleport(TeleportState {
                    cooldown: secs_to_ticks(rng.random_range(1.0..2.0)) as i32,
                    range: d.pick([120.0, 100.0, 80.0, 60.0]) * s,
                    interval_frames: secs_to_ticks(interval_s),
                    split_generation: params.split_generation,
                    max_split_generations,
                });
            }
            CircleKind::Shrinking => {
                circle.color = palette::ORANGE;
                circle.base_radius = BASE_RADIUS * sv;
                points = 20.0;
                circle.state = KindState::Shrinking {
                    rate: 0.15 * s * shrink_mult,
                };
            }
            CircleKind::Small => {
                circle.base_radius = 15.0;
                circle.color = palette::YELLOW;
                points = 30.0;
            }
            CircleKind::Ghost => {
                circle.color = palette::GRAY;
                circle.base_radius = BASE_RADIUS * sv;
                circle.alpha = 128.0;
                points = 35.0;
                circle.state = KindState::Ghost(GhostState {
                    full_radius: circle.base_radius,
                });
            }
            CircleKind::Tank => {
                let hyper = params.round >= 14 && rng.random::<f32>() < 0.2;
                let glowing = hyper || (params.round >= 12 && rng.random::<f32>() < 0.3);
                if glowing {
                    let hp = ((rng.random_range(5..=12) as f32) * health_mult) as i32;
                    circle.max_health = hp.max(1);
                } else {
                    circle.max_health = ((3.0 * health_mult) as i32).max(1);
                }
                if hyper {
                    circle.color = [150, 150, 255];
                    points = 150.0;
                    circle.base_radius = 20.0 * sv;
                    circle.base_speed = 2.5;
                } else if glowing {
                    circle.color = [100, 100, 255];
                    points = 100.0;
                    circle.base_radius = 25.0 * sv;
                    circle.base_speed = 1.0;
                } else {
                    circle.color = palette::DARK_GRAY;
                    points = 50.0;
                    circle.base_radius = 25.0 * sv;
                    circle.base_speed = 1.0;
                }
                circle.health = circle.max_health;
                circle.state = KindState::Tank(TankState {
                    glowing,
                    hyper,
                    glow_timer: 0,
                    glow_alpha: 128.0,
                });
            }
            CircleKind::Supertank => {
                let hp = ((rng.random_range(20..=30) as f32) * health_mult) as i32;
                circle.max_health = hp.max(1);
                circle.health = circle.max_health;
                circle.color = palette::ANGRY_RED;
                points = 300.0;
                circle.base_radius = 40.0 * sv;
                circle.base_speed = 0.5;
                let countdown_s: f32 = d.pick([6.0, 5.0, 4.0, 3.0]);
                circle.state = KindState::Supertank(SupertankState {
                    glow_timer: 0,
                    glow_alpha: 128.0,
                    last_clicked_ms: None,
                    regen_active: false,
                    regen_tick_ms: 0,
                    self_destruct: None,
                    self_destruct_frames: secs_to_ticks(countdown_s),
                });
            }
            CircleKind::Hexagon => {
                circle.color = palette::MAGENTA;
                points = 45.0;
                circle.base_radius = 35.0 * sv;
                let base_health = match params.round {
                    r if r >= 15 => 4,
                    r if r >= 10 => 3,
                    _ => 2,
                };
                let bonus: i32 = d.pick([0, 1, 2, 3]);
                circle.max_health = (((base_health + bonus) as f32 * health_mult) as i32).max(2);
                circle.health = circle.max_health;
                circle.base_speed = d.pick([2.0, 2.5, 3.2, 4.0]);
                circle.state = KindState::Hexagon(Box::new(HexagonState::new(params, rng)));
            }
            CircleKind::Grabber => {
                circle.color = GRABBER_DISGUISES
                    .choose(rng)
                    .copied()
                    .unwrap_or(palette::RED);
                points = 75.0;
                circle.base_radius = 25.0 * sv;
                circle.base_speed = 1.8;
                let grab_duration_s = rng.random_range(5.0..10.0);
                let pre_grab_delay_s = if params.sandbox {
                    0.1
                } else {
                    d.pick([0.7, 0.5, 0.3, 0.1])
                };
                circle.state = KindState::Grabber(GrabberState {
                    grabbing: false,
                    grab_start_ms: 0,
                    grab_duration_s,
                    grab_distance: 15.0 * s,
                    grab_offset: Vec2::ZERO,
                    pre_grab_delay_s,
                    pre_grab_start_ms: None,
                    stalking: false,
                    will_attack: false,
                    wait_s: rng.random_range(3.0..8.0),
                    wait_start_ms: None,
                    show_taunt: false,
                    taunt_alpha: 255.0,
                    cursor_target: None,
                });
            }
            CircleKind::Snake => {
                let weights = SNAKE_LENGTH_WEIGHTS.map(|(_, w)| w);
                let length = WeightedIndex::new(weights)
                    .map(|dist| SNAKE_LENGTH_WEIGHTS[rng.sample(dist)].0)
                    .unwrap_or(3);
                circle.color = palette::SNAKE_GREEN;
                circle.base_radius = 20.0 * sv;
                circle.base_speed = 2.2;
                let spacing = 35.0 * s;
                let raw = Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
                let dir = raw.normalize_or(Vec2::X);
                let turn_interval = rng.random_range(30..=90);
                let rainbow = rng.random::<f32>() < 0.05;
                if rainbow {
                    circle.color = palette::MAGENTA;
                    circle.base_speed *= 1.1;
                }
                points = snake_points(length, rainbow);
                let segments = (0..length)
                    .map(|i| params.pos - dir * spacing * (i + 1) as f32)
                    .collect();
                circle.state = KindState::Snake(Box::new(SnakeState {
                    length,
                    segments,
                    segments_killed: 0,
                    spacing,
                    dir,
                    rainbow,
                    rainbow_timer: 0,
                    boost_timer: 0,
                    boost_cooldown: 0,
                    detection_range: 180.0 * s,
                    panic_range: 80.0 * s,
                    turn_timer: 0,
                    turn_interval,
                    circle_mode: false,
                    circle_timer: 0,
                    circle_duration: 0,
                    circle_direction: 1.0,
                    erratic_timer: 0,
                    zigzag_mode: false,
                    zigzag_timer: 0,
                    zigzag_direction: 1.0,
                    position_history: VecDeque::new(),
                    movement_history: VecDeque::new(),
                    turn_history: VecDeque::new(),
                    last_dir: dir,
                    stuck_timer: 0,
                    escape_timer: 0,
                    ignore_cursor: 0,
                }));
            }
            CircleKind::Shooter => {
                circle.color = palette::DARK_BLUE;
                points = 120.0;
                circle.base_radius = 35.0 * sv;
                circle.max_health = (10.0 * health_mult) as i32;
                circle.health = circle.max_health;
                circle.base_speed = 0.5;
                let spin_mult: f32 = d.pick([1.0, 0.7, 0.5, 0.3]);
                circle.state = KindState::Shooter(ShooterState {
                    detection_range: 150.0 * s,
                    last_shot_ms: None,
                    shot_cooldown_ms: 2000,
                    has_fired: false,
                    spin_angle: 0.0,
                    spin_speed: 0.0,
                    spinning: false,
                    spin_start_ms: 0,
                    spin_up_ms: (300.0 * spin_mult) as u64,
                    invisible: false,
                    invisible_start_ms: 0,
                    invisible_duration_ms: 0,
                    needs_teleport: false,
                    shot_fired_ms: None,
                    visible_after_shot_ms: d.pick([3000, 2500, 2000, 1500]),
                });
            }
        }
        circle.points = (points * points_mult) as u32;

        let bonus = late_round_health_bonus(params.round);
        if bonus > 0 && params.split_generation == 0 && params.kind != CircleKind::Grabber {
            circle.max_health += bonus;
            circle.health = circle.max_health;
            circle.points = (circle.points as f32 * (1.0 + bonus as f32 * 0.3)) as u32;
        }

        circle.speed = circle.base_speed * circle.base_speed_mult * circle.round_speed_mult * s;
        circle.radius = circle.base_radius * s;
        circle
    }

    /// Build the two smaller teleport circles a split produces
    pub fn split_children(&self, rng: &mut impl Rng) -> [SpawnParams; 2] {
        let (generation, max_generations) = match &self.state {
            KindState::Teleport(t) => (t.split_generation, t.max_split_generations),
            _ => (0, 1),
        };
        let offset = self.radius * 0.5;
        let angles: [f32; 2] = [rng.random_range(0.0..TAU), rng.random_range(0.0..TAU)];
        let child = |angle: f32| {
            SpawnParams {
                pos: self.pos + crate::from_angle(angle) * offset,
                kind: CircleKind::Teleport,
                base_speed_mult: self.base_speed_mult,
                round_speed_mult: self.round_speed_mult,
                scale: self.scale,
                difficulty: self.difficulty,
                size_variation: (self.size_variation * 0.6).max(0.4),
                round: self.round,
                sandbox: false,
                split_generation: generation + 1,
                max_split_generations: Some(max_generations),
            }
        };
        angles.map(child)
    }

    /// Chance a dying teleport circle splits in two
    fn split_chance(&self, sandbox: bool) -> f32 {
        let KindState::Teleport(t) = &self.state else {
            return 0.0;
        };
        if t.split_generation >= t.max_split_generations {
            return 0.0;
        }
        let child_radius = self.base_radius * (self.size_variation * 0.6).max(0.4) * self.scale;
        if child_radius < MIN_SPLIT_RADIUS * self.scale {
            return 0.0;
        }
        if sandbox {
            return 1.0;
        }
        let base = if t.max_split_generations == 2 { 0.25 } else { 0.20 };
        let r = self.round as f32;
        let bonus = match self.difficulty {
            Difficulty::Easy => (self.round / 2) as f32 * 0.005,
            Difficulty::Medium => (r - 1.0) * 0.005,
            Difficulty::Hard => (r - 1.0) * 0.01,
            Difficulty::Nightmare => (r - 1.0) * 0.02,
        };
        (base + bonus).min(1.0)
    }

    /// Apply one point of damage
    pub fn take_damage(&mut self, sandbox: bool, rng: &mut impl Rng) -> DamageOutcome {
        self.health -= 1;

        let below_half = self.health <= self.max_health / 2;
        if let KindState::Supertank(st) = &mut self.state {
            if below_half && st.self_destruct.is_none() {
                st.self_destruct = Some(SelfDestruct {
                    timer: 0,
                    last_beep: 0,
                    beep_interval: 60,
                });
            }
        }

        if self.health > 0 {
            let sound = match self.kind {
                CircleKind::Supertank => SoundEffect::SupertankHit,
                CircleKind::Tank => SoundEffect::TankHit,
                _ => SoundEffect::Collision,
            };
            return DamageOutcome {
                killed: false,
                sound,
                split: false,
            };
        }

        self.dying = true;
        let mut split = false;
        if self.kind == CircleKind::Teleport {
            let chance = self.split_chance(sandbox);
            split = rng.random::<f32>() < chance;
        }
        let sound = match self.kind {
            CircleKind::Supertank => SoundEffect::SupertankDeath,
            CircleKind::Tank => SoundEffect::TankDeath,
            _ => SoundEffect::Death,
        };
        DamageOutcome {
            killed: true,
            sound,
            split,
        }
    }

    /// Side length used for hexagon drawing and hit testing
    #[inline]
    pub fn hexagon_draw_radius(&self) -> f32 {
        self.radius.floor().max(8.0)
    }

    /// Hollow hexagon outline width in pixels
    pub fn hexagon_outline_width(&self) -> f32 {
        let thin = match &self.state {
            KindState::Hexagon(h) => h.expansion.as_ref().is_some_and(|e| e.thin_outline),
            _ => false,
        };
        if thin {
            (2.0 * self.scale).floor().max(1.0)
        } else {
            (5.0 * self.scale).floor().max(3.0)
        }
    }

    /// Snake segment radius
    #[inline]
    pub fn segment_radius(&self) -> f32 {
        (self.radius * 0.8).floor().max(8.0)
    }

    /// Is the shooter currently hidden
    pub fn is_invisible(&self) -> bool {
        matches!(&self.state, KindState::Shooter(s) if s.invisible)
    }

    pub fn is_grabbing(&self) -> bool {
        matches!(&self.state, KindState::Grabber(g) if g.grabbing)
    }

    /// Hit test a point against this circle without side effects
    pub fn hit_test(&self, p: Vec2) -> Hit {
        let dist_sq = self.pos.distance_squared(p);
        let body = |r: f32| if dist_sq <= r * r { Hit::Body } else { Hit::Miss };
        match &self.state {
            KindState::Grabber(g) if g.grabbing => Hit::Miss,
            KindState::Hexagon(h) => {
                let verts = hexagon_vertices(self.pos, self.hexagon_draw_radius());
                if h.filled {
                    if point_in_polygon(p, &verts) {
                        Hit::Body
                    } else {
                        Hit::Miss
                    }
                } else {
                    let buffer: f32 = self.difficulty.pick([2.0, 1.5, 1.0, 0.8]);
                    let thickness = (self.hexagon_outline_width() * buffer).max(1.0);
                    let on_edge = (0..6).any(|i| {
                        distance_to_segment(p, verts[i], verts[(i + 1) % 6]) <= thickness
                    });
                    if on_edge { Hit::Body } else { Hit::Miss }
                }
            }
            KindState::Ghost(_) => {
                if self.alpha < 25.0 {
                    Hit::Miss
                } else {
                    body(self.radius * 0.9)
                }
            }
            KindState::Shrinking { .. } => body(self.radius.max(5.0)),
            KindState::Snake(snake) => {
                let seg_r = self.segment_radius();
                let alive = snake.alive_segments();
                if let Some(i) = snake.segments[..alive]
                    .iter()
                    .position(|seg| seg.distance_squared(p) <= seg_r * seg_r)
                {
                    return Hit::Segment(i);
                }
                if alive == 0 { body(self.radius) } else { Hit::Miss }
            }
            _ => body(self.radius),
        }
    }

    /// Remove the tail segment of a snake
    pub fn kill_tail_segment(&mut self) -> bool {
        match &mut self.state {
            KindState::Snake(snake) if snake.alive_segments() > 0 => {
                snake.segments_killed += 1;
                true
            }
            _ => false,
        }
    }

    /// Turn a finished grabber into an ordinary red circle
    pub fn become_normal(&mut self, rng: &mut impl Rng) {
        self.kind = CircleKind::Normal;
        self.color = palette::RED;
        self.points = 10;
        self.vel = Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
        self.state = KindState::Plain;
    }

    /// Glow intensity for glowing tanks and supertanks
    pub fn glow_alpha(&self) -> Option<f32> {
        match &self.state {
            KindState::Tank(t) if t.glowing => Some(t.glow_alpha),
            KindState::Supertank(s) => Some(s.glow_alpha),
            _ => None,
        }
    }
}

impl HexagonState {
    fn new(params: &SpawnParams, rng: &mut impl Rng) -> Self {
        let d = params.difficulty;
        let s = params.scale;
        let sandbox_round = params.round >= 15;

        let mut hollow_transition_speed = 0.15 * d.pick([0.7, 1.0, 1.4, 1.8]);
        let growing = rng.random::<f32>() < if sandbox_round { 0.9 } else { 0.7 };
        let mut growth_transition_speed = 0.18 * d.pick([0.8, 1.0, 1.3, 1.6]);

        let expanding = rng.random::<f32>() < if sandbox_round { 0.4 } else { 0.2 };
        let expansion = expanding.then(|| {
            let fast = rng.random::<f32>() < 0.6;
            let (speed, max_scale, hollow_speed) = if fast {
                (
                    0.008 + rng.random::<f32>() * 0.012,
                    s * (1.8 + rng.random::<f32>() * 0.7),
                    0.08 + rng.random::<f32>() * 0.07,
                )
            } else {
                (
                    0.003 + rng.random::<f32>() * 0.005,
                    s * (1.4 + rng.random::<f32>() * 0.5),
                    0.02 + rng.random::<f32>() * 0.03,
                )
            };
            let thin_outline = rng.random::<f32>() < 0.5;
            Expansion {
                phase: ExpansionPhase::Expanding,
                progress: 0.0,
                fast,
                speed,
                max_scale,
                hollow_speed,
                hollow_timer: 0.0,
                thin_outline,
                base_scale: s,
                reset_cooldown: 0,
                reset_cooldown_duration: rng.random_range(120..=360),
            }
        });

        let behaviors: &[HexBehavior] = if sandbox_round {
            &[
                HexBehavior::Normal,
                HexBehavior::Normal,
                HexBehavior::RandomPulse,
                HexBehavior::RandomSize,
                HexBehavior::RandomHollow,
            ]
        } else {
            &[
                HexBehavior::Normal,
                HexBehavior::RandomPulse,
                HexBehavior::RandomSize,
                HexBehavior::RandomHollow,
            ]
        };
        let behavior = behaviors.choose(rng).copied().unwrap_or(HexBehavior::Normal);
        let behavior_interval = rng.random_range(60..=180);

        let round_range = (1.0 + (params.round as f32 - 8.0) * 0.01).clamp(1.0, 1.1);
        let range_mult = d.pick([0.8, 0.9, 1.0, 1.1]) * round_range;

        let round_mult = (1.0 + (params.round as f32 - 8.0) * 0.04).clamp(1.0, 1.4);
        hollow_transition_speed *= d.pick([0.3, 0.6, 1.0, 1.5]) * round_mult;
        if growing {
            growth_transition_speed *= d.pick([0.5, 0.8, 1.2, 1.8]) * round_mult;
        }

        Self {
            filled: true,
            target_alpha: 255.0,
            hollow_transition_speed,
            growing,
            growth: 1.0,
            target_growth: 1.0,
            growth_transition_speed,
            size_mult: 1.0,
            behavior,
            behavior_timer: 0,
            behavior_interval,
            random_target_size: 1.0,
            random_target_alpha: 255.0,
            proximity_threshold: 100.0 * s * range_mult,
            min_distance: 40.0 * s * range_mult,
            expansion,
        }
    }
}

/// Angle of a direction vector
#[inline]
pub(crate) fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Wrap an angle difference into [-PI, PI]
#[inline]
pub(crate) fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}
