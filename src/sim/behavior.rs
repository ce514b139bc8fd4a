//! Per-frame circle behavior
//!
//! Each live circle first runs its kind-specific logic (teleporting, ghost
//! fading, hexagon hollowing, shooter volleys, supertank countdowns) and then
//! moves. Hexagons, grabbers and snakes have their own movement; everything
//! else uses cursor avoidance, a movement pattern and shared wall physics.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;

use super::circle::{
    Circle, CircleKind, DEATH_DURATION, ExpansionPhase, HexBehavior, KindState, Motion,
    MovementPattern, PatternState, SHOOTER_MAX_SPIN, SHRINK_RESET_RADIUS, SnakeState, heading,
};
use super::collision::{cap_speed, clamp_axis, clamp_to_screen};
use super::obstacle::Triangle;
use super::palette;
use super::state::GameEvent;
use crate::audio::SoundEffect;
use crate::{from_angle, secs_to_ticks, steer};

/// Supertank regeneration starts this long after the last click
const REGEN_COOLDOWN_MS: u64 = 3000;
/// One point of health per interval while regenerating
const REGEN_RATE_MS: u64 = 500;
/// Grabber seek speed while attacking
const GRABBER_SEEK_MULT: f32 = 1.5;
/// Taunt text alpha lost per frame
const TAUNT_FADE_SPEED: f32 = 1.5;
/// Snake direction smoothing for turns and erratic jerks
const SNAKE_SMOOTHING: f32 = 0.7;
/// Snake speed multiplier while boosting
const SNAKE_BOOST: f32 = 1.8;

/// Everything a circle can see or touch while it updates
pub struct UpdateContext<'a> {
    /// Effective cursor (the grab target while the cursor is captured)
    pub mouse: Vec2,
    pub width: f32,
    pub height: f32,
    pub now_ms: u64,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    /// New shooter triangles are pushed here
    pub triangles: &'a mut Vec<Triangle>,
    /// Shooters that still have triangles in flight
    pub shooters_with_triangles: &'a [u32],
    /// Grabbers that are grabbing or committed to an attack
    pub active_grabbers: &'a [u32],
}

/// What the caller should do with a circle after its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Keep,
    /// Death animation finished
    Remove,
    /// Supertank countdown ran out; costs a life
    Exploded,
}

/// 1 at or inside `near`, 0 at or beyond `far`, linear between
fn proximity_factor(distance: f32, near: f32, far: f32) -> f32 {
    if distance <= near {
        1.0
    } else if distance >= far {
        0.0
    } else {
        1.0 - (distance - near) / (far - near)
    }
}

fn jitter(rng: &mut Pcg32, amount: f32) -> Vec2 {
    Vec2::new(
        rng.random_range(-amount..=amount),
        rng.random_range(-amount..=amount),
    )
}

/// Uniform point at least `margin` from every edge
pub(crate) fn random_point(rng: &mut Pcg32, margin: f32, width: f32, height: f32) -> Vec2 {
    let axis = |rng: &mut Pcg32, extent: f32| {
        if extent <= margin * 2.0 {
            extent * 0.5
        } else {
            rng.random_range(margin..=extent - margin)
        }
    };
    let x = axis(rng, width);
    let y = axis(rng, height);
    Vec2::new(x, y)
}

impl Motion {
    /// Advance the slow wander heading and return this frame's push
    fn wander_step(&mut self, speed: f32, rng: &mut Pcg32) -> Vec2 {
        self.wander_timer += 1;
        if self.wander_timer >= self.wander_duration {
            self.wander_angle += rng.random_range(-FRAC_PI_3..=FRAC_PI_3);
            self.wander_timer = 0;
            self.wander_duration = rng.random_range(60..=180);
        }
        from_angle(self.wander_angle) * speed * 0.1
    }
}

impl Circle {
    /// Advance this circle by one frame
    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) -> UpdateOutcome {
        if self.dying {
            self.death_timer += 1;
            let t = self.death_timer as f32 / DEATH_DURATION as f32;
            self.radius = self.base_radius * self.scale * (1.0 + t * 2.0);
            return if self.death_timer >= DEATH_DURATION {
                UpdateOutcome::Remove
            } else {
                UpdateOutcome::Keep
            };
        }

        match self.kind {
            CircleKind::Teleport => self.update_teleport(ctx),
            CircleKind::Shrinking => self.update_shrinking(),
            CircleKind::Ghost => self.update_ghost(ctx.mouse),
            CircleKind::Shooter => self.update_shooter(ctx),
            CircleKind::Hexagon => self.update_hexagon(ctx),
            _ => {}
        }

        self.update_glow();
        if self.update_supertank(ctx) {
            return UpdateOutcome::Exploded;
        }

        let size_mult = match &self.state {
            KindState::Hexagon(h) => h.size_mult,
            _ => 1.0,
        };
        self.radius = self.base_radius * self.scale * size_mult;

        match self.kind {
            CircleKind::Hexagon => self.move_hexagon(ctx),
            CircleKind::Grabber => self.move_grabber(ctx),
            CircleKind::Snake => self.move_snake(ctx),
            _ => self.move_standard(ctx),
        }
        UpdateOutcome::Keep
    }

    fn update_teleport(&mut self, ctx: &mut UpdateContext<'_>) {
        let KindState::Teleport(t) = &mut self.state else {
            return;
        };
        if self.pos.distance(ctx.mouse) <= t.range {
            t.cooldown -= 1;
            if t.cooldown <= 0 {
                let margin = 50.0 * self.scale;
                self.pos = random_point(ctx.rng, margin, ctx.width, ctx.height);
                let jitter: f32 = ctx.rng.random_range(0.75..=1.25);
                t.cooldown = (t.interval_frames as f32 * jitter) as i32;
            }
        } else {
            // Stay primed so the jump comes quickly once the cursor returns
            t.cooldown = t.cooldown.min(secs_to_ticks(0.5) as i32);
        }
    }

    fn update_shrinking(&mut self) {
        let KindState::Shrinking { rate } = self.state else {
            return;
        };
        self.base_radius -= rate;
        if self.base_radius <= 5.0 {
            self.base_radius = SHRINK_RESET_RADIUS;
        }
    }

    fn update_ghost(&mut self, mouse: Vec2) {
        let KindState::Ghost(g) = &self.state else {
            return;
        };
        let full = g.full_radius;
        let s = self.scale;
        let pf = proximity_factor(self.pos.distance(mouse), 40.0 * s, 120.0 * s);
        let target_alpha = (128.0 * (1.0 - pf * 0.75)).max(30.0);
        let target_mult = (1.0 - pf * 0.4).max(0.6);
        const RATE: f32 = 0.08;

        let alpha_diff = target_alpha - self.alpha;
        if alpha_diff.abs() > 1.0 {
            self.alpha += alpha_diff * RATE;
        } else {
            self.alpha = target_alpha;
        }
        self.alpha = self.alpha.clamp(30.0, 255.0);

        let current = if full > 0.0 {
            self.base_radius / full
        } else {
            1.0
        };
        let radius_diff = target_mult - current;
        self.base_radius = if radius_diff.abs() > 0.01 {
            full * (current + radius_diff * RATE)
        } else {
            full * target_mult
        };
    }

    fn update_shooter(&mut self, ctx: &mut UpdateContext<'_>) {
        let KindState::Shooter(sh) = &mut self.state else {
            return;
        };
        let now = ctx.now_ms;
        let has_triangles = ctx.shooters_with_triangles.contains(&self.id);

        if !sh.invisible {
            if let Some(fired) = sh.shot_fired_ms {
                if now.saturating_sub(fired) >= sh.visible_after_shot_ms {
                    sh.invisible = true;
                    sh.invisible_start_ms = now;
                    sh.invisible_duration_ms = ctx.rng.random_range(2000..=4000);
                    sh.shot_fired_ms = None;
                }
            }
        }
        if sh.invisible
            && now.saturating_sub(sh.invisible_start_ms) >= sh.invisible_duration_ms
            && !has_triangles
        {
            sh.invisible = false;
            sh.needs_teleport = true;
        }
        if sh.needs_teleport {
            let margin = self.radius + 20.0;
            self.pos = random_point(ctx.rng, margin, ctx.width, ctx.height);
            sh.needs_teleport = false;
        }

        if self.pos.distance(ctx.mouse) > sh.detection_range {
            if sh.spinning {
                sh.spinning = false;
                sh.spin_speed = 0.0;
            }
            return;
        }

        if !sh.spinning {
            sh.spinning = true;
            sh.spin_start_ms = now;
        }
        let progress = if sh.spin_up_ms == 0 {
            1.0
        } else {
            (now.saturating_sub(sh.spin_start_ms) as f32 / sh.spin_up_ms as f32).min(1.0)
        };
        sh.spin_speed = SHOOTER_MAX_SPIN * progress;
        sh.spin_angle = (sh.spin_angle + sh.spin_speed) % TAU;

        let cooled = sh
            .last_shot_ms
            .is_none_or(|t| now.saturating_sub(t) >= sh.shot_cooldown_ms);
        if sh.invisible || !cooled || has_triangles || progress < 1.0 {
            return;
        }

        let count = ctx.rng.random_range(5..=9);
        let step = TAU / count as f32;
        let speed_mult: f32 = self.difficulty.pick([1.0, 1.2, 1.4, 1.6]);
        for i in 0..count {
            let angle = i as f32 * step + ctx.rng.random_range(-0.2..=0.2);
            let speed = ctx.rng.random_range(1.5..=2.5) * self.scale * speed_mult;
            let size_variation = ctx.rng.random_range(1.0..=1.2);
            ctx.triangles.push(Triangle::new(
                self.pos,
                from_angle(angle) * speed,
                self.scale,
                size_variation,
                now,
                self.id,
            ));
        }
        log::debug!("shooter {} fired {count} triangles", self.id);

        sh.last_shot_ms = Some(now);
        sh.has_fired = true;
        sh.spinning = false;
        sh.spin_speed = 0.0;
        sh.shot_fired_ms = Some(now);
    }

    fn update_hexagon(&mut self, ctx: &mut UpdateContext<'_>) {
        let KindState::Hexagon(hex) = &mut self.state else {
            return;
        };
        let d = self.difficulty;
        let round = self.round as f32;
        let distance = self.pos.distance(ctx.mouse);
        let pf = proximity_factor(distance, hex.min_distance, hex.proximity_threshold);

        // Hollowing curve: harder settings stay solid longer, then drop off faster
        let round_bonus = ((round - 8.0) * 0.02).clamp(0.0, 0.3);
        let exponent = d.pick([0.7, 1.0, 1.3, 1.6]) + round_bonus;
        hex.target_alpha = 255.0 - pf.powf(exponent) * 240.0;
        let alpha_diff = hex.target_alpha - self.alpha;
        if alpha_diff.abs() > 1.0 {
            self.alpha += alpha_diff * hex.hollow_transition_speed;
        } else {
            self.alpha = hex.target_alpha;
        }
        self.alpha = self.alpha.clamp(15.0, 255.0);

        if hex.growing {
            let max_growth: f32 = d.pick([1.5, 2.0, 2.5, 3.0]);
            hex.target_growth = if pf > 0.05 {
                1.0 + (pf * 2.0).min(1.0) * (max_growth - 1.0)
            } else {
                1.0
            };
            let growth_diff = hex.target_growth - hex.growth;
            if growth_diff.abs() > 0.01 {
                hex.growth += growth_diff * hex.growth_transition_speed;
            } else {
                hex.growth = hex.target_growth;
            }
            match hex.behavior {
                HexBehavior::Normal => hex.size_mult = hex.growth,
                HexBehavior::RandomPulse => hex.size_mult = hex.size_mult.max(hex.growth),
                _ => {}
            }
        }

        hex.behavior_timer += 1;
        if hex.behavior_timer >= hex.behavior_interval {
            hex.behavior_timer = 0;
            hex.behavior_interval = ctx.rng.random_range(60..=180);
            match hex.behavior {
                HexBehavior::RandomPulse => {
                    hex.random_target_size = ctx.rng.random_range(0.6..=2.2);
                }
                HexBehavior::RandomSize => {
                    hex.random_target_size = ctx.rng.random_range(0.4..=2.5);
                }
                HexBehavior::RandomHollow => {
                    hex.random_target_alpha = [30.0, 80.0, 120.0, 180.0, 255.0]
                        .choose(ctx.rng)
                        .copied()
                        .unwrap_or(255.0);
                }
                HexBehavior::Normal => {}
            }
        }
        match hex.behavior {
            HexBehavior::RandomPulse => {
                if (hex.random_target_size - hex.size_mult).abs() > 0.02 {
                    let target = hex.growth.max(hex.random_target_size);
                    hex.size_mult += (target - hex.size_mult) * 0.04;
                }
            }
            HexBehavior::RandomSize => {
                let diff = hex.random_target_size - hex.size_mult;
                if diff.abs() > 0.02 {
                    hex.size_mult += diff * 0.06;
                }
            }
            HexBehavior::RandomHollow => {
                let diff = hex.random_target_alpha - self.alpha;
                if diff.abs() > 2.0 {
                    self.alpha += diff * 0.08;
                } else {
                    self.alpha = hex.random_target_alpha;
                }
                hex.filled = self.alpha > 120.0;
            }
            HexBehavior::Normal => {}
        }

        if let Some(exp) = hex.expansion.as_mut() {
            let trigger = 120.0 * exp.base_scale;
            match exp.phase {
                ExpansionPhase::Expanding if distance < trigger => {
                    let near = (1.0 - distance / trigger).max(0.0);
                    let boost = if exp.fast { 3.0 } else { 1.5 };
                    exp.progress += exp.speed * (1.0 + near * boost);
                    if exp.progress >= 1.0 {
                        exp.progress = 1.0;
                        exp.phase = ExpansionPhase::Hollowing;
                        exp.hollow_timer = 0.0;
                    }
                    self.scale = exp.base_scale + (exp.max_scale - exp.base_scale) * exp.progress;
                }
                ExpansionPhase::Expanding => {
                    if distance >= trigger * 1.5 && exp.progress < 0.3 && exp.progress > 0.0 {
                        exp.progress = (exp.progress - exp.speed * 0.5).max(0.0);
                        self.scale =
                            exp.base_scale + (exp.max_scale - exp.base_scale) * exp.progress;
                    }
                }
                ExpansionPhase::Hollowing => {
                    let rate = if exp.fast { 2.0 } else { 0.7 };
                    exp.hollow_timer += exp.hollow_speed * rate;
                    if exp.hollow_timer >= 1.0 {
                        exp.hollow_timer = 1.0;
                        exp.phase = ExpansionPhase::Cooldown;
                        exp.reset_cooldown = exp.reset_cooldown_duration;
                    }
                    self.alpha = (255.0 * (1.0 - exp.hollow_timer)).floor();
                }
                ExpansionPhase::Cooldown => {
                    if distance >= trigger * 1.2 {
                        exp.reset_cooldown -= 1;
                    } else {
                        exp.reset_cooldown = exp.reset_cooldown_duration;
                    }
                    if exp.reset_cooldown <= 0 {
                        exp.phase = ExpansionPhase::Expanding;
                        exp.progress = 0.0;
                        self.scale = exp.base_scale;
                        self.alpha = 255.0;
                        exp.reset_cooldown_duration = ctx.rng.random_range(120..=360);
                    } else {
                        self.alpha = 30.0;
                    }
                }
            }
        }

        let reduction: f32 = d.pick([-20.0, 0.0, 20.0, 40.0]);
        let round_increase = ((round - 8.0) * 2.0).clamp(0.0, 25.0);
        let threshold = (200.0 - reduction + round_increase).max(160.0);
        hex.filled = self.alpha > threshold;
    }

    fn update_glow(&mut self) {
        let (timer, alpha) = match &mut self.state {
            KindState::Tank(t) if t.glowing => (&mut t.glow_timer, &mut t.glow_alpha),
            KindState::Supertank(s) => (&mut s.glow_timer, &mut s.glow_alpha),
            _ => return,
        };
        *timer += 1;
        *alpha = (128.0 + 127.0 * (*timer as f32 * 0.1).sin()).floor();
    }

    /// Regeneration and the self-destruct countdown; true when it explodes
    fn update_supertank(&mut self, ctx: &mut UpdateContext<'_>) -> bool {
        let KindState::Supertank(st) = &mut self.state else {
            return false;
        };
        let now = ctx.now_ms;

        if let Some(clicked) = st.last_clicked_ms {
            if now.saturating_sub(clicked) >= REGEN_COOLDOWN_MS {
                if !st.regen_active && self.health < self.max_health {
                    st.regen_active = true;
                    st.regen_tick_ms = now;
                }
                st.last_clicked_ms = None;
            }
        }
        if st.regen_active
            && self.health < self.max_health
            && now.saturating_sub(st.regen_tick_ms) >= REGEN_RATE_MS
        {
            self.health = (self.health + 1).min(self.max_health);
            st.regen_tick_ms = now;
            if self.health >= self.max_health {
                st.regen_active = false;
            }
        }

        let frames = st.self_destruct_frames.max(1);
        let Some(sd) = st.self_destruct.as_mut() else {
            return false;
        };
        sd.timer += 1;
        let progress = sd.timer as f32 / frames as f32;
        // Beeps accelerate from once a second to ten times a second
        sd.beep_interval = ((60.0 - 54.0 * progress) as u32).max(6);
        if sd.timer - sd.last_beep >= sd.beep_interval {
            ctx.events.push(GameEvent::Sound(SoundEffect::Beep));
            sd.last_beep = sd.timer;
        }
        if sd.timer >= frames {
            log::info!("supertank {} self-destructed", self.id);
            ctx.events.push(GameEvent::Sound(SoundEffect::Explosion));
            self.dying = true;
            return true;
        }
        false
    }

    fn move_hexagon(&mut self, ctx: &mut UpdateContext<'_>) {
        let s = self.scale;
        let offset = self.pos - ctx.mouse;
        let distance = offset.length();
        if distance < 100.0 * s && distance > 8.0 {
            let strength = 3.0 * s * self.difficulty.pick([0.8, 1.0, 1.3, 1.6]);
            let intensity: f32 = self.difficulty.pick([0.04, 0.05, 0.07, 0.09]);
            let follow = -offset / distance * strength;
            self.vel += follow * intensity + jitter(ctx.rng, 0.08 * s);
        } else if distance <= 8.0 {
            self.vel += jitter(ctx.rng, 0.05 * s);
        } else {
            self.vel += jitter(ctx.rng, 0.12 * s);
        }

        self.pos += self.vel;
        let buffer = self.radius + 5.0;
        if self.pos.x - buffer < 0.0 {
            self.pos.x = buffer;
            self.vel.x = self.vel.x.abs() * 0.5;
        } else if self.pos.x + buffer > ctx.width {
            self.pos.x = ctx.width - buffer;
            self.vel.x = -self.vel.x.abs() * 0.5;
        }
        if self.pos.y - buffer < 0.0 {
            self.pos.y = buffer;
            self.vel.y = self.vel.y.abs() * 0.5;
        } else if self.pos.y + buffer > ctx.height {
            self.pos.y = ctx.height - buffer;
            self.vel.y = -self.vel.y.abs() * 0.5;
        }
        self.vel *= 0.98;
    }

    fn move_grabber(&mut self, ctx: &mut UpdateContext<'_>) {
        let now = ctx.now_ms;
        let KindState::Grabber(g) = &mut self.state else {
            return;
        };
        let to_mouse = ctx.mouse - self.pos;
        let distance = to_mouse.length();

        if g.grabbing {
            let elapsed = now.saturating_sub(g.grab_start_ms) as f32 / 1000.0;
            let wave = Vec2::new(
                (elapsed * 3.0).sin() * 1.8,
                (elapsed * 4.0).cos() * 1.5 + (elapsed * 2.0).sin(),
            );
            self.pos += (wave + jitter(ctx.rng, 1.0)) * self.speed * 1.5;
            self.pos = clamp_to_screen(self.pos, self.radius + 20.0, ctx.width, ctx.height);
            g.cursor_target = Some(self.pos + g.grab_offset);

            if g.show_taunt {
                g.taunt_alpha -= TAUNT_FADE_SPEED;
                if g.taunt_alpha <= 0.0 {
                    g.show_taunt = false;
                    g.taunt_alpha = 0.0;
                }
            }
            if elapsed >= g.grab_duration_s {
                log::debug!("grabber {} released the cursor", self.id);
                self.become_normal(ctx.rng);
            }
            return;
        }

        let wait_start = *g.wait_start_ms.get_or_insert(now);
        let waited = now.saturating_sub(wait_start) as f32 / 1000.0;
        let mut idle = false;
        if !g.stalking {
            if waited < g.wait_s {
                idle = true;
            } else if ctx.active_grabbers.iter().any(|&id| id != self.id) {
                // Only one grabber hunts at a time
                g.wait_s = ctx.rng.random_range(1.0..=3.0);
                g.wait_start_ms = Some(now);
            } else if ctx.rng.random::<f32>() < 0.7 {
                g.stalking = true;
                g.will_attack = true;
            } else {
                g.will_attack = false;
                g.wait_s = ctx.rng.random_range(2.0..=5.0);
                g.wait_start_ms = Some(now);
            }
        } else if g.will_attack {
            if distance > 0.0 {
                let force = self.speed * GRABBER_SEEK_MULT * 3.0 * 0.15;
                self.vel = to_mouse / distance * force;
            }
            if distance <= g.grab_distance {
                match g.pre_grab_start_ms {
                    None => g.pre_grab_start_ms = Some(now),
                    Some(start)
                        if now.saturating_sub(start) as f32 >= g.pre_grab_delay_s * 1000.0 =>
                    {
                        g.grabbing = true;
                        g.grab_start_ms = now;
                        g.grab_offset = jitter(ctx.rng, 5.0);
                        g.show_taunt = true;
                        g.taunt_alpha = 255.0;
                        g.pre_grab_start_ms = None;
                        g.cursor_target = Some(self.pos + g.grab_offset);
                        self.color = palette::ANGRY_RED;
                        log::debug!("grabber {} captured the cursor", self.id);
                        return;
                    }
                    Some(_) => {}
                }
            } else {
                g.pre_grab_start_ms = None;
            }
        }

        if idle {
            self.apply_mouse_avoidance(ctx.mouse);
            self.apply_pattern(ctx);
        }

        self.pos += self.vel;
        self.vel *= 0.98;
        self.bounce_off_walls(ctx.width, ctx.height, 0.8);
    }

    fn move_snake(&mut self, ctx: &mut UpdateContext<'_>) {
        let KindState::Snake(snake) = &mut self.state else {
            return;
        };
        let (width, height) = (ctx.width, ctx.height);
        let head_offset = self.pos - ctx.mouse;
        let head_distance = head_offset.length();
        let alive = snake.alive_segments();
        let min_distance = snake.segments[..alive]
            .iter()
            .map(|seg| seg.distance(ctx.mouse))
            .fold(head_distance, f32::min);

        if snake.boost_timer > 0 {
            snake.boost_timer -= 1;
            if snake.boost_timer == 0 {
                snake.boost_cooldown = secs_to_ticks(ctx.rng.random_range(2.0..=6.0));
            }
        } else if snake.boost_cooldown > 0 {
            snake.boost_cooldown -= 1;
        } else if min_distance < snake.panic_range {
            snake.boost_timer = secs_to_ticks(ctx.rng.random_range(1.0..=3.0)).max(1);
        }
        let boosting = snake.is_boosting();
        let speed = if boosting {
            self.speed * SNAKE_BOOST
        } else {
            self.speed
        };

        let escaping = track_snake_cornering(snake, self.pos, speed, width, height);
        snake.ignore_cursor = snake.ignore_cursor.saturating_sub(1);

        if escaping {
            if snake.escape_timer == 1 {
                snake.ignore_cursor = secs_to_ticks(2.0);
            }
            if snake.escape_timer > 3 {
                let center = Vec2::new(width * 0.5, height * 0.5);
                let to_center = (center - self.pos).normalize_or_zero();
                let spread = ctx.rng.random_range(-FRAC_PI_2..=FRAC_PI_2);
                snake.dir = Vec2::from_angle(spread).rotate(to_center);
                if snake.escape_timer > 20 {
                    snake.escape_timer = 0;
                    snake.stuck_timer = 0;
                }
            } else {
                snake.dir = from_angle(ctx.rng.random_range(0.0..TAU));
            }
            snake.dir = snake.dir.normalize_or(Vec2::X);
        } else if snake.ignore_cursor == 0
            && min_distance < snake.detection_range
            && min_distance > 0.0
        {
            let strength = if boosting { 1.2 } else { 0.8 };
            let force =
                strength * (snake.detection_range - min_distance) / snake.detection_range;
            let avoid = if head_distance > 0.0 {
                head_offset / head_distance * force
            } else {
                Vec2::ZERO
            };
            let blend = if boosting { 0.6 } else { 0.4 };
            snake.dir = (snake.dir * (1.0 - blend) + avoid * blend).normalize_or(snake.dir);
        } else {
            snake_patterns(snake, ctx.rng);
        }

        let old_head = self.pos;
        self.pos += snake.dir * speed;

        // Snakes bounce well inside the edge and never wrap
        const MARGIN: f32 = 30.0;
        if self.pos.x < MARGIN {
            self.pos.x = MARGIN;
            snake.dir.x = snake.dir.x.abs();
        } else if self.pos.x > width - MARGIN {
            self.pos.x = width - MARGIN;
            snake.dir.x = -snake.dir.x.abs();
        }
        if self.pos.y < MARGIN {
            self.pos.y = MARGIN;
            snake.dir.y = snake.dir.y.abs();
        } else if self.pos.y > height - MARGIN {
            self.pos.y = height - MARGIN;
            snake.dir.y = -snake.dir.y.abs();
        }
        self.vel = snake.dir * speed;

        let spacing = snake.spacing;
        let mut prev = old_head;
        for seg in snake.segments.iter_mut() {
            let current = *seg;
            let delta = prev - current;
            let d = delta.length();
            if d > spacing {
                *seg += delta / d * (d - spacing);
            }
            prev = current;
        }

        if snake.rainbow {
            snake.rainbow_timer = snake.rainbow_timer.wrapping_add(1);
        }
    }

    fn move_standard(&mut self, ctx: &mut UpdateContext<'_>) {
        self.apply_mouse_avoidance(ctx.mouse);
        self.apply_pattern(ctx);
        self.apply_physics(ctx);
    }

    /// Push away from a nearby cursor; evasive and predictive patterns do their own
    fn apply_mouse_avoidance(&mut self, mouse: Vec2) {
        if self.motion.escape_timer > 0
            || matches!(
                self.motion.pattern,
                MovementPattern::Evasive | MovementPattern::Predictive
            )
        {
            return;
        }
        let away = self.pos - mouse;
        let d = away.length();
        if d < self.avoid_distance && d > 0.0 {
            let force = self.avoid_strength * (self.avoid_distance - d) / self.avoid_distance;
            self.vel += away / d * force * 0.3;
        }
    }

    fn apply_pattern(&mut self, ctx: &mut UpdateContext<'_>) {
        let speed = self.speed;
        let pos = self.pos;
        let mouse = ctx.mouse;
        let wander = match self.motion.pattern {
            MovementPattern::Wandering
            | MovementPattern::Predictive
            | MovementPattern::Evasive => self.motion.wander_step(speed, ctx.rng),
            _ => Vec2::ZERO,
        };

        match &mut self.motion.state {
            PatternState::Wandering => self.vel += wander,
            PatternState::Zigzag {
                timer,
                interval,
                angle,
                speed_mult,
            } => {
                *timer += 1;
                if *timer >= *interval {
                    *angle += [FRAC_PI_2, -FRAC_PI_2, FRAC_PI_3, -FRAC_PI_3]
                        .choose(ctx.rng)
                        .copied()
                        .unwrap_or(FRAC_PI_2);
                    *timer = 0;
                    *interval = ctx.rng.random_range(30..=90);
                }
                self.vel += from_angle(*angle) * speed * *speed_mult * 0.5;
            }
            PatternState::Orbital {
                center,
                radius,
                angle,
                speed: orbit_speed,
                eccentricity,
            } => {
                *angle = (*angle + *orbit_speed).rem_euclid(TAU);
                let target = *center
                    + Vec2::new(
                        angle.cos() * *radius * *eccentricity,
                        angle.sin() * *radius,
                    );
                self.vel += (target - pos).normalize_or_zero() * speed * 0.15;
            }
            PatternState::Predictive {
                strength,
                last_mouse,
            } => {
                self.vel += wander;
                if let Some(last) = *last_mouse {
                    let predicted = mouse + (mouse - last) * 10.0;
                    let away = pos - predicted;
                    let d = away.length();
                    let reach = self.avoid_distance * 1.5;
                    if d < reach && d > 0.0 {
                        self.vel += away / d * (reach - d) / reach * speed * *strength;
                    }
                }
                *last_mouse = Some(mouse);
            }
            PatternState::Bouncy {
                strength,
                damping,
                threshold,
                timer,
            } => {
                *timer += 1;
                if *timer as f32 >= 90.0 * *threshold {
                    *timer = 0;
                    let kick = from_angle(ctx.rng.random_range(0.0..TAU)) * speed * *strength;
                    self.vel = self.vel * *damping + kick;
                }
            }
            PatternState::Serpentine {
                amplitude,
                frequency,
                phase,
                base_dir,
            } => {
                *phase = (*phase + *frequency) % (2.0 * PI);
                let r = self.radius + 1.0;
                if pos.x <= r {
                    base_dir.x = base_dir.x.abs();
                } else if pos.x >= ctx.width - r {
                    base_dir.x = -base_dir.x.abs();
                }
                if pos.y <= r {
                    base_dir.y = base_dir.y.abs();
                } else if pos.y >= ctx.height - r {
                    base_dir.y = -base_dir.y.abs();
                }
                let side = base_dir.perp() * phase.cos() * *amplitude * *frequency;
                self.vel += *base_dir * speed * 0.05 + side * 0.1;
            }
            PatternState::Evasive {
                sensitivity,
                reaction_frames,
                panic_distance,
                alarm,
            } => {
                self.vel += wander;
                let away = pos - mouse;
                let d = away.length();
                if d < self.avoid_distance * *sensitivity {
                    *alarm += 1;
                } else {
                    *alarm = alarm.saturating_sub(1);
                }
                if *alarm >= *reaction_frames && d > 0.0 {
                    let panic = if d < *panic_distance { 2.0 } else { 1.0 };
                    self.vel += away / d * speed * 0.3 * *sensitivity * panic;
                }
            }
        }
    }

    fn apply_physics(&mut self, ctx: &mut UpdateContext<'_>) {
        self.corner_escape(ctx);

        let magnitude = self.vel.length();
        self.vel = cap_speed(self.vel, self.speed);
        let s = self.scale;
        if magnitude < 0.2 * s {
            self.vel += jitter(ctx.rng, 0.3 * s);
        }
        self.vel *= 0.995;
        self.pos += self.vel;

        let bounce = if self.motion.escape_timer > 0 { 0.3 } else { 0.8 };
        self.bounce_off_walls(ctx.width, ctx.height, bounce);
    }

    fn bounce_off_walls(&mut self, width: f32, height: f32, damping: f32) {
        let r = self.radius;
        if self.pos.x - r <= 0.0 || self.pos.x + r >= width {
            self.vel.x *= -damping;
            self.pos.x = clamp_axis(self.pos.x, r, width);
        }
        if self.pos.y - r <= 0.0 || self.pos.y + r >= height {
            self.vel.y *= -damping;
            self.pos.y = clamp_axis(self.pos.y, r, height);
        }
    }

    /// Shove circles out of screen corners
    fn corner_escape(&mut self, ctx: &mut UpdateContext<'_>) {
        let s = self.scale;
        let (w, h) = (ctx.width, ctx.height);
        let margin = 60.0 * s;
        let near_left = self.pos.x < margin;
        let near_right = self.pos.x > w - margin;
        let near_top = self.pos.y < margin;
        let near_bottom = self.pos.y > h - margin;
        let in_corner = (near_left || near_right) && (near_top || near_bottom);

        let m = &mut self.motion;
        if in_corner && m.escape_timer == 0 {
            m.escape_intense = ctx.rng.random::<f32>() < 0.3;
            m.escape_timer = if m.escape_intense { 180 } else { 120 };
        }
        if m.escape_timer == 0 {
            return;
        }

        let safe = (if m.escape_intense { 200.0 } else { 120.0 }) * s;
        let far_from_edges = self.pos.x > safe
            && self.pos.x < w - safe
            && self.pos.y > safe
            && self.pos.y < h - safe;
        let exit_chance = if m.escape_intense { 0.7 } else { 1.0 };
        if far_from_edges && ctx.rng.random::<f32>() < exit_chance {
            m.escape_timer = 0;
            return;
        }

        let (strength, boost) = if m.escape_intense {
            (4.0 * s, 1.6)
        } else {
            (2.5 * s, 1.3)
        };
        let mut push = Vec2::ZERO;
        if near_left {
            push.x += strength;
        }
        if near_right {
            push.x -= strength;
        }
        if near_top {
            push.y += strength;
        }
        if near_bottom {
            push.y -= strength;
        }
        self.vel = (self.vel + push) * boost;
        m.escape_timer -= 1;
    }
}

/// Record movement history and decide whether a snake is boxed in
fn track_snake_cornering(
    snake: &mut SnakeState,
    pos: Vec2,
    speed: f32,
    width: f32,
    height: f32,
) -> bool {
    snake.position_history.push_back(pos);
    if snake.position_history.len() > 30 {
        snake.position_history.pop_front();
    }
    let n = snake.position_history.len();
    if n >= 2 {
        let moved = pos.distance(snake.position_history[n - 2]);
        snake.movement_history.push_back(moved);
        if snake.movement_history.len() > 20 {
            snake.movement_history.pop_front();
        }
    }
    let dot = snake.dir.dot(snake.last_dir).clamp(-1.0, 1.0);
    snake.turn_history.push_back(dot.abs().acos());
    if snake.turn_history.len() > 15 {
        snake.turn_history.pop_front();
    }
    snake.last_dir = snake.dir;

    let mut cornered = false;
    if snake.movement_history.len() >= 10 && snake.turn_history.len() >= 10 {
        let avg = snake.movement_history.iter().rev().take(10).sum::<f32>() / 10.0;
        let low_movement = avg < speed * 0.3;
        let sharp_turns = snake
            .turn_history
            .iter()
            .rev()
            .take(10)
            .filter(|&&a| a > 0.5)
            .count();
        let erratic = sharp_turns >= 6;
        const EDGE: f32 = 80.0;
        let near_edge =
            pos.x < EDGE || pos.x > width - EDGE || pos.y < EDGE || pos.y > height - EDGE;

        if low_movement || (erratic && near_edge) || (erratic && avg < speed * 0.6) {
            cornered = true;
            snake.stuck_timer += 1;
        } else {
            snake.stuck_timer = snake.stuck_timer.saturating_sub(1);
        }
    }

    let escaping = cornered && snake.stuck_timer >= 3;
    if escaping {
        snake.escape_timer += 1;
    } else {
        snake.escape_timer = snake.escape_timer.saturating_sub(1);
    }
    escaping
}

/// Free-roaming snake steering: circling, zigzags, erratic bursts and turns
fn snake_patterns(snake: &mut SnakeState, rng: &mut Pcg32) {
    snake.turn_timer += 1;
    snake.erratic_timer = snake.erratic_timer.saturating_sub(1);
    if snake.zigzag_mode {
        snake.zigzag_timer += 1;
    }

    let sign = |rng: &mut Pcg32| if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    if !snake.circle_mode && !snake.zigzag_mode {
        if rng.random::<f32>() < 0.004 {
            snake.circle_mode = true;
            snake.circle_timer = 0;
            snake.circle_duration = rng.random_range(120..=240);
            snake.circle_direction = sign(rng);
        } else if rng.random::<f32>() < 0.005 {
            snake.zigzag_mode = true;
            snake.zigzag_timer = 0;
            snake.zigzag_direction = sign(rng);
        }
    }

    if snake.circle_mode {
        snake.circle_timer += 1;
        snake.dir = from_angle(heading(snake.dir) + 0.06 * snake.circle_direction);
        if snake.circle_timer >= snake.circle_duration || rng.random::<f32>() < 0.005 {
            snake.circle_mode = false;
            snake.circle_timer = 0;
            if rng.random::<f32>() < 0.3 {
                snake.erratic_timer = rng.random_range(60..=120);
            }
        }
    } else if snake.zigzag_mode {
        let period: u32 = rng.random_range(20..=30);
        if snake.zigzag_timer % period == 0 {
            snake.zigzag_direction = -snake.zigzag_direction;
        }
        snake.dir = steer(snake.dir, 0.15 * snake.zigzag_direction, 0.8);
        if rng.random::<f32>() < 0.008 {
            snake.zigzag_mode = false;
            snake.zigzag_timer = 0;
        }
    } else if snake.erratic_timer > 0 {
        if rng.random::<f32>() < 0.08 {
            let turn = rng.random_range(-0.6..=0.6);
            snake.dir = steer(snake.dir, turn, SNAKE_SMOOTHING);
        }
    } else if snake.turn_timer >= snake.turn_interval {
        snake.dir = match rng.random_range(0..4) {
            0 => steer(snake.dir, rng.random_range(-0.3..=0.3), SNAKE_SMOOTHING),
            1 => steer(snake.dir, rng.random_range(-0.6..=0.6), SNAKE_SMOOTHING),
            2 => steer(snake.dir, rng.random_range(-0.9..=0.9), SNAKE_SMOOTHING),
            // S-curve: a softer blend of a small turn
            _ => steer(snake.dir, rng.random_range(-0.4..=0.4), 0.7),
        };
        snake.turn_timer = 0;
        snake.turn_interval = rng.random_range(30..=90);

        let roll = rng.random::<f32>();
        if roll < 0.15 {
            snake.erratic_timer = rng.random_range(60..=120);
        } else if roll < 0.25 {
            snake.zigzag_mode = true;
            snake.zigzag_timer = 0;
        }
    } else if rng.random::<f32>() < 0.04 {
        let turn = rng.random_range(-0.1..=0.1);
        snake.dir = steer(snake.dir, turn, 0.95);
    }
}
