//! Scene building: game state to vertices
//!
//! Pure CPU work so draw output can be tested without a GPU.

use glam::Vec2;
use std::f32::consts::TAU;

use super::shapes;
use super::vertex::{Vertex, colors, opaque, rgba};
use crate::sim::circle::{DEATH_DURATION, SHOOTER_MAX_SPIN};
use crate::sim::collision::hexagon_vertices;
use crate::sim::palette::{self, Rgb};
use crate::sim::{Circle, GameState, KindState, Pipe, Spinner, Triangle};

/// Per-frame inputs that are not part of the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneOptions {
    /// Real cursor position
    pub mouse: Vec2,
    /// Gradient background instead of plain black
    pub dynamic_background: bool,
}

/// Build the full frame
pub fn build(state: &GameState, opts: &SceneOptions) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(4096);
    let size = Vec2::new(state.width, state.height);
    // Game time in seconds drives every pulse so frames are reproducible
    let t = state.time_ticks as f32 / crate::consts::TICKS_PER_SECOND as f32;

    if opts.dynamic_background {
        background(&mut out, size, t);
    }

    if state.screen.is_active() {
        for spinner in &state.spinners {
            draw_spinner(&mut out, spinner);
        }
        for pipe in &state.pipes {
            draw_pipe(&mut out, pipe, state.height);
        }
        for circle in &state.circles {
            draw_circle(&mut out, circle, opts.mouse, t);
        }
        for triangle in &state.triangles {
            draw_triangle(&mut out, triangle);
        }
    }

    flashes(&mut out, state, size);

    if state.screen.is_active() {
        cursor_overlay(&mut out, state, opts.mouse);
    }
    out
}

fn background(out: &mut Vec<Vertex>, size: Vec2, t: f32) {
    // Slow drift between the two gradient stops
    let mix = 0.5 + 0.5 * (t * 0.1).sin();
    let lerp = |a: Rgb, b: Rgb, m: f32| -> Rgb {
        std::array::from_fn(|i| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * m) as u8)
    };
    let top = lerp(palette::DARK_BLUE, palette::NAVY_BLUE, mix);
    let bottom = lerp(palette::DEEP_PURPLE, palette::MIDNIGHT_BLUE, 1.0 - mix);
    shapes::vertical_gradient(out, size, opaque(top), opaque(bottom));
}

fn flashes(out: &mut Vec<Vertex>, state: &GameState, size: Vec2) {
    if state.screen_flash > 0.0 {
        shapes::rect(out, Vec2::ZERO, size, rgba(palette::HIT_FLASH, state.screen_flash));
    } else if state.pipe_flash > 0.0 {
        shapes::rect(
            out,
            Vec2::ZERO,
            size,
            rgba(palette::PIPE_WARNING_FLASH, state.pipe_flash),
        );
    }
    if state.explosion_flash > 0.0 {
        shapes::rect(
            out,
            Vec2::ZERO,
            size,
            rgba(palette::EXPLOSION_FLASH, state.explosion_flash),
        );
    }
}

fn draw_spinner(out: &mut Vec<Vertex>, spinner: &Spinner) {
    for tip in spinner.blade_tips() {
        shapes::line(out, spinner.pos, tip, spinner.blade_width + 2.0, opaque(palette::WHITE));
        shapes::line(out, spinner.pos, tip, spinner.blade_width, opaque(palette::RED));
    }
    shapes::circle(out, spinner.pos, spinner.blade_width * 1.1, opaque(palette::RED));
}

fn draw_pipe(out: &mut Vec<Vertex>, pipe: &Pipe, height: f32) {
    let top = pipe.gap_top().max(0.0);
    let bottom = pipe.gap_bottom().min(height);
    let fill = opaque(palette::GREEN);
    let border = opaque(colors::PIPE_BORDER);

    for (y0, y1) in [(0.0, top), (bottom, height)] {
        if y1 <= y0 {
            continue;
        }
        shapes::rect(out, Vec2::new(pipe.x, y0), Vec2::new(pipe.width, y1 - y0), fill);
        let corners = [
            Vec2::new(pipe.x, y0),
            Vec2::new(pipe.x + pipe.width, y0),
            Vec2::new(pipe.x + pipe.width, y1),
            Vec2::new(pipe.x, y1),
        ];
        shapes::polygon_outline(out, &corners, 3.0, border);
    }
}

fn draw_triangle(out: &mut Vec<Vertex>, triangle: &Triangle) {
    let corners = triangle.corners();
    shapes::polygon(out, &corners, rgba(palette::ORANGE, triangle.alpha));
    if triangle.alpha >= 255.0 {
        shapes::polygon_outline(out, &corners, 2.0, opaque(palette::BLACK));
    }
}

fn draw_circle(out: &mut Vec<Vertex>, circle: &Circle, mouse: Vec2, t: f32) {
    if circle.dying {
        let alpha = 255.0 * (1.0 - circle.death_timer as f32 / DEATH_DURATION as f32);
        shapes::circle(out, circle.pos, circle.radius, rgba(circle.color, alpha));
        return;
    }

    match &circle.state {
        KindState::Ghost(_) => {
            shapes::circle(out, circle.pos, circle.radius, rgba(circle.color, circle.alpha));
        }
        KindState::Tank(tank) if tank.glowing => {
            let (layers, step, fade, glow) = if tank.hyper {
                (4, 3.0, 25.0, colors::HYPER_TANK_GLOW)
            } else {
                (3, 5.0, 40.0, colors::TANK_GLOW)
            };
            glow_layers(out, circle, layers, step, fade, glow, tank.glow_alpha);
            shapes::circle(out, circle.pos, circle.radius, opaque(circle.color));
        }
        KindState::Supertank(st) => {
            glow_layers(out, circle, 6, 2.0, 15.0, colors::SUPERTANK_GLOW, st.glow_alpha);
            shapes::circle(out, circle.pos, circle.radius, opaque(circle.color));
            if let Some(sd) = &st.self_destruct {
                let progress = sd.timer as f32 / st.self_destruct_frames.max(1) as f32;
                let flash_speed = 0.1 + progress * 0.4;
                if (t * flash_speed).fract() < 0.5 {
                    let color = if progress < 0.83 {
                        palette::RED
                    } else {
                        palette::GREEN
                    };
                    shapes::circle(out, circle.pos, (circle.radius * 0.3).max(3.0), opaque(color));
                }
            }
        }
        KindState::Hexagon(hex) => {
            let verts = hexagon_vertices(circle.pos, circle.hexagon_draw_radius());
            let color = rgba(circle.color, circle.alpha);
            if hex.filled {
                shapes::polygon(out, &verts, color);
            } else {
                shapes::polygon_outline(out, &verts, circle.hexagon_outline_width(), color);
            }
        }
        KindState::Grabber(g) => {
            if g.grabbing {
                let pulse = (t * 10.0).sin().abs() * 100.0 + 50.0;
                shapes::circle(out, circle.pos, circle.radius * 1.8, rgba(colors::GRAB_GLOW, pulse));
            } else {
                let to_mouse = mouse - circle.pos;
                let distance = to_mouse.length();
                if distance > 0.0 && distance < 100.0 {
                    let reach = (circle.radius * 2.0).min(distance);
                    let end = circle.pos + to_mouse / distance * reach;
                    shapes::line(out, circle.pos, end, 2.0, opaque(colors::GRAB_ARM));
                }
            }
            shapes::circle(out, circle.pos, circle.radius, opaque(circle.color));
        }
        KindState::Snake(snake) => {
            let head_r = circle.radius;
            let rainbow = |i: usize| -> Rgb {
                let phase = (snake.rainbow_timer as f32 + i as f32 * 20.0) * 0.1;
                [
                    (127.0 + 127.0 * phase.sin()) as u8,
                    (127.0 + 127.0 * (phase + 2.0).sin()) as u8,
                    (127.0 + 127.0 * (phase + 4.0).sin()) as u8,
                ]
            };
            if snake.rainbow {
                shapes::circle(out, circle.pos, head_r * 1.8, rgba(rainbow(0), 80.0));
            } else if snake.is_boosting() {
                let pulse = (t * 20.0).sin().abs() * 80.0 + 40.0;
                shapes::circle(out, circle.pos, head_r * 1.6, rgba(colors::BOOST_GLOW, pulse));
            } else if snake.circle_mode {
                let pulse = (t * 10.0).sin().abs() * 60.0 + 30.0;
                shapes::circle(out, circle.pos, head_r * 1.3, rgba(colors::COIL_GLOW, pulse));
            }

            let seg_r = circle.segment_radius();
            let mut prev = circle.pos;
            for (i, seg) in snake.segments[..snake.alive_segments()].iter().enumerate() {
                let color = if snake.rainbow {
                    opaque(rainbow(i))
                } else {
                    opaque(colors::SNAKE_BODY)
                };
                shapes::line(out, prev, *seg, 3.0, color);
                shapes::circle(out, *seg, seg_r, color);
                prev = *seg;
            }
            shapes::circle(out, circle.pos, head_r, opaque(circle.color));

            // Eyes look along the heading
            let dir = snake.dir.normalize_or(Vec2::X);
            let offset = head_r * 0.6;
            let eye_size = (head_r * 0.15).max(3.0);
            for side in [1.0, -1.0] {
                let eye = circle.pos + dir * offset * 0.5 + dir.perp() * offset * 0.3 * side;
                shapes::circle(out, eye, eye_size, opaque(palette::WHITE));
                shapes::circle(out, eye, (eye_size - 1.0).max(1.0), opaque(palette::BLACK));
            }
        }
        KindState::Shooter(sh) => {
            if sh.invisible {
                return;
            }
            shapes::circle(out, circle.pos, circle.radius, opaque(circle.color));
            if mouse.distance(circle.pos) <= sh.detection_range {
                shapes::ring(out, circle.pos, sh.detection_range, 2.0, rgba(palette::RED, 30.0));
            }
            let cannon_r = 4.0 * circle.scale;
            let cannon_color = if sh.spin_speed > 0.0 {
                let ratio = (sh.spin_speed / SHOOTER_MAX_SPIN).min(1.0);
                [(100.0 + 155.0 * ratio) as u8, 100, (255.0 - 155.0 * ratio) as u8]
            } else {
                palette::GRAY
            };
            for i in 0..8 {
                let angle = sh.spin_angle + TAU * i as f32 / 8.0;
                let p = circle.pos + crate::from_angle(angle) * circle.radius * 0.9;
                shapes::circle(out, p, cannon_r, opaque(palette::BLACK));
                shapes::circle(out, p, cannon_r - 1.0, opaque(cannon_color));
            }
            let core = circle.radius * 0.3;
            shapes::circle(out, circle.pos, core, opaque(palette::BLACK));
            shapes::circle(out, circle.pos, core - 2.0, opaque(palette::DARK_BLUE));
        }
        _ => shapes::circle(out, circle.pos, circle.radius, opaque(circle.color)),
    }

    if circle.max_health > 1 {
        health_bar(out, circle);
    }
}

fn glow_layers(
    out: &mut Vec<Vertex>,
    circle: &Circle,
    layers: u32,
    step: f32,
    fade: f32,
    color: Rgb,
    alpha: f32,
) {
    let glow_radius = circle.radius * 1.5;
    for i in 0..layers {
        let r = glow_radius - i as f32 * step;
        let a = (alpha - i as f32 * fade).max(0.0);
        if r > 0.0 && a > 0.0 {
            shapes::circle(out, circle.pos, r, rgba(color, a));
        }
    }
}

fn health_bar(out: &mut Vec<Vertex>, circle: &Circle) {
    let width = (circle.radius * 1.8).max(30.0);
    let height = (6.0 * circle.scale).floor().max(4.0);
    let min = Vec2::new(
        circle.pos.x - width * 0.5,
        circle.pos.y - circle.radius - 18.0 * circle.scale,
    );
    shapes::rect(out, min, Vec2::new(width, height), opaque(colors::HEALTH_BACK));

    let ratio = circle.health.max(0) as f32 / circle.max_health as f32;
    let fill = if ratio > 0.6 {
        palette::GREEN
    } else if ratio > 0.3 {
        palette::YELLOW
    } else {
        palette::ORANGE
    };
    shapes::rect(out, min, Vec2::new(width * ratio, height), opaque(fill));
}

fn cursor_overlay(out: &mut Vec<Vertex>, state: &GameState, mouse: Vec2) {
    if state.cursor_grabbed {
        let p = state.virtual_mouse;
        shapes::ring(out, p, 12.0, 4.0, opaque(palette::WHITE));
        shapes::ring(out, p, 8.0, 3.0, opaque(palette::YELLOW));
        shapes::circle(out, p, 4.0, opaque(palette::RED));
        return;
    }
    if state.cursor_hidden || !state.options.click_radius_helper {
        return;
    }
    let r = state.options.click_radius;
    shapes::circle(out, mouse, r, rgba(palette::WHITE, 30.0));
    shapes::ring(out, mouse, r, 2.0, rgba(palette::WHITE, 60.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CircleKind, Screen, sandbox_spawn_circle, start_new_game};

    fn opts() -> SceneOptions {
        SceneOptions {
            mouse: Vec2::new(5.0, 5.0),
            dynamic_background: false,
        }
    }

    fn playing() -> GameState {
        let mut state = GameState::new(3);
        start_new_game(&mut state);
        state
    }

    #[test]
    fn test_menu_is_background_only() {
        let state = GameState::new(1);
        assert!(build(&state, &opts()).is_empty());
        let with_bg = build(
            &state,
            &SceneOptions {
                dynamic_background: true,
                ..opts()
            },
        );
        assert_eq!(with_bg.len(), 6);
    }

    #[test]
    fn test_menu_hides_entities() {
        let mut state = playing();
        sandbox_spawn_circle(&mut state, CircleKind::Normal, Vec2::new(600.0, 400.0));
        assert!(!build(&state, &opts()).is_empty());
        state.screen = Screen::MainMenu;
        assert!(build(&state, &opts()).is_empty());
    }

    #[test]
    fn test_every_kind_draws() {
        for kind in CircleKind::UNLOCK_ORDER {
            let mut state = playing();
            sandbox_spawn_circle(&mut state, kind, Vec2::new(600.0, 400.0));
            let verts = build(&state, &opts());
            assert!(!verts.is_empty(), "{kind:?} drew nothing");
            assert_eq!(verts.len() % 3, 0);
        }
    }

    #[test]
    fn test_dying_circle_fades() {
        let mut state = playing();
        sandbox_spawn_circle(&mut state, CircleKind::Normal, Vec2::new(600.0, 400.0));
        let c = &mut state.circles[0];
        c.dying = true;
        c.death_timer = DEATH_DURATION / 2;
        let verts = build(&state, &opts());
        assert!(verts.iter().all(|v| (v.color[3] - 0.5).abs() < 0.01));
    }

    #[test]
    fn test_hit_flash_covers_screen() {
        let mut state = playing();
        state.screen_flash = 255.0;
        state.pipe_flash = 100.0;
        let verts = build(&state, &opts());
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[0].color, rgba(palette::HIT_FLASH, 255.0));
        assert!(verts.iter().any(|v| v.position == [state.width, state.height]));
    }

    #[test]
    fn test_click_radius_helper_ring() {
        let mut state = playing();
        assert!(build(&state, &opts()).is_empty());
        state.options.click_radius_helper = true;
        state.options.click_radius = 40.0;
        let verts = build(&state, &opts());
        assert!(!verts.is_empty());
        let far = verts
            .iter()
            .map(|v| Vec2::from(v.position).distance(opts().mouse))
            .fold(0.0f32, f32::max);
        assert!((far - 40.0).abs() < 1e-3);

        state.cursor_hidden = true;
        assert!(build(&state, &opts()).is_empty());
    }

    #[test]
    fn test_grabbed_cursor_drawn_at_virtual_mouse() {
        let mut state = playing();
        state.cursor_grabbed = true;
        state.virtual_mouse = Vec2::new(300.0, 300.0);
        let verts = build(&state, &opts());
        assert!(!verts.is_empty());
        assert!(verts
            .iter()
            .all(|v| Vec2::from(v.position).distance(state.virtual_mouse) <= 12.01));
    }

    #[test]
    fn test_pipe_split_around_gap() {
        let mut state = playing();
        state.options.pipe_warning_flash = false;
        crate::sim::sandbox_spawn_pipe(&mut state);
        let pipe = state.pipes[0].clone();
        let verts = build(&state, &opts());
        let inside_gap = verts.iter().any(|v| {
            let y = v.position[1];
            y > pipe.gap_top() + 3.0 && y < pipe.gap_bottom() - 3.0
        });
        assert!(!inside_gap);
    }
}
