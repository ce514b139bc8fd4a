//! Circle Clicker entry point
//!
//! The browser build runs the interactive game loop. The native build is a
//! headless runner that drives the same simulation with a simple autoplayer.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Element, HtmlCanvasElement, KeyboardEvent, MouseEvent};

    use circle_clicker::App;
    use circle_clicker::app::Key;
    use circle_clicker::audio::web::{AudioManager, WebMusic};
    use circle_clicker::consts::SIM_DT;
    use circle_clicker::persistence::{LocalStorageStore, MemoryStore, Store};
    use circle_clicker::renderer::{RenderState, SceneOptions, scene};
    use circle_clicker::ui;

    /// Game instance holding all state
    struct Game {
        app: App<WebMusic>,
        render_state: Option<RenderState>,
        audio: AudioManager,
        overlay: Option<Element>,
        canvas: HtmlCanvasElement,
        /// Canvas pixels per CSS pixel
        dpr: f32,
        last_time: f64,
        /// Last overlay markup, to skip redundant DOM writes
        last_html: String,
        cursor_hidden: bool,
        quit_logged: bool,
    }

    impl Game {
        fn new(seed: u64, canvas: HtmlCanvasElement, overlay: Option<Element>, dpr: f32) -> Self {
            let store: Box<dyn Store> = match LocalStorageStore::new() {
                Ok(store) => Box::new(store),
                Err(e) => {
                    log::warn!("Progress will not be saved: {e}");
                    Box::new(MemoryStore::new())
                }
            };
            let app = App::new(seed, store, WebMusic::default());
            let mut audio = AudioManager::new();
            audio.set_volumes(app.settings.volumes);
            Self {
                app,
                render_state: None,
                audio,
                overlay,
                canvas,
                dpr,
                last_time: 0.0,
                last_html: String::new(),
                cursor_hidden: false,
                quit_logged: false,
            }
        }

        /// CSS pixel offset to arena pixels
        fn to_arena(&self, x: i32, y: i32) -> Vec2 {
            Vec2::new(x as f32, y as f32) * self.dpr
        }

        fn update(&mut self, dt: f32) {
            self.app.frame(dt);

            self.audio.set_volumes(self.app.settings.volumes);
            for effect in self.app.drain_sounds() {
                self.audio.play(effect);
            }
            for (hum, on) in self.app.hums() {
                self.audio.set_hum(hum, on);
            }

            if self.app.quit_requested() && !self.quit_logged {
                self.quit_logged = true;
                log::info!("Quit requested");
                if let Some(window) = web_sys::window() {
                    let _ = window.close();
                }
            }
        }

        fn render(&mut self) {
            let opts = SceneOptions {
                mouse: self.app.mouse(),
                dynamic_background: self.app.settings.accessibility.dynamic_background,
            };
            let vertices = scene::build(&self.app.state, &opts);
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&vertices) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Update the DOM text overlay and cursor visibility
        fn update_overlay(&mut self) {
            let lines = ui::layout(&self.app);
            let html = ui::overlay_html(&lines, 1.0 / self.dpr);
            if html != self.last_html {
                if let Some(el) = &self.overlay {
                    el.set_inner_html(&html);
                }
                self.last_html = html;
            }

            let state = &self.app.state;
            let hide = state.screen.is_active() && (state.cursor_grabbed || state.cursor_hidden);
            if hide != self.cursor_hidden {
                let _ = self
                    .canvas
                    .style()
                    .set_property("cursor", if hide { "none" } else { "default" });
                self.cursor_hidden = hide;
            }
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.app.resize(width as f32, height as f32);
            if let Some(ref mut render_state) = self.render_state {
                render_state.resize(width, height);
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Circle Clicker starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let seed = js_sys::Date::now() as u64;
        let overlay = document.get_element_by_id("overlay");
        let game = Rc::new(RefCell::new(Game::new(
            seed,
            canvas.clone(),
            overlay,
            dpr as f32,
        )));
        game.borrow_mut().app.resize(width as f32, height as f32);
        log::info!("Game initialized with seed: {}", seed);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = RenderState::new(surface, &adapter, width, height)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        game.borrow_mut().render_state = Some(render_state);

        setup_input_handlers(&canvas, game.clone())?;
        setup_resize(game.clone())?;
        setup_auto_mute(game.clone())?;

        request_animation_frame(game);

        log::info!("Circle Clicker running!");
        Ok(())
    }

    fn setup_input_handlers(
        canvas: &HtmlCanvasElement,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let pos = g.to_arena(event.offset_x(), event.offset_y());
                g.app.mouse_move(pos);
            });
            canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                if event.button() != 0 {
                    return;
                }
                let mut g = game.borrow_mut();
                // Audio can only start after a user gesture
                g.audio.resume();
                let pos = g.to_arena(event.offset_x(), event.offset_y());
                g.app.mouse_down(pos);
            });
            canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = Key::from_key_name(&event.key());
                // Keep Tab focus and Space scrolling away from the page
                if matches!(key, Key::Tab | Key::Space) || (event.ctrl_key() && key != Key::Other)
                {
                    event.prevent_default();
                }
                let mut g = game.borrow_mut();
                g.audio.resume();
                g.app.key_down(key, event.ctrl_key());
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_resize(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let dpr = window.device_pixel_ratio();
            let mut g = game.borrow_mut();
            let width = (g.canvas.client_width() as f64 * dpr) as u32;
            let height = (g.canvas.client_height() as f64 * dpr) as u32;
            if width == 0 || height == 0 {
                return;
            }
            g.canvas.set_width(width);
            g.canvas.set_height(height);
            g.dpr = dpr as f32;
            g.resize(width, height);
            log::info!("Resized to {}x{}", width, height);
        });
        window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    /// Silence effects while the tab is hidden
    fn setup_auto_mute(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let hidden = document_clone.visibility_state() == web_sys::VisibilityState::Hidden;
            game.borrow_mut().audio.set_muted(hidden);
            log::info!("Audio {}", if hidden { "muted (tab hidden)" } else { "unmuted" });
        });
        document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            g.render();
            g.update_overlay();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Startup failed: {:?}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use clap::{Parser, ValueEnum};
    use glam::Vec2;

    use circle_clicker::App;
    use circle_clicker::app::Key;
    use circle_clicker::audio::SilentMusic;
    use circle_clicker::consts::{MAX_TIME_LIMIT, MIN_TIME_LIMIT, SIM_DT};
    use circle_clicker::persistence::{FileStore, StoreError};
    use circle_clicker::sim::{Circle, Difficulty, GameMode, Hit, KindState, Screen};
    use circle_clicker::ui::performance_rating;

    /// Frames between autoplayer clicks
    const CLICK_INTERVAL: u32 = 12;

    #[derive(Debug, thiserror::Error)]
    pub enum RunError {
        #[error("invalid arguments: {0}")]
        InvalidArguments(String),
        #[error("data store unavailable: {0}")]
        StoreUnavailable(#[from] StoreError),
        #[error("run failed: {0}")]
        RunFailed(String),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum ModeArg {
        Endless,
        Timed,
    }

    /// Run Circle Clicker headlessly with an autoplayer
    #[derive(Debug, Parser)]
    #[command(name = "circle-clicker", version, about)]
    struct Args {
        /// RNG seed (defaults to the current time)
        #[arg(long)]
        seed: Option<u64>,
        /// Easy, Medium, Hard or Nightmare
        #[arg(long, default_value = "Medium")]
        difficulty: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Endless)]
        mode: ModeArg,
        /// Time limit in seconds for timed mode
        #[arg(long, default_value_t = circle_clicker::consts::DEFAULT_TIME_LIMIT)]
        duration: u32,
        /// Where settings and high scores live (defaults to the user config dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Simulation frames to run before ending the game
        #[arg(long, default_value_t = 3600)]
        frames: u32,
        /// Save the final score under this name
        #[arg(long)]
        name: Option<String>,
    }

    /// Result of a headless run
    #[derive(Debug)]
    pub struct Summary {
        pub score: u32,
        pub rounds: u32,
        pub label: String,
        pub rating: &'static str,
        pub frames: u32,
    }

    pub fn run() -> Result<Summary, RunError> {
        run_with(parse_args(std::env::args_os())?)
    }

    fn parse_args<I, T>(args: I) -> Result<Args, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Args::try_parse_from(args) {
            Ok(args) => Ok(args),
            Err(e)
                if matches!(
                    e.kind(),
                    clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
                ) =>
            {
                e.exit()
            }
            Err(e) => Err(RunError::InvalidArguments(e.to_string().trim().to_string())),
        }
    }

    fn run_with(args: Args) -> Result<Summary, RunError> {
        let difficulty = Difficulty::from_name(&args.difficulty).ok_or_else(|| {
            RunError::InvalidArguments(format!("unknown difficulty '{}'", args.difficulty))
        })?;
        if !(MIN_TIME_LIMIT..=MAX_TIME_LIMIT).contains(&args.duration) {
            return Err(RunError::InvalidArguments(format!(
                "duration must be between {MIN_TIME_LIMIT} and {MAX_TIME_LIMIT} seconds"
            )));
        }
        if args.frames == 0 {
            return Err(RunError::InvalidArguments("frames must be positive".into()));
        }

        let store = match args.data_dir.clone() {
            Some(dir) => FileStore::new(dir),
            None => FileStore::in_config_dir()?,
        };
        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });
        log::info!("Headless run: seed {seed}, {} {:?}", difficulty.name(), args.mode);

        let mut app = App::new(seed, Box::new(store), SilentMusic::default());
        app.state.difficulty = difficulty;
        app.state.time_limit = args.duration;
        app.key_down(Key::Space, false);
        app.key_down(Key::Enter, false);
        if args.mode == ModeArg::Timed {
            app.key_down(Key::Down, false);
        }
        app.key_down(Key::Enter, false);
        if app.state.screen != Screen::Playing {
            return Err(RunError::RunFailed("game did not start".into()));
        }

        let mut frames = 0;
        while frames < args.frames && app.state.screen == Screen::Playing {
            if frames % CLICK_INTERVAL == 0 {
                if let Some(target) = pick_target(&app.state.circles) {
                    app.mouse_down(target);
                }
            }
            app.frame(SIM_DT);
            frames += 1;

            if let Some(c) = app.state.circles.iter().find(|c| !c.pos.is_finite()) {
                return Err(RunError::RunFailed(format!(
                    "circle {} left the arena at frame {frames}",
                    c.id
                )));
            }
        }

        if app.state.screen == Screen::Playing {
            app.key_down(Key::Escape, false);
        }

        let label = app.state.mode_label();
        let rounds = match app.state.mode {
            GameMode::Endless => app.state.round.saturating_sub(1),
            GameMode::Timed => app.state.round,
        };
        let summary = Summary {
            score: app.state.score,
            rounds,
            label,
            rating: performance_rating(&app.state).0,
            frames,
        };

        if let Some(name) = args.name.as_deref() {
            for c in name.chars() {
                app.key_down(Key::Char(c), false);
            }
            app.key_down(Key::Enter, false);
            if app.last_submission.is_none() {
                return Err(RunError::RunFailed(format!("score for '{name}' was not recorded")));
            }
        }
        Ok(summary)
    }

    /// Point the autoplayer clicks: the first visible hittable circle
    fn pick_target(circles: &[Circle]) -> Option<Vec2> {
        circles.iter().filter(|c| !c.dying && !c.is_invisible()).find_map(|c| {
            let p = match &c.state {
                KindState::Snake(snake) => match snake.expected_segment() {
                    Some(i) => snake.segments[i],
                    None => c.pos,
                },
                _ => c.pos,
            };
            (c.hit_test(p) != Hit::Miss).then_some(p)
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn temp_dir(name: &str) -> PathBuf {
            let dir = std::env::temp_dir().join(format!(
                "circle-clicker-run-{}-{}",
                name,
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            dir
        }

        fn args(extra: &[&str], dir: &PathBuf) -> Args {
            let mut argv = vec!["circle-clicker", "--seed", "7", "--data-dir"];
            let dir = dir.to_string_lossy().into_owned();
            argv.push(&dir);
            argv.extend_from_slice(extra);
            parse_args(argv).unwrap()
        }

        #[test]
        fn test_unknown_flag_is_invalid_arguments() {
            let err = parse_args(["circle-clicker", "--bogus"]).unwrap_err();
            assert!(matches!(err, RunError::InvalidArguments(_)));
            assert!(err.to_string().starts_with("invalid arguments:"));
        }

        #[test]
        fn test_bad_values_are_rejected() {
            let dir = temp_dir("bad");
            for extra in [
                &["--difficulty", "Impossible"][..],
                &["--duration", "10"][..],
                &["--frames", "0"][..],
            ] {
                let err = run_with(args(extra, &dir)).unwrap_err();
                assert!(matches!(err, RunError::InvalidArguments(_)), "{extra:?}");
            }
        }

        #[test]
        fn test_error_messages_are_distinct() {
            let a = RunError::InvalidArguments("x".into()).to_string();
            let b = RunError::StoreUnavailable(StoreError::Unavailable("x".into())).to_string();
            let c = RunError::RunFailed("x".into()).to_string();
            assert_ne!(a, b);
            assert_ne!(b, c);
            assert_ne!(a, c);
        }

        #[test]
        fn test_short_run_records_named_score() {
            let dir = temp_dir("named");
            let summary =
                run_with(args(&["--frames", "600", "--name", "Bot"], &dir)).unwrap();
            assert_eq!(summary.frames, 600);
            assert_eq!(summary.label, "Medium (Endless)");
            assert!(dir.join("high_scores.json").exists());
            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn test_same_seed_same_result() {
            let dir = temp_dir("seed");
            let a = run_with(args(&["--frames", "300"], &dir)).unwrap();
            let b = run_with(args(&["--frames", "300"], &dir)).unwrap();
            assert_eq!(a.score, b.score);
            assert_eq!(a.rounds, b.rounds);
            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn test_timed_mode_starts() {
            let dir = temp_dir("timed");
            let summary = run_with(args(
                &["--mode", "timed", "--duration", "60", "--frames", "120"],
                &dir,
            ))
            .unwrap();
            assert!(summary.label.contains("60"));
            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match headless::run() {
        Ok(summary) => {
            println!(
                "Score: {}  Rounds: {}  Mode: {}  Performance: {}  ({} frames)",
                summary.score, summary.rounds, summary.label, summary.rating, summary.frames
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
