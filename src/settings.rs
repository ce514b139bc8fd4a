//! Accessibility settings and volume levels
//!
//! Persisted as one JSON record under [`Settings::STORAGE_KEY`]. Loading is
//! lenient and merges key by key: unknown keys are ignored, missing or
//! mistyped keys keep their defaults and an out-of-range click radius falls
//! back to the default.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::audio::Volumes;
use crate::consts::{DEFAULT_CLICK_RADIUS, MAX_CLICK_RADIUS, MIN_CLICK_RADIUS};
use crate::persistence::{self, Store};
use crate::sim::PlayOptions;

/// One toggle in the accessibility menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessibilityOption {
    PipeWarningFlash,
    DynamicBackground,
    ClickRadiusHelper,
    DisablePipes,
    DisableSpinners,
    MusicEnabled,
}

impl AccessibilityOption {
    /// Menu order
    pub const ALL: [AccessibilityOption; 6] = [
        AccessibilityOption::PipeWarningFlash,
        AccessibilityOption::DynamicBackground,
        AccessibilityOption::ClickRadiusHelper,
        AccessibilityOption::DisablePipes,
        AccessibilityOption::DisableSpinners,
        AccessibilityOption::MusicEnabled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AccessibilityOption::PipeWarningFlash => "Pipe Warning Flash",
            AccessibilityOption::DynamicBackground => "Dynamic Star Background",
            AccessibilityOption::ClickRadiusHelper => "Click Radius Helper",
            AccessibilityOption::DisablePipes => "Disable Pipes",
            AccessibilityOption::DisableSpinners => "Disable Spinners",
            AccessibilityOption::MusicEnabled => "Background Music",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AccessibilityOption::PipeWarningFlash => "Shows a blue flash 0.5s before a pipe spawns",
            AccessibilityOption::DynamicBackground => "Animated background gradient",
            AccessibilityOption::ClickRadiusHelper => {
                "Shows visual click area around cursor (use +/- to resize)"
            }
            AccessibilityOption::DisablePipes => "Completely disable pipe obstacles from spawning",
            AccessibilityOption::DisableSpinners => {
                "Completely disable spinner obstacles from spawning"
            }
            AccessibilityOption::MusicEnabled => "Enable or disable background music",
        }
    }
}

/// Accessibility toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Accessibility {
    pub pipe_warning_flash: bool,
    pub dynamic_background: bool,
    pub click_radius_helper: bool,
    pub disable_pipes: bool,
    pub disable_spinners: bool,
    pub music_enabled: bool,
}

impl Default for Accessibility {
    fn default() -> Self {
        Self {
            pipe_warning_flash: true,
            dynamic_background: true,
            click_radius_helper: false,
            disable_pipes: false,
            disable_spinners: false,
            music_enabled: true,
        }
    }
}

impl Accessibility {
    pub fn get(&self, option: AccessibilityOption) -> bool {
        match option {
            AccessibilityOption::PipeWarningFlash => self.pipe_warning_flash,
            AccessibilityOption::DynamicBackground => self.dynamic_background,
            AccessibilityOption::ClickRadiusHelper => self.click_radius_helper,
            AccessibilityOption::DisablePipes => self.disable_pipes,
            AccessibilityOption::DisableSpinners => self.disable_spinners,
            AccessibilityOption::MusicEnabled => self.music_enabled,
        }
    }

    /// Flip a toggle, returning its new value
    pub fn toggle(&mut self, option: AccessibilityOption) -> bool {
        let flag = match option {
            AccessibilityOption::PipeWarningFlash => &mut self.pipe_warning_flash,
            AccessibilityOption::DynamicBackground => &mut self.dynamic_background,
            AccessibilityOption::ClickRadiusHelper => &mut self.click_radius_helper,
            AccessibilityOption::DisablePipes => &mut self.disable_pipes,
            AccessibilityOption::DisableSpinners => &mut self.disable_spinners,
            AccessibilityOption::MusicEnabled => &mut self.music_enabled,
        };
        *flag = !*flag;
        *flag
    }
}

/// Persisted player preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Settings {
    pub accessibility: Accessibility,
    /// Click helper reach in pixels, `[10, 100]`
    pub click_radius: u32,
    pub volumes: Volumes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accessibility: Accessibility::default(),
            click_radius: DEFAULT_CLICK_RADIUS,
            volumes: Volumes::default(),
        }
    }
}

/// Overwrite `target` with `obj[key]` when present and of the right type
fn merge<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, target: &mut T) {
    if let Some(value) = obj.get(key) {
        match T::deserialize(value) {
            Ok(v) => *target = v,
            Err(e) => log::warn!("Ignoring setting '{key}': {e}"),
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "accessibility_settings.json";

    /// Click radius step for the =/- keys
    pub const CLICK_RADIUS_STEP: u32 = 5;

    /// Parse a stored record
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let root: Value = serde_json::from_str(text)?;
        let root = root
            .as_object()
            .ok_or_else(|| serde_json::Error::custom("settings record is not an object"))?;
        let mut settings = Self::default();

        if let Some(obj) = root.get("accessibility").and_then(Value::as_object) {
            let a = &mut settings.accessibility;
            merge(obj, "pipe_warning_flash", &mut a.pipe_warning_flash);
            merge(obj, "dynamic_background", &mut a.dynamic_background);
            merge(obj, "click_radius_helper", &mut a.click_radius_helper);
            merge(obj, "disable_pipes", &mut a.disable_pipes);
            merge(obj, "disable_spinners", &mut a.disable_spinners);
            merge(obj, "music_enabled", &mut a.music_enabled);
        }

        let range = MIN_CLICK_RADIUS as f64..=MAX_CLICK_RADIUS as f64;
        if let Some(r) = root
            .get("click_radius")
            .and_then(Value::as_f64)
            .filter(|r| range.contains(r))
        {
            settings.click_radius = r as u32;
        }

        if let Some(obj) = root.get("volumes").and_then(Value::as_object) {
            let v = &mut settings.volumes;
            merge(obj, "master", &mut v.master);
            merge(obj, "tank", &mut v.tank);
            merge(obj, "effects", &mut v.effects);
        }
        settings.volumes = settings.volumes.sanitized();
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load(store: &dyn Store) -> Self {
        match store.load(Self::STORAGE_KEY) {
            Ok(Some(text)) => match Self::from_json(&text) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring malformed settings: {e}");
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to read settings: {e}");
                Self::default()
            }
        }
    }

    /// Save settings; failures are logged and otherwise ignored
    pub fn save(&self, store: &mut dyn Store) {
        match persistence::save_json(store, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {e}"),
        }
    }

    /// Grow or shrink the click helper by one step, clamped to `[10, 100]`
    pub fn adjust_click_radius(&mut self, grow: bool) {
        self.click_radius = if grow {
            (self.click_radius + Self::CLICK_RADIUS_STEP).min(MAX_CLICK_RADIUS)
        } else {
            self.click_radius
                .saturating_sub(Self::CLICK_RADIUS_STEP)
                .max(MIN_CLICK_RADIUS)
        };
    }

    /// Simulation options derived from these settings
    pub fn play_options(&self) -> PlayOptions {
        PlayOptions {
            pipe_warning_flash: self.accessibility.pipe_warning_flash,
            click_radius_helper: self.accessibility.click_radius_helper,
            click_radius: self.click_radius as f32,
            disable_pipes: self.accessibility.disable_pipes,
            disable_spinners: self.accessibility.disable_spinners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.accessibility.pipe_warning_flash);
        assert!(s.accessibility.music_enabled);
        assert!(!s.accessibility.click_radius_helper);
        assert_eq!(s.click_radius, 30);
        assert_eq!(s.volumes.tank, 3.5);
    }

    #[test]
    fn test_unknown_keys_ignored_missing_keys_default() {
        let s = Settings::from_json(
            r#"{"accessibility": {"disable_pipes": true, "sparkles": true}, "theme": "dark"}"#,
        )
        .unwrap();
        assert!(s.accessibility.disable_pipes);
        assert!(s.accessibility.pipe_warning_flash);
        assert_eq!(s.click_radius, DEFAULT_CLICK_RADIUS);
        assert_eq!(s.volumes, Volumes::default());
    }

    #[test]
    fn test_mistyped_keys_keep_other_settings() {
        let s = Settings::from_json(
            r#"{
                "accessibility": {"disable_pipes": true, "music_enabled": null, "dynamic_background": "yes"},
                "click_radius": 45,
                "volumes": {"master": "loud", "effects": 0.5}
            }"#,
        )
        .unwrap();
        assert!(s.accessibility.disable_pipes);
        assert!(s.accessibility.music_enabled);
        assert!(s.accessibility.dynamic_background);
        assert_eq!(s.click_radius, 45);
        assert_eq!(s.volumes.master, 1.0);
        assert_eq!(s.volumes.effects, 0.5);

        let s = Settings::from_json(r#"{"accessibility": 3, "volumes": [], "click_radius": 50}"#)
            .unwrap();
        assert_eq!(s.accessibility, Accessibility::default());
        assert_eq!(s.volumes, Volumes::default());
        assert_eq!(s.click_radius, 50);
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert!(Settings::from_json("[1, 2]").is_err());
        let mut store = MemoryStore::new();
        store.save(Settings::STORAGE_KEY, "42").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_out_of_range_radius_falls_back() {
        let s = Settings::from_json(r#"{"click_radius": 500}"#).unwrap();
        assert_eq!(s.click_radius, DEFAULT_CLICK_RADIUS);
        let s = Settings::from_json(r#"{"click_radius": 5}"#).unwrap();
        assert_eq!(s.click_radius, DEFAULT_CLICK_RADIUS);
        let s = Settings::from_json(r#"{"click_radius": 100}"#).unwrap();
        assert_eq!(s.click_radius, 100);
    }

    #[test]
    fn test_malformed_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.save(Settings::STORAGE_KEY, "not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let mut s = Settings::default();
        s.accessibility.toggle(AccessibilityOption::MusicEnabled);
        s.click_radius = 45;
        s.volumes.adjust_master(-0.5);
        s.save(&mut store);

        let back = Settings::load(&store);
        assert_eq!(back, s);
        let text = store.get(Settings::STORAGE_KEY).unwrap();
        assert!(text.contains("\"accessibility\""));
        assert!(text.contains("\"click_radius\":45"));
        assert!(text.contains("\"volumes\""));
    }

    #[test]
    fn test_toggle_every_option() {
        let mut a = Accessibility::default();
        for opt in AccessibilityOption::ALL {
            let before = a.get(opt);
            assert_eq!(a.toggle(opt), !before);
            assert_eq!(a.get(opt), !before);
        }
    }

    #[test]
    fn test_play_options_follow_settings() {
        let mut s = Settings::default();
        s.accessibility.disable_spinners = true;
        s.click_radius = 60;
        let opts = s.play_options();
        assert!(opts.disable_spinners);
        assert_eq!(opts.click_radius, 60.0);
    }

    proptest! {
        #[test]
        fn prop_click_radius_stays_in_range(steps in prop::collection::vec(any::<bool>(), 0..50)) {
            let mut s = Settings::default();
            for grow in steps {
                s.adjust_click_radius(grow);
                prop_assert!((MIN_CLICK_RADIUS..=MAX_CLICK_RADIUS).contains(&s.click_radius));
            }
        }

        #[test]
        fn prop_loaded_radius_in_range(r in -1000i64..1000) {
            let s = Settings::from_json(&format!("{{\"click_radius\": {r}}}")).unwrap();
            prop_assert!((MIN_CLICK_RADIUS..=MAX_CLICK_RADIUS).contains(&s.click_radius));
        }
    }
}
