//! Audio system
//!
//! Sound effects are synthesized procedurally (see [`synth`]), so the game
//! ships no sample files. Background music goes through [`music::MusicPlayer`],
//! which cross-fades between the menu track and the game playlist.
//!
//! The simulation only names effects; playback happens in the platform layer.

pub mod music;
pub mod synth;

#[cfg(target_arch = "wasm32")]
pub mod web;

use serde::{Deserialize, Serialize};

pub use music::{MusicBackend, MusicPlayer, SilentMusic};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Circle damaged but not destroyed
    Collision,
    /// Circle appeared
    Spawn,
    /// Circle destroyed (death animation starts)
    Death,
    GameOver,
    /// Points awarded
    Coin,
    TankHit,
    SupertankHit,
    TankDeath,
    SupertankDeath,
    /// Looping engine drone while a tank is alive
    TankHum,
    SupertankHum,
    /// Cursor touched a hazard
    Hit,
    /// Supertank self-destructed
    Explosion,
    /// Supertank countdown tick
    Beep,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 14] = [
        SoundEffect::Collision,
        SoundEffect::Spawn,
        SoundEffect::Death,
        SoundEffect::GameOver,
        SoundEffect::Coin,
        SoundEffect::TankHit,
        SoundEffect::SupertankHit,
        SoundEffect::TankDeath,
        SoundEffect::SupertankDeath,
        SoundEffect::TankHum,
        SoundEffect::SupertankHum,
        SoundEffect::Hit,
        SoundEffect::Explosion,
        SoundEffect::Beep,
    ];

    /// Mixer channel this effect plays on
    pub fn channel(self) -> Channel {
        match self {
            SoundEffect::TankHit
            | SoundEffect::SupertankHit
            | SoundEffect::TankDeath
            | SoundEffect::SupertankDeath
            | SoundEffect::TankHum
            | SoundEffect::SupertankHum => Channel::Tank,
            _ => Channel::Effects,
        }
    }

    /// Hums loop for as long as their tank lives
    pub fn is_loop(self) -> bool {
        matches!(self, SoundEffect::TankHum | SoundEffect::SupertankHum)
    }
}

/// Volume group an effect is mixed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Tank,
    Effects,
}

/// Master volume range
pub const MASTER_VOLUME_MAX: f32 = 2.0;
/// Tank volume range when adjusted from the keyboard
pub const TANK_VOLUME_MAX: f32 = 3.0;
/// Keyboard volume step
pub const VOLUME_STEP: f32 = 0.1;

/// Player volume levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volumes {
    pub master: f32,
    /// Tank sounds are quiet by nature, so this starts above its adjustable range
    pub tank: f32,
    pub effects: f32,
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            master: 1.0,
            tank: 3.5,
            effects: 1.0,
        }
    }
}

impl Volumes {
    /// Final gain for a channel
    pub fn for_channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Tank => self.master * self.tank,
            Channel::Effects => self.master * self.effects,
        }
    }

    /// Step master volume, clamped to `[0, 2]`
    pub fn adjust_master(&mut self, delta: f32) {
        self.master = (self.master + delta).clamp(0.0, MASTER_VOLUME_MAX);
    }

    /// Step tank volume, clamped to `[0, 3]`
    pub fn adjust_tank(&mut self, delta: f32) {
        self.tank = (self.tank + delta).clamp(0.0, TANK_VOLUME_MAX);
    }

    /// Replace non-finite or negative levels loaded from disk
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let fix = |v: f32, d: f32| if v.is_finite() && v >= 0.0 { v } else { d };
        Self {
            master: fix(self.master, defaults.master),
            tank: fix(self.tank, defaults.tank),
            effects: fix(self.effects, defaults.effects),
        }
    }
}
