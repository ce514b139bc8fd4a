//! Procedural sound synthesis
//!
//! Every effect is a single oscillator whose frequency follows a curve over
//! the sound's progress `p` in `[0, 1)`. One-shots decay as `exp(-3p)`;
//! hums pulse with a slow "whump" envelope so they can loop seamlessly.

use std::f32::consts::TAU;

use super::SoundEffect;

/// Output sample rate (mono)
pub const SAMPLE_RATE: u32 = 22_050;
/// Peak sample amplitude before the envelope
const AMPLITUDE: f32 = 4096.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Square,
    Sawtooth,
    Sine,
}

impl Waveform {
    /// Sample the waveform at phase `freq * t` (in cycles)
    pub fn sample(self, cycles: f32) -> f32 {
        match self {
            Waveform::Square => {
                if (cycles * TAU).sin() > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * (cycles - (cycles + 0.5).floor()),
            Waveform::Sine => (cycles * TAU).sin(),
        }
    }
}

/// Synthesis parameters for one effect
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub duration: f32,
    pub volume: f32,
    pub waveform: Waveform,
    /// Pulse rate of the whump envelope; `None` for a decaying one-shot
    pub whump_hz: Option<f32>,
}

impl SoundEffect {
    pub fn voice(self) -> Voice {
        let (duration, volume, waveform) = match self {
            SoundEffect::Collision => (0.1, 0.15, Waveform::Square),
            SoundEffect::Spawn => (0.2, 0.1, Waveform::Square),
            SoundEffect::Death => (0.3, 0.12, Waveform::Sawtooth),
            SoundEffect::GameOver => (0.5, 0.15, Waveform::Square),
            SoundEffect::Coin => (0.3, 0.2, Waveform::Square),
            SoundEffect::TankHit => (0.15, 0.18, Waveform::Sawtooth),
            SoundEffect::SupertankHit => (0.2, 0.2, Waveform::Sawtooth),
            SoundEffect::TankDeath => (0.4, 0.16, Waveform::Sawtooth),
            SoundEffect::SupertankDeath => (0.6, 0.35, Waveform::Sawtooth),
            SoundEffect::TankHum => (2.0, 0.6, Waveform::Sine),
            SoundEffect::SupertankHum => (0.5, 0.4, Waveform::Sine),
            SoundEffect::Hit => (0.3, 0.5, Waveform::Square),
            SoundEffect::Explosion => (0.4, 0.7, Waveform::Sawtooth),
            SoundEffect::Beep => (0.1, 0.3, Waveform::Sine),
        };
        let whump_hz = match self {
            SoundEffect::TankHum => Some(1.2),
            SoundEffect::SupertankHum => Some(0.8),
            _ => None,
        };
        Voice {
            duration,
            volume,
            waveform,
            whump_hz,
        }
    }

    /// Instantaneous frequency at progress `p`
    pub fn frequency(self, p: f32) -> f32 {
        match self {
            SoundEffect::Collision => 800.0 - 400.0 * p,
            SoundEffect::Spawn => 200.0 + 600.0 * p,
            SoundEffect::Death | SoundEffect::Explosion => 300.0 - 250.0 * p,
            SoundEffect::GameOver => 1500.0 - 1400.0 * p,
            SoundEffect::Coin => {
                if p < 0.5 {
                    1000.0 + 2000.0 * p
                } else {
                    2000.0 - 1000.0 * (p - 0.5)
                }
            }
            SoundEffect::TankHit => {
                (120.0 + 180.0 * (p * 8.0).sin()) * (1.0 + 0.3 * (p * 16.0).sin())
            }
            SoundEffect::SupertankHit => {
                (80.0 + 220.0 * (p * 10.0).sin()) * (1.0 + 0.5 * (p * 20.0).sin())
            }
            SoundEffect::TankDeath => 400.0 - 350.0 * p + 50.0 * (p * 12.0).sin(),
            SoundEffect::SupertankDeath => {
                500.0 - 450.0 * p + 30.0 * (p * 25.0).sin() * (p * 37.0).sin()
            }
            SoundEffect::TankHum => 120.0,
            SoundEffect::SupertankHum => 90.0,
            SoundEffect::Hit => 800.0 - 700.0 * p,
            SoundEffect::Beep => 1200.0,
        }
    }
}

/// Rhythmic loudness for hums: rise, hold, fall, never below half
pub fn whump(t: f32, pulse_hz: f32) -> f32 {
    let cycle = (t * pulse_hz).fract();
    let shape = if cycle < 0.3 {
        cycle / 0.3
    } else if cycle < 0.7 {
        1.0
    } else {
        1.0 - (cycle - 0.7) / 0.3
    };
    0.5 + 0.5 * shape * shape
}

/// Render an effect to signed 16-bit mono samples
pub fn samples(effect: SoundEffect) -> Vec<i16> {
    let voice = effect.voice();
    let frames = (voice.duration * SAMPLE_RATE as f32) as usize;
    (0..frames)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let p = i as f32 / frames as f32;
            let wave = voice.waveform.sample(effect.frequency(p) * t);
            let envelope = match voice.whump_hz {
                Some(hz) => voice.volume * whump(t, hz),
                None => (-3.0 * p).exp() * voice.volume,
            };
            (AMPLITUDE * wave * envelope) as i16
        })
        .collect()
}

/// Samples as `[-1, 1]` floats for Web Audio buffers
pub fn samples_f32(effect: SoundEffect) -> Vec<f32> {
    samples(effect)
        .into_iter()
        .map(|s| s as f32 / i16::MAX as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_match_durations() {
        assert_eq!(samples(SoundEffect::Collision).len(), 2205);
        assert_eq!(samples(SoundEffect::TankHum).len(), 44_100);
        assert_eq!(samples(SoundEffect::SupertankDeath).len(), 13_230);
    }

    #[test]
    fn test_every_effect_renders_and_stays_bounded() {
        for effect in SoundEffect::ALL {
            let s = samples(effect);
            assert!(!s.is_empty(), "{effect:?}");
            let peak = effect.voice().volume * AMPLITUDE;
            assert!(s.iter().all(|&x| (x as f32).abs() <= peak + 1.0), "{effect:?}");
        }
    }

    #[test]
    fn test_one_shots_decay() {
        let s = samples(SoundEffect::Hit);
        let head: i32 = s[..200].iter().map(|&x| (x as i32).abs()).max().unwrap_or(0);
        let tail: i32 = s[s.len() - 200..]
            .iter()
            .map(|&x| (x as i32).abs())
            .max()
            .unwrap_or(0);
        assert!(tail < head / 2);
    }

    #[test]
    fn test_coin_sweeps_up_then_down() {
        let e = SoundEffect::Coin;
        assert_eq!(e.frequency(0.0), 1000.0);
        assert!((e.frequency(0.5) - 2000.0).abs() < 1e-3);
        assert!((e.frequency(1.0) - 1500.0).abs() < 1e-3);
    }

    #[test]
    fn test_whump_envelope() {
        assert!((whump(0.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((whump(0.5, 1.0) - 1.0).abs() < 1e-6);
        for i in 0..100 {
            let w = whump(i as f32 * 0.037, 1.2);
            assert!((0.5..=1.0).contains(&w));
        }
    }

    #[test]
    fn test_waveforms() {
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
        assert!((Waveform::Sawtooth.sample(0.25) - 0.5).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-6);
    }
}
