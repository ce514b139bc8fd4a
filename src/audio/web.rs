//! Web Audio playback
//!
//! Effects are rendered once by [`synth`](super::synth) into `AudioBuffer`s
//! and replayed through a gain node per shot. Tank hums loop while their
//! tank is alive. Music streams from `<audio>` elements.

use std::collections::HashMap;

use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, GainNode, HtmlAudioElement};

use super::music::MusicBackend;
use super::synth::{SAMPLE_RATE, samples_f32};
use super::{SoundEffect, Volumes};

/// Sound effect player for the browser
pub struct AudioManager {
    ctx: Option<AudioContext>,
    buffers: HashMap<SoundEffect, AudioBuffer>,
    /// Running hum loops
    hums: HashMap<SoundEffect, (AudioBufferSourceNode, GainNode)>,
    volumes: Volumes,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        let buffers = ctx
            .as_ref()
            .map(|ctx| {
                SoundEffect::ALL
                    .iter()
                    .filter_map(|&effect| Some((effect, render(ctx, effect)?)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            ctx,
            buffers,
            hums: HashMap::new(),
            volumes: Volumes::default(),
            muted: false,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Apply new volume levels, including to running hums
    pub fn set_volumes(&mut self, volumes: Volumes) {
        self.volumes = volumes;
        for (effect, (_, gain)) in &self.hums {
            gain.gain().set_value(self.gain_for(*effect));
        }
    }

    /// Mute/unmute all effects (page hidden)
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.set_volumes(self.volumes);
    }

    fn gain_for(&self, effect: SoundEffect) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volumes.for_channel(effect.channel())
        }
    }

    /// Play a one-shot sound effect
    pub fn play(&self, effect: SoundEffect) {
        let vol = self.gain_for(effect);
        if vol <= 0.0 || effect.is_loop() {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        if let Some((src, _)) = self.create_source(ctx, effect, vol) {
            src.start().ok();
        }
    }

    /// Start or stop the loop for a hum effect
    pub fn set_hum(&mut self, effect: SoundEffect, on: bool) {
        if !effect.is_loop() {
            return;
        }
        if !on {
            if let Some((src, _)) = self.hums.remove(&effect) {
                src.stop().ok();
            }
            return;
        }
        if self.hums.contains_key(&effect) {
            return;
        }
        let Some(ctx) = &self.ctx else { return };
        if let Some((src, gain)) = self.create_source(ctx, effect, self.gain_for(effect)) {
            src.set_loop(true);
            src.start().ok();
            self.hums.insert(effect, (src, gain));
        }
    }

    /// Silence every hum (leaving a game)
    pub fn stop_hums(&mut self) {
        for (_, (src, _)) in self.hums.drain() {
            src.stop().ok();
        }
    }

    /// Buffer source routed through its own gain node
    fn create_source(
        &self,
        ctx: &AudioContext,
        effect: SoundEffect,
        vol: f32,
    ) -> Option<(AudioBufferSourceNode, GainNode)> {
        let buffer = self.buffers.get(&effect)?;
        let src = ctx.create_buffer_source().ok()?;
        let gain = ctx.create_gain().ok()?;

        src.set_buffer(Some(buffer));
        gain.gain().set_value(vol);
        src.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((src, gain))
    }
}

/// Render one effect into a mono buffer
fn render(ctx: &AudioContext, effect: SoundEffect) -> Option<AudioBuffer> {
    let mut data = samples_f32(effect);
    let buffer = ctx
        .create_buffer(1, data.len() as u32, SAMPLE_RATE as f32)
        .ok()?;
    buffer.copy_to_channel(&mut data, 0).ok()?;
    Some(buffer)
}

/// Streams music tracks from `assets/<track>.mp3`
#[derive(Default)]
pub struct WebMusic {
    element: Option<HtmlAudioElement>,
    looping: bool,
}

impl MusicBackend for WebMusic {
    fn play(&mut self, track: &'static str, looping: bool) {
        self.stop();
        let url = format!("assets/{track}.mp3");
        match HtmlAudioElement::new_with_src(&url) {
            Ok(el) => {
                el.set_loop(looping);
                el.set_volume(0.0);
                // Rejected until the first user gesture; the next transition retries
                let _ = el.play();
                self.element = Some(el);
                self.looping = looping;
            }
            Err(e) => log::warn!("Failed to load {url}: {e:?}"),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(el) = &self.element {
            el.set_volume(volume as f64);
        }
    }

    fn stop(&mut self) {
        if let Some(el) = self.element.take() {
            let _ = el.pause();
        }
    }

    fn is_busy(&self) -> bool {
        self.element.as_ref().is_some_and(|el| !el.paused() && !el.ended())
    }

    fn finished(&self) -> bool {
        !self.looping && self.element.as_ref().is_some_and(|el| el.ended())
    }
}
