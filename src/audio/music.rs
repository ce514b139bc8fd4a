//! Background music with cross-fades
//!
//! The menu has one looping track; gameplay cycles through a shuffled
//! playlist. Switching between them fades the current track out, starts the
//! queued one silent and fades it back in. The actual decoding and output is
//! behind [`MusicBackend`] so the transition logic runs anywhere.

use rand::Rng;
use rand::seq::SliceRandom;

/// Looping menu track
pub const MENU_TRACK: &str = "Neon Stillness";
/// Gameplay playlist (shuffled per session)
pub const GAME_TRACKS: [&str; 2] = ["Echoes in the Void", "Neon Currents"];
/// Full music volume
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.15;
/// Fade rate in volume units per second
pub const FADE_SPEED: f32 = 0.1;

/// Plays one track at a time
pub trait MusicBackend {
    /// Start `track` from the beginning, replacing whatever was playing
    fn play(&mut self, track: &'static str, looping: bool);
    fn set_volume(&mut self, volume: f32);
    fn stop(&mut self);
    /// Something is currently playing
    fn is_busy(&self) -> bool;
    /// The current non-looping track reached its end
    fn finished(&self) -> bool;
}

impl<B: MusicBackend + ?Sized> MusicBackend for Box<B> {
    fn play(&mut self, track: &'static str, looping: bool) {
        (**self).play(track, looping)
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }
}

/// Backend for headless runs: remembers the track, outputs nothing
#[derive(Debug, Default)]
pub struct SilentMusic {
    playing: Option<&'static str>,
}

impl SilentMusic {
    pub fn playing(&self) -> Option<&'static str> {
        self.playing
    }
}

impl MusicBackend for SilentMusic {
    fn play(&mut self, track: &'static str, _looping: bool) {
        self.playing = Some(track);
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn stop(&mut self) {
        self.playing = None;
    }

    fn is_busy(&self) -> bool {
        self.playing.is_some()
    }

    fn finished(&self) -> bool {
        false
    }
}

/// A track waiting for the fade-out to finish
#[derive(Debug, Clone, Copy, PartialEq)]
struct Queued {
    track: &'static str,
    looping: bool,
}

/// Music transition manager
pub struct MusicPlayer<B: MusicBackend> {
    backend: B,
    /// Music is switched on in the accessibility settings
    enabled: bool,
    /// Full volume in `[0, 1]`
    volume: f32,
    /// Volume right now (ramps during fades)
    current_volume: f32,
    fade_target: f32,
    fading_out: bool,
    next: Option<Queued>,
    current_track: Option<&'static str>,
    game_tracks: Vec<&'static str>,
    track_index: usize,
    menu_music: bool,
}

impl<B: MusicBackend> MusicPlayer<B> {
    /// Create a player with the game playlist shuffled by `rng`
    pub fn new<R: Rng + ?Sized>(backend: B, rng: &mut R) -> Self {
        let mut game_tracks = GAME_TRACKS.to_vec();
        game_tracks.shuffle(rng);
        Self {
            backend,
            enabled: true,
            volume: DEFAULT_MUSIC_VOLUME,
            current_volume: 0.0,
            fade_target: 0.0,
            fading_out: false,
            next: None,
            current_track: None,
            game_tracks,
            track_index: 0,
            menu_music: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_track(&self) -> Option<&'static str> {
        self.current_track
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn is_fading_out(&self) -> bool {
        self.fading_out
    }

    pub fn is_menu_music(&self) -> bool {
        self.menu_music
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Playlist order for this session
    pub fn game_tracks(&self) -> &[&'static str] {
        &self.game_tracks
    }

    /// Follow the music toggle. Turning music off stops it; turning it back on
    /// is completed by the caller asking for the music of the current screen.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    /// Switch to the looping menu track
    pub fn play_menu(&mut self) {
        if !self.enabled {
            self.halt_backend();
            return;
        }
        if self.menu_music && self.current_track == Some(MENU_TRACK) {
            return;
        }
        if self.backend.is_busy() && !self.fading_out {
            self.fade_out(Some(Queued {
                track: MENU_TRACK,
                looping: true,
            }));
        } else {
            self.start(MENU_TRACK, true);
            self.fade_in();
        }
        self.menu_music = true;
    }

    /// Switch to the game playlist, keeping a game track that is already playing
    pub fn play_game(&mut self) {
        if !self.enabled {
            self.halt_backend();
            return;
        }
        self.menu_music = false;

        if self.current_track.is_some_and(|t| self.game_tracks.contains(&t)) {
            if self.fading_out {
                // Cancel a fade toward the menu and bring this track back up
                self.fading_out = false;
                self.next = None;
                self.fade_target = self.volume;
            }
            return;
        }

        let Some(&track) = self.game_tracks.get(self.track_index) else {
            return;
        };
        if self.backend.is_busy() && !self.fading_out {
            self.fade_out(Some(Queued {
                track,
                looping: false,
            }));
        } else {
            self.start(track, false);
            self.fade_in();
        }
    }

    /// Advance fades and the playlist by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        let step = FADE_SPEED * dt;
        if self.fading_out {
            self.current_volume = (self.current_volume - step).max(0.0);
            self.backend.set_volume(self.current_volume);
            if self.current_volume <= 0.0 {
                if let Some(next) = self.next.take() {
                    self.start(next.track, next.looping);
                    self.fade_in();
                }
                self.fading_out = false;
            }
        } else if self.current_volume < self.fade_target {
            self.current_volume = (self.current_volume + step).min(self.volume);
            self.backend.set_volume(self.current_volume);
        }

        let advance = self.backend.finished() && !self.menu_music && !self.fading_out;
        if advance && !self.game_tracks.is_empty() {
            self.track_index = (self.track_index + 1) % self.game_tracks.len();
            let track = self.game_tracks[self.track_index];
            self.start(track, false);
            self.fade_in();
        }
    }

    /// Change full volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if !self.fading_out && self.current_volume > 0.0 {
            self.current_volume = self.volume;
            self.fade_target = self.volume;
            self.backend.set_volume(self.current_volume);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Stop playback and forget every pending transition
    pub fn stop(&mut self) {
        self.backend.stop();
        self.menu_music = false;
        self.fading_out = false;
        self.next = None;
        self.current_volume = 0.0;
        self.fade_target = 0.0;
        self.current_track = None;
    }

    fn halt_backend(&mut self) {
        if self.backend.is_busy() {
            self.stop();
        }
    }

    fn start(&mut self, track: &'static str, looping: bool) {
        self.backend.set_volume(self.current_volume);
        self.backend.play(track, looping);
        self.current_track = Some(track);
        log::debug!("Music: {track}");
    }

    fn fade_out(&mut self, next: Option<Queued>) {
        self.fading_out = true;
        self.fade_target = 0.0;
        self.next = next;
    }

    fn fade_in(&mut self) {
        self.fading_out = false;
        self.fade_target = self.volume;
        self.current_volume = 0.0;
        self.backend.set_volume(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Records what the player asked for
    #[derive(Default)]
    struct MockBackend {
        playing: Option<(&'static str, bool)>,
        volume: f32,
        ended: bool,
        plays: Vec<&'static str>,
    }

    impl MusicBackend for MockBackend {
        fn play(&mut self, track: &'static str, looping: bool) {
            self.playing = Some((track, looping));
            self.ended = false;
            self.plays.push(track);
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn stop(&mut self) {
            self.playing = None;
        }

        fn is_busy(&self) -> bool {
            self.playing.is_some() && !self.ended
        }

        fn finished(&self) -> bool {
            self.ended
        }
    }

    fn player() -> MusicPlayer<MockBackend> {
        let mut rng = Pcg32::seed_from_u64(3);
        MusicPlayer::new(MockBackend::default(), &mut rng)
    }

    /// Run the fade for `secs` seconds in 60 Hz steps
    fn run(p: &mut MusicPlayer<MockBackend>, secs: f32) {
        for _ in 0..(secs * 60.0) as u32 {
            p.update(1.0 / 60.0);
        }
    }

    #[test]
    fn test_menu_starts_silent_and_fades_in() {
        let mut p = player();
        p.play_menu();
        assert_eq!(p.backend().playing, Some((MENU_TRACK, true)));
        assert_eq!(p.current_volume(), 0.0);
        run(&mut p, 0.75);
        assert!(p.current_volume() > 0.05);
        run(&mut p, 2.0);
        assert!((p.current_volume() - DEFAULT_MUSIC_VOLUME).abs() < 1e-6);
        assert!((p.backend().volume - DEFAULT_MUSIC_VOLUME).abs() < 1e-6);
    }

    #[test]
    fn test_menu_again_is_noop() {
        let mut p = player();
        p.play_menu();
        run(&mut p, 2.0);
        p.play_menu();
        assert_eq!(p.backend().plays.len(), 1);
        assert!(!p.is_fading_out());
    }

    #[test]
    fn test_menu_to_game_crossfades() {
        let mut p = player();
        p.play_menu();
        run(&mut p, 2.0);
        p.play_game();
        assert!(p.is_fading_out());
        assert_eq!(p.current_track(), Some(MENU_TRACK));

        run(&mut p, 2.0);
        let first = p.game_tracks()[0];
        assert_eq!(p.current_track(), Some(first));
        assert_eq!(p.backend().playing, Some((first, false)));
        assert!(!p.is_fading_out());
    }

    #[test]
    fn test_game_track_not_restarted() {
        let mut p = player();
        p.play_game();
        run(&mut p, 1.0);
        p.play_game();
        assert_eq!(p.backend().plays.len(), 1);
    }

    #[test]
    fn test_game_back_to_menu_loops_menu() {
        let mut p = player();
        p.play_game();
        run(&mut p, 2.0);
        p.play_menu();
        run(&mut p, 2.0);
        assert_eq!(p.backend().playing, Some((MENU_TRACK, true)));
        assert!(p.is_menu_music());
    }

    #[test]
    fn test_returning_to_game_mid_fade_cancels_fade() {
        let mut p = player();
        p.play_game();
        run(&mut p, 2.0);
        p.play_menu();
        run(&mut p, 0.2);
        p.play_game();
        assert!(!p.is_fading_out());
        run(&mut p, 2.0);
        assert_eq!(p.backend().plays.len(), 1);
        assert!((p.current_volume() - DEFAULT_MUSIC_VOLUME).abs() < 1e-6);
    }

    #[test]
    fn test_playlist_advances_cyclically() {
        let mut p = player();
        p.play_game();
        let order = p.game_tracks().to_vec();
        for i in 1..=3 {
            p.backend.ended = true;
            p.update(1.0 / 60.0);
            assert_eq!(p.current_track(), Some(order[i % order.len()]));
        }
    }

    #[test]
    fn test_menu_track_end_does_not_advance() {
        let mut p = player();
        p.play_menu();
        p.backend.ended = true;
        p.update(1.0 / 60.0);
        assert_eq!(p.backend().plays.len(), 1);
    }

    #[test]
    fn test_disabled_music_stops() {
        let mut p = player();
        p.play_menu();
        p.set_enabled(false);
        assert!(p.backend().playing.is_none());
        p.play_game();
        assert!(p.backend().playing.is_none());
        assert_eq!(p.current_track(), None);

        p.set_enabled(true);
        p.play_game();
        assert!(p.backend().playing.is_some());
    }

    #[test]
    fn test_set_volume_clamps_and_applies() {
        let mut p = player();
        p.play_menu();
        run(&mut p, 2.0);
        p.set_volume(4.0);
        assert_eq!(p.volume(), 1.0);
        assert_eq!(p.current_volume(), 1.0);
        p.set_volume(-1.0);
        assert_eq!(p.volume(), 0.0);
    }

    #[test]
    fn test_stop_resets() {
        let mut p = player();
        p.play_menu();
        run(&mut p, 2.0);
        p.play_game();
        p.stop();
        assert!(!p.is_fading_out());
        assert!(!p.is_menu_music());
        assert_eq!(p.current_volume(), 0.0);
        run(&mut p, 2.0);
        assert!(p.backend().playing.is_none());
    }

    #[test]
    fn test_shuffle_keeps_all_tracks() {
        let p = player();
        let mut tracks = p.game_tracks().to_vec();
        tracks.sort();
        let mut expected = GAME_TRACKS.to_vec();
        expected.sort();
        assert_eq!(tracks, expected);
    }
}
