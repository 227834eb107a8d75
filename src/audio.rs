//! Audio cue routing
//!
//! Maps simulation events onto sound effect cues and music transitions.
//! Effects are procedural: each one is a short list of oscillator voices, so
//! a backend needs nothing but a tone generator. [`LogSink`] just logs them.

use serde::Serialize;

use crate::settings::Settings;
use crate::sim::GameEvent;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoundEffect {
    /// Throttled footstep while moving
    Footstep,
    /// Boost charge spent
    Boost,
    Dash,
    /// Boost became available
    BoostReady,
    /// Paper delivered
    Delivery,
    /// Delivery inside the combo window
    ComboDelivery,
    /// Clipped by a car
    Crash,
    /// Ran through a puddle
    Splash,
    /// Power-up collected
    PowerUp,
    /// Power-up despawned unclaimed
    PowerUpFizzle,
    RoundStart,
    Pause,
    Resume,
    GameOver,
    /// New top score
    HighScore,
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One oscillator voice with an exponential frequency ramp and decay
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    pub wave: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    /// Seconds after the cue starts
    pub delay: f32,
    pub duration: f32,
    /// Peak gain before the sink's volume is applied
    pub gain: f32,
}

impl Tone {
    const fn new(
        wave: Waveform,
        start_hz: f32,
        end_hz: f32,
        delay: f32,
        duration: f32,
        gain: f32,
    ) -> Self {
        Self {
            wave,
            start_hz,
            end_hz,
            delay,
            duration,
            gain,
        }
    }
}

/// Rising or falling arpeggio of short notes
fn arpeggio(wave: Waveform, notes: &[f32], spacing: f32, duration: f32, gain: f32) -> Vec<Tone> {
    notes
        .iter()
        .enumerate()
        .map(|(i, &hz)| Tone::new(wave, hz, hz, i as f32 * spacing, duration, gain))
        .collect()
}

impl SoundEffect {
    /// Voices that make up this effect
    pub fn tones(self) -> Vec<Tone> {
        use Waveform::*;
        match self {
            SoundEffect::Footstep => vec![Tone::new(Triangle, 120.0, 90.0, 0.0, 0.05, 0.15)],
            SoundEffect::Boost => vec![Tone::new(Sawtooth, 200.0, 700.0, 0.0, 0.25, 0.3)],
            SoundEffect::Dash => vec![Tone::new(Triangle, 300.0, 900.0, 0.0, 0.12, 0.3)],
            SoundEffect::BoostReady => arpeggio(Square, &[440.0, 660.0, 880.0], 0.07, 0.12, 0.2),
            SoundEffect::Delivery => arpeggio(Sine, &[600.0, 800.0, 1000.0], 0.08, 0.15, 0.25),
            SoundEffect::ComboDelivery => {
                arpeggio(Triangle, &[600.0, 800.0, 1000.0, 1200.0], 0.06, 0.15, 0.3)
            }
            SoundEffect::Crash => vec![
                Tone::new(Square, 150.0, 40.0, 0.0, 0.3, 0.5),
                Tone::new(Sawtooth, 90.0, 30.0, 0.02, 0.35, 0.3),
            ],
            SoundEffect::Splash => vec![Tone::new(Sine, 900.0, 200.0, 0.0, 0.2, 0.3)],
            SoundEffect::PowerUp => arpeggio(Sine, &[700.0, 900.0, 1100.0], 0.05, 0.12, 0.25),
            SoundEffect::PowerUpFizzle => vec![Tone::new(Sine, 500.0, 250.0, 0.0, 0.25, 0.1)],
            SoundEffect::RoundStart => {
                arpeggio(Triangle, &[400.0, 500.0, 600.0, 800.0], 0.1, 0.4, 0.3)
            }
            SoundEffect::Pause => vec![Tone::new(Sine, 500.0, 400.0, 0.0, 0.1, 0.2)],
            SoundEffect::Resume => vec![Tone::new(Sine, 400.0, 500.0, 0.0, 0.1, 0.2)],
            SoundEffect::GameOver => arpeggio(Sine, &[400.0, 350.0, 300.0, 200.0], 0.2, 0.3, 0.3),
            SoundEffect::HighScore => {
                arpeggio(Triangle, &[500.0, 600.0, 700.0, 800.0, 1000.0], 0.08, 0.25, 0.25)
            }
        }
    }
}

/// Background music states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MusicState {
    Menu,
    InRound,
    Paused,
    GameOver,
}

/// Audio backend
pub trait AudioSink {
    /// Start a one-shot effect at `volume` (already includes master/mute)
    fn play(&mut self, effect: SoundEffect, tones: &[Tone], volume: f32);
    /// Switch the music loop
    fn set_music(&mut self, state: MusicState, volume: f32);
}

/// Sink that only logs cues; used by the headless runner
#[derive(Debug, Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play(&mut self, effect: SoundEffect, tones: &[Tone], volume: f32) {
        log::debug!("sfx {effect:?} ({} voices) at {volume:.2}", tones.len());
    }

    fn set_music(&mut self, state: MusicState, volume: f32) {
        log::debug!("music -> {state:?} at {volume:.2}");
    }
}

/// Routes game events to a sink according to the player's settings
pub struct AudioManager<S: AudioSink> {
    sink: S,
    settings: Settings,
    music: MusicState,
}

impl<S: AudioSink> AudioManager<S> {
    pub fn new(mut sink: S, settings: Settings) -> Self {
        sink.set_music(MusicState::Menu, settings.music_gain());
        Self {
            sink,
            settings,
            music: MusicState::Menu,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings and re-apply the music volume
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.sink.set_music(self.music, self.settings.music_gain());
    }

    pub fn music(&self) -> MusicState {
        self.music
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let volume = self.settings.sfx_gain();
        if volume <= 0.0 {
            return;
        }
        if effect == SoundEffect::Footstep && !self.settings.footsteps {
            return;
        }
        self.sink.play(effect, &effect.tones(), volume);
    }

    fn transition(&mut self, state: MusicState) {
        if self.music != state {
            self.music = state;
            self.sink.set_music(state, self.settings.music_gain());
        }
    }

    /// Back to the menu loop between rounds
    pub fn back_to_menu(&mut self) {
        self.transition(MusicState::Menu);
    }

    pub fn handle(&mut self, event: &GameEvent) {
        match event {
            GameEvent::RoundStarted => {
                self.play(SoundEffect::RoundStart);
                self.transition(MusicState::InRound);
            }
            GameEvent::Paused => {
                self.play(SoundEffect::Pause);
                self.transition(MusicState::Paused);
            }
            GameEvent::Resumed => {
                self.play(SoundEffect::Resume);
                self.transition(MusicState::InRound);
            }
            GameEvent::Step => self.play(SoundEffect::Footstep),
            GameEvent::BoostActivated => self.play(SoundEffect::Boost),
            GameEvent::DashActivated => self.play(SoundEffect::Dash),
            GameEvent::BoostUnlocked => self.play(SoundEffect::BoostReady),
            GameEvent::Delivered { combo, .. } if *combo > 0 => {
                self.play(SoundEffect::ComboDelivery)
            }
            GameEvent::Delivered { .. } => self.play(SoundEffect::Delivery),
            GameEvent::CarHit { .. } => self.play(SoundEffect::Crash),
            GameEvent::PuddleSplash { .. } => self.play(SoundEffect::Splash),
            GameEvent::PowerUpCollected { .. } => self.play(SoundEffect::PowerUp),
            GameEvent::PowerUpExpired { .. } => self.play(SoundEffect::PowerUpFizzle),
            GameEvent::RoundOver(_) => {
                self.play(SoundEffect::GameOver);
                self.transition(MusicState::GameOver);
            }
        }
    }

    pub fn handle_all(&mut self, events: &[GameEvent]) {
        for event in events {
            self.handle(event);
        }
    }
}
