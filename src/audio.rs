//! Audio cues using the Web Audio API
//!
//! Every cue is a handful of synthesized tones, so no sound files ship with
//! the game. Playback is best effort: a missing or suspended context just
//! means silence.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::settings::Settings;
use crate::sim::SoundEffect;

/// One oscillator burst
#[derive(Debug, Clone, Copy)]
struct Tone {
    freq: f32,
    /// Exponential glide target over the tone's length
    glide_to: Option<f32>,
    wave: OscillatorType,
    /// Peak gain before the volume setting is applied
    level: f32,
    /// Start offset in seconds
    delay: f64,
    duration: f64,
}

impl Tone {
    const fn new(freq: f32, wave: OscillatorType, level: f32, duration: f64) -> Self {
        Self {
            freq,
            glide_to: None,
            wave,
            level,
            delay: 0.0,
            duration,
        }
    }

    const fn glide(mut self, to: f32) -> Self {
        self.glide_to = Some(to);
        self
    }

    const fn after(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}

fn tones_for(effect: SoundEffect) -> Vec<Tone> {
    use OscillatorType::{Sawtooth, Sine, Square, Triangle};

    match effect {
        SoundEffect::DotPickup => vec![Tone::new(880.0, Square, 0.12, 0.05)],
        SoundEffect::PowerPickup => vec![
            Tone::new(220.0, Sawtooth, 0.25, 0.35).glide(880.0),
            Tone::new(440.0, Sine, 0.2, 0.3).glide(1760.0).after(0.05),
        ],
        SoundEffect::PursuerEaten => vec![
            Tone::new(1200.0, Triangle, 0.3, 0.2).glide(300.0),
            Tone::new(600.0, Sine, 0.2, 0.15).after(0.1),
        ],
        SoundEffect::PlayerShot => vec![Tone::new(900.0, Square, 0.15, 0.08).glide(400.0)],
        SoundEffect::EnemyShot => vec![Tone::new(300.0, Sawtooth, 0.12, 0.1).glide(150.0)],
        SoundEffect::EnemyDestroyed => vec![
            Tone::new(180.0, Sawtooth, 0.3, 0.2).glide(40.0),
            Tone::new(3000.0, Square, 0.08, 0.06),
        ],
        SoundEffect::BossHit => vec![Tone::new(90.0, Square, 0.3, 0.12).glide(60.0)],
        SoundEffect::BossAppears => vec![
            Tone::new(55.0, Sawtooth, 0.4, 1.4).glide(40.0),
            Tone::new(58.0, Sawtooth, 0.3, 1.4).glide(41.0),
            Tone::new(110.0, Sine, 0.25, 1.0).after(0.4),
        ],
        SoundEffect::LevelClear => [523.25, 659.25, 783.99, 1046.5]
            .iter()
            .enumerate()
            .map(|(i, &f)| Tone::new(f, Triangle, 0.3, 0.25).after(i as f64 * 0.1))
            .collect(),
        SoundEffect::Jumpscare => vec![
            Tone::new(1800.0, Sawtooth, 0.6, 0.9).glide(90.0),
            Tone::new(1850.0, Square, 0.4, 0.9).glide(70.0),
            Tone::new(45.0, Sine, 0.6, 1.2),
        ],
    }
}

/// Plays cues drained from the session
pub struct AudioManager {
    ctx: Option<AudioContext>,
    volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: Settings::default().effective_sfx_volume(),
            muted: false,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.volume = settings.effective_sfx_volume();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn play(&self, effect: SoundEffect) {
        if self.muted || self.volume <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let t = ctx.current_time();
        for tone in tones_for(effect) {
            self.sound(ctx, &tone, t);
        }
    }

    pub fn play_all(&self, effects: &[SoundEffect]) {
        for &effect in effects {
            self.play(effect);
        }
    }

    fn create_osc(&self, ctx: &AudioContext, tone: &Tone) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(tone.wave);
        osc.frequency().set_value(tone.freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    fn sound(&self, ctx: &AudioContext, tone: &Tone, now: f64) {
        let Some((osc, gain)) = self.create_osc(ctx, tone) else {
            return;
        };
        let start = now + tone.delay;
        let end = start + tone.duration;

        gain.gain().set_value_at_time(0.0, now).ok();
        gain.gain()
            .set_value_at_time(tone.level * self.volume, start)
            .ok();
        gain.gain().exponential_ramp_to_value_at_time(0.001, end).ok();
        if let Some(to) = tone.glide_to {
            osc.frequency().set_value_at_time(tone.freq, start).ok();
            osc.frequency().exponential_ramp_to_value_at_time(to, end).ok();
        }

        osc.start_with_when(start).ok();
        osc.stop_with_when(end + 0.02).ok();
    }
}
