//! Voice — one in-flight playback instance of the instrument sample.

use std::sync::Arc;

use super::gain::GainParam;
use super::sample::SampleBuffer;

/// A triggered sample playback: a read position advancing through the shared
/// buffer at a pitch-shifting rate, shaped by a per-voice gain stage.
#[derive(Debug, Clone)]
pub struct SampleVoice {
    buffer: Arc<SampleBuffer>,
    /// Fractional read position in the buffer.
    position: f64,
    /// Buffer samples consumed per output sample.
    step: f64,
    gain: GainParam,
    /// Absolute sample time at which the voice is forced silent.
    stop_at: Option<u64>,
    finished: bool,
}

impl SampleVoice {
    /// A voice playing `buffer` at `playback_rate` (1.0 = native pitch),
    /// rendered at `engine_rate` output samples per second.
    pub fn new(buffer: Arc<SampleBuffer>, playback_rate: f64, engine_rate: f64) -> Self {
        let sr_ratio = buffer.sample_rate as f64 / engine_rate;
        SampleVoice {
            buffer,
            position: 0.0,
            step: playback_rate * sr_ratio,
            gain: GainParam::new(1.0),
            stop_at: None,
            finished: false,
        }
    }

    /// Ramp the gain to zero over `fade_secs` starting from its current
    /// level at `now`, and stop the voice at ramp end. A shorter fade
    /// scheduled later wins; a longer one cannot extend an existing stop.
    pub fn fade_out(&mut self, now: u64, fade_secs: f64, engine_rate: f64) {
        let duration = (fade_secs * engine_rate) as u64;
        self.gain.ramp_to(0.0, now, duration);
        let stop = now + duration;
        self.stop_at = Some(match self.stop_at {
            Some(existing) => existing.min(stop),
            None => stop,
        });
    }

    /// Render the output sample at absolute time `t` and advance.
    pub fn next_sample(&mut self, t: u64) -> f64 {
        if self.finished {
            return 0.0;
        }
        if let Some(stop) = self.stop_at {
            if t >= stop {
                self.finished = true;
                return 0.0;
            }
        }

        let sample = self.buffer.read_interpolated(self.position) * self.gain.value_at(t);
        self.position += self.step;
        if self.position >= self.buffer.len() as f64 {
            self.finished = true;
        }
        sample
    }

    /// Current gain level at time `t`.
    pub fn gain_at(&self, t: u64) -> f64 {
        self.gain.value_at(t)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> f64 {
        self.position
    }
}
