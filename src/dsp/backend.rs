//! Playback backend — the capability boundary between voice bookkeeping and
//! the audio primitives that actually make sound.
//!
//! The voice pool and the engine speak only [`PlaybackBackend`]; the
//! [`BufferBackend`] adapter implements it with in-process sample rendering.
//! A host with its own audio graph can substitute another adapter without
//! touching pool or engine logic.

use std::sync::Arc;

use crate::asset::SampleAsset;
use crate::error::EngineError;

use super::mixer::MasterBus;
use super::sample::SampleBuffer;
use super::voice::SampleVoice;

/// Opaque identifier for a voice owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub u64);

/// Audio-primitive operations the engine needs from its host platform.
///
/// Control operations are synchronous and non-blocking: fades and stops are
/// scheduled against the backend's sample clock, never waited on. The render
/// clock communicates back exclusively through [`drain_finished`]
/// notifications, which the control path consumes.
///
/// [`drain_finished`]: PlaybackBackend::drain_finished
pub trait PlaybackBackend {
    /// Establish the audio output context.
    fn prepare(&mut self) -> Result<(), EngineError>;

    /// Decode and install the instrument sample.
    fn load(&mut self, asset: &SampleAsset) -> Result<(), EngineError>;

    fn is_loaded(&self) -> bool;

    /// Current position of the sample clock.
    fn now(&self) -> u64;

    /// Start a voice playing the loaded sample at `rate`.
    fn trigger(&mut self, rate: f64) -> Result<VoiceHandle, EngineError>;

    /// Ramp the voice's gain to zero over `fade_secs` from its current
    /// level, stopping it at ramp end. Unknown handles are ignored.
    fn release(&mut self, handle: VoiceHandle, fade_secs: f64);

    /// Stop a voice immediately. Stopping an already-stopped voice is a
    /// silent no-op.
    fn stop(&mut self, handle: VoiceHandle);

    /// Stop every voice immediately and discard pending notifications.
    fn stop_all(&mut self);

    /// Voices that ended since the last drain (naturally or at a scheduled
    /// stop).
    fn drain_finished(&mut self) -> Vec<VoiceHandle>;

    /// Render the dry voice mix into `out` and advance the sample clock.
    fn render_block(&mut self, out: &mut [f32]);
}

/// In-process backend: renders voices from the decoded sample buffer.
pub struct BufferBackend {
    sample_rate: f64,
    buffer: Option<Arc<SampleBuffer>>,
    /// Active voices in trigger order.
    voices: Vec<(VoiceHandle, SampleVoice)>,
    next_handle: u64,
    clock: u64,
    finished: Vec<VoiceHandle>,
    bus: MasterBus,
}

impl BufferBackend {
    pub fn new(sample_rate: f64, master_gain: f64) -> Self {
        BufferBackend {
            sample_rate,
            buffer: None,
            voices: Vec::new(),
            next_handle: 0,
            clock: 0,
            finished: Vec::new(),
            bus: MasterBus::new(master_gain),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.bus.gain = gain;
    }

    /// Number of voices currently in the render set (including ones still
    /// fading toward a scheduled stop).
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl PlaybackBackend for BufferBackend {
    fn prepare(&mut self) -> Result<(), EngineError> {
        if !(self.sample_rate > 0.0) {
            return Err(EngineError::ContextUnavailable {
                detail: format!("invalid sample rate {}", self.sample_rate),
            });
        }
        Ok(())
    }

    fn load(&mut self, asset: &SampleAsset) -> Result<(), EngineError> {
        let buffer = asset.decode()?;
        self.buffer = Some(Arc::new(buffer));
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    fn now(&self) -> u64 {
        self.clock
    }

    fn trigger(&mut self, rate: f64) -> Result<VoiceHandle, EngineError> {
        let buffer = self.buffer.as_ref().ok_or(EngineError::SampleMissing)?;
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        self.voices.push((
            handle,
            SampleVoice::new(Arc::clone(buffer), rate, self.sample_rate),
        ));
        Ok(handle)
    }

    fn release(&mut self, handle: VoiceHandle, fade_secs: f64) {
        let now = self.clock;
        let rate = self.sample_rate;
        if let Some((_, voice)) = self.voices.iter_mut().find(|(h, _)| *h == handle) {
            voice.fade_out(now, fade_secs, rate);
        }
    }

    fn stop(&mut self, handle: VoiceHandle) {
        self.voices.retain(|(h, _)| *h != handle);
    }

    fn stop_all(&mut self) {
        self.voices.clear();
        self.finished.clear();
    }

    fn drain_finished(&mut self) -> Vec<VoiceHandle> {
        std::mem::take(&mut self.finished)
    }

    fn render_block(&mut self, out: &mut [f32]) {
        let n = out.len();
        self.bus.clear(n);

        for (_, voice) in &mut self.voices {
            for i in 0..n {
                let sample = voice.next_sample(self.clock + i as u64);
                if sample != 0.0 {
                    self.bus.add(i, sample);
                }
                if voice.is_finished() {
                    break;
                }
            }
        }

        let mut still_active = Vec::with_capacity(self.voices.len());
        for (handle, voice) in self.voices.drain(..) {
            if voice.is_finished() {
                self.finished.push(handle);
            } else {
                still_active.push((handle, voice));
            }
        }
        self.voices = still_active;

        self.bus.write_into(out);
        self.clock += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 44100.0;

    fn loaded_backend(sample_len: usize) -> BufferBackend {
        let mut backend = BufferBackend::new(RATE, 1.0);
        backend.prepare().unwrap();
        backend
            .load(&SampleAsset::from_memory(
                "test",
                vec![0.5; sample_len],
                RATE as u32,
                "C4",
            ))
            .unwrap();
        backend
    }

    #[test]
    fn trigger_without_sample_fails() {
        let mut backend = BufferBackend::new(RATE, 1.0);
        assert!(matches!(
            backend.trigger(1.0).unwrap_err(),
            EngineError::SampleMissing
        ));
    }

    #[test]
    fn zero_sample_rate_fails_prepare() {
        let mut backend = BufferBackend::new(0.0, 1.0);
        assert!(matches!(
            backend.prepare().unwrap_err(),
            EngineError::ContextUnavailable { .. }
        ));
    }

    #[test]
    fn triggered_voice_renders_audio() {
        let mut backend = loaded_backend(4096);
        backend.trigger(1.0).unwrap();

        let mut out = vec![0.0_f32; 256];
        backend.render_block(&mut out);

        assert!(out.iter().any(|&s| s.abs() > 0.1));
        assert_eq!(backend.now(), 256);
    }

    #[test]
    fn natural_end_reports_completion() {
        let mut backend = loaded_backend(100);
        let handle = backend.trigger(1.0).unwrap();

        let mut out = vec![0.0_f32; 256];
        backend.render_block(&mut out);

        assert_eq!(backend.voice_count(), 0);
        assert_eq!(backend.drain_finished(), vec![handle]);
        // A second drain yields nothing.
        assert!(backend.drain_finished().is_empty());
    }

    #[test]
    fn release_fades_then_stops() {
        let mut backend = loaded_backend(44100);
        let handle = backend.trigger(1.0).unwrap();
        backend.release(handle, 0.05);

        // 50 ms at 44.1 kHz = 2205 samples; render past the ramp.
        let mut out = vec![0.0_f32; 4096];
        backend.render_block(&mut out);

        assert_eq!(backend.voice_count(), 0);
        assert_eq!(backend.drain_finished(), vec![handle]);

        // Tail of the block, after the scheduled stop, is silent.
        assert!(out[3000..].iter().all(|&s| s == 0.0));
        // The fade's start is still audible.
        assert!(out[..1000].iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut backend = loaded_backend(4096);
        let handle = backend.trigger(1.0).unwrap();
        backend.stop(handle);
        backend.stop(handle);
        assert_eq!(backend.voice_count(), 0);
        assert!(backend.drain_finished().is_empty());
    }

    #[test]
    fn stop_all_discards_pending_notifications() {
        let mut backend = loaded_backend(100);
        backend.trigger(1.0).unwrap();
        backend.trigger(2.0).unwrap();

        let mut out = vec![0.0_f32; 256];
        backend.render_block(&mut out);
        assert!(!backend.finished.is_empty());

        backend.stop_all();
        assert_eq!(backend.voice_count(), 0);
        assert!(backend.drain_finished().is_empty());
    }

    #[test]
    fn handles_are_never_reused() {
        let mut backend = loaded_backend(4096);
        let a = backend.trigger(1.0).unwrap();
        backend.stop(a);
        let b = backend.trigger(1.0).unwrap();
        assert_ne!(a, b);
    }
}
