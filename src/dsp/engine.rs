//! Playback engine — the top-level facade binding pitch mapping, the voice
//! pool, and the reverb network over a playback backend.
//!
//! Control operations are synchronous and return immediately; the audio
//! side runs through [`PlaybackEngine::render_block`], which the host's
//! output callback drives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::arpeggio::Arpeggiator;
use crate::asset::SampleAsset;
use crate::diag::{default_diagnostics, Diagnostics};
use crate::error::EngineError;
use crate::pitch::{Note, PitchMapper};

use super::backend::{BufferBackend, PlaybackBackend};
use super::pool::VoicePool;
use super::reverb::{ReverbConfig, ReverbNetwork};

/// Engine lifecycle. `Failed` is terminal: a failed initialization is never
/// silently retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Engine parameters, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "sampleRate")]
    pub sample_rate: f64,
    /// Master bus level ahead of the reverb network.
    #[serde(rename = "masterGain")]
    pub master_gain: f64,
    pub reverb: ReverbConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            master_gain: 0.5,
            reverb: ReverbConfig::default(),
        }
    }
}

/// The instrument's sound engine: one sample, played at arbitrary pitches,
/// with bounded per-key polyphony and an artificial room tail.
pub struct PlaybackEngine<B: PlaybackBackend = BufferBackend> {
    state: EngineState,
    config: EngineConfig,
    backend: B,
    pool: VoicePool,
    reverb: Option<ReverbNetwork>,
    mapper: PitchMapper,
    arpeggiator: Arpeggiator,
    diag: Arc<dyn Diagnostics>,
}

impl PlaybackEngine<BufferBackend> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let backend = BufferBackend::new(config.sample_rate, config.master_gain);
        Self::with_backend(config, backend)
    }

    /// Master output level. Takes effect on the next rendered block.
    pub fn set_master_gain(&mut self, gain: f64) {
        self.config.master_gain = gain;
        self.backend.set_master_gain(gain);
    }
}

impl Default for PlaybackEngine<BufferBackend> {
    fn default() -> Self {
        PlaybackEngine::new()
    }
}

impl<B: PlaybackBackend> PlaybackEngine<B> {
    /// Engine over a caller-supplied backend adapter.
    pub fn with_backend(config: EngineConfig, backend: B) -> Self {
        Self::with_diagnostics(config, backend, default_diagnostics())
    }

    pub fn with_diagnostics(config: EngineConfig, backend: B, diag: Arc<dyn Diagnostics>) -> Self {
        PlaybackEngine {
            state: EngineState::Uninitialized,
            mapper: PitchMapper::with_diagnostics(
                Note { index: 0, octave: 4 },
                diag.clone(),
            ),
            arpeggiator: Arpeggiator::with_diagnostics(diag.clone()),
            config,
            backend,
            pool: VoicePool::new(),
            reverb: None,
            diag,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Prepare the output context, build the reverb network, and load the
    /// one sample asset. Idempotent once `Ready`; a failure is terminal and
    /// every later call returns [`EngineError::Unavailable`].
    pub fn initialize(&mut self, asset: &SampleAsset) -> Result<(), EngineError> {
        match self.state {
            EngineState::Ready => return Ok(()),
            EngineState::Failed => return Err(EngineError::Unavailable),
            _ => {}
        }

        self.state = EngineState::Initializing;
        match self.initialize_inner(asset) {
            Ok(()) => {
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Failed;
                self.diag.error("engine.init_failed", &e.to_string());
                Err(e)
            }
        }
    }

    fn initialize_inner(&mut self, asset: &SampleAsset) -> Result<(), EngineError> {
        self.backend.prepare()?;
        // Master output feeds the reverb network, which feeds the
        // destination; the wiring is fixed from here on.
        self.reverb = Some(ReverbNetwork::with_config(
            self.config.sample_rate,
            &self.config.reverb,
        ));
        self.backend.load(asset)?;
        self.mapper =
            PitchMapper::with_diagnostics(asset.native_pitch(), self.diag.clone());
        Ok(())
    }

    /// Trigger `note` (e.g. `"E4"`), tracked under `key` if given, else
    /// under the note name itself. A no-op with a warning until the engine
    /// is `Ready`.
    pub fn play_note(&mut self, note: &str, key: Option<&str>) {
        if self.state != EngineState::Ready || !self.backend.is_loaded() {
            self.diag.warn("engine.not_ready", note);
            return;
        }

        let rate = self.mapper.playback_rate_for(note);
        let key = key.unwrap_or(note);
        if let Err(e) = self.pool.trigger(&mut self.backend, key, rate) {
            self.diag.error("engine.trigger_failed", &e.to_string());
        }
    }

    /// Release the newest voice for the note (or explicit key).
    pub fn stop_note(&mut self, note: &str, key: Option<&str>) {
        if self.state != EngineState::Ready {
            return;
        }
        self.pool.release(&mut self.backend, key.unwrap_or(note));
    }

    /// Stop every voice immediately, without fades.
    pub fn panic(&mut self) {
        self.pool.release_all(&mut self.backend);
    }

    /// Number of voices currently tracked by the pool.
    pub fn active_voices(&mut self) -> usize {
        self.pool.remove_finished(&mut self.backend);
        self.pool.len()
    }

    /// Unroll a chord into an ordered note sequence (see [`Arpeggiator`]).
    pub fn generate_arpeggio(
        &self,
        root: &str,
        chord_type: &str,
        start_octave: i32,
        count: usize,
    ) -> Vec<Note> {
        self.arpeggiator
            .generate(root, chord_type, start_octave, count)
    }

    /// Render the next block: dry voice mix through the reverb network.
    pub fn render_block(&mut self, out: &mut [f32]) {
        self.backend.render_block(out);
        if let Some(reverb) = &mut self.reverb {
            reverb.process_block(out);
        }
    }
}
