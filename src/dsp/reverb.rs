//! Reverb — a small feedback delay network.
//!
//! Synthesizes a reverberant tail from primitive delay elements instead of a
//! convolution impulse: the input feeds four parallel delay lines, each with
//! a single-tap feedback loop, and their outputs sum into a wet bus that is
//! mixed with the dry signal.
//!
//! ```text
//! input ──┬───────────────× dry ─────────────────→ (+) → output
//!         ├─→ [delay 23ms] ─┬─× line gain ─┐        ↑
//!         │        ↑ ←── × feedback        │        │
//!         ├─→ [delay 37ms] ... ────────────┼─× wet ─┘
//!         ├─→ [delay 53ms] ... ────────────┤
//!         └─→ [delay 67ms] ... ────────────┘
//! ```
//!
//! The delay times are mutually non-commensurate; rational-ratio times stack
//! their echoes into a periodic comb that rings metallically.

use serde::{Deserialize, Serialize};

use super::delay::DelayLine;

/// Reverb parameters. Fixed once the network is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverbConfig {
    /// Delay time per line, in seconds.
    #[serde(rename = "delayTimes")]
    pub delay_times: Vec<f64>,
    /// Feedback coefficient from each delay's output back into its input.
    pub feedback: f64,
    /// Dry path level.
    pub dry: f64,
    /// Wet bus level.
    pub wet: f64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        ReverbConfig {
            delay_times: vec![0.023, 0.037, 0.053, 0.067],
            feedback: 0.5,
            dry: 0.7,
            wet: 0.3,
        }
    }
}

/// One delay line with its feedback tap and output gain.
#[derive(Debug, Clone)]
struct FeedbackDelay {
    line: DelayLine,
    feedback: f32,
    gain: f32,
}

impl FeedbackDelay {
    fn new(len: usize, feedback: f32, gain: f32) -> Self {
        FeedbackDelay {
            line: DelayLine::new(len),
            feedback,
            gain,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.peek();
        self.line.tick(input + delayed * self.feedback);
        delayed * self.gain
    }

    fn clear(&mut self) {
        self.line.clear();
    }
}

/// The fixed-topology reverb network.
#[derive(Debug, Clone)]
pub struct ReverbNetwork {
    lines: Vec<FeedbackDelay>,
    dry: f32,
    wet: f32,
}

impl ReverbNetwork {
    /// Network with the canonical parameters (23/37/53/67 ms, feedback 0.5,
    /// dry 0.7, wet 0.3).
    pub fn new(sample_rate: f64) -> Self {
        Self::with_config(sample_rate, &ReverbConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: &ReverbConfig) -> Self {
        // Per-line gain divides by the line count so the wet bus cannot
        // build up past the input level.
        let line_gain = 0.7 / config.delay_times.len().max(1) as f32;
        let lines = config
            .delay_times
            .iter()
            .map(|&time| {
                FeedbackDelay::new(
                    (time * sample_rate) as usize,
                    config.feedback as f32,
                    line_gain,
                )
            })
            .collect();

        ReverbNetwork {
            lines,
            dry: config.dry as f32,
            wet: config.wet as f32,
        }
    }

    /// Number of delay lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Process one sample: dry pass-through plus the wet bus.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut bus = 0.0;
        for line in &mut self.lines {
            bus += line.process(input);
        }
        input * self.dry + bus * self.wet
    }

    /// Process a block in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Flush all delay buffers.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }
}
