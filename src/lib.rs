pub mod arpeggio;
pub mod asset;
pub mod diag;
pub mod dsp;
pub mod error;
pub mod pitch;

use wasm_bindgen::prelude::*;

use crate::arpeggio::Arpeggiator;
use crate::asset::SampleAsset;
use crate::dsp::engine::{EngineConfig, PlaybackEngine};
use crate::error::EngineError;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the harpsim-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: generate an arpeggio as an array of note-name strings
/// (e.g. `["C4", "E4", "G4", "C5", "E5"]`).
#[wasm_bindgen]
pub fn generate_arpeggio(
    root: &str,
    chord_type: &str,
    start_octave: i32,
    count: u32,
) -> Result<JsValue, JsValue> {
    let notes = Arpeggiator::new().generate(root, chord_type, start_octave, count as usize);
    let names: Vec<String> = notes.iter().map(|n| n.to_string()).collect();
    serde_wasm_bindgen::to_value(&names).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// Render an arpeggio offline through the full engine chain
/// (trigger → voice pool → gain → reverb network).
///
/// `sample` is the instrument's decoded mono sample recorded at C4;
/// `note_spacing` is the onset interval between consecutive notes in
/// seconds. Returns mono f32 audio at `out_sample_rate`.
pub fn render_arpeggio(
    sample: &[f32],
    sample_rate: u32,
    root: &str,
    chord_type: &str,
    start_octave: i32,
    count: usize,
    note_spacing: f64,
    out_sample_rate: u32,
) -> Result<Vec<f32>, EngineError> {
    let config = EngineConfig {
        sample_rate: out_sample_rate as f64,
        ..Default::default()
    };
    let mut engine = PlaybackEngine::with_config(config);

    let asset = SampleAsset::from_memory("render-sample", sample.to_vec(), sample_rate, "C4");
    engine.initialize(&asset)?;

    let notes = engine.generate_arpeggio(root, chord_type, start_octave, count);

    let out_rate = out_sample_rate as f64;
    let spacing_samples = ((note_spacing * out_rate) as usize).max(1);
    // Room for the last note to play out, plus the reverb tail.
    let sample_seconds = sample.len() as f64 / sample_rate.max(1) as f64;
    let tail_samples = ((sample_seconds + 0.5) * out_rate) as usize;
    let total = spacing_samples * notes.len() + tail_samples;

    let block_size = 128;
    let mut output = vec![0.0_f32; total];
    let mut next_note = 0;
    let mut pos = 0;

    while pos < total {
        while next_note < notes.len() && next_note * spacing_samples <= pos {
            engine.play_note(&notes[next_note].to_string(), None);
            next_note += 1;
        }

        let end = (pos + block_size).min(total);
        engine.render_block(&mut output[pos..end]);
        pos = end;
    }

    Ok(output)
}

/// WASM-exposed: [`render_arpeggio`] returning the raw audio buffer for
/// AudioWorklet playback.
#[wasm_bindgen]
pub fn render_arpeggio_samples(
    sample: &[f32],
    sample_rate: u32,
    root: &str,
    chord_type: &str,
    start_octave: i32,
    count: u32,
    note_spacing: f64,
    out_sample_rate: u32,
) -> Result<Vec<f32>, JsValue> {
    render_arpeggio(
        sample,
        sample_rate,
        root,
        chord_type,
        start_octave,
        count as usize,
        note_spacing,
        out_sample_rate,
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))
}
