//! Pitch mapping — note names, pitch numbers, frequencies, playback rates.
//!
//! Pitch numbers follow MIDI numbering (C4 = 60, one unit per semitone);
//! frequencies follow 12-TET with A4 = 440 Hz. Playback rates express how
//! much a fixed-pitch sample must be sped up or slowed down to sound at a
//! target pitch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::diag::{default_diagnostics, Diagnostics};

/// Canonical chromatic spellings, sharps preferred, indexed 0-11 from C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Frequency of A4 (pitch number 69) in Hz.
pub const TUNING_PITCH: f64 = 440.0;

/// Pitch number of middle C, the soft-fallback default.
pub const DEFAULT_PITCH: i32 = 60;

/// Chromatic index for a note name. Accepts enharmonic flat spellings
/// (`Db` == `C#`); returns `None` for anything else.
pub fn note_index(name: &str) -> Option<u8> {
    let idx = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(idx)
}

/// A pitch value: chromatic index within the octave plus an octave number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    /// Chromatic index 0-11 (C = 0).
    pub index: u8,
    /// Octave number; C4 is middle C.
    pub octave: i32,
}

impl Note {
    pub fn new(index: u8, octave: i32) -> Self {
        Note {
            index: index % 12,
            octave,
        }
    }

    /// Linear pitch number: `(octave + 1) * 12 + index`. C4 = 60.
    pub fn pitch_number(&self) -> i32 {
        (self.octave + 1) * 12 + self.index as i32
    }

    /// Inverse of [`Note::pitch_number`]. Total for any integer input; the
    /// octave may come out negative or arbitrarily large.
    pub fn from_pitch_number(pitch: i32) -> Self {
        Note {
            index: pitch.rem_euclid(12) as u8,
            octave: pitch.div_euclid(12) - 1,
        }
    }

    /// Canonical (sharp) spelling of this note's pitch class.
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.index as usize]
    }

    /// Frequency in Hz: `440 * 2^((pitch - 69) / 12)`.
    pub fn frequency(&self) -> f64 {
        pitch_to_frequency(self.pitch_number())
    }

    /// Parse a note name such as `C4`, `F#5`, or `Bb3`.
    pub fn parse(note: &str) -> Option<Self> {
        let bytes = note.as_bytes();
        if bytes.is_empty() || !note.is_ascii() {
            return None;
        }

        let mut idx = 1;
        if idx < bytes.len() && (bytes[idx] == b'#' || bytes[idx] == b'b') {
            idx += 1;
        }

        let index = note_index(&note[..idx])?;
        let octave: i32 = note[idx..].parse().ok()?;
        Some(Note { index, octave })
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

impl FromStr for Note {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Note::parse(s).ok_or(())
    }
}

/// Frequency for a pitch number: `440 * 2^((pitch - 69) / 12)`.
pub fn pitch_to_frequency(pitch: i32) -> f64 {
    TUNING_PITCH * (2.0_f64).powf((pitch as f64 - 69.0) / 12.0)
}

/// Rate at which a sample recorded at `root` must play back to sound at
/// `target`: `2^((target - root) / 12)`, the frequency ratio of the two
/// pitches. 1.0 = native speed, 2.0 = one octave up.
pub fn playback_rate(target: i32, root: i32) -> f64 {
    (2.0_f64).powf((target - root) as f64 / 12.0)
}

/// The soft-failing mapper used on the engine's control path.
///
/// Unrecognized input never raises: it degrades to middle C (the sample's
/// native pitch) and reports a diagnostic.
pub struct PitchMapper {
    native: Note,
    diag: Arc<dyn Diagnostics>,
}

impl PitchMapper {
    /// Mapper for a sample recorded at `native` (the engine's is C4).
    pub fn new(native: Note) -> Self {
        Self::with_diagnostics(native, default_diagnostics())
    }

    pub fn with_diagnostics(native: Note, diag: Arc<dyn Diagnostics>) -> Self {
        PitchMapper { native, diag }
    }

    pub fn native(&self) -> Note {
        self.native
    }

    /// Pitch number for a note name and octave. Unknown names map to 60 (C4)
    /// with a warning.
    pub fn pitch_number(&self, name: &str, octave: i32) -> i32 {
        match note_index(name) {
            Some(index) => Note { index, octave }.pitch_number(),
            None => {
                self.diag.warn("pitch.unknown_note", name);
                DEFAULT_PITCH
            }
        }
    }

    /// Note for a pitch number. Always succeeds.
    pub fn note_for(&self, pitch: i32) -> Note {
        Note::from_pitch_number(pitch)
    }

    /// Frequency for a note name and octave. Unknown names map to the C4
    /// frequency (~261.63 Hz) with a warning.
    pub fn frequency(&self, name: &str, octave: i32) -> f64 {
        pitch_to_frequency(self.pitch_number(name, octave))
    }

    /// Playback rate that pitches the native sample to `note` (e.g. `"E5"`).
    /// Unparseable notes map to the rate for C4 with a warning.
    pub fn playback_rate_for(&self, note: &str) -> f64 {
        let target = match Note::parse(note) {
            Some(n) => n.pitch_number(),
            None => {
                self.diag.warn("pitch.unknown_note", note);
                DEFAULT_PITCH
            }
        };
        playback_rate(target, self.native.pitch_number())
    }
}

impl Default for PitchMapper {
    fn default() -> Self {
        PitchMapper::new(Note::from_pitch_number(DEFAULT_PITCH))
    }
}
