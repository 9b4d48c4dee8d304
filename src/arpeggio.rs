//! Arpeggio generation — unrolls a chord shape into an ordered note sequence.
//!
//! Generation is pure: the same spec always yields the same sequence, so a
//! host can regenerate and restart an arpeggio at will.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::diag::{default_diagnostics, Diagnostics};
use crate::pitch::{note_index, Note};

/// Number of notes generated when the caller does not ask for a count.
pub const DEFAULT_COUNT: usize = 10;

/// Chord type tokens recognized by [`chord_intervals`].
pub const CHORD_TYPES: [&str; 5] = ["major", "minor", "dom7", "maj7", "min7"];

/// Semitone offsets from the root for a chord type token (case-sensitive).
pub fn chord_intervals(chord_type: &str) -> Option<&'static [u8]> {
    let intervals: &'static [u8] = match chord_type {
        "major" => &[0, 4, 7],
        "minor" => &[0, 3, 7],
        "dom7" => &[0, 4, 7, 10],
        "maj7" => &[0, 4, 7, 11],
        "min7" => &[0, 3, 7, 10],
        _ => return None,
    };
    Some(intervals)
}

/// A request for an arpeggio sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpeggioSpec {
    /// Root pitch class, e.g. `"C"` or `"F#"`.
    pub root: String,
    /// One of the [`CHORD_TYPES`] tokens.
    #[serde(rename = "chordType")]
    pub chord_type: String,
    /// Octave of the first root note.
    #[serde(rename = "startOctave")]
    pub start_octave: i32,
    /// Number of notes to emit.
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    DEFAULT_COUNT
}

/// Generates arpeggio sequences from chord definitions.
pub struct Arpeggiator {
    diag: Arc<dyn Diagnostics>,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self::with_diagnostics(default_diagnostics())
    }

    pub fn with_diagnostics(diag: Arc<dyn Diagnostics>) -> Self {
        Arpeggiator { diag }
    }

    /// Unroll `chord_type` rooted at `root`/`start_octave` into `count`
    /// notes, climbing one octave each time the interval list wraps.
    ///
    /// An unknown chord type yields an empty sequence (with an error
    /// diagnostic); an unknown root falls back to C in the requested octave
    /// (with a warning).
    pub fn generate(
        &self,
        root: &str,
        chord_type: &str,
        start_octave: i32,
        count: usize,
    ) -> Vec<Note> {
        let Some(intervals) = chord_intervals(chord_type) else {
            self.diag.error("arpeggio.unknown_chord", chord_type);
            return Vec::new();
        };

        let root_index = note_index(root).unwrap_or_else(|| {
            self.diag.warn("arpeggio.unknown_root", root);
            0
        });
        let root_pitch = Note::new(root_index, start_octave).pitch_number();

        let mut sequence = Vec::with_capacity(count);
        let mut octave_offset = 0;
        let mut interval_idx = 0;

        for _ in 0..count {
            let pitch = root_pitch + octave_offset + intervals[interval_idx] as i32;
            sequence.push(Note::from_pitch_number(pitch));

            interval_idx += 1;
            if interval_idx >= intervals.len() {
                interval_idx = 0;
                octave_offset += 12;
            }
        }

        sequence
    }

    /// [`Arpeggiator::generate`] driven by a stored spec.
    pub fn generate_spec(&self, spec: &ArpeggioSpec) -> Vec<Note> {
        self.generate(&spec.root, &spec.chord_type, spec.start_octave, spec.count)
    }
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Arpeggiator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CollectingDiagnostics;

    fn names(notes: &[Note]) -> Vec<String> {
        notes.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn c_major_wraps_into_next_octave() {
        let arp = Arpeggiator::new();
        let seq = arp.generate("C", "major", 4, 5);
        assert_eq!(names(&seq), ["C4", "E4", "G4", "C5", "E5"]);
    }

    #[test]
    fn a_minor_first_triad() {
        let arp = Arpeggiator::new();
        let seq = arp.generate("A", "minor", 3, 3);
        assert_eq!(names(&seq), ["A3", "C4", "E4"]);
    }

    #[test]
    fn min7_spans_two_octaves() {
        let arp = Arpeggiator::new();
        let seq = arp.generate("D", "min7", 4, 8);
        assert_eq!(
            names(&seq),
            ["D4", "F4", "A4", "C5", "D5", "F5", "A5", "C6"]
        );
    }

    #[test]
    fn maj7_stays_within_octave_before_wrap() {
        let arp = Arpeggiator::new();
        let seq = arp.generate("C", "maj7", 4, 4);
        assert_eq!(names(&seq), ["C4", "E4", "G4", "B4"]);
    }

    #[test]
    fn unknown_chord_returns_empty_with_error() {
        let diag = Arc::new(CollectingDiagnostics::new());
        let arp = Arpeggiator::with_diagnostics(diag.clone());
        let seq = arp.generate("C", "bogus", 4, 5);
        assert!(seq.is_empty());
        assert_eq!(diag.codes(), ["arpeggio.unknown_chord"]);
    }

    #[test]
    fn unknown_root_defaults_to_c_in_requested_octave() {
        let diag = Arc::new(CollectingDiagnostics::new());
        let arp = Arpeggiator::with_diagnostics(diag.clone());
        let seq = arp.generate("X", "major", 3, 3);
        assert_eq!(names(&seq), ["C3", "E3", "G3"]);
        assert_eq!(diag.codes(), ["arpeggio.unknown_root"]);
    }

    #[test]
    fn generation_is_deterministic() {
        let arp = Arpeggiator::new();
        let a = arp.generate("F#", "dom7", 2, 12);
        let b = arp.generate("F#", "dom7", 2, 12);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_count_yields_empty_sequence() {
        let arp = Arpeggiator::new();
        assert!(arp.generate("C", "major", 4, 0).is_empty());
    }

    #[test]
    fn spec_roundtrips_through_json_with_default_count() {
        let spec: ArpeggioSpec =
            serde_json::from_str(r#"{"root":"G","chordType":"min7","startOctave":3}"#)
                .unwrap();
        assert_eq!(spec.count, DEFAULT_COUNT);

        let arp = Arpeggiator::new();
        let seq = arp.generate_spec(&spec);
        assert_eq!(seq.len(), DEFAULT_COUNT);
        assert_eq!(seq[0].to_string(), "G3");
    }

    #[test]
    fn flat_root_accepted() {
        let arp = Arpeggiator::new();
        let seq = arp.generate("Bb", "major", 3, 3);
        assert_eq!(names(&seq), ["A#3", "D4", "F4"]);
    }
}
