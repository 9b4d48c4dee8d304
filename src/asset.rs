//! Sample assets — the descriptor for the instrument's one sample and the
//! decoding paths that turn it into a [`SampleBuffer`].
//!
//! A host that already owns decoded PCM hands it over as
//! [`SampleSource::Memory`]; file and inline-payload sources decode behind
//! the `assets` feature (WAV via `hound`, MP3 via `minimp3`).

use serde::{Deserialize, Serialize};

use crate::dsp::sample::SampleBuffer;
use crate::error::EngineError;
use crate::pitch::Note;

/// The logical path of the instrument's bundled sample.
pub const DEFAULT_SAMPLE_PATH: &str = "sounds/Harp-C4.mp3";

/// The note the bundled sample was recorded at.
pub const DEFAULT_NATIVE_NOTE: &str = "C4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Wav,
    Mp3,
}

/// Where the sample's audio data comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SampleSource {
    /// Already-decoded mono PCM.
    Memory {
        data: Vec<f32>,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
    },
    /// An audio file on disk.
    File { path: String, codec: AudioCodec },
    /// A base64-encoded audio file carried inline in the descriptor.
    InlineBase64 { data: String, codec: AudioCodec },
}

/// Descriptor for one sample asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleAsset {
    pub id: String,
    /// The pitch the sample was recorded at, e.g. `"C4"`.
    #[serde(rename = "nativeNote")]
    pub native_note: String,
    pub source: SampleSource,
}

impl SampleAsset {
    /// Asset wrapping decoded PCM.
    pub fn from_memory(id: &str, data: Vec<f32>, sample_rate: u32, native_note: &str) -> Self {
        SampleAsset {
            id: id.to_string(),
            native_note: native_note.to_string(),
            source: SampleSource::Memory { data, sample_rate },
        }
    }

    /// The instrument's bundled harp sample.
    pub fn bundled() -> Self {
        SampleAsset {
            id: "harp-c4".to_string(),
            native_note: DEFAULT_NATIVE_NOTE.to_string(),
            source: SampleSource::File {
                path: DEFAULT_SAMPLE_PATH.to_string(),
                codec: AudioCodec::Mp3,
            },
        }
    }

    /// Parse a descriptor from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::AssetDecode {
            asset: "<json>".to_string(),
            detail: e.to_string(),
        })
    }

    /// The native pitch as a [`Note`]; malformed descriptors fall back to C4.
    pub fn native_pitch(&self) -> Note {
        Note::parse(&self.native_note).unwrap_or(Note { index: 0, octave: 4 })
    }

    /// Decode the source into a mono sample buffer.
    pub fn decode(&self) -> Result<SampleBuffer, EngineError> {
        match &self.source {
            SampleSource::Memory { data, sample_rate } => {
                Ok(SampleBuffer::from_f32(data, *sample_rate))
            }
            #[cfg(feature = "assets")]
            SampleSource::File { path, codec } => {
                let bytes = std::fs::read(path).map_err(|e| EngineError::AssetIo {
                    asset: path.clone(),
                    detail: e.to_string(),
                })?;
                decode::bytes(&self.id, &bytes, *codec)
            }
            #[cfg(feature = "assets")]
            SampleSource::InlineBase64 { data, codec } => {
                use base64::Engine as _;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|e| EngineError::AssetDecode {
                        asset: self.id.clone(),
                        detail: format!("invalid base64 payload: {e}"),
                    })?;
                decode::bytes(&self.id, &bytes, *codec)
            }
            #[cfg(not(feature = "assets"))]
            SampleSource::File { path, .. } => Err(EngineError::UnsupportedSource {
                asset: path.clone(),
                detail: "file decoding requires the `assets` feature".to_string(),
            }),
            #[cfg(not(feature = "assets"))]
            SampleSource::InlineBase64 { .. } => Err(EngineError::UnsupportedSource {
                asset: self.id.clone(),
                detail: "inline decoding requires the `assets` feature".to_string(),
            }),
        }
    }
}

#[cfg(feature = "assets")]
mod decode {
    use std::io::Cursor;

    use super::{AudioCodec, EngineError, SampleBuffer};

    pub fn bytes(id: &str, bytes: &[u8], codec: AudioCodec) -> Result<SampleBuffer, EngineError> {
        match codec {
            AudioCodec::Wav => wav(id, bytes),
            AudioCodec::Mp3 => mp3(id, bytes),
        }
    }

    fn wav(id: &str, bytes: &[u8]) -> Result<SampleBuffer, EngineError> {
        let decode_err = |detail: String| EngineError::AssetDecode {
            asset: id.to_string(),
            detail,
        };

        let mut reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| decode_err(e.to_string()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<Result<_, _>>()
                .map_err(|e| decode_err(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| decode_err(e.to_string()))?
            }
        };

        let data: Vec<f64> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect();

        if data.is_empty() {
            return Err(decode_err("no audio frames".to_string()));
        }
        Ok(SampleBuffer::new(data, spec.sample_rate))
    }

    fn mp3(id: &str, bytes: &[u8]) -> Result<SampleBuffer, EngineError> {
        let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
        let mut pcm: Vec<i16> = Vec::new();
        let mut sample_rate = 0_u32;
        let mut channels = 1_u16;

        loop {
            match decoder.next_frame() {
                Ok(frame) => {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                    pcm.extend_from_slice(&frame.data);
                }
                Err(minimp3::Error::Eof) => break,
                Err(e) => {
                    return Err(EngineError::AssetDecode {
                        asset: id.to_string(),
                        detail: format!("{e:?}"),
                    });
                }
            }
        }

        if pcm.is_empty() || sample_rate == 0 {
            return Err(EngineError::AssetDecode {
                asset: id.to_string(),
                detail: "no decodable frames".to_string(),
            });
        }
        Ok(SampleBuffer::from_interleaved_i16(&pcm, channels, sample_rate))
    }
}
