//! Sample storage — the one decoded audio buffer the instrument plays.

/// A mono sample loaded into memory.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Mono f64 samples.
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data = pcm.iter().map(|&s| s as f64 / 32768.0).collect();
        SampleBuffer { data, sample_rate }
    }

    /// Create from f32 samples.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let data = samples.iter().map(|&s| s as f64).collect();
        SampleBuffer { data, sample_rate }
    }

    /// Average interleaved multi-channel PCM down to mono.
    pub fn from_interleaved_i16(pcm: &[i16], channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1) as usize;
        let data = pcm
            .chunks_exact(channels)
            .map(|frame| {
                frame.iter().map(|&s| s as f64 / 32768.0).sum::<f64>() / channels as f64
            })
            .collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds at the buffer's native rate.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Read with linear interpolation at a fractional position. Positions
    /// outside the buffer read as silence.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return if idx < self.data.len() {
                self.data[idx]
            } else {
                0.0
            };
        }

        let frac = position - idx as f64;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_between_samples() {
        let buf = SampleBuffer::new(vec![0.0, 1.0, 0.0, -1.0], 44100);

        assert!((buf.read_interpolated(0.0) - 0.0).abs() < 1e-9);
        assert!((buf.read_interpolated(0.5) - 0.5).abs() < 1e-9);
        assert!((buf.read_interpolated(1.0) - 1.0).abs() < 1e-9);
        assert!((buf.read_interpolated(2.5) - (-0.5)).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_reads_are_silent() {
        let buf = SampleBuffer::new(vec![1.0, 1.0], 44100);
        assert_eq!(buf.read_interpolated(-0.5), 0.0);
        assert_eq!(buf.read_interpolated(2.0), 0.0);
    }

    #[test]
    fn from_i16_scales_to_unit_range() {
        let buf = SampleBuffer::from_i16(&[0, 16384, -16384, 32767], 44100);
        assert_eq!(buf.len(), 4);
        assert!(buf.data[0].abs() < 1e-9);
        assert!((buf.data[1] - 0.5).abs() < 0.01);
        assert!((buf.data[2] + 0.5).abs() < 0.01);
    }

    #[test]
    fn interleaved_stereo_averages_to_mono() {
        let buf = SampleBuffer::from_interleaved_i16(&[16384, -16384, 32767, 32767], 2, 48000);
        assert_eq!(buf.len(), 2);
        assert!(buf.data[0].abs() < 1e-9);
        assert!((buf.data[1] - 1.0).abs() < 0.01);
        assert_eq!(buf.sample_rate, 48000);
    }

    #[test]
    fn duration_uses_native_rate() {
        let buf = SampleBuffer::new(vec![0.0; 22050], 44100);
        assert!((buf.duration() - 0.5).abs() < 1e-9);
    }
}
