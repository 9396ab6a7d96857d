//! Preloaded speaker audio.
//! Tracks are interleaved stereo f32 at a fixed 44.1 kHz.

use crate::core::time::Seconds;

/// Sample rate of every preloaded track
pub const SAMPLE_RATE: u32 = 44100;
/// Channel count of every preloaded track
pub const CHANNELS: usize = 2;
/// Duration assumed when a source does not report one
pub const FALLBACK_DURATION: Seconds = 10.0;

/// One fully decoded speaker clip
#[derive(Debug, Clone, Default)]
pub struct AudioTrack {
    /// Interleaved samples (L, R, L, R, ...)
    samples: Vec<f32>,
}

impl AudioTrack {
    /// Wrap interleaved stereo samples. A dangling half frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>) -> Self {
        samples.truncate(samples.len() - samples.len() % CHANNELS);
        Self { samples }
    }

    /// Number of samples per channel
    pub fn sample_count(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    pub fn duration(&self) -> Seconds {
        self.sample_count() as f64 / SAMPLE_RATE as f64
    }

    /// Stereo pair at sample index `i`
    #[inline]
    pub fn frame(&self, i: usize) -> Option<(f32, f32)> {
        let base = i.checked_mul(CHANNELS)?;
        Some((*self.samples.get(base)?, *self.samples.get(base + 1)?))
    }
}

/// Growable interleaved buffer used while decoding a track.
/// Starts from a duration estimate and doubles when it runs out.
#[derive(Debug)]
pub struct TrackWriter {
    samples: Vec<f32>,
    capacity_frames: usize,
    grow_count: u32,
}

impl TrackWriter {
    /// Reserve 110% of `estimated_duration` worth of stereo frames
    pub fn with_estimated_duration(estimated_duration: Seconds) -> Self {
        let duration = if estimated_duration.is_finite() && estimated_duration > 0.0 {
            estimated_duration
        } else {
            FALLBACK_DURATION
        };
        let capacity_frames = ((SAMPLE_RATE as f64 * duration * 1.1) as usize).max(1);
        Self {
            samples: Vec::with_capacity(capacity_frames * CHANNELS),
            capacity_frames,
            grow_count: 0,
        }
    }

    /// Interleave planar left/right samples onto the end of the track
    pub fn push_planar(&mut self, left: &[f32], right: &[f32]) {
        let frames = left.len().min(right.len());
        let needed = self.frames() + frames;
        if needed > self.capacity_frames {
            while needed > self.capacity_frames {
                self.capacity_frames *= 2;
            }
            self.samples
                .reserve_exact(self.capacity_frames * CHANNELS - self.samples.len());
            self.grow_count += 1;
            tracing::debug!(capacity_frames = self.capacity_frames, "audio buffer grown");
        }
        for (l, r) in left.iter().zip(right.iter()).take(frames) {
            self.samples.push(*l);
            self.samples.push(*r);
        }
    }

    /// Frames written so far
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Times the buffer had to grow past its estimate
    pub fn grow_count(&self) -> u32 {
        self.grow_count
    }

    pub fn finish(self) -> AudioTrack {
        AudioTrack::from_interleaved(self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_frames() {
        let track = AudioTrack::from_interleaved(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(track.sample_count(), 2);
        assert_eq!(track.frame(1), Some((0.3, 0.4)));
        assert_eq!(track.frame(2), None);
        assert_eq!(track.frame(usize::MAX), None);
    }

    #[test]
    fn test_writer_doubles_on_overrun() {
        let mut writer = TrackWriter::with_estimated_duration(0.0002);
        let initial = writer.capacity_frames();
        let left = vec![0.25f32; initial * 3];
        let right = vec![-0.25f32; initial * 3];
        writer.push_planar(&left, &right);
        assert_eq!(writer.capacity_frames(), initial * 4);
        assert_eq!(writer.grow_count(), 1);
        let track = writer.finish();
        assert_eq!(track.sample_count(), initial * 3);
        assert_eq!(track.frame(initial * 3 - 1), Some((0.25, -0.25)));
    }

    #[test]
    fn test_unknown_duration_uses_fallback() {
        let writer = TrackWriter::with_estimated_duration(f64::NAN);
        assert_eq!(
            writer.capacity_frames(),
            (SAMPLE_RATE as f64 * FALLBACK_DURATION * 1.1) as usize
        );
    }
}
