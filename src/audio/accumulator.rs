//! Stereo sample accumulator between the per-frame mixer and the audio encoder.
//!
//! Each video frame appends a variable number of samples; the encoder consumes
//! fixed-size chunks. Chunks are stamped with a running sample counter.

/// Pending samples per channel held before appends are refused
pub const DEFAULT_CAPACITY: usize = 8192;

/// Planar stereo samples ready for one encoder frame
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    /// Position of the first sample, in samples since the start of the stream
    pub pts: i64,
}

impl AudioChunk {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

#[derive(Debug)]
pub struct AudioAccumulator {
    left: Vec<f32>,
    right: Vec<f32>,
    capacity: usize,
    next_pts: i64,
    dropped: usize,
}

impl AudioAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            left: Vec::with_capacity(capacity),
            right: Vec::with_capacity(capacity),
            capacity,
            next_pts: 0,
            dropped: 0,
        }
    }

    /// Pending samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Samples handed out so far, including padding
    pub fn emitted(&self) -> i64 {
        self.next_pts
    }

    /// Samples refused because the accumulator was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Append interleaved stereo. Returns `false` and drops the whole
    /// append when it would exceed the capacity.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> bool {
        let frames = samples.len() / 2;
        if self.left.len() + frames > self.capacity {
            self.dropped += frames;
            tracing::warn!(
                pending = self.left.len(),
                frames,
                "audio accumulator full, dropping samples"
            );
            return false;
        }
        for pair in samples.chunks_exact(2) {
            self.left.push(pair[0]);
            self.right.push(pair[1]);
        }
        true
    }

    /// Take one full chunk of `frame_size` samples if enough are pending
    pub fn pop_chunk(&mut self, frame_size: usize) -> Option<AudioChunk> {
        if frame_size == 0 || self.left.len() < frame_size {
            return None;
        }
        Some(self.take(frame_size, frame_size))
    }

    /// Take whatever is pending, zero-padded up to `frame_size`
    pub fn pop_padded(&mut self, frame_size: usize) -> Option<AudioChunk> {
        if self.left.is_empty() {
            return None;
        }
        let count = self.left.len().min(frame_size.max(1));
        Some(self.take(count, frame_size.max(count)))
    }

    fn take(&mut self, count: usize, padded_len: usize) -> AudioChunk {
        let mut left: Vec<f32> = self.left.drain(..count).collect();
        let mut right: Vec<f32> = self.right.drain(..count).collect();
        left.resize(padded_len, 0.0);
        right.resize(padded_len, 0.0);
        let chunk = AudioChunk {
            left,
            right,
            pts: self.next_pts,
        };
        self.next_pts += padded_len as i64;
        chunk
    }
}

impl Default for AudioAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(frames: usize, value: f32) -> Vec<f32> {
        vec![value; frames * 2]
    }

    #[test]
    fn test_drains_full_chunks_with_running_pts() {
        let mut acc = AudioAccumulator::default();
        let mut pts = Vec::new();
        for _ in 0..10 {
            assert!(acc.push_interleaved(&stereo(735, 0.1)));
            while let Some(chunk) = acc.pop_chunk(1024) {
                assert_eq!(chunk.len(), 1024);
                pts.push(chunk.pts);
            }
        }
        assert_eq!(pts, vec![0, 1024, 2048, 3072, 4096, 5120, 6144]);
        assert_eq!(acc.len(), 7350 - 7 * 1024);
    }

    #[test]
    fn test_tail_is_zero_padded() {
        let mut acc = AudioAccumulator::default();
        acc.push_interleaved(&[0.5, -0.5, 0.25, -0.25, 0.1, -0.1]);
        assert!(acc.pop_chunk(4).is_none());

        let tail = acc.pop_padded(4).unwrap();
        assert_eq!(tail.left, vec![0.5, 0.25, 0.1, 0.0]);
        assert_eq!(tail.right, vec![-0.5, -0.25, -0.1, 0.0]);
        assert_eq!(tail.pts, 0);
        assert_eq!(acc.emitted(), 4);
        assert!(acc.pop_padded(4).is_none());
    }

    #[test]
    fn test_overflowing_append_is_dropped() {
        let mut acc = AudioAccumulator::new(1000);
        assert!(acc.push_interleaved(&stereo(900, 0.0)));
        assert!(!acc.push_interleaved(&stereo(200, 0.0)));
        assert_eq!(acc.len(), 900);
        assert_eq!(acc.dropped(), 200);
    }
}
