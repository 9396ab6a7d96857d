//! Per-frame audio window extraction.
//!
//! At most one track plays at a time: the track whose ordinal matches the
//! active caption entry. Overlapping tracks are never summed.

use crate::audio::buffer::{AudioTrack, CHANNELS, SAMPLE_RATE};
use crate::core::time::{to_sample_offset, Seconds};
use crate::core::timeline::Timeline;

/// Gain applied after hard clipping
pub const DEFAULT_GAIN: f32 = 0.9;

/// Copy `out.len() / 2` stereo frames of `track` starting at `offset` into `out`.
///
/// Samples are clipped to `[-1, 1]` and scaled by `gain`. Positions before
/// the start or past the end of the track are silence.
pub fn extract_window(track: &AudioTrack, offset: Seconds, gain: f32, out: &mut [f32]) {
    let start = to_sample_offset(offset, SAMPLE_RATE);
    for (i, pair) in out.chunks_exact_mut(CHANNELS).enumerate() {
        let index = start + i as i64;
        let frame = if index < 0 {
            None
        } else {
            track.frame(index as usize)
        };
        match frame {
            Some((left, right)) => {
                pair[0] = left.clamp(-1.0, 1.0) * gain;
                pair[1] = right.clamp(-1.0, 1.0) * gain;
            }
            None => pair.fill(0.0),
        }
    }
}

/// Selects and reads the speaker track for the current caption
#[derive(Debug, Default)]
pub struct AudioMixer {
    tracks: Vec<AudioTrack>,
    gain: f32,
}

impl AudioMixer {
    pub fn new(tracks: Vec<AudioTrack>, gain: f32) -> Self {
        Self { tracks, gain }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Track paired with the caption active at `t`, and the read offset into it
    pub fn select<'a>(&'a self, timeline: &Timeline, t: Seconds) -> Option<(&'a AudioTrack, Seconds)> {
        let index = timeline.active_index(t)?;
        let track = self.tracks.get(index)?;
        let entry = &timeline.entries()[index];
        Some((track, t - entry.start_time))
    }

    /// Fill `out` with interleaved stereo for the frame starting at `t`.
    /// Silence when no caption or no paired track is active.
    pub fn mix_into(&self, timeline: &Timeline, t: Seconds, out: &mut [f32]) {
        match self.select(timeline, t) {
            Some((track, offset)) => extract_window(track, offset, self.gain, out),
            None => out.fill(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::caption::{CaptionEntry, Speaker, WordSpan};

    fn ramp_track(frames: usize, value: f32) -> AudioTrack {
        AudioTrack::from_interleaved(vec![value; frames * CHANNELS])
    }

    #[test]
    fn test_extract_clips_and_attenuates() {
        let mut samples = Vec::new();
        for i in 0..100 {
            let v = (i as f32 - 50.0) / 10.0;
            samples.push(v);
            samples.push(-v);
        }
        let track = AudioTrack::from_interleaved(samples);
        let mut out = vec![0.0f32; 200];
        extract_window(&track, 0.0, DEFAULT_GAIN, &mut out);
        assert!(out.iter().all(|s| s.abs() <= DEFAULT_GAIN));
        assert_eq!(out[0], -DEFAULT_GAIN);
        assert_eq!(out[1], DEFAULT_GAIN);
    }

    #[test]
    fn test_short_track_pads_with_silence() {
        let track = ramp_track(100, 0.5);
        let mut out = vec![1.0f32; 735 * CHANNELS];
        extract_window(&track, 0.0, DEFAULT_GAIN, &mut out);
        assert!(out[..200].iter().all(|s| (*s - 0.45).abs() < 1e-6));
        assert!(out[200..].iter().all(|s| *s == 0.0));

        let mut past_end = vec![1.0f32; 64];
        extract_window(&track, 5.0, DEFAULT_GAIN, &mut past_end);
        assert!(past_end.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_negative_offset_is_silence_until_start() {
        let track = ramp_track(10, 0.5);
        let lead = (SAMPLE_RATE / 2) as usize;
        let mut out = vec![1.0f32; (lead + 2) * CHANNELS];
        extract_window(&track, -0.5, 1.0, &mut out);
        assert!(out[..lead * CHANNELS].iter().all(|s| *s == 0.0));
        assert_eq!(&out[lead * CHANNELS..], &[0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_mixer_pairs_tracks_by_ordinal() {
        let timeline = Timeline::new(vec![
            CaptionEntry::from_words(Speaker::A, vec![WordSpan::new("a", 0.0, 1.0)]).unwrap(),
            CaptionEntry::from_words(Speaker::B, vec![WordSpan::new("b", 1.5, 2.5)]).unwrap(),
            CaptionEntry::from_words(Speaker::A, vec![WordSpan::new("c", 3.0, 4.0)]).unwrap(),
        ]);
        let mixer = AudioMixer::new(vec![ramp_track(44100, 0.1), ramp_track(44100, 0.2)], 1.0);

        let (_, offset) = mixer.select(&timeline, 2.0).unwrap();
        assert!((offset - 0.5).abs() < 1e-12);

        let mut out = vec![0.0f32; 4];
        mixer.mix_into(&timeline, 1.6, &mut out);
        assert!(out.iter().all(|s| (*s - 0.2).abs() < 1e-6));

        // Gap between captions.
        mixer.mix_into(&timeline, 1.2, &mut out);
        assert!(out.iter().all(|s| *s == 0.0));

        // Third caption has no paired track.
        out.fill(1.0);
        mixer.mix_into(&timeline, 3.5, &mut out);
        assert!(out.iter().all(|s| *s == 0.0));
    }
}
