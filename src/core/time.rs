//! Time representation for the frame-stepped render clock.
//! Timeline times are seconds (f64); encoder timestamps are integer ticks.

/// Time in seconds since the start of the render.
pub type Seconds = f64;

/// Time constants for conversions
pub mod constants {
    pub const MILLIS_PER_SECOND: f64 = 1000.0;
    pub const SECONDS_PER_MINUTE: f64 = 60.0;
    pub const SECONDS_PER_HOUR: f64 = 3600.0;
}

/// Convert a frame index to its presentation time at a fixed frame rate.
/// Derived from the index every time, never accumulated.
#[inline]
pub fn from_frame_index(frame_index: u64, fps: u32) -> Seconds {
    frame_index as f64 / fps as f64
}

/// Number of frames needed to cover `duration`, rounded to the nearest frame.
#[inline]
pub fn frame_count(duration: Seconds, fps: u32) -> u64 {
    (duration * fps as f64).round().max(0.0) as u64
}

/// Number of audio samples (per channel) that cover `dt`.
#[inline]
pub fn samples_for(dt: Seconds, sample_rate: u32) -> usize {
    (dt * sample_rate as f64).round().max(0.0) as usize
}

/// Sample position of `time` in a stream at `sample_rate`. May be negative.
#[inline]
pub fn to_sample_offset(time: Seconds, sample_rate: u32) -> i64 {
    (time * sample_rate as f64) as i64
}

/// Convert seconds to milliseconds
#[inline]
pub fn to_millis(time: Seconds) -> f64 {
    time * constants::MILLIS_PER_SECOND
}

/// Format time as HH:MM:SS.mmm
pub fn format_time(time: Seconds) -> String {
    let total_millis = to_millis(time.max(0.0)).round() as i64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let hours = total_seconds / constants::SECONDS_PER_HOUR as i64;
    let minutes = (total_seconds % constants::SECONDS_PER_HOUR as i64)
        / constants::SECONDS_PER_MINUTE as i64;
    let seconds = total_seconds % constants::SECONDS_PER_MINUTE as i64;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index() {
        assert_eq!(from_frame_index(30, 30), 1.0);
        assert_eq!(from_frame_index(0, 30), 0.0);
    }

    #[test]
    fn test_no_drift_over_long_runs() {
        let fps = 60;
        let step = 1.0 / fps as f64;
        let frames = frame_count(600.0, fps);
        for i in 0..frames {
            let delta = from_frame_index(i + 1, fps) - from_frame_index(i, fps);
            assert!((delta - step).abs() < 1e-9, "frame {} delta {}", i, delta);
        }
        assert_eq!(from_frame_index(frames, fps), 600.0);
    }

    #[test]
    fn test_frame_count_rounds() {
        assert_eq!(frame_count(10.0, 60), 600);
        assert_eq!(frame_count(3.509, 60), 211);
        assert_eq!(frame_count(0.0, 60), 0);
    }

    #[test]
    fn test_samples_for_frame() {
        assert_eq!(samples_for(1.0 / 60.0, 44100), 735);
        assert_eq!(samples_for(1.0 / 30.0, 44100), 1470);
        assert_eq!(samples_for(0.0, 44100), 0);
    }

    #[test]
    fn test_sample_offset() {
        assert_eq!(to_sample_offset(1.0, 44100), 44100);
        assert_eq!(to_sample_offset(-0.5, 44100), -22050);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(3661.5), "01:01:01.500");
        assert_eq!(format_time(0.0), "00:00:00.000");
    }
}
