//! Stream metadata information extracted from media files.

use std::fmt;

use ffmpeg_next as ffmpeg;

use crate::core::time::Seconds;

/// Frame rate assumed when a stream does not report one
const FALLBACK_FPS: f64 = 30.0;

/// Video-specific stream information
#[derive(Debug, Clone)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: Option<Seconds>,
    pub pixel_format: String,
}

impl VideoStreamInfo {
    pub fn from_stream(
        stream: &ffmpeg::Stream,
        input: &ffmpeg::format::context::Input,
        decoder: &ffmpeg::decoder::Video,
    ) -> Self {
        let fps = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .map(f64::from)
            .unwrap_or(FALLBACK_FPS);

        let duration = if stream.duration() > 0 {
            Some(stream.duration() as f64 * f64::from(stream.time_base()))
        } else if input.duration() > 0 {
            Some(input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64)
        } else {
            None
        };

        Self {
            index: stream.index(),
            codec_name: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            width: decoder.width(),
            height: decoder.height(),
            fps,
            duration,
            pixel_format: format!("{:?}", decoder.format()),
        }
    }

    /// Seconds between consecutive source frames
    pub fn frame_interval(&self) -> Seconds {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            1.0 / FALLBACK_FPS
        }
    }
}

impl fmt::Display for VideoStreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stream {}: {} {}x{} {} @ {:.2} fps",
            self.index, self.codec_name, self.width, self.height, self.pixel_format, self.fps
        )?;
        if let Some(duration) = self.duration {
            write!(f, ", {:.2}s", duration)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(fps: f64, duration: Option<Seconds>) -> VideoStreamInfo {
        VideoStreamInfo {
            index: 0,
            codec_name: "h264".to_string(),
            width: 1920,
            height: 1080,
            fps,
            duration,
            pixel_format: "YUV420P".to_string(),
        }
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(info(25.0, None).frame_interval(), 0.04);
        assert_eq!(info(0.0, None).frame_interval(), 1.0 / 30.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            info(30.0, Some(12.5)).to_string(),
            "stream 0: h264 1920x1080 YUV420P @ 30.00 fps, 12.50s"
        );
    }
}
