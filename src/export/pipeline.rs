//! Export configuration and the error type shared by the export stages.

use crate::audio::accumulator::DEFAULT_CAPACITY;
use crate::audio::buffer::{CHANNELS, SAMPLE_RATE};
use crate::audio::mixer::DEFAULT_GAIN;
use crate::audio::AudioError;
use crate::core::time::Seconds;
use crate::decode::background::DEFAULT_SEEK_THRESHOLD;
use crate::decode::DecodeError;
use crate::export::encoder::EncodeError;
use crate::media::LoadError;
use crate::playback::character::StageLayout;
use crate::render::compositor::CaptionStyle;
use crate::render::{Color, RenderError};

/// Error type for export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Headless file render or real-time preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Render,
    Interactive,
}

impl RenderMode {
    /// Canvas colour when no background frame is available
    pub fn fallback_color(self) -> Color {
        match self {
            RenderMode::Render => Color::DARK_BLUE,
            RenderMode::Interactive => Color::OFF_WHITE,
        }
    }

    pub fn default_output(self) -> &'static str {
        match self {
            RenderMode::Render => "output_render.mp4",
            RenderMode::Interactive => "output.mp4",
        }
    }
}

/// Export settings
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate: u64, // bits per second
    pub gop: u32,
    pub max_b_frames: usize,
    pub audio_bitrate: u64, // bits per second
    pub sample_rate: u32,
    pub channels: u32,
    pub seek_threshold: Seconds,
    pub loop_background: bool,
    pub mixer_gain: f32,
    /// Samples per channel the accumulator holds before refusing appends
    pub accumulator_capacity: usize,
    pub character_scale: f32,
    pub character_margin: f32,
    pub character_bottom_offset: f32,
    pub font_size: f32,
    pub caption: CaptionStyle,
    /// Frames between progress log lines
    pub progress_interval: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 60,
            video_bitrate: 8_000_000, // 8 Mbps
            gop: 60,
            max_b_frames: 0,
            audio_bitrate: 128_000, // 128 kbps
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS as u32,
            seek_threshold: DEFAULT_SEEK_THRESHOLD,
            loop_background: true,
            mixer_gain: DEFAULT_GAIN,
            accumulator_capacity: DEFAULT_CAPACITY,
            character_scale: 0.5,
            character_margin: 50.0,
            character_bottom_offset: 100.0,
            font_size: 72.0,
            caption: CaptionStyle::default(),
            progress_interval: 600,
        }
    }
}

impl ExportSettings {
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::InvalidSettings(format!(
                "canvas {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ExportError::InvalidSettings(format!(
                "canvas {}x{} must have even dimensions for 4:2:0 encoding",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(ExportError::InvalidSettings("fps must be positive".to_string()));
        }
        if self.sample_rate != SAMPLE_RATE || self.channels != CHANNELS as u32 {
            return Err(ExportError::InvalidSettings(format!(
                "audio must be {} Hz with {} channels",
                SAMPLE_RATE, CHANNELS
            )));
        }
        Ok(())
    }

    pub fn frame_duration(&self) -> Seconds {
        1.0 / self.fps.max(1) as f64
    }

    /// Background frames within this distance of the target time are accepted
    pub fn frame_tolerance(&self) -> Seconds {
        self.frame_duration()
    }

    pub fn stage_layout(&self) -> StageLayout {
        StageLayout {
            canvas_width: self.width,
            canvas_height: self.height,
            margin: self.character_margin,
            bottom_offset: self.character_bottom_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ExportSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!((settings.width, settings.height, settings.fps), (1080, 1920, 60));
        assert!((settings.frame_tolerance() - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        let settings = ExportSettings {
            width: 1081,
            ..ExportSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ExportError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let settings = ExportSettings {
            fps: 0,
            ..ExportSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_mode_defaults() {
        assert_eq!(RenderMode::Render.default_output(), "output_render.mp4");
        assert_eq!(RenderMode::Interactive.default_output(), "output.mp4");
        assert_eq!(RenderMode::Render.fallback_color(), Color::DARK_BLUE);
    }
}
