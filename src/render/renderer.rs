//! Public drawing interface for one output frame.
//! The render loop describes a frame as a `FrameScene`; a `SceneRenderer`
//! turns it into RGBA8 pixels.

use crate::core::caption::{CaptionEntry, Speaker};
use crate::core::time::Seconds;

/// Error type for rendering operations
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// RGBA colour, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 228, 48);
    pub const PURE_BLUE: Color = Color::rgb(0, 0, 255);
    pub const PURE_GREEN: Color = Color::rgb(0, 255, 0);
    pub const DARK_BLUE: Color = Color::rgb(0, 82, 172);
    pub const OFF_WHITE: Color = Color::rgb(245, 245, 245);

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// An RGBA8 image with tightly packed rows
#[derive(Debug, Clone)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Position and opacity of a drawn layer.
/// `position` is the top-left corner in canvas pixels.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: (f32, f32),
    pub opacity: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            opacity: 1.0,
        }
    }
}

/// A character to draw this frame
#[derive(Debug, Clone, Copy)]
pub struct CharacterLayer {
    pub speaker: Speaker,
    pub transform: Transform,
}

/// The caption to draw this frame
#[derive(Debug, Clone, Copy)]
pub struct CaptionView<'a> {
    pub entry: &'a CaptionEntry,
    pub active_word: Option<usize>,
}

/// Everything drawn in one output frame, back to front.
#[derive(Debug, Clone)]
pub struct FrameScene<'a> {
    pub time: Seconds,
    /// Canvas-sized RGBA8 background, or `None` to clear with `fallback`
    pub background: Option<&'a [u8]>,
    pub fallback: Color,
    pub characters: Vec<CharacterLayer>,
    pub caption: Option<CaptionView<'a>>,
}

/// Draws frame scenes onto an RGBA8 canvas
pub trait SceneRenderer {
    /// Canvas dimensions in pixels
    fn size(&self) -> (u32, u32);

    /// Draw a complete frame, replacing the previous canvas contents
    fn draw(&mut self, scene: &FrameScene<'_>) -> Result<(), RenderError>;

    /// The canvas as tightly packed RGBA8 rows, top to bottom
    fn pixels(&self) -> &[u8];
}
