//! Glyph rasterization and text blending onto RGBA8 canvases.

use std::collections::HashMap;

use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::Font;

use crate::render::renderer::Color;

#[derive(Debug, Clone)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    coverage: Vec<u8>,
}

/// Draws single lines of text at a fixed pixel size.
pub struct TextPainter {
    font: Font,
    font_size: f32,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl TextPainter {
    pub fn new(font: Font, font_size: f32) -> Self {
        Self {
            font,
            font_size,
            glyph_cache: HashMap::new(),
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Horizontal advance of `text` in pixels
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, self.font_size).advance_width)
            .sum()
    }

    /// Draw `text` with its top-left corner at `(x, y)`
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        frame: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        text: &str,
        color: Color,
    ) {
        self.draw_sized(frame, width, height, x, y, text, color, self.font_size);
    }

    /// Like `draw`, at `font_size` pixels instead of the painter's size
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sized(
        &mut self,
        frame: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        text: &str,
        color: Color,
        font_size: f32,
    ) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, font_size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, coverage) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    coverage,
                }
            });
            blend_glyph(
                frame,
                width,
                height,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                bitmap,
                color,
            );
        }
    }

    /// Draw `text` over a square outline of `outline` pixels
    #[allow(clippy::too_many_arguments)]
    pub fn draw_outlined(
        &mut self,
        frame: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        text: &str,
        color: Color,
        outline: i32,
        outline_color: Color,
    ) {
        for dy in -outline..=outline {
            for dx in -outline..=outline {
                if dx == 0 && dy == 0 {
                    continue;
                }
                self.draw(
                    frame,
                    width,
                    height,
                    x + dx as f32,
                    y + dy as f32,
                    text,
                    outline_color,
                );
            }
        }
        self.draw(frame, width, height, x, y, text, color);
    }
}

fn blend_glyph(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    glyph: &GlyphBitmap,
    color: Color,
) {
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= height as i32 {
            continue;
        }
        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= width as i32 {
                continue;
            }
            let coverage = glyph.coverage[row * glyph.width + col];
            if coverage == 0 {
                continue;
            }
            let alpha = coverage as f32 / 255.0 * (color.a as f32 / 255.0);
            let idx = ((py as u32 * width + px as u32) * 4) as usize;
            blend_pixel(&mut frame[idx..idx + 4], color, alpha);
        }
    }
}

/// Source-over blend of `color` at `alpha` onto one opaque RGBA8 pixel
#[inline]
pub fn blend_pixel(dst: &mut [u8], color: Color, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    dst[0] = (color.r as f32 * alpha + dst[0] as f32 * inv).round() as u8;
    dst[1] = (color.g as f32 * alpha + dst[1] as f32 * inv).round() as u8;
    dst[2] = (color.b as f32 * alpha + dst[2] as f32 * inv).round() as u8;
    dst[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_pixel_extremes() {
        let mut px = [10u8, 20, 30, 255];
        blend_pixel(&mut px, Color::WHITE, 0.0);
        assert_eq!(px, [10, 20, 30, 255]);
        blend_pixel(&mut px, Color::GREEN, 1.0);
        assert_eq!(px, [0, 228, 48, 255]);
    }

    #[test]
    fn test_blend_pixel_half() {
        let mut px = [0u8, 0, 0, 255];
        blend_pixel(&mut px, Color::rgb(200, 100, 50), 0.5);
        assert_eq!(px, [100, 50, 25, 255]);
    }

    #[test]
    fn test_blend_glyph_clips_to_frame() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let glyph = GlyphBitmap {
            width: 3,
            height: 3,
            coverage: vec![255; 9],
        };
        blend_glyph(&mut frame, 4, 4, 2, 2, &glyph, Color::WHITE);
        let lit = frame.chunks(4).filter(|p| p[0] == 255).count();
        assert_eq!(lit, 4);
    }
}
