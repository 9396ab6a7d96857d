//! CPU compositor: draws frame scenes into an RGBA8 canvas.

use crate::core::caption::Speaker;
use crate::core::project::speaker_tag;
use crate::render::caption::{visible_words, DEFAULT_GROUP_SIZE};
use crate::render::renderer::{
    CharacterLayer, Color, FrameScene, RenderError, SceneRenderer, Sprite,
};
use crate::render::text::{blend_pixel, TextPainter};

/// Size of the box drawn for a character without a sprite. Not scaled.
pub const PLACEHOLDER_CHARACTER_SIZE: (u32, u32) = (400, 600);
const PLACEHOLDER_LABEL_SIZE: f32 = 40.0;
const PLACEHOLDER_LABEL_INSET: i32 = 50;

/// Caption appearance. The line is centred on the canvas.
#[derive(Debug, Clone, Copy)]
pub struct CaptionStyle {
    pub outline: i32,
    pub group_size: usize,
    pub color: Color,
    pub highlight: Color,
    pub outline_color: Color,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            outline: 2,
            group_size: DEFAULT_GROUP_SIZE,
            color: Color::WHITE,
            highlight: Color::GREEN,
            outline_color: Color::BLACK,
        }
    }
}

/// Top edge of a caption line centred vertically on the canvas
fn caption_top(canvas_height: u32, font_size: f32) -> f32 {
    (canvas_height as f32 - font_size) / 2.0
}

/// One character's sprite, or the labelled box drawn in its place.
#[derive(Debug, Clone)]
pub enum CharacterArt {
    Sprite(Sprite),
    Placeholder {
        width: u32,
        height: u32,
        color: Color,
        label: String,
    },
}

impl CharacterArt {
    /// Solid box named after the speaker
    pub fn placeholder(speaker: Speaker) -> Self {
        let (width, height) = PLACEHOLDER_CHARACTER_SIZE;
        Self::Placeholder {
            width,
            height,
            color: match speaker {
                Speaker::A => Color::PURE_BLUE,
                Speaker::B => Color::PURE_GREEN,
            },
            label: speaker_tag(speaker).to_uppercase(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            CharacterArt::Sprite(sprite) => (sprite.width, sprite.height),
            CharacterArt::Placeholder { width, height, .. } => (*width, *height),
        }
    }
}

/// Software canvas implementing `SceneRenderer`
pub struct Compositor {
    width: u32,
    height: u32,
    canvas: Vec<u8>,
    character_a: CharacterArt,
    character_b: CharacterArt,
    text: Option<TextPainter>,
    caption_style: CaptionStyle,
}

impl Compositor {
    pub fn new(
        width: u32,
        height: u32,
        character_a: CharacterArt,
        character_b: CharacterArt,
        text: Option<TextPainter>,
        caption_style: CaptionStyle,
    ) -> Self {
        Self {
            width,
            height,
            canvas: vec![0; (width * height * 4) as usize],
            character_a,
            character_b,
            text,
            caption_style,
        }
    }

    /// Drawn size of a character
    pub fn character_size(&self, speaker: Speaker) -> (u32, u32) {
        self.art(speaker).size()
    }

    fn art(&self, speaker: Speaker) -> &CharacterArt {
        match speaker {
            Speaker::A => &self.character_a,
            Speaker::B => &self.character_b,
        }
    }

    fn clear(&mut self, color: Color) {
        let px = color.to_array();
        for chunk in self.canvas.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn draw_character(&mut self, layer: &CharacterLayer) {
        let opacity = layer.transform.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        let x0 = layer.transform.position.0.round() as i32;
        let y0 = layer.transform.position.1.round() as i32;
        let (width, height) = (self.width as i32, self.height as i32);
        let art = match layer.speaker {
            Speaker::A => &self.character_a,
            Speaker::B => &self.character_b,
        };
        let (art_w, art_h) = art.size();

        for row in 0..art_h as i32 {
            let py = y0 + row;
            if py < 0 || py >= height {
                continue;
            }
            for col in 0..art_w as i32 {
                let px = x0 + col;
                if px < 0 || px >= width {
                    continue;
                }
                let (color, alpha) = match art {
                    CharacterArt::Sprite(sprite) => {
                        let src = ((row as u32 * sprite.width + col as u32) * 4) as usize;
                        let p = &sprite.pixels[src..src + 4];
                        (Color { r: p[0], g: p[1], b: p[2], a: 255 }, p[3] as f32 / 255.0)
                    }
                    CharacterArt::Placeholder { color, .. } => (*color, 1.0),
                };
                if alpha <= 0.0 {
                    continue;
                }
                let idx = ((py * width + px) * 4) as usize;
                blend_pixel(&mut self.canvas[idx..idx + 4], color, alpha * opacity);
            }
        }

        if let (CharacterArt::Placeholder { label, .. }, Some(text)) = (art, self.text.as_mut()) {
            let tint = Color {
                a: (opacity * 255.0).round() as u8,
                ..Color::WHITE
            };
            text.draw_sized(
                &mut self.canvas,
                self.width,
                self.height,
                (x0 + PLACEHOLDER_LABEL_INSET) as f32,
                (y0 + art_h as i32 / 2) as f32,
                label,
                tint,
                PLACEHOLDER_LABEL_SIZE,
            );
        }
    }

    fn draw_caption(&mut self, scene: &FrameScene<'_>) {
        let (Some(view), Some(text)) = (scene.caption, self.text.as_mut()) else {
            return;
        };
        let style = self.caption_style;
        let words = visible_words(view.entry, view.active_word, scene.time, style.group_size);
        if words.is_empty() {
            return;
        }

        let space = text.measure(" ");
        let line_width: f32 = words.iter().map(|(w, _)| text.measure(&w.text)).sum::<f32>()
            + space * (words.len() - 1) as f32;
        let mut x = (self.width as f32 - line_width) / 2.0;
        let y = caption_top(self.height, text.font_size());

        for (word, highlighted) in words {
            let color = if highlighted { style.highlight } else { style.color };
            text.draw_outlined(
                &mut self.canvas,
                self.width,
                self.height,
                x,
                y,
                &word.text,
                color,
                style.outline,
                style.outline_color,
            );
            x += text.measure(&word.text) + space;
        }
    }
}

impl SceneRenderer for Compositor {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&mut self, scene: &FrameScene<'_>) -> Result<(), RenderError> {
        match scene.background {
            Some(background) => {
                if background.len() != self.canvas.len() {
                    return Err(RenderError::SizeMismatch {
                        expected: self.canvas.len(),
                        actual: background.len(),
                    });
                }
                self.canvas.copy_from_slice(background);
            }
            None => self.clear(scene.fallback),
        }

        for layer in &scene.characters {
            self.draw_character(layer);
        }
        self.draw_caption(scene);
        Ok(())
    }

    fn pixels(&self) -> &[u8] {
        &self.canvas
    }
}
