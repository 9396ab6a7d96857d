pub mod caption;
pub mod compositor;
pub mod renderer;
pub mod text;

pub use compositor::{CaptionStyle, CharacterArt, Compositor};
pub use renderer::{
    CaptionView, CharacterLayer, Color, FrameScene, RenderError, SceneRenderer, Sprite, Transform,
};
pub use text::TextPainter;
