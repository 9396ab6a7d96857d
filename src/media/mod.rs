//! Loading of project inputs: caption files, sprites and fonts.

pub mod assets;
pub mod captions;

pub use assets::{load_font, load_font_with_fallback, load_sprite, SYSTEM_FALLBACK_FONTS};
pub use captions::{load_caption_file, load_timeline, CaptionFile, LoadError};
