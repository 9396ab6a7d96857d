//! Renders short vertical videos of two characters trading spoken lines.
//!
//! Captions drive a timeline; each frame composites a background video frame,
//! the speaking character and the current caption words, and the result is
//! encoded with the matching speaker audio into an H.264/AAC MP4.

pub mod audio;
pub mod core;
pub mod decode;
pub mod export;
pub mod media;
pub mod playback;
pub mod render;
