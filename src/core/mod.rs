//! Core types for the renderer.
//!
//! Caption entries, the caption timeline, time helpers and the project
//! directory layout. All timeline times are seconds (f64).

pub mod caption;
pub mod project;
pub mod time;
pub mod timeline;

// Re-export core data structures for easier access.
pub use caption::{CaptionEntry, Speaker, WordSpan};
pub use project::ProjectLayout;
pub use time::Seconds;
pub use timeline::{active_word, Timeline, TimelineBuilder};
