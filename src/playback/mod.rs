//! Per-frame simulation state: the clock, character animation and the
//! interactive preview surface.

pub mod character;
pub mod preview;
pub mod sync;

pub use character::{ease_out_cubic, CharacterState, Phase, Stage, StageLayout};
pub use preview::{Headless, InterruptPreview, PreviewSurface};
pub use sync::{ClockMode, FrameClock, FrameTick};
