pub mod accumulator;
pub mod buffer;
pub mod loader;
pub mod mixer;

pub use accumulator::{AudioAccumulator, AudioChunk};
pub use buffer::{AudioTrack, SAMPLE_RATE};
pub use loader::{load_track, load_tracks, AudioError};
pub use mixer::{extract_window, AudioMixer};
