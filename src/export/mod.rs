pub mod encoder;
pub mod exporter;
pub mod muxer;
pub mod pipeline;

pub use encoder::{AudioEncoder, EncodeError, VideoCodecPath, VideoEncoder};
pub use exporter::{ExportSummary, Exporter};
pub use muxer::{MediaSink, Mp4Writer};
pub use pipeline::{ExportError, ExportSettings, RenderMode};
