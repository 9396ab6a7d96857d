pub mod background;
pub mod decoder;
pub mod scale;
pub mod stream_info;

pub use background::{
    BackgroundFrameSource, BackgroundSource, FrameGate, FrameStream, ScaledDecoder, SeekPolicy,
};
pub use decoder::{DecodeError, DecodePath, HardwareDecode, SoftwareDecode, VideoDecoder};
pub use scale::{CropPlan, RgbaConverter};
pub use stream_info::VideoStreamInfo;
