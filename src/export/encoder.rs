//! FFmpeg encoders for exporting video.
//! H.264 is opened through an ordered list of codec paths; audio is AAC.
//! All unsafe-adjacent FFmpeg state stays inside these wrappers.

use std::path::PathBuf;

use ffmpeg_next as ffmpeg;
use ffmpeg::codec::{self, Codec};
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{Pixel, Sample};
use ffmpeg::software::scaling::{Context as ScaleContext, Flags as ScaleFlags};
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{Dictionary, Packet, Rational};

use crate::audio::AudioChunk;
use crate::export::pipeline::ExportSettings;

/// Samples per AAC frame when the encoder does not report one
const DEFAULT_AAC_FRAME_SIZE: usize = 1024;

/// Error type for encoding operations
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),
    #[error("File creation failed for {path}: {message}")]
    FileCreation { path: PathBuf, message: String },
    #[error("No H.264 encoder could be opened")]
    NoVideoEncoder,
    #[error("AAC encoder not found")]
    NoAudioEncoder,
    #[error("Frame is {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
    #[error("Audio chunk has {actual} samples, encoder expects {expected}")]
    ChunkSize { expected: usize, actual: usize },
    #[error("Output already finished")]
    Finished,
}

pub(crate) fn ffmpeg_err(context: &'static str) -> impl Fn(ffmpeg::Error) -> EncodeError {
    move |e| EncodeError::FFmpeg(format!("{}: {}", context, e))
}

/// Video encoder parameters
#[derive(Debug, Clone)]
pub struct VideoEncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bit_rate: usize,
    pub gop: u32,
    pub max_b_frames: usize,
    /// Codec extradata goes in the container header
    pub global_header: bool,
}

impl VideoEncoderConfig {
    pub fn from_settings(settings: &ExportSettings, global_header: bool) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            bit_rate: settings.video_bitrate as usize,
            gop: settings.gop,
            max_b_frames: settings.max_b_frames,
            global_header,
        }
    }

    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.fps.max(1) as i32)
    }
}

/// One way of getting an H.264 encoder
pub trait VideoCodecPath {
    fn name(&self) -> &'static str;
    fn codec(&self) -> Option<Codec>;
    fn pixel_format(&self) -> Pixel;
    fn options(&self) -> Dictionary<'static>;
}

/// AMD AMF hardware encoder
pub struct AmfH264;

impl VideoCodecPath for AmfH264 {
    fn name(&self) -> &'static str {
        "h264_amf"
    }

    fn codec(&self) -> Option<Codec> {
        ffmpeg::encoder::find_by_name("h264_amf")
    }

    fn pixel_format(&self) -> Pixel {
        Pixel::NV12
    }

    fn options(&self) -> Dictionary<'static> {
        let mut opts = Dictionary::new();
        opts.set("usage", "lowlatency");
        opts.set("profile", "main");
        opts.set("quality", "speed");
        opts.set("rc", "cqp");
        opts.set("qp_i", "23");
        opts.set("qp_p", "23");
        opts
    }
}

/// Cheapest motion search and analysis x264 offers
pub const X264_FAST_PARAMS: &str = "aq-mode=0:me=dia:subme=1:ref=1:analyse=none:trellis=0:\
    no-fast-pskip=0:8x8dct=0:sliced-threads=1";

/// x264 software encoder tuned for throughput
pub struct Libx264;

impl VideoCodecPath for Libx264 {
    fn name(&self) -> &'static str {
        "libx264"
    }

    fn codec(&self) -> Option<Codec> {
        ffmpeg::encoder::find_by_name("libx264")
    }

    fn pixel_format(&self) -> Pixel {
        Pixel::YUV420P
    }

    fn options(&self) -> Dictionary<'static> {
        let mut opts = Dictionary::new();
        opts.set("preset", "ultrafast");
        opts.set("tune", "zerolatency");
        opts.set("crf", "28");
        opts.set("threads", "0");
        opts.set("thread_type", "slice+frame");
        opts.set("x264-params", X264_FAST_PARAMS);
        opts
    }
}

/// Whatever H.264 encoder FFmpeg has registered
pub struct AnyH264;

impl VideoCodecPath for AnyH264 {
    fn name(&self) -> &'static str {
        "h264"
    }

    fn codec(&self) -> Option<Codec> {
        ffmpeg::encoder::find(codec::Id::H264)
    }

    fn pixel_format(&self) -> Pixel {
        Pixel::YUV420P
    }

    fn options(&self) -> Dictionary<'static> {
        Dictionary::new()
    }
}

/// Hardware first, then x264, then any H.264 encoder
pub fn default_video_paths() -> [&'static dyn VideoCodecPath; 3] {
    [&AmfH264, &Libx264, &AnyH264]
}

fn open_path(
    path: &dyn VideoCodecPath,
    config: &VideoEncoderConfig,
) -> Result<(ffmpeg::encoder::video::Encoder, Codec), EncodeError> {
    let codec = path
        .codec()
        .ok_or_else(|| EncodeError::FFmpeg(format!("{} is not registered", path.name())))?;
    let mut encoder = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(ffmpeg_err("video encoder context"))?;

    encoder.set_width(config.width);
    encoder.set_height(config.height);
    encoder.set_format(path.pixel_format());
    encoder.set_time_base(config.time_base());
    encoder.set_frame_rate(Some(Rational::new(config.fps as i32, 1)));
    encoder.set_bit_rate(config.bit_rate);
    encoder.set_gop(config.gop);
    encoder.set_max_b_frames(config.max_b_frames);
    if config.global_header {
        encoder.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let opened = encoder
        .open_as_with(codec, path.options())
        .map_err(ffmpeg_err("open video encoder"))?;
    Ok((opened, codec))
}

/// RGBA canvas frames in, H.264 packets out
pub struct VideoEncoder {
    encoder: ffmpeg::encoder::video::Encoder,
    codec: Codec,
    path_name: &'static str,
    scaler: ScaleContext,
    rgba: VideoFrame,
    width: u32,
    height: u32,
    time_base: Rational,
}

impl VideoEncoder {
    /// Open the first path that works, logging each one that does not.
    pub fn open(
        paths: &[&dyn VideoCodecPath],
        config: &VideoEncoderConfig,
    ) -> Result<Self, EncodeError> {
        for path in paths {
            let (encoder, codec) = match open_path(*path, config) {
                Ok(opened) => opened,
                Err(e) => {
                    tracing::warn!("Video encoder {} unavailable: {}", path.name(), e);
                    continue;
                }
            };
            let scaler = ScaleContext::get(
                Pixel::RGBA,
                config.width,
                config.height,
                path.pixel_format(),
                config.width,
                config.height,
                ScaleFlags::BILINEAR,
            )
            .map_err(ffmpeg_err("create encoder scaler"))?;

            tracing::info!(
                encoder = path.name(),
                width = config.width,
                height = config.height,
                fps = config.fps,
                "video encoder opened"
            );
            return Ok(Self {
                encoder,
                codec,
                path_name: path.name(),
                scaler,
                rgba: VideoFrame::new(Pixel::RGBA, config.width, config.height),
                width: config.width,
                height: config.height,
                time_base: config.time_base(),
            });
        }
        Err(EncodeError::NoVideoEncoder)
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn path_name(&self) -> &'static str {
        self.path_name
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn encoder(&self) -> &ffmpeg::encoder::video::Encoder {
        &self.encoder
    }

    /// Convert and submit one canvas; `index` is the frame's pts.
    pub fn send_rgba(&mut self, rgba: &[u8], index: i64) -> Result<(), EncodeError> {
        let row = self.width as usize * 4;
        let expected = row * self.height as usize;
        if rgba.len() != expected {
            return Err(EncodeError::FrameSize {
                expected,
                actual: rgba.len(),
            });
        }

        let stride = self.rgba.stride(0);
        let plane = self.rgba.data_mut(0);
        for (y, src) in rgba.chunks_exact(row).enumerate() {
            plane[y * stride..y * stride + row].copy_from_slice(src);
        }

        // Fresh output each frame: the encoder may keep a reference to the last one.
        let mut converted = VideoFrame::empty();
        self.scaler
            .run(&self.rgba, &mut converted)
            .map_err(ffmpeg_err("convert frame"))?;
        converted.set_pts(Some(index));

        self.encoder
            .send_frame(&converted)
            .map_err(ffmpeg_err("send video frame"))
    }

    pub fn send_eof(&mut self) -> Result<(), EncodeError> {
        self.encoder
            .send_eof()
            .map_err(ffmpeg_err("flush video encoder"))
    }

    pub fn receive_packet(&mut self, packet: &mut Packet) -> bool {
        self.encoder.receive_packet(packet).is_ok()
    }
}

/// AAC encoder parameters
#[derive(Debug, Clone)]
pub struct AudioEncoderConfig {
    pub sample_rate: u32,
    pub bit_rate: usize,
    pub global_header: bool,
}

impl AudioEncoderConfig {
    pub fn from_settings(settings: &ExportSettings, global_header: bool) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            bit_rate: settings.audio_bitrate as usize,
            global_header,
        }
    }

    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate as i32)
    }
}

/// Planar stereo chunks in, AAC packets out
pub struct AudioEncoder {
    encoder: ffmpeg::encoder::audio::Encoder,
    codec: Codec,
    frame_size: usize,
    sample_rate: u32,
    time_base: Rational,
}

impl AudioEncoder {
    pub fn open(config: &AudioEncoderConfig) -> Result<Self, EncodeError> {
        let codec = ffmpeg::encoder::find(codec::Id::AAC).ok_or(EncodeError::NoAudioEncoder)?;
        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(ffmpeg_err("audio encoder context"))?;

        encoder.set_rate(config.sample_rate as i32);
        encoder.set_channel_layout(ChannelLayout::STEREO);
        encoder.set_format(Sample::F32(SampleType::Planar));
        encoder.set_bit_rate(config.bit_rate);
        encoder.set_time_base(config.time_base());
        if config.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_as_with(codec, Dictionary::new())
            .map_err(ffmpeg_err("open AAC encoder"))?;
        let frame_size = match encoder.frame_size() as usize {
            0 => DEFAULT_AAC_FRAME_SIZE,
            n => n,
        };
        tracing::info!(frame_size, bit_rate = config.bit_rate, "audio encoder opened");

        Ok(Self {
            encoder,
            codec,
            frame_size,
            sample_rate: config.sample_rate,
            time_base: config.time_base(),
        })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Samples per channel in every submitted chunk
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn encoder(&self) -> &ffmpeg::encoder::audio::Encoder {
        &self.encoder
    }

    pub fn send_chunk(&mut self, chunk: &AudioChunk) -> Result<(), EncodeError> {
        if chunk.len() != self.frame_size || chunk.right.len() != self.frame_size {
            return Err(EncodeError::ChunkSize {
                expected: self.frame_size,
                actual: chunk.len(),
            });
        }
        let mut frame = AudioFrame::new(
            Sample::F32(SampleType::Planar),
            self.frame_size,
            ChannelLayout::STEREO,
        );
        frame.set_rate(self.sample_rate);
        frame.set_pts(Some(chunk.pts));
        frame.plane_mut::<f32>(0)[..self.frame_size].copy_from_slice(&chunk.left);
        frame.plane_mut::<f32>(1)[..self.frame_size].copy_from_slice(&chunk.right);

        self.encoder
            .send_frame(&frame)
            .map_err(ffmpeg_err("send audio frame"))
    }

    pub fn send_eof(&mut self) -> Result<(), EncodeError> {
        self.encoder
            .send_eof()
            .map_err(ffmpeg_err("flush audio encoder"))
    }

    pub fn receive_packet(&mut self, packet: &mut Packet) -> bool {
        self.encoder.receive_packet(packet).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_order_and_formats() {
        let paths = default_video_paths();
        let names: Vec<_> = paths.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["h264_amf", "libx264", "h264"]);
        assert_eq!(paths[0].pixel_format(), Pixel::NV12);
        assert_eq!(paths[1].pixel_format(), Pixel::YUV420P);
    }

    #[test]
    fn test_path_options() {
        let x264 = Libx264.options();
        assert_eq!(x264.get("preset"), Some("ultrafast"));
        assert_eq!(x264.get("crf"), Some("28"));
        let params = x264.get("x264-params").unwrap();
        assert!(params.starts_with("aq-mode=0:me=dia:"));
        assert!(params.contains(":no-fast-pskip=0:"));

        let amf = AmfH264.options();
        assert_eq!(amf.get("rc"), Some("cqp"));
        assert_eq!(amf.get("qp_p"), Some("23"));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ExportSettings::default();
        let video = VideoEncoderConfig::from_settings(&settings, true);
        assert_eq!(video.bit_rate, 8_000_000);
        assert_eq!(video.gop, 60);
        assert_eq!(video.max_b_frames, 0);
        assert_eq!(video.time_base(), Rational::new(1, 60));

        let audio = AudioEncoderConfig::from_settings(&settings, false);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.bit_rate, 128_000);
    }

    struct Missing;

    impl VideoCodecPath for Missing {
        fn name(&self) -> &'static str {
            "missing"
        }

        fn codec(&self) -> Option<Codec> {
            None
        }

        fn pixel_format(&self) -> Pixel {
            Pixel::YUV420P
        }

        fn options(&self) -> Dictionary<'static> {
            Dictionary::new()
        }
    }

    #[test]
    fn test_no_path_opens() {
        let config = VideoEncoderConfig::from_settings(&ExportSettings::default(), false);
        assert!(matches!(
            VideoEncoder::open(&[&Missing, &Missing], &config),
            Err(EncodeError::NoVideoEncoder)
        ));
    }
}
