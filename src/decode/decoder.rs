//! FFmpeg video decoder with hardware/software path selection.
//! All unsafe FFmpeg code is isolated in this module.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;

use ffmpeg_next as ffmpeg;
use ffmpeg::codec;
use ffmpeg::format::Pixel;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{Packet, Rational};

use crate::core::time::Seconds;
use crate::decode::stream_info::VideoStreamInfo;

/// Default VAAPI render node
pub const VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Error type for decoding operations
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("No video stream found")]
    NoVideoStream,
    #[error("Seek failed: {0}")]
    SeekFailed(String),
    #[error("Failed to open codec: {0}")]
    CodecOpenFailed(String),
    #[error("Hardware frame transfer failed: {0}")]
    HardwareTransfer(String),
    #[error("No decode path could open the stream")]
    NoDecodePath,
}

fn ffmpeg_err(context: &'static str) -> impl Fn(ffmpeg::Error) -> DecodeError {
    move |e| DecodeError::FFmpeg(format!("{}: {}", context, e))
}

/// Owned reference to a hardware device context
pub struct HwDevice {
    device_ref: *mut ffmpeg::ffi::AVBufferRef,
}

impl HwDevice {
    /// Create a device of `device_type` on `device`
    pub fn create(
        device_type: ffmpeg::ffi::AVHWDeviceType,
        device: &str,
    ) -> Result<Self, DecodeError> {
        let device_cstr = CString::new(device)
            .map_err(|e| DecodeError::CodecOpenFailed(format!("Invalid device path: {}", e)))?;
        let mut device_ref: *mut ffmpeg::ffi::AVBufferRef = ptr::null_mut();
        let ret = unsafe {
            ffmpeg::ffi::av_hwdevice_ctx_create(
                &mut device_ref,
                device_type,
                device_cstr.as_ptr(),
                ptr::null_mut(),
                0,
            )
        };
        if ret < 0 || device_ref.is_null() {
            return Err(DecodeError::CodecOpenFailed(format!(
                "av_hwdevice_ctx_create({}) returned {}",
                device, ret
            )));
        }
        Ok(Self { device_ref })
    }

    fn new_ref(&self) -> *mut ffmpeg::ffi::AVBufferRef {
        unsafe { ffmpeg::ffi::av_buffer_ref(self.device_ref) }
    }
}

impl Drop for HwDevice {
    fn drop(&mut self) {
        unsafe {
            ffmpeg::ffi::av_buffer_unref(&mut self.device_ref);
        }
    }
}

/// An opened video decoder plus the device it decodes on, if any
pub struct OpenedDecoder {
    pub decoder: ffmpeg::decoder::Video,
    pub hw_device: Option<HwDevice>,
}

/// One way of opening a video decoder
pub trait DecodePath {
    fn name(&self) -> &'static str;
    fn try_open(&self, parameters: codec::Parameters) -> Result<OpenedDecoder, DecodeError>;
}

/// VAAPI hardware decoding
pub struct HardwareDecode {
    pub device: String,
}

impl Default for HardwareDecode {
    fn default() -> Self {
        Self {
            device: VAAPI_DEVICE.to_string(),
        }
    }
}

impl DecodePath for HardwareDecode {
    fn name(&self) -> &'static str {
        "vaapi"
    }

    fn try_open(&self, parameters: codec::Parameters) -> Result<OpenedDecoder, DecodeError> {
        let device = HwDevice::create(
            ffmpeg::ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_VAAPI,
            &self.device,
        )?;
        let mut context = codec::context::Context::from_parameters(parameters)
            .map_err(ffmpeg_err("codec parameters"))?;
        unsafe {
            (*context.as_mut_ptr()).hw_device_ctx = device.new_ref();
        }
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| DecodeError::CodecOpenFailed(e.to_string()))?;
        Ok(OpenedDecoder {
            decoder,
            hw_device: Some(device),
        })
    }
}

/// Plain software decoding
pub struct SoftwareDecode;

impl DecodePath for SoftwareDecode {
    fn name(&self) -> &'static str {
        "software"
    }

    fn try_open(&self, parameters: codec::Parameters) -> Result<OpenedDecoder, DecodeError> {
        let context = codec::context::Context::from_parameters(parameters)
            .map_err(ffmpeg_err("codec parameters"))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| DecodeError::CodecOpenFailed(e.to_string()))?;
        Ok(OpenedDecoder {
            decoder,
            hw_device: None,
        })
    }
}

/// Try each path in order, returning the first that opens.
pub fn open_first(
    paths: &[&dyn DecodePath],
    parameters: &codec::Parameters,
) -> Result<(OpenedDecoder, &'static str), DecodeError> {
    for path in paths {
        match path.try_open(parameters.clone()) {
            Ok(opened) => return Ok((opened, path.name())),
            Err(e) => tracing::warn!("Decode path {} unavailable: {}", path.name(), e),
        }
    }
    Err(DecodeError::NoDecodePath)
}

/// A decoded frame in system memory with its presentation time
pub struct DecodedFrame {
    pub frame: VideoFrame,
    /// Seconds since the stream's start time
    pub time: Seconds,
}

/// Sequential video decoder over one input file
pub struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    _hw_device: Option<HwDevice>,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    time_base: Rational,
    start_pts: i64,
    frame_interval: Seconds,
    last_time: Option<Seconds>,
    draining: bool,
    info: VideoStreamInfo,
}

impl VideoDecoder {
    /// Open with hardware decoding first, then software
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let hardware = HardwareDecode::default();
        Self::open_with(path, &[&hardware, &SoftwareDecode])
    }

    pub fn open_with<P: AsRef<Path>>(
        path: P,
        paths: &[&dyn DecodePath],
    ) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DecodeError::FileNotFound(path.to_path_buf()));
        }
        ffmpeg::init().map_err(ffmpeg_err("init"))?;

        let input = ffmpeg::format::input(&path).map_err(ffmpeg_err("open input"))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(DecodeError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let start_pts = match stream.start_time() {
            ts if ts == ffmpeg::ffi::AV_NOPTS_VALUE => 0,
            ts => ts,
        };
        let parameters = stream.parameters();

        let (opened, path_name) = open_first(paths, &parameters)?;
        let info = VideoStreamInfo::from_stream(&stream, &input, &opened.decoder);
        drop(stream);

        tracing::info!(
            path = %path.display(),
            decode_path = path_name,
            "{}",
            info
        );

        let frame_interval = info.frame_interval();
        Ok(Self {
            decoder: opened.decoder,
            _hw_device: opened.hw_device,
            input,
            stream_index,
            time_base,
            start_pts,
            frame_interval,
            last_time: None,
            draining: false,
            info,
        })
    }

    pub fn info(&self) -> &VideoStreamInfo {
        &self.info
    }

    /// Seek to the keyframe at or before `time` and drop buffered frames
    pub fn seek(&mut self, time: Seconds) -> Result<(), DecodeError> {
        let target_pts = self.start_pts + self.seconds_to_pts(time.max(0.0));
        let ret = unsafe {
            ffmpeg::ffi::av_seek_frame(
                self.input.as_mut_ptr(),
                self.stream_index as i32,
                target_pts,
                ffmpeg::ffi::AVSEEK_FLAG_BACKWARD as i32,
            )
        };
        if ret < 0 {
            return Err(DecodeError::SeekFailed(format!(
                "av_seek_frame returned {}",
                ret
            )));
        }
        self.decoder.flush();
        self.draining = false;
        self.last_time = None;
        Ok(())
    }

    /// Decode the next frame in presentation order. `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>, DecodeError> {
        loop {
            let mut frame = VideoFrame::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => return self.finish_frame(frame).map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(_) if self.draining => return Ok(None),
                Err(_) => {}
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        tracing::debug!("Dropping video packet: {}", e);
                    }
                }
                Err(ffmpeg::Error::Eof) => self.start_draining()?,
                Err(e) => {
                    tracing::warn!("Background read failed, treating as end of stream: {}", e);
                    self.start_draining()?;
                }
            }
        }
    }

    fn start_draining(&mut self) -> Result<(), DecodeError> {
        self.draining = true;
        self.decoder
            .send_eof()
            .map_err(ffmpeg_err("flush decoder"))
    }

    fn finish_frame(&mut self, frame: VideoFrame) -> Result<DecodedFrame, DecodeError> {
        let time = match frame.timestamp().or_else(|| frame.pts()) {
            Some(ts) => self.pts_to_seconds(ts - self.start_pts),
            None => self
                .last_time
                .map(|last| last + self.frame_interval)
                .unwrap_or(0.0),
        };
        self.last_time = Some(time);

        let frame = if frame.format() == Pixel::VAAPI {
            transfer_to_system(&frame)?
        } else {
            frame
        };
        Ok(DecodedFrame { frame, time })
    }

    fn seconds_to_pts(&self, time: Seconds) -> i64 {
        (time * f64::from(self.time_base.invert())) as i64
    }

    fn pts_to_seconds(&self, pts: i64) -> Seconds {
        pts as f64 * f64::from(self.time_base)
    }
}

/// Copy a hardware surface into a system-memory frame
fn transfer_to_system(frame: &VideoFrame) -> Result<VideoFrame, DecodeError> {
    let mut software = VideoFrame::empty();
    let ret = unsafe {
        ffmpeg::ffi::av_hwframe_transfer_data(software.as_mut_ptr(), frame.as_ptr(), 0)
    };
    if ret < 0 {
        return Err(DecodeError::HardwareTransfer(format!(
            "av_hwframe_transfer_data returned {}",
            ret
        )));
    }
    software.set_pts(frame.pts());
    Ok(software)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl DecodePath for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn try_open(&self, _: codec::Parameters) -> Result<OpenedDecoder, DecodeError> {
            Err(DecodeError::CodecOpenFailed("unavailable".to_string()))
        }
    }

    #[test]
    fn test_no_path_opens() {
        let parameters = codec::Parameters::new();
        let result = open_first(&[&Failing, &Failing], &parameters);
        assert!(matches!(result, Err(DecodeError::NoDecodePath)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            VideoDecoder::open("/nonexistent/background.mp4"),
            Err(DecodeError::FileNotFound(_))
        ));
    }
}
