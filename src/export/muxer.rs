//! MP4 output: encoder packets are rescaled to stream time bases and written
//! interleaved.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::context::Output;
use ffmpeg::{Packet, Rational};

use crate::audio::AudioChunk;
use crate::export::encoder::{
    default_video_paths, ffmpeg_err, AudioEncoder, AudioEncoderConfig, EncodeError, VideoEncoder,
    VideoEncoderConfig,
};
use crate::export::pipeline::ExportSettings;

/// Where rendered frames and mixed audio go.
pub trait MediaSink {
    /// Submit one RGBA canvas; `index` is the output frame number.
    fn push_video(&mut self, rgba: &[u8], index: u64) -> Result<(), EncodeError>;

    /// Samples per channel the audio stream consumes per chunk, or `None`
    /// when the output has no audio.
    fn audio_frame_size(&self) -> Option<usize>;

    fn push_audio(&mut self, chunk: &AudioChunk) -> Result<(), EncodeError>;

    /// Drain the video encoder. No video may be pushed afterwards.
    fn flush_video(&mut self) -> Result<(), EncodeError>;

    /// Drain audio and finalize the container.
    fn finish(&mut self) -> Result<(), EncodeError>;
}

struct AudioOutput {
    encoder: AudioEncoder,
    stream: usize,
    stream_time_base: Rational,
}

/// H.264 (+ optional AAC) MP4 file
pub struct Mp4Writer {
    output: Output,
    path: PathBuf,
    video: VideoEncoder,
    video_stream: usize,
    video_stream_time_base: Rational,
    audio: Option<AudioOutput>,
    video_packets: u64,
    audio_packets: u64,
    video_flushed: bool,
    finished: bool,
}

impl Mp4Writer {
    /// Open `path`, set up the encoders and write the container header.
    pub fn create(
        path: &Path,
        settings: &ExportSettings,
        with_audio: bool,
    ) -> Result<Self, EncodeError> {
        ffmpeg::init().map_err(ffmpeg_err("init"))?;

        let mut output = ffmpeg::format::output(&path).map_err(|e| EncodeError::FileCreation {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let video = VideoEncoder::open(
            &default_video_paths(),
            &VideoEncoderConfig::from_settings(settings, global_header),
        )?;
        let video_stream = {
            let mut stream = output
                .add_stream(video.codec())
                .map_err(ffmpeg_err("add video stream"))?;
            stream.set_parameters(video.encoder());
            stream.set_time_base(video.time_base());
            stream.index()
        };

        let audio_config = AudioEncoderConfig::from_settings(settings, global_header);
        let audio_encoder = if with_audio {
            optional_audio(AudioEncoder::open(&audio_config))
        } else {
            None
        };
        let audio = if let Some(encoder) = audio_encoder {
            let mut stream = output
                .add_stream(encoder.codec())
                .map_err(ffmpeg_err("add audio stream"))?;
            stream.set_parameters(encoder.encoder());
            stream.set_time_base(encoder.time_base());
            let index = stream.index();
            Some((encoder, index))
        } else {
            None
        };

        output
            .write_header()
            .map_err(ffmpeg_err("write header"))?;

        // The muxer may pick its own stream time bases while writing the header.
        let stream_time_base = |output: &Output, index: usize| {
            output
                .stream(index)
                .map(|stream| stream.time_base())
                .ok_or_else(|| EncodeError::FFmpeg(format!("stream {} missing", index)))
        };
        let video_stream_time_base = stream_time_base(&output, video_stream)?;
        let audio = match audio {
            Some((encoder, stream)) => Some(AudioOutput {
                stream_time_base: stream_time_base(&output, stream)?,
                encoder,
                stream,
            }),
            None => None,
        };

        tracing::info!(
            path = %path.display(),
            video = video.path_name(),
            audio = audio.is_some(),
            "output opened"
        );

        Ok(Self {
            output,
            path: path.to_path_buf(),
            video,
            video_stream,
            video_stream_time_base,
            audio,
            video_packets: 0,
            audio_packets: 0,
            video_flushed: false,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_video_packets(&mut self) -> Result<(), EncodeError> {
        let codec_time_base = self.video.time_base();
        self.video_packets += write_pending(
            &mut self.output,
            self.video_stream,
            codec_time_base,
            self.video_stream_time_base,
            |packet| self.video.receive_packet(packet),
        )?;
        Ok(())
    }

    fn write_audio_packets(&mut self) -> Result<(), EncodeError> {
        let Some(audio) = self.audio.as_mut() else {
            return Ok(());
        };
        let codec_time_base = audio.encoder.time_base();
        self.audio_packets += write_pending(
            &mut self.output,
            audio.stream,
            codec_time_base,
            audio.stream_time_base,
            |packet| audio.encoder.receive_packet(packet),
        )?;
        Ok(())
    }
}

/// A missing or unopenable AAC encoder downgrades the output to video only.
fn optional_audio<T>(opened: Result<T, EncodeError>) -> Option<T> {
    match opened {
        Ok(encoder) => Some(encoder),
        Err(e) => {
            tracing::warn!("Could not open audio encoder, writing video only: {}", e);
            None
        }
    }
}

fn write_pending(
    output: &mut Output,
    stream: usize,
    codec_time_base: Rational,
    stream_time_base: Rational,
    mut receive: impl FnMut(&mut Packet) -> bool,
) -> Result<u64, EncodeError> {
    let mut written = 0;
    let mut packet = Packet::empty();
    while receive(&mut packet) {
        packet.set_stream(stream);
        packet.rescale_ts(codec_time_base, stream_time_base);
        packet
            .write_interleaved(output)
            .map_err(ffmpeg_err("write packet"))?;
        written += 1;
    }
    Ok(written)
}

impl MediaSink for Mp4Writer {
    fn push_video(&mut self, rgba: &[u8], index: u64) -> Result<(), EncodeError> {
        if self.video_flushed {
            return Err(EncodeError::Finished);
        }
        self.video.send_rgba(rgba, index as i64)?;
        self.write_video_packets()
    }

    fn audio_frame_size(&self) -> Option<usize> {
        self.audio.as_ref().map(|audio| audio.encoder.frame_size())
    }

    fn push_audio(&mut self, chunk: &AudioChunk) -> Result<(), EncodeError> {
        if self.finished {
            return Err(EncodeError::Finished);
        }
        let Some(audio) = self.audio.as_mut() else {
            return Ok(());
        };
        audio.encoder.send_chunk(chunk)?;
        self.write_audio_packets()
    }

    fn flush_video(&mut self) -> Result<(), EncodeError> {
        if self.video_flushed {
            return Ok(());
        }
        self.video.send_eof()?;
        self.write_video_packets()?;
        self.video_flushed = true;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        if self.finished {
            return Ok(());
        }
        self.flush_video()?;
        if let Some(audio) = self.audio.as_mut() {
            audio.encoder.send_eof()?;
        }
        self.write_audio_packets()?;
        self.output
            .write_trailer()
            .map_err(ffmpeg_err("write trailer"))?;
        self.finished = true;

        tracing::info!(
            path = %self.path.display(),
            video_packets = self.video_packets,
            audio_packets = self.audio_packets,
            "output finalized"
        );
        Ok(())
    }
}

impl Drop for Mp4Writer {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                path = %self.path.display(),
                "output closed without a trailer, file may be unplayable"
            );
        }
    }
}
