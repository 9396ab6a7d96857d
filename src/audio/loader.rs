//! Speaker clip preloading with FFmpeg.
//! Decodes a whole file and resamples it to 44.1 kHz stereo f32.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::Sample;
use ffmpeg::software::resampling;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;

use crate::audio::buffer::{AudioTrack, TrackWriter, FALLBACK_DURATION, SAMPLE_RATE};

/// Extra output room per conversion for resampler delay
const RESAMPLE_HEADROOM: usize = 256;

/// Error type for audio loading
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("No audio stream found in {0}")]
    NoAudioStream(PathBuf),
}

fn ffmpeg_err(context: &'static str) -> impl Fn(ffmpeg::Error) -> AudioError {
    move |e| AudioError::FFmpeg(format!("{}: {}", context, e))
}

/// Decode and resample one clip completely into memory.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_track(path: &Path) -> Result<AudioTrack, AudioError> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }
    ffmpeg::init().map_err(ffmpeg_err("init"))?;

    let mut ictx = ffmpeg::format::input(&path).map_err(ffmpeg_err("open input"))?;
    let (stream_index, parameters, estimated) = {
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .ok_or_else(|| AudioError::NoAudioStream(path.to_path_buf()))?;
        let container = ictx.duration();
        let estimated = if container > 0 {
            container as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        } else if stream.duration() > 0 {
            stream.duration() as f64 * f64::from(stream.time_base())
        } else {
            FALLBACK_DURATION
        };
        (stream.index(), stream.parameters(), estimated)
    };

    let context = ffmpeg::codec::context::Context::from_parameters(parameters)
        .map_err(ffmpeg_err("codec parameters"))?;
    let mut decoder = context
        .decoder()
        .audio()
        .map_err(ffmpeg_err("open audio decoder"))?;

    let source_layout = if decoder.channel_layout().is_empty() {
        ChannelLayout::default(i32::from(decoder.channels()))
    } else {
        decoder.channel_layout()
    };
    let mut converter = Converter {
        resampler: resampling::Context::get(
            decoder.format(),
            source_layout,
            decoder.rate(),
            Sample::F32(SampleType::Planar),
            ChannelLayout::STEREO,
            SAMPLE_RATE,
        )
        .map_err(ffmpeg_err("create resampler"))?,
        source_layout,
        source_rate: decoder.rate().max(1),
        writer: TrackWriter::with_estimated_duration(estimated),
    };
    tracing::debug!(
        rate = decoder.rate(),
        channels = decoder.channels(),
        estimated,
        "decoding audio clip"
    );

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            tracing::warn!("Dropping undecodable audio packet: {}", e);
            continue;
        }
        converter.drain_decoder(&mut decoder);
    }
    decoder.send_eof().map_err(ffmpeg_err("flush decoder"))?;
    converter.drain_decoder(&mut decoder);
    converter.flush();

    let track = converter.writer.finish();
    tracing::info!(
        samples = track.sample_count(),
        seconds = track.duration(),
        "audio clip loaded"
    );
    Ok(track)
}

/// Load every clip, skipping the ones that fail.
pub fn load_tracks(paths: &[PathBuf]) -> Vec<AudioTrack> {
    paths
        .iter()
        .filter_map(|path| match load_track(path) {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!("Skipping audio clip: {}", e);
                None
            }
        })
        .collect()
}

struct Converter {
    resampler: resampling::Context,
    source_layout: ChannelLayout,
    source_rate: u32,
    writer: TrackWriter,
}

impl Converter {
    fn output_frame(&self, input_samples: usize) -> AudioFrame {
        let scaled = (input_samples as u64 * SAMPLE_RATE as u64).div_ceil(self.source_rate as u64);
        AudioFrame::new(
            Sample::F32(SampleType::Planar),
            scaled as usize + RESAMPLE_HEADROOM,
            ChannelLayout::STEREO,
        )
    }

    fn drain_decoder(&mut self, decoder: &mut ffmpeg::decoder::Audio) {
        let mut decoded = AudioFrame::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if decoded.channel_layout().is_empty() {
                decoded.set_channel_layout(self.source_layout);
            }
            let mut converted = self.output_frame(decoded.samples());
            match self.resampler.run(&decoded, &mut converted) {
                Ok(_) => self.append(&converted),
                Err(e) => tracing::warn!("Dropping audio frame that failed to resample: {}", e),
            }
        }
    }

    /// Drain samples still buffered inside the resampler
    fn flush(&mut self) {
        for _ in 0..64 {
            let mut tail = self.output_frame(0);
            match self.resampler.flush(&mut tail) {
                Ok(_) if tail.samples() > 0 => self.append(&tail),
                Ok(_) => break,
                Err(e) => {
                    tracing::warn!("Resampler flush failed: {}", e);
                    break;
                }
            }
        }
    }

    fn append(&mut self, frame: &AudioFrame) {
        if frame.samples() == 0 {
            return;
        }
        self.writer.push_planar(frame.plane::<f32>(0), frame.plane::<f32>(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_wav(path: &Path, rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_mono_clip_is_resampled_to_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01_peter.wav");
        write_wav(&path, 22050, &vec![8192i16; 11025]);

        let track = load_track(&path).unwrap();
        let seconds = track.duration();
        assert!((seconds - 0.5).abs() < 0.02, "decoded {} seconds", seconds);

        let (left, right) = track.frame(track.sample_count() / 2).unwrap();
        assert!(left > 0.05);
        assert!((left - right).abs() < 1e-6);
    }

    #[test]
    fn test_load_tracks_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("01.wav");
        let bad = dir.path().join("02.wav");
        write_wav(&good, 44100, &vec![0i16; 441]);
        fs::write(&bad, b"garbage").unwrap();
        let missing = dir.path().join("03.wav");

        let tracks = load_tracks(&[good, bad, missing]);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_track(Path::new("/nonexistent/clip.wav")),
            Err(AudioError::FileNotFound(_))
        ));
    }
}
