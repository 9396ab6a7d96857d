//! On-demand background frames for the render loop.
//!
//! The render clock only moves forward in small steps, so most requests are
//! served by decoding forward from the current position. Seeks happen only on
//! the first request, on backward moves, and on large forward jumps.

use std::path::Path;

use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::core::time::Seconds;
use crate::decode::decoder::{DecodeError, VideoDecoder};
use crate::decode::scale::RgbaConverter;

/// Forward jumps larger than this trigger a keyframe seek
pub const DEFAULT_SEEK_THRESHOLD: Seconds = 0.5;

/// Anything that can hand the render loop a canvas-sized RGBA frame for a time.
pub trait BackgroundSource {
    /// RGBA8 frame for `time`, or `None` when no frame is available
    fn frame_at(&mut self, time: Seconds) -> Result<Option<&[u8]>, DecodeError>;
}

/// Decides when a request needs a seek instead of a forward scan.
#[derive(Debug, Clone)]
pub struct SeekPolicy {
    threshold: Seconds,
    last_requested: Option<Seconds>,
}

impl SeekPolicy {
    pub fn new(threshold: Seconds) -> Self {
        Self {
            threshold,
            last_requested: None,
        }
    }

    pub fn last_requested(&self) -> Option<Seconds> {
        self.last_requested
    }

    /// Record a request for `time` and report whether it needs a seek
    pub fn should_seek(&mut self, time: Seconds) -> bool {
        let seek = match self.last_requested {
            None => true,
            Some(last) => time < last || time - last > self.threshold,
        };
        self.last_requested = Some(time);
        seek
    }
}

impl Default for SeekPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SEEK_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Skip,
    Accept,
}

/// Frame acceptance with a monotonic guard on delivered frame times.
#[derive(Debug, Clone)]
pub struct FrameGate {
    tolerance: Seconds,
    last_delivered: Option<Seconds>,
}

impl FrameGate {
    pub fn new(tolerance: Seconds) -> Self {
        Self {
            tolerance,
            last_delivered: None,
        }
    }

    pub fn last_delivered(&self) -> Option<Seconds> {
        self.last_delivered
    }

    /// Forget the delivered cursor after an explicit seek
    pub fn reset(&mut self) {
        self.last_delivered = None;
    }

    /// The last delivered frame is still close enough to `target`
    pub fn covers(&self, target: Seconds) -> bool {
        self.last_delivered
            .is_some_and(|last| last >= target - self.tolerance)
    }

    pub fn judge(&self, frame_time: Seconds, target: Seconds) -> Verdict {
        if self.last_delivered.is_some_and(|last| frame_time < last) {
            return Verdict::Skip;
        }
        if frame_time >= target - self.tolerance {
            Verdict::Accept
        } else {
            Verdict::Skip
        }
    }

    pub fn deliver(&mut self, frame_time: Seconds) {
        self.last_delivered = Some(frame_time);
    }
}

/// Map render time into the source when it loops
pub fn loop_time(time: Seconds, duration: Option<Seconds>) -> Seconds {
    match duration {
        Some(d) if d > 0.0 => time.rem_euclid(d),
        _ => time,
    }
}

/// A decoder as the background source sees it: seekable, yielding frame
/// times in decode order, with the latest frame copied out on request.
pub trait FrameStream {
    /// Bytes written by `copy_frame`
    fn frame_len(&self) -> usize;

    /// Reposition at or before `time`
    fn seek(&mut self, time: Seconds) -> Result<(), DecodeError>;

    /// Decode the next frame and return its time. `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Seconds>, DecodeError>;

    /// Write the frame last returned by `next_frame` into `out`
    fn copy_frame(&mut self, out: &mut [u8]) -> Result<(), DecodeError>;
}

/// `VideoDecoder` output scaled into canvas-sized RGBA.
pub struct ScaledDecoder {
    decoder: VideoDecoder,
    converter: RgbaConverter,
    current: Option<VideoFrame>,
}

impl ScaledDecoder {
    pub fn new(decoder: VideoDecoder, width: u32, height: u32) -> Self {
        Self {
            decoder,
            converter: RgbaConverter::new(width, height),
            current: None,
        }
    }
}

impl FrameStream for ScaledDecoder {
    fn frame_len(&self) -> usize {
        self.converter.frame_len()
    }

    fn seek(&mut self, time: Seconds) -> Result<(), DecodeError> {
        self.current = None;
        self.decoder.seek(time)
    }

    fn next_frame(&mut self) -> Result<Option<Seconds>, DecodeError> {
        match self.decoder.next_frame()? {
            Some(decoded) => {
                self.current = Some(decoded.frame);
                Ok(Some(decoded.time))
            }
            None => Ok(None),
        }
    }

    fn copy_frame(&mut self, out: &mut [u8]) -> Result<(), DecodeError> {
        match &self.current {
            Some(frame) => self.converter.convert(frame, out),
            None => Ok(()),
        }
    }
}

/// Background video decoded on demand into a held canvas frame.
pub struct BackgroundFrameSource<S = ScaledDecoder> {
    stream: S,
    policy: SeekPolicy,
    gate: FrameGate,
    held: Vec<u8>,
    loop_duration: Option<Seconds>,
    /// Restarted from the top before the clock wrapped
    wrapped_early: bool,
    seeks: u64,
}

impl BackgroundFrameSource {
    /// Open `path` for a `width`x`height` canvas. `tolerance` is normally one output frame.
    pub fn open<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        tolerance: Seconds,
        looping: bool,
    ) -> Result<Self, DecodeError> {
        let decoder = VideoDecoder::open(path)?;
        let loop_duration = if looping { decoder.info().duration } else { None };
        if looping && loop_duration.is_none() {
            tracing::warn!("Background duration unknown, playing once without looping");
        }
        let stream = ScaledDecoder::new(decoder, width, height);
        Ok(Self::from_stream(stream, tolerance, loop_duration))
    }
}

impl<S: FrameStream> BackgroundFrameSource<S> {
    /// Serve frames from `stream`, wrapping render time at `loop_duration` if given
    pub fn from_stream(stream: S, tolerance: Seconds, loop_duration: Option<Seconds>) -> Self {
        let held = vec![0u8; stream.frame_len()];
        Self {
            stream,
            policy: SeekPolicy::default(),
            gate: FrameGate::new(tolerance),
            held,
            loop_duration,
            wrapped_early: false,
            seeks: 0,
        }
    }

    pub fn with_seek_threshold(mut self, threshold: Seconds) -> Self {
        self.policy = SeekPolicy::new(threshold);
        self
    }

    /// Number of seeks performed so far
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    fn seek_to(&mut self, target: Seconds) {
        match self.stream.seek(target) {
            Ok(()) => {
                self.seeks += 1;
                self.gate.reset();
                self.wrapped_early = false;
                tracing::debug!(time = target, "background seek");
            }
            Err(e) => tracing::warn!("Background seek to {:.3}s failed: {}", target, e),
        }
    }

    /// Decode forward to the first acceptable frame and hold it
    fn scan_forward(&mut self, target: Seconds) -> Result<bool, DecodeError> {
        while let Some(frame_time) = self.stream.next_frame()? {
            if self.gate.judge(frame_time, target) == Verdict::Skip {
                continue;
            }
            self.stream.copy_frame(&mut self.held)?;
            self.gate.deliver(frame_time);
            return Ok(true);
        }
        Ok(false)
    }

    /// The stream ended before `target`. A looping source keeps showing its
    /// last frame until the clock wraps, or restarts if nothing is held.
    fn end_of_stream(&mut self, target: Seconds) -> Result<bool, DecodeError> {
        if self.loop_duration.is_none() {
            tracing::debug!(time = target, "no background frame before end of stream");
            return Ok(false);
        }
        if self.gate.last_delivered().is_some() {
            return Ok(true);
        }
        self.seek_to(0.0);
        match self.stream.next_frame()? {
            Some(frame_time) => {
                self.stream.copy_frame(&mut self.held)?;
                self.gate.deliver(frame_time);
                self.wrapped_early = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S: FrameStream> BackgroundSource for BackgroundFrameSource<S> {
    fn frame_at(&mut self, time: Seconds) -> Result<Option<&[u8]>, DecodeError> {
        let target = loop_time(time, self.loop_duration);

        if self.policy.should_seek(target) {
            self.seek_to(target);
        } else if self.wrapped_early || self.gate.covers(target) {
            return Ok(Some(&self.held));
        }

        if self.scan_forward(target)? || self.end_of_stream(target)? {
            Ok(Some(&self.held))
        } else {
            Ok(None)
        }
    }
}
