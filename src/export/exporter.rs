//! Fixed-rate render and encode loop.
//!
//! Each frame: advance the clock, fetch the background, step the characters,
//! draw, hand the canvas to the sink, then mix this frame's audio into the
//! accumulator and drain whole encoder chunks. Video pts is the frame index;
//! audio pts is the running sample count.

use std::time::{Duration, Instant};

use crate::audio::{AudioAccumulator, AudioMixer};
use crate::core::time::{format_time, frame_count, samples_for, to_millis, Seconds};
use crate::core::{active_word, Timeline};
use crate::decode::BackgroundSource;
use crate::export::muxer::MediaSink;
use crate::export::pipeline::{ExportError, ExportSettings, RenderMode};
use crate::playback::{FrameClock, PreviewSurface, Stage};
use crate::render::{CaptionView, FrameScene, SceneRenderer};

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub frames_planned: u64,
    pub frames_rendered: u64,
    pub duration: Seconds,
    /// Audio samples per channel sent to the sink, including padding
    pub audio_samples: i64,
    pub dropped_audio_samples: usize,
    /// Frames drawn over the fallback colour because no background was available
    pub background_misses: u64,
    pub interrupted: bool,
}

#[derive(Debug, Default)]
struct StageTimings {
    background: Duration,
    draw: Duration,
    encode: Duration,
    frames: u32,
}

impl StageTimings {
    fn average_ms(&self, total: Duration) -> f64 {
        to_millis(total.as_secs_f64()) / self.frames.max(1) as f64
    }
}

/// Drives one render from the first frame to the container trailer
pub struct Exporter<R: SceneRenderer> {
    settings: ExportSettings,
    mode: RenderMode,
    timeline: Timeline,
    renderer: R,
    stage: Stage,
    mixer: AudioMixer,
}

impl<R: SceneRenderer> Exporter<R> {
    pub fn new(
        settings: ExportSettings,
        mode: RenderMode,
        timeline: Timeline,
        renderer: R,
        stage: Stage,
        mixer: AudioMixer,
    ) -> Self {
        Self {
            settings,
            mode,
            timeline,
            renderer,
            stage,
            mixer,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Render every frame into `sink`, then flush and finalize it.
    pub fn run<S: MediaSink + ?Sized>(
        &mut self,
        sink: &mut S,
        mut background: Option<&mut dyn BackgroundSource>,
        preview: &mut dyn PreviewSurface,
    ) -> Result<ExportSummary, ExportError> {
        self.settings.validate()?;
        let expected = (self.settings.width, self.settings.height);
        if self.renderer.size() != expected {
            return Err(ExportError::InvalidSettings(format!(
                "renderer is {:?}, settings ask for {:?}",
                self.renderer.size(),
                expected
            )));
        }

        let fps = self.settings.fps;
        let duration = self.timeline.total_duration();
        let total_frames = frame_count(duration, fps);
        let mut clock = match self.mode {
            RenderMode::Render => FrameClock::fixed(fps),
            RenderMode::Interactive => FrameClock::wall_clock(fps),
        };
        let audio_frame_size = sink.audio_frame_size();
        let mut accumulator = AudioAccumulator::new(self.settings.accumulator_capacity);
        let mut scratch: Vec<f32> = Vec::new();
        let mut timings = StageTimings::default();
        let mut background_misses = 0u64;
        let mut frames_rendered = 0u64;
        let mut interrupted = false;
        let has_background = background.is_some();
        let started = Instant::now();

        tracing::info!(
            mode = ?self.mode,
            frames = total_frames,
            duration = %format_time(duration),
            captions = self.timeline.len(),
            audio_tracks = self.mixer.track_count(),
            "render started"
        );

        for index in 0..total_frames {
            if preview.should_close() {
                tracing::info!(frame = index, "preview closed, stopping render");
                interrupted = true;
                break;
            }
            let tick = clock.tick(index);
            let t = tick.time;

            let fetch_started = Instant::now();
            let frame = match background.as_deref_mut() {
                Some(source) => match source.frame_at(t) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("Background frame at {:.3}s unavailable: {}", t, e);
                        None
                    }
                },
                None => None,
            };
            if has_background && frame.is_none() {
                background_misses += 1;
            }
            timings.background += fetch_started.elapsed();

            let entry = self.timeline.active_entry(t);
            self.stage
                .update(entry.map(|entry| entry.speaker), tick.dt as f32);

            let draw_started = Instant::now();
            let scene = FrameScene {
                time: t,
                background: frame,
                fallback: self.mode.fallback_color(),
                characters: self.stage.layers(),
                caption: entry.map(|entry| CaptionView {
                    entry,
                    active_word: active_word(entry, t),
                }),
            };
            self.renderer.draw(&scene)?;
            timings.draw += draw_started.elapsed();
            preview.present(self.renderer.pixels(), expected.0, expected.1);

            let encode_started = Instant::now();
            sink.push_video(self.renderer.pixels(), index)?;

            if let Some(chunk_size) = audio_frame_size {
                let samples = samples_for(tick.dt, self.settings.sample_rate);
                scratch.resize(samples * 2, 0.0);
                self.mixer.mix_into(&self.timeline, t, &mut scratch);
                accumulator.push_interleaved(&scratch);
                while let Some(chunk) = accumulator.pop_chunk(chunk_size) {
                    sink.push_audio(&chunk)?;
                }
            }
            timings.encode += encode_started.elapsed();
            timings.frames += 1;
            frames_rendered += 1;

            if self.settings.progress_interval > 0
                && frames_rendered % self.settings.progress_interval == 0
            {
                tracing::info!(
                    "frame {}/{} ({:.1}%) at {}: bg {:.2}ms, draw {:.2}ms, encode {:.2}ms",
                    frames_rendered,
                    total_frames,
                    frames_rendered as f64 * 100.0 / total_frames.max(1) as f64,
                    format_time(t),
                    timings.average_ms(timings.background),
                    timings.average_ms(timings.draw),
                    timings.average_ms(timings.encode),
                );
                timings = StageTimings::default();
            }
        }

        sink.flush_video()?;
        if let Some(chunk_size) = audio_frame_size {
            while let Some(chunk) = accumulator.pop_padded(chunk_size) {
                sink.push_audio(&chunk)?;
            }
        }
        sink.finish()?;

        let summary = ExportSummary {
            frames_planned: total_frames,
            frames_rendered,
            duration,
            audio_samples: accumulator.emitted(),
            dropped_audio_samples: accumulator.dropped(),
            background_misses,
            interrupted,
        };
        tracing::info!(
            frames = summary.frames_rendered,
            background_misses = summary.background_misses,
            dropped_audio = summary.dropped_audio_samples,
            elapsed = %format_time(started.elapsed().as_secs_f64()),
            "render finished"
        );
        Ok(summary)
    }
}
