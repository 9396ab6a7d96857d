//! Command-line entry point.
//! `shortcast <PROJECT_ID>` previews in real time until Ctrl-C;
//! `--render <VIDEO>` renders headless over a background video.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shortcast::audio::{load_tracks, AudioMixer};
use shortcast::core::{ProjectLayout, Speaker};
use shortcast::decode::{BackgroundFrameSource, BackgroundSource};
use shortcast::export::{ExportSettings, Exporter, Mp4Writer, RenderMode};
use shortcast::media::{
    load_font_with_fallback, load_sprite, load_timeline, SYSTEM_FALLBACK_FONTS,
};
use shortcast::playback::{Headless, InterruptPreview, PreviewSurface, Stage};
use shortcast::render::{CharacterArt, Compositor, TextPainter};

#[derive(Parser, Debug)]
#[command(name = "shortcast", version, about = "Render captioned two-character shorts")]
struct Cli {
    /// Project identifier; selects captions/<ID> and audio/<ID> under the media root.
    project_id: String,

    /// Background video. Renders headless to a file instead of previewing.
    #[arg(long, value_name = "VIDEO")]
    render: Option<PathBuf>,

    /// Directory holding captions/, audio/, characters/ and fonts/.
    #[arg(long, default_value = "media")]
    media_root: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();
    let settings = ExportSettings::default();
    settings.validate()?;

    let mode = if cli.render.is_some() {
        RenderMode::Render
    } else {
        RenderMode::Interactive
    };
    let layout = ProjectLayout::new(&cli.media_root, cli.project_id.as_str());

    let caption_files = layout.caption_files().unwrap_or_else(|e| {
        tracing::warn!(
            "No captions read from {}: {}",
            layout.captions_dir().display(),
            e
        );
        Vec::new()
    });
    let timeline = load_timeline(&caption_files);

    let art_a = character_art(&layout, Speaker::A, settings.character_scale);
    let art_b = character_art(&layout, Speaker::B, settings.character_scale);
    let text = match load_font_with_fallback(&layout.caption_font(), SYSTEM_FALLBACK_FONTS) {
        Ok(font) => Some(TextPainter::new(font, settings.font_size)),
        Err(e) => {
            tracing::error!("No usable caption font, captions will NOT be drawn: {}", e);
            None
        }
    };
    let compositor = Compositor::new(
        settings.width,
        settings.height,
        art_a,
        art_b,
        text,
        settings.caption,
    );
    let stage = Stage::new(
        settings.stage_layout(),
        compositor.character_size(Speaker::A),
        compositor.character_size(Speaker::B),
    );

    let tracks = match mode {
        RenderMode::Render => match layout.audio_files() {
            Ok(files) => load_tracks(&files),
            Err(e) => {
                tracing::warn!(
                    "No audio read from {}: {}",
                    layout.audio_dir().display(),
                    e
                );
                Vec::new()
            }
        },
        RenderMode::Interactive => Vec::new(),
    };
    if mode == RenderMode::Render && tracks.len() != timeline.len() {
        tracing::warn!(
            tracks = tracks.len(),
            captions = timeline.len(),
            "audio and caption counts differ, pairing by order"
        );
    }
    let mixer = AudioMixer::new(tracks, settings.mixer_gain);

    let mut background = match &cli.render {
        Some(path) => Some(
            BackgroundFrameSource::open(
                path,
                settings.width,
                settings.height,
                settings.frame_tolerance(),
                settings.loop_background,
            )
            .with_context(|| format!("opening background video {}", path.display()))?
            .with_seek_threshold(settings.seek_threshold),
        ),
        None => None,
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(mode.default_output()));
    let mut writer = Mp4Writer::create(&output, &settings, !mixer.is_empty())
        .with_context(|| format!("creating {}", output.display()))?;

    let mut preview: Box<dyn PreviewSurface> = match mode {
        RenderMode::Render => Box::new(Headless),
        RenderMode::Interactive => {
            tracing::info!("Previewing, press Ctrl-C to stop");
            Box::new(InterruptPreview::install().context("installing Ctrl-C handler")?)
        }
    };

    let mut exporter = Exporter::new(settings, mode, timeline, compositor, stage, mixer);
    let summary = exporter.run(
        &mut writer,
        background
            .as_mut()
            .map(|source| source as &mut dyn BackgroundSource),
        preview.as_mut(),
    )?;

    if let Some(source) = &background {
        tracing::debug!(seeks = source.seek_count(), "background decode done");
    }
    tracing::info!(
        output = %output.display(),
        frames = summary.frames_rendered,
        interrupted = summary.interrupted,
        "done"
    );
    Ok(())
}

/// Sprite from the project's characters directory, or a placeholder box
fn character_art(layout: &ProjectLayout, speaker: Speaker, scale: f32) -> CharacterArt {
    let path = layout.character_sprite(speaker);
    match load_sprite(&path, scale) {
        Ok(sprite) => CharacterArt::Sprite(sprite),
        Err(e) => {
            tracing::warn!("Using placeholder for {:?}: {}", speaker, e);
            CharacterArt::placeholder(speaker)
        }
    }
}
