//! Project directory conventions.
//!
//! A project id resolves to a caption directory and an audio directory under
//! the media root. Files in both are paired by sorted filename order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::caption::Speaker;

pub const CAPTION_EXTENSION: &str = "json";
pub const AUDIO_EXTENSION: &str = "wav";

/// Filesystem layout of one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub media_root: PathBuf,
    pub project_id: String,
}

impl ProjectLayout {
    pub fn new(media_root: impl Into<PathBuf>, project_id: impl Into<String>) -> Self {
        Self {
            media_root: media_root.into(),
            project_id: project_id.into(),
        }
    }

    pub fn captions_dir(&self) -> PathBuf {
        self.media_root.join("captions").join(&self.project_id)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.media_root.join("audio").join(&self.project_id)
    }

    /// Sprite image for a speaker
    pub fn character_sprite(&self, speaker: Speaker) -> PathBuf {
        self.media_root
            .join("characters")
            .join(format!("{}.png", speaker_tag(speaker)))
    }

    pub fn caption_font(&self) -> PathBuf {
        self.media_root.join("fonts").join("caption.ttf")
    }

    /// Caption files, sorted by filename
    pub fn caption_files(&self) -> io::Result<Vec<PathBuf>> {
        list_sorted(&self.captions_dir(), CAPTION_EXTENSION)
    }

    /// Audio clips, sorted by filename
    pub fn audio_files(&self) -> io::Result<Vec<PathBuf>> {
        list_sorted(&self.audio_dir(), AUDIO_EXTENSION)
    }
}

/// Filename tag that identifies a speaker's files.
pub fn speaker_tag(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::A => "peter",
        Speaker::B => "stewie",
    }
}

/// Speaker named by a file's name. Unknown names fall back to `Speaker::A`.
pub fn speaker_from_filename(path: &Path) -> Speaker {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains(speaker_tag(Speaker::B)) {
        Speaker::B
    } else {
        Speaker::A
    }
}

/// Regular files in `dir` with extension `ext` (case-insensitive), sorted by filename.
pub fn list_sorted(dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
