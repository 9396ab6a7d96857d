//! Character sprite and caption font loading.

use std::fs;
use std::path::Path;

use fontdue::{Font, FontSettings};
use image::imageops::FilterType;

use crate::media::captions::LoadError;
use crate::render::renderer::Sprite;

/// Load a sprite image as RGBA8, scaled by `scale`.
pub fn load_sprite(path: &Path, scale: f32) -> Result<Sprite, LoadError> {
    let image = image::open(path)
        .map_err(|e| LoadError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .to_rgba8();

    let width = ((image.width() as f32 * scale).round() as u32).max(1);
    let height = ((image.height() as f32 * scale).round() as u32).max(1);
    let scaled = if (width, height) == image.dimensions() {
        image
    } else {
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    };

    Ok(Sprite {
        width,
        height,
        pixels: scaled.into_raw(),
    })
}

/// Fonts tried when the project's caption font cannot be loaded
pub const SYSTEM_FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Load `preferred`, or else the first loadable font in `fallbacks`.
/// Fails with the error for `preferred` when nothing loads.
pub fn load_font_with_fallback(preferred: &Path, fallbacks: &[&str]) -> Result<Font, LoadError> {
    let preferred_err = match load_font(preferred) {
        Ok(font) => return Ok(font),
        Err(e) => e,
    };
    for candidate in fallbacks.iter().map(Path::new) {
        if !candidate.is_file() {
            continue;
        }
        match load_font(candidate) {
            Ok(font) => {
                tracing::warn!(
                    fallback = %candidate.display(),
                    "{}, using fallback caption font",
                    preferred_err
                );
                return Ok(font);
            }
            Err(e) => tracing::debug!("Skipping fallback font: {}", e),
        }
    }
    Err(preferred_err)
}

/// Load a TrueType/OpenType font.
pub fn load_font(path: &Path) -> Result<Font, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(|message| LoadError::Font {
        path: path.to_path_buf(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_sprite_scales() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peter.png");
        let image = image::RgbaImage::from_pixel(40, 20, image::Rgba([10, 20, 30, 255]));
        image.save(&path).unwrap();

        let sprite = load_sprite(&path, 0.5).unwrap();
        assert_eq!((sprite.width, sprite.height), (20, 10));
        assert_eq!(sprite.pixels.len(), 20 * 10 * 4);
        assert_eq!(&sprite.pixels[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_assets_are_errors() {
        assert!(load_sprite(Path::new("/nonexistent/peter.png"), 0.5).is_err());
        assert!(matches!(
            load_font(Path::new("/nonexistent/caption.ttf")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_fallback_font_reports_preferred_error() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.ttf");
        fs::write(&broken, b"not a font either").unwrap();
        let broken = broken.to_string_lossy().into_owned();

        let preferred = dir.path().join("theboldfont.ttf");
        let result =
            load_font_with_fallback(&preferred, &["/nonexistent/fallback.ttf", broken.as_str()]);
        match result {
            Err(LoadError::Io { path, .. }) => assert_eq!(path, preferred),
            other => panic!("expected the preferred font's error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_font_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caption.ttf");
        fs::write(&path, b"definitely not a font").unwrap();
        assert!(matches!(load_font(&path), Err(LoadError::Font { .. })));
    }
}
