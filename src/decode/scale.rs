//! Colour conversion of decoded frames into canvas-sized RGBA8.
//!
//! Sources are scaled to cover the canvas while keeping their aspect ratio,
//! and the overflowing axis is centre-cropped.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{Context as ScaleContext, Flags as ScaleFlags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use crate::decode::decoder::DecodeError;

/// How a source frame maps onto the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
    pub target_width: u32,
    pub target_height: u32,
}

impl CropPlan {
    /// Scale-to-fill plan for a `src` frame on a `dst` canvas
    pub fn cover(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> Self {
        let src_w = src_width.max(1) as f64;
        let src_h = src_height.max(1) as f64;
        let scale = (dst_width as f64 / src_w).max(dst_height as f64 / src_h);

        let scaled_width = ((src_w * scale).round() as u32).max(dst_width);
        let scaled_height = ((src_h * scale).round() as u32).max(dst_height);

        Self {
            scaled_width,
            scaled_height,
            crop_x: (scaled_width - dst_width) / 2,
            crop_y: (scaled_height - dst_height) / 2,
            target_width: dst_width,
            target_height: dst_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceKey {
    format: Pixel,
    width: u32,
    height: u32,
}

/// Converts decoded frames of any format into a fixed-size RGBA8 canvas.
/// The scaler is rebuilt whenever the source format or size changes.
pub struct RgbaConverter {
    target_width: u32,
    target_height: u32,
    scaler: Option<(SourceKey, CropPlan, ScaleContext)>,
    scaled: VideoFrame,
}

impl RgbaConverter {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            scaler: None,
            scaled: VideoFrame::empty(),
        }
    }

    /// Buffer size of one converted frame
    pub fn frame_len(&self) -> usize {
        (self.target_width * self.target_height * 4) as usize
    }

    /// Convert `frame` into `out`, which must be `frame_len()` bytes
    pub fn convert(&mut self, frame: &VideoFrame, out: &mut [u8]) -> Result<(), DecodeError> {
        let key = SourceKey {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        };
        let rebuild = !matches!(&self.scaler, Some((current, _, _)) if *current == key);
        if rebuild {
            let plan = CropPlan::cover(key.width, key.height, self.target_width, self.target_height);
            let context = ScaleContext::get(
                key.format,
                key.width,
                key.height,
                Pixel::RGBA,
                plan.scaled_width,
                plan.scaled_height,
                ScaleFlags::BILINEAR,
            )
            .map_err(|e| DecodeError::FFmpeg(format!("create scaler: {}", e)))?;
            tracing::debug!(?plan, source = ?key.format, "background scaler ready");
            self.scaled = VideoFrame::empty();
            self.scaler = Some((key, plan, context));
        }
        let Some((_, plan, context)) = self.scaler.as_mut() else {
            return Err(DecodeError::FFmpeg("scaler unavailable".to_string()));
        };

        context
            .run(frame, &mut self.scaled)
            .map_err(|e| DecodeError::FFmpeg(format!("scale frame: {}", e)))?;
        copy_cropped(
            self.scaled.data(0),
            self.scaled.stride(0),
            plan,
            out,
        )
    }
}

/// Copy the crop window out of a scaled RGBA8 plane
pub fn copy_cropped(
    plane: &[u8],
    stride: usize,
    plan: &CropPlan,
    out: &mut [u8],
) -> Result<(), DecodeError> {
    let row_bytes = plan.target_width as usize * 4;
    let expected = row_bytes * plan.target_height as usize;
    if out.len() != expected {
        return Err(DecodeError::FFmpeg(format!(
            "output buffer is {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    let x_offset = plan.crop_x as usize * 4;
    for (row, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
        let start = (plan.crop_y as usize + row) * stride + x_offset;
        let src = plane.get(start..start + row_bytes).ok_or_else(|| {
            DecodeError::FFmpeg(format!("scaled plane too small at row {}", row))
        })?;
        dst.copy_from_slice(src);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_source_crops_width() {
        let plan = CropPlan::cover(1920, 1080, 1080, 1920);
        assert_eq!(plan.scaled_height, 1920);
        assert_eq!(plan.scaled_width, 3413);
        assert_eq!(plan.crop_x, (3413 - 1080) / 2);
        assert_eq!(plan.crop_y, 0);
    }

    #[test]
    fn test_tall_source_crops_height() {
        let plan = CropPlan::cover(720, 2000, 1080, 1920);
        assert_eq!(plan.scaled_width, 1080);
        assert_eq!(plan.scaled_height, 3000);
        assert_eq!(plan.crop_y, 540);
        assert_eq!(plan.crop_x, 0);
    }

    #[test]
    fn test_matching_aspect_has_no_crop() {
        let plan = CropPlan::cover(540, 960, 1080, 1920);
        assert_eq!((plan.scaled_width, plan.scaled_height), (1080, 1920));
        assert_eq!((plan.crop_x, plan.crop_y), (0, 0));
    }

    #[test]
    fn test_copy_cropped_window() {
        // 4x2 source with stride padding, cropped to the middle 2x2.
        let stride = 20;
        let mut plane = vec![0u8; stride * 2];
        for y in 0..2 {
            for x in 0..4 {
                plane[y * stride + x * 4] = (y * 4 + x) as u8;
            }
        }
        let plan = CropPlan {
            scaled_width: 4,
            scaled_height: 2,
            crop_x: 1,
            crop_y: 0,
            target_width: 2,
            target_height: 2,
        };
        let mut out = vec![0u8; 16];
        copy_cropped(&plane, stride, &plan, &mut out).unwrap();
        assert_eq!([out[0], out[4], out[8], out[12]], [1, 2, 5, 6]);

        let mut wrong = vec![0u8; 8];
        assert!(copy_cropped(&plane, stride, &plan, &mut wrong).is_err());
    }
}
