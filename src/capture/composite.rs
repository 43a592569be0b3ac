//! Multi-display cropping and compositing.
//!
//! Pure pixel logic: per-display frames in, one raster out. A target
//! rectangle in capture space is resolved against the displays it overlaps;
//! a single overlap is a plain crop at that display's own pixel density,
//! while a straddling rectangle is assembled on a reference-density canvas,
//! one disjoint sub-crop per display. Gaps not owned by any display (or a
//! sub-crop that fails) stay solid black rather than failing the composite.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::errors::CaptureError;
use crate::geometry::Rect;

/// One display's captured pixels together with its capture-space bounds.
/// The frame's pixel density is derived from the image dimensions against
/// the bounds, independently per axis.
pub struct DisplayFrame {
    pub bounds: Rect,
    pub image: RgbaImage,
}

impl DisplayFrame {
    pub fn new(bounds: Rect, image: RgbaImage) -> Self {
        Self { bounds, image }
    }

    fn density_x(&self) -> f64 {
        self.image.width() as f64 / self.bounds.width
    }

    fn density_y(&self) -> f64 {
        self.image.height() as f64 / self.bounds.height
    }

    /// Crop the part of this frame covering `region` (capture space,
    /// logical units). `None` when the region falls outside the frame's
    /// pixels after density scaling.
    fn crop_region(&self, region: &Rect) -> Option<RgbaImage> {
        let dx = self.density_x();
        let dy = self.density_y();
        let x = ((region.x - self.bounds.x) * dx).round();
        let y = ((region.y - self.bounds.y) * dy).round();
        let width = (region.width * dx).round();
        let height = (region.height * dy).round();
        if x < 0.0 || y < 0.0 || width <= 0.0 || height <= 0.0 {
            return None;
        }
        let (x, y, width, height) = (x as u32, y as u32, width as u32, height as u32);
        if x + width > self.image.width() || y + height > self.image.height() {
            return None;
        }
        Some(imageops::crop_imm(&self.image, x, y, width, height).to_image())
    }
}

/// Crop or composite `target` (capture space, logical units) out of the
/// given per-display frames.
///
/// Exactly one overlapping display: crop at that display's own density and
/// return directly. Several: allocate a black canvas at the first
/// overlapping display's density, rescale each display's sub-crop from its
/// own density to the reference, and blit at the intersection's offset from
/// the target origin. Intersections are disjoint by construction, so blit
/// order does not matter.
pub fn composite_rect(
    target: Rect,
    frames: &[DisplayFrame],
) -> Result<RgbaImage, CaptureError> {
    if target.is_empty() {
        return Err(CaptureError::InvalidRectangle {
            width: target.width,
            height: target.height,
        });
    }

    let overlapping: Vec<(&DisplayFrame, Rect)> = frames
        .iter()
        .filter_map(|f| target.intersection(&f.bounds).map(|i| (f, i)))
        .collect();

    match overlapping.as_slice() {
        [] => Err(CaptureError::CaptureFailed(
            "capture rectangle does not intersect any display".to_string(),
        )),
        [(frame, intersection)] => frame.crop_region(intersection).ok_or_else(|| {
            CaptureError::CaptureFailed("cropping display frame failed".to_string())
        }),
        _ => {
            let ref_dx = overlapping[0].0.density_x();
            let ref_dy = overlapping[0].0.density_y();
            let out_width = (target.width * ref_dx).round() as u32;
            let out_height = (target.height * ref_dy).round() as u32;
            if out_width == 0 || out_height == 0 {
                return Err(CaptureError::InvalidRectangle {
                    width: target.width,
                    height: target.height,
                });
            }
            // Black covers inter-monitor gaps no display owns.
            let mut canvas =
                RgbaImage::from_pixel(out_width, out_height, Rgba([0, 0, 0, 255]));

            for (frame, intersection) in &overlapping {
                let Some(piece) = frame.crop_region(intersection) else {
                    log::warn!(
                        "Dropping display sub-crop at {:?}; leaving black fill",
                        intersection
                    );
                    continue;
                };
                let dest_width = (intersection.width * ref_dx).round() as u32;
                let dest_height = (intersection.height * ref_dy).round() as u32;
                if dest_width == 0 || dest_height == 0 {
                    continue;
                }
                let piece = if piece.width() != dest_width || piece.height() != dest_height
                {
                    imageops::resize(&piece, dest_width, dest_height, FilterType::Triangle)
                } else {
                    piece
                };
                let off_x = ((intersection.x - target.x) * ref_dx).round() as i64;
                let off_y = ((intersection.y - target.y) * ref_dy).round() as i64;
                imageops::replace(&mut canvas, &piece, off_x, off_y);
            }

            Ok(canvas)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    const RED: [u8; 4] = [200, 20, 20, 255];
    const BLUE: [u8; 4] = [20, 20, 200, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn two_display_frames() -> Vec<DisplayFrame> {
        vec![
            DisplayFrame::new(
                Rect::new(0.0, 0.0, 1920.0, 1080.0),
                solid(1920, 1080, RED),
            ),
            DisplayFrame::new(
                Rect::new(1920.0, 0.0, 1920.0, 1080.0),
                solid(3840, 2160, BLUE),
            ),
        ]
    }

    #[test]
    fn test_single_display_crop_uses_native_density() {
        let frames = two_display_frames();
        // Entirely inside the density-2 display.
        let img = composite_rect(Rect::new(2000.0, 100.0, 50.0, 40.0), &frames).unwrap();
        assert_eq!((img.width(), img.height()), (100, 80));
        assert_eq!(img.get_pixel(0, 0).0, BLUE);
    }

    #[test]
    fn test_straddling_rect_has_no_seam() {
        let frames = two_display_frames();
        let img =
            composite_rect(Rect::new(1900.0, 100.0, 100.0, 100.0), &frames).unwrap();
        // Reference density is the first overlapping display's (1.0).
        assert_eq!((img.width(), img.height()), (100, 100));
        for y in 0..100 {
            for x in 0..20 {
                assert_eq!(img.get_pixel(x, y).0, RED, "left pane at {},{}", x, y);
            }
            for x in 20..100 {
                assert_eq!(img.get_pixel(x, y).0, BLUE, "right pane at {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_gap_between_displays_stays_black() {
        let frames = vec![
            DisplayFrame::new(Rect::new(0.0, 0.0, 100.0, 100.0), solid(100, 100, RED)),
            DisplayFrame::new(
                Rect::new(150.0, 0.0, 100.0, 100.0),
                solid(100, 100, BLUE),
            ),
        ];
        let img = composite_rect(Rect::new(50.0, 0.0, 150.0, 50.0), &frames).unwrap();
        assert_eq!(img.get_pixel(10, 10).0, RED);
        assert_eq!(img.get_pixel(75, 10).0, BLACK, "gap column");
        assert_eq!(img.get_pixel(120, 10).0, BLUE);
    }

    #[test]
    fn test_rejects_empty_rect() {
        let frames = two_display_frames();
        assert!(matches!(
            composite_rect(Rect::new(0.0, 0.0, 0.0, 10.0), &frames),
            Err(CaptureError::InvalidRectangle { .. })
        ));
    }

    #[test]
    fn test_rect_outside_all_displays_fails() {
        let frames = two_display_frames();
        assert!(matches!(
            composite_rect(Rect::new(5000.0, 5000.0, 10.0, 10.0), &frames),
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_empty_frame_degrades_to_black_fill() {
        // Second display's capture came back empty, so its sub-crop fails
        // and the region it should have covered stays black instead of the
        // whole composite erroring.
        let frames = vec![
            DisplayFrame::new(Rect::new(0.0, 0.0, 100.0, 100.0), solid(100, 100, RED)),
            DisplayFrame::new(Rect::new(100.0, 0.0, 100.0, 100.0), RgbaImage::new(0, 0)),
        ];
        let img = composite_rect(Rect::new(50.0, 0.0, 100.0, 50.0), &frames).unwrap();
        assert_eq!(img.get_pixel(10, 10).0, RED);
        assert_eq!(img.get_pixel(90, 10).0, BLACK);
    }
}
