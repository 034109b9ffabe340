//! Cut production: slices the masked image into one sub-image per rectangle

use image::GrayImage;
use tracing::warn;

use super::regions::Rect;

/// A candidate item label: its rectangle and an owned copy of the pixels inside it
#[derive(Debug, Clone)]
pub struct Cut {
    pub rect: Rect,
    pub pixels: GrayImage,
}

/// Copy each rectangle out of `masked`, in input order.
///
/// Rectangles that are empty or leave the image are skipped.
pub fn produce_cuts(rects: &[Rect], masked: &GrayImage) -> Vec<Cut> {
    let (width, height) = masked.dimensions();

    rects
        .iter()
        .filter_map(|rect| {
            if !rect.fits_within(width, height) {
                warn!(
                    "Skipping region {:?}: outside {}x{} mask",
                    rect, width, height
                );
                return None;
            }
            if rect.width == 0 || rect.height == 0 {
                return None;
            }

            let pixels = image::imageops::crop_imm(
                masked,
                rect.x as u32,
                rect.y as u32,
                rect.width as u32,
                rect.height as u32,
            )
            .to_image();

            Some(Cut { rect: *rect, pixels })
        })
        .collect()
}
