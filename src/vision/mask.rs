//! Binary mask construction
//!
//! Turns a captured frame into two masks: `counters`, a blurred and
//! re-binarized blob mask used for shape detection, and `masked`, the
//! precise bright-text pixels inside those blobs rendered dark-on-light
//! for recognition.

use anyhow::{ensure, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::box_filter;

use crate::capture::frame::CapturedFrame;
use crate::config::VisionSettings;

/// Cutoff used to invert the masked content; content is strictly 0/255
const INVERT_CUTOFF: u8 = 127;

/// Output of the mask builder
#[derive(Debug, Clone, PartialEq)]
pub struct Masks {
    /// 0/255 connectivity mask for contour extraction
    pub counters: GrayImage,
    /// Inverted text pixels restricted to blob regions
    pub masked: GrayImage,
}

/// Builds the counter and content masks for one frame
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    params: VisionSettings,
}

impl MaskBuilder {
    pub fn new(params: VisionSettings) -> Self {
        Self { params }
    }

    /// Build masks from an RGBA frame
    pub fn build(&self, frame: &CapturedFrame) -> Result<Masks> {
        ensure!(
            frame.is_well_formed(),
            "Frame buffer holds {} bytes, expected {}x{}x4",
            frame.data.len(),
            frame.width,
            frame.height
        );

        Ok(self.build_rgb(&frame_to_rgb(frame)))
    }

    /// Build masks from a 3-channel image
    pub fn build_rgb(&self, rgb: &RgbImage) -> Masks {
        let p = &self.params;
        let low = [p.content_threshold; 3];
        let high = [u8::MAX; 3];

        let content = in_range(rgb, low, high);

        let counter = in_range(rgb, low, high);
        let counter = blur_binarize(&counter, p.first_blur, p.first_cutoff);
        let counter = blur_binarize(&counter, p.second_blur, p.second_cutoff);

        let masked = copy_where(&content, &counter);
        let masked = threshold(&masked, INVERT_CUTOFF, ThresholdType::BinaryInverted);

        let counters = threshold(&counter, p.counter_cutoff, ThresholdType::Binary);

        Masks { counters, masked }
    }
}

/// Drop the alpha channel of an RGBA frame
fn frame_to_rgb(frame: &CapturedFrame) -> RgbImage {
    let width = frame.width;
    let data = &frame.data;
    RgbImage::from_fn(frame.width, frame.height, |x, y| {
        let idx = ((y * width + x) * 4) as usize;
        Rgb([data[idx], data[idx + 1], data[idx + 2]])
    })
}

/// 255 where every channel lies within `[low, high]`, 0 elsewhere
pub fn in_range(image: &RgbImage, low: [u8; 3], high: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb(px) = *image.get_pixel(x, y);
        let inside = (0..3).all(|c| px[c] >= low[c] && px[c] <= high[c]);
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Box-blur with a `kernel`x`kernel` window, then binarize at `cutoff`.
///
/// `box_filter` replicates edge pixels instead of reflecting them, so blobs
/// touching the frame border may grow slightly differently within
/// `kernel / 2` pixels of it.
fn blur_binarize(mask: &GrayImage, kernel: u32, cutoff: u8) -> GrayImage {
    let radius = kernel / 2;
    let blurred = box_filter(mask, radius, radius);
    threshold(&blurred, cutoff, ThresholdType::Binary)
}

/// Copy `src` pixels where `mask` is non-zero, 0 elsewhere
pub fn copy_where(src: &GrayImage, mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 {
            *src.get_pixel(x, y)
        } else {
            Luma([0])
        }
    })
}
