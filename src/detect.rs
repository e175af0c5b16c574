use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::error::VservoError;
use crate::frame::BoundingBox;

/// The consumed detection capability: one grayscale frame in, zero or more
/// bounding boxes out. `scale_factor` and `min_neighbors` are tunables
/// passed through from configuration, not computed here.
pub trait Detector {
    fn detect(
        &self,
        gray: &GrayImage,
        scale_factor: f32,
        min_neighbors: u32,
    ) -> Result<Vec<BoundingBox>, VservoError>;
}

/// Bundled stand-in detector: thresholds the frame on luminance and boxes
/// the connected bright regions.
///
/// `min_neighbors` is reused as the minimum pixel area of a region;
/// `scale_factor` is accepted for cascade-style implementations of
/// [`Detector`] and unused here.
pub struct BlobDetector {
    threshold: u8,
}

impl BlobDetector {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

impl Detector for BlobDetector {
    fn detect(
        &self,
        gray: &GrayImage,
        _scale_factor: f32,
        min_neighbors: u32,
    ) -> Result<Vec<BoundingBox>, VservoError> {
        let mut binary = GrayImage::new(gray.width(), gray.height());
        for (src, dst) in gray.pixels().zip(binary.pixels_mut()) {
            *dst = if src.0[0] >= self.threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            };
        }

        let labelled = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        // Track the pixel extent and area of every labelled region.
        let mut extents: Vec<(u32, u32, u32, u32, u32)> = Vec::new();
        for (x, y, pixel) in labelled.enumerate_pixels() {
            let label = pixel.0[0] as usize;
            if label == 0 {
                continue;
            }
            if extents.len() < label {
                extents.resize(label, (u32::MAX, u32::MAX, 0, 0, 0));
            }
            let entry = &mut extents[label - 1];
            entry.0 = entry.0.min(x);
            entry.1 = entry.1.min(y);
            entry.2 = entry.2.max(x);
            entry.3 = entry.3.max(y);
            entry.4 += 1;
        }

        let min_area = min_neighbors;
        let boxes: Vec<BoundingBox> = extents
            .into_iter()
            .filter(|&(_, _, _, _, area)| area >= min_area)
            .map(|(min_x, min_y, max_x, max_y, _)| BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            })
            .collect();

        debug!(target: "detect", "Found {} region(s) above threshold {}", boxes.len(), self.threshold);
        Ok(boxes)
    }
}
