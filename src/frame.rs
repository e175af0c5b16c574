use image::{imageops, GrayImage, RgbImage};

/// One acquired video frame. Created each cycle and discarded after
/// processing.
#[derive(Debug, Clone)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Center of the frame in pixel coordinates.
    pub fn center(&self) -> Point {
        Point {
            x: (self.width() / 2) as i32,
            y: (self.height() / 2) as i32,
        }
    }

    /// Grayscale copy for detection.
    pub fn grayscale(&self) -> GrayImage {
        imageops::grayscale(&self.buffer)
    }

    pub fn buffer(&self) -> &RgbImage {
        &self.buffer
    }
}

/// Axis-aligned detection rectangle, origin top-left, scoped to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Center of the box. Coordinates past the `i32` range saturate
    /// instead of wrapping.
    pub fn center(&self) -> Point {
        let cx = u64::from(self.x) + u64::from(self.width) / 2;
        let cy = u64::from(self.y) + u64::from(self.height) / 2;
        Point {
            x: i32::try_from(cx).unwrap_or(i32::MAX),
            y: i32::try_from(cy).unwrap_or(i32::MAX),
        }
    }
}

/// Integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}
