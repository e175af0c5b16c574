use std::path::PathBuf;

use chrono::Local;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::config::Output;
use crate::error::VservoError;
use crate::frame::{BoundingBox, Frame, Point};

const CENTER_DOT_RADIUS: i32 = 7;

/// Optional display collaborator: draws the frame center, the detection
/// rectangles and their center points, and saves the annotated frame to the
/// output folder at a throttled interval.
pub struct FrameSink {
    folder: PathBuf,
    draw_centers: bool,
    line_color: Rgb<u8>,
    line_thickness: u32,
    save_interval: i64,
    last_save_time: i64,
}

impl FrameSink {
    /// Build a sink from the output configuration; `None` when saving is
    /// disabled.
    pub fn from_config(output: &Output) -> Option<Self> {
        if output.folder.is_empty() {
            return None;
        }
        Some(Self {
            folder: PathBuf::from(&output.folder),
            draw_centers: output.draw_centers,
            line_color: Rgb(output.line_color),
            line_thickness: output.line_thickness,
            save_interval: output.save_interval,
            last_save_time: 0,
        })
    }

    /// Annotate and save the frame, unless the last save was less than the
    /// configured interval ago.
    pub fn record(&mut self, frame: &Frame, boxes: &[BoundingBox]) -> Result<(), VservoError> {
        let now = Local::now().timestamp();
        if self.last_save_time != 0 && now < self.last_save_time + self.save_interval {
            debug!(target: "render", "Skipping frame save, within interval");
            return Ok(());
        }

        let annotated = self.annotate(frame, boxes);

        std::fs::create_dir_all(&self.folder)?;
        let path = self
            .folder
            .join(format!("frame_{}.png", Local::now().format("%Y%m%d_%H%M%S")));
        annotated.save(&path)?;
        self.last_save_time = now;

        info!(target: "render", "Saved annotated frame to {}", path.display());
        Ok(())
    }

    fn annotate(&self, frame: &Frame, boxes: &[BoundingBox]) -> RgbImage {
        let mut image = frame.buffer().clone();

        if self.draw_centers {
            let center = frame.center();
            draw_filled_circle_mut(
                &mut image,
                (center.x, center.y),
                CENTER_DOT_RADIUS,
                Rgb([255, 255, 255]),
            );
        }

        for detection in boxes {
            // Thickness as nested one-pixel rectangles.
            for i in 0..self.line_thickness {
                if detection.width <= 2 * i || detection.height <= 2 * i {
                    break;
                }
                draw_hollow_rect_mut(
                    &mut image,
                    Rect::at(detection.x as i32 + i as i32, detection.y as i32 + i as i32)
                        .of_size(detection.width - 2 * i, detection.height - 2 * i),
                    self.line_color,
                );
            }

            if self.draw_centers {
                let Point { x, y } = detection.center();
                draw_filled_circle_mut(&mut image, (x, y), CENTER_DOT_RADIUS, self.line_color);
            }
        }

        image
    }
}
