use std::path::PathBuf;

use enum_dispatch::enum_dispatch;
use image::ImageReader;
use tracing::debug;

use crate::error::VservoError;
use crate::frame::Frame;

#[cfg(feature = "stream")]
extern crate ffmpeg_next as ffmpeg;
#[cfg(feature = "stream")]
use ffmpeg::codec::context::Context as CodecContext;
#[cfg(feature = "stream")]
use ffmpeg::format::{input, Pixel};
#[cfg(feature = "stream")]
use ffmpeg::media::Type;
#[cfg(feature = "stream")]
use ffmpeg::software::scaling::{Context as ScalingContext, Flags};
#[cfg(feature = "stream")]
use ffmpeg::util::frame::video::Video;

/// Pull-based sequence of frames. `Ok(None)` signals end-of-sequence; any
/// error is terminal for the source, and retrying is the caller's decision.
#[enum_dispatch(SourceKind)]
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VservoError>;
}

/// The media source picked from configuration. Exactly one is active per
/// run; the conflict check happens before construction.
#[enum_dispatch]
pub enum SourceKind {
    Image(ImageSource),
    Camera(CameraSource),
}

/// A single static image: yields exactly one frame, then end-of-sequence.
pub struct ImageSource {
    path: PathBuf,
    consumed: bool,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: false,
        }
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VservoError> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;

        let image = ImageReader::open(&self.path)
            .map_err(|err| {
                VservoError::Acquisition(format!(
                    "could not open image '{}': {err}",
                    self.path.display()
                ))
            })?
            .decode()
            .map_err(|err| {
                VservoError::Acquisition(format!(
                    "could not decode image '{}': {err}",
                    self.path.display()
                ))
            })?;

        debug!(target: "source", "Loaded image {}", self.path.display());
        Ok(Some(Frame::new(image.to_rgb8())))
    }
}

/// Live capture through FFmpeg, frames scaled to the configured window size.
///
/// Conceptually infinite: frames are produced until the caller stops pulling
/// or the underlying stream ends.
pub struct CameraSource {
    #[cfg(feature = "stream")]
    ictx: ffmpeg::format::context::Input,
    #[cfg(feature = "stream")]
    decoder: ffmpeg::decoder::Video,
    #[cfg(feature = "stream")]
    scaler: ScalingContext,
    #[cfg(feature = "stream")]
    stream_index: usize,
    #[cfg(feature = "stream")]
    finished: bool,
}

impl std::fmt::Debug for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSource").finish_non_exhaustive()
    }
}

impl CameraSource {
    /// Open the capture device (`/dev/video{index}`) or, when set, the
    /// configured stream URL.
    #[allow(unused_variables)]
    pub fn open(index: u32, url: &str, width: u32, height: u32) -> Result<Self, VservoError> {
        #[cfg(feature = "stream")]
        {
            ffmpeg::init()?;
            ffmpeg::log::set_level(ffmpeg::log::Level::Quiet);

            let target = if url.is_empty() {
                format!("/dev/video{index}")
            } else {
                url.to_string()
            };

            tracing::info!(target: "source", "Opening capture input {}", target);
            let ictx = input(&target).map_err(|err| {
                VservoError::Acquisition(format!("could not open capture input '{target}': {err}"))
            })?;

            let input_stream = ictx.streams().best(Type::Video).ok_or_else(|| {
                VservoError::Acquisition(format!("no video stream in '{target}'"))
            })?;
            let stream_index = input_stream.index();

            let decoder = CodecContext::from_parameters(input_stream.parameters())
                .and_then(|context| context.decoder().video())?;

            let scaler = ScalingContext::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                Pixel::RGB24,
                width,
                height,
                Flags::BILINEAR,
            )?;

            Ok(Self {
                ictx,
                decoder,
                scaler,
                stream_index,
                finished: false,
            })
        }

        #[cfg(not(feature = "stream"))]
        {
            Err(VservoError::Acquisition(
                "camera capture requested but vservo was built without the 'stream' feature"
                    .to_string(),
            ))
        }
    }

    #[cfg(feature = "stream")]
    fn frame_from_video(rgb: &Video) -> Frame {
        let width = rgb.width();
        let height = rgb.height();
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        // Copy row by row; FFmpeg lines may carry padding past width * 3.
        let row_bytes = width as usize * 3;
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }

        let image = image::RgbImage::from_raw(width, height, buffer)
            .unwrap_or_else(|| image::RgbImage::new(width, height));
        Frame::new(image)
    }
}

impl FrameSource for CameraSource {
    #[cfg(feature = "stream")]
    fn next_frame(&mut self) -> Result<Option<Frame>, VservoError> {
        if self.finished {
            return Ok(None);
        }

        let mut decoded = Video::empty();
        loop {
            // Drain any frame already buffered in the decoder first.
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = Video::empty();
                self.scaler.run(&decoded, &mut rgb)?;
                return Ok(Some(Self::frame_from_video(&rgb)));
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) if stream.index() == self.stream_index => {
                    self.decoder.send_packet(&packet).map_err(|err| {
                        VservoError::Acquisition(format!("decoder rejected packet: {err}"))
                    })?;
                }
                Some(_) => continue,
                None => {
                    // Stream exhausted: flush the decoder, then end.
                    self.finished = true;
                    let _ = self.decoder.send_eof();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        let mut rgb = Video::empty();
                        self.scaler.run(&decoded, &mut rgb)?;
                        return Ok(Some(Self::frame_from_video(&rgb)));
                    }
                    tracing::info!(target: "source", "Capture stream ended");
                    return Ok(None);
                }
            }
        }
    }

    #[cfg(not(feature = "stream"))]
    fn next_frame(&mut self) -> Result<Option<Frame>, VservoError> {
        Err(VservoError::Acquisition(
            "camera capture requested but vservo was built without the 'stream' feature"
                .to_string(),
        ))
    }
}
