use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
pub enum VservoError {
    /// The frame source could not produce the next frame. Fatal to the run.
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),

    /// An actuator backend could not be constructed. Recovered by running
    /// detection-only with the null backend.
    #[error("actuator device unavailable: {0}")]
    DeviceUnavailable(String),

    /// An actuator write failed mid-run. Not retried.
    #[error("actuator write failed: {0}")]
    Device(String),

    #[error("camera and image sources are both enabled; pick one")]
    #[diagnostic(help("set exactly one of [camera].use / [image].use in the config file"))]
    ConfigurationConflict,

    #[error("neither camera nor image source is enabled")]
    #[diagnostic(help("set [camera].use or [image].use in the config file"))]
    NoMediaSource,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[cfg(feature = "stream")]
    #[error(transparent)]
    Ffmpeg(#[from] ffmpeg_next::Error),
}
