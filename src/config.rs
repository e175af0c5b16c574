use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VservoError;

/// Validated run configuration. Loaded once at startup and treated as
/// read-only by every component downstream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Pixels of slack around the frame center within which an object
    /// counts as centered.
    pub offset: u32,
    /// Serial port for the microcontroller backend. Empty disables it.
    pub port: String,
    /// Name of the detection profile (e.g. a cascade file) the detector
    /// was built from. Informational for the bundled detector.
    pub cascade_name: String,
    pub camera: Camera,
    pub image: Image,
    pub window: Window,
    #[serde(default)]
    pub detection: Detection,
    #[serde(default)]
    pub serial: Serial,
    #[serde(default)]
    pub servo: Servo,
    #[serde(default)]
    pub output: Output,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Camera {
    pub index: u32,
    /// Optional stream URL; overrides `index` when non-empty.
    #[serde(default)]
    pub url: String,
    #[serde(rename = "use")]
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Image {
    pub path: String,
    #[serde(rename = "use")]
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Window {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    /// Pyramid step for cascade-style detectors; passed through untouched.
    pub scale_factor: f32,
    /// Neighbour/area threshold; passed through untouched.
    pub min_neighbors: u32,
    /// Luminance threshold for the bundled blob detector.
    pub threshold: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Serial {
    pub baud_rate: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Servo {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub x_channel: u8,
    pub y_channel: u8,
    pub movement_amount: i32,
    pub min_degree: i32,
    pub max_degree_x: i32,
    pub max_degree_y: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Output {
    /// Folder for annotated frames. Empty disables saving.
    pub folder: String,
    /// Minimum seconds between saved frames.
    pub save_interval: i64,
    pub draw_centers: bool,
    pub line_color: [u8; 3],
    pub line_thickness: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offset: 50,
            port: "COM3".to_string(),
            cascade_name: "face.xml".to_string(),
            camera: Camera {
                index: 0,
                url: String::new(),
                enabled: true,
            },
            image: Image {
                path: String::new(),
                enabled: false,
            },
            window: Window {
                width: 1920,
                height: 1080,
            },
            detection: Detection::default(),
            serial: Serial::default(),
            servo: Servo::default(),
            output: Output::default(),
        }
    }
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 4,
            threshold: 200,
        }
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

impl Default for Servo {
    fn default() -> Self {
        Self {
            enabled: false,
            x_channel: 0,
            y_channel: 1,
            movement_amount: 10,
            min_degree: 0,
            max_degree_x: 180,
            max_degree_y: 150,
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            folder: String::new(),
            save_interval: 60,
            draw_centers: true,
            line_color: [0, 0, 255],
            line_thickness: 2,
        }
    }
}

impl Config {
    /// Load the config file, creating a default one when it does not exist
    /// and replacing it when it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VservoError> {
        let settings = Settings::new(path.as_ref());

        if !settings.file_exists() {
            settings.create_default()?;
        }

        settings.load()
    }
}

/// File-level settings operations, separate from the validated [`Config`].
pub struct Settings {
    path: PathBuf,
}

impl Settings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn file_exists(&self) -> bool {
        self.path.exists()
    }

    /// Write a config file populated with the defaults.
    pub fn create_default(&self) -> Result<(), VservoError> {
        let serialized = toml::to_string_pretty(&Config::default())?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Parse the config file. An invalid file is replaced with the defaults
    /// rather than aborting the run.
    pub fn load(&self) -> Result<Config, VservoError> {
        let raw = std::fs::read_to_string(&self.path)?;

        match toml::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!(
                    "Config file {} is invalid ({}); replacing it with defaults",
                    self.path.display(),
                    err
                );
                self.replace_invalid()?;
                Ok(Config::default())
            }
        }
    }

    fn replace_invalid(&self) -> Result<(), VservoError> {
        std::fs::remove_file(&self.path)?;
        self.create_default()
    }
}
