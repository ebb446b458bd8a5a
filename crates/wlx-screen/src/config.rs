use core::time::Duration;
use std::{fs, io::Read, path::PathBuf};

use serde::{Deserialize, Serialize};
use xshm_capture_provider::{LIBRARY_NAME, SessionOptions};

use crate::{
    directories::config_dir,
    failure::{Failure, report_and_panic},
    overlay::{CursorMode, CurvedSurface},
};

const FILE_NAME: &str = "wlx-screen.toml";

/// The user configuration, missing fields use their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path or name of the capture library.
    pub library_path: String,

    /// Outputs to show, every output when unset.
    pub outputs: Option<Vec<u32>>,

    /// Draw a cross into the screen texture instead of moving a cursor object.
    pub fallback_cursors: bool,

    /// Arm length of the fallback cross in pixels.
    pub cursor_size: u32,

    /// Render ticks per second.
    pub tick_rate: u32,

    /// Minimum seconds between two warnings about discarded frames.
    pub corrupt_frame_warning_interval_secs: u64,

    /// Inverse radius of the screen surface in 1/m, `0.0` is flat.
    pub curvature: f32,

    /// Width of a screen overlay in metres.
    pub overlay_width: f32,

    /// Enable the Vulkan validation layer.
    pub debug_vulkan: bool,
}

impl Config {
    /// Load the config file, `None` if there is none yet.
    pub fn try_load_config() -> Result<Option<Self>, toml::de::Error> {
        let mut file = match fs::File::open(Self::file_path()) {
            Ok(file) => file,
            Err(error) => {
                if error.kind() == std::io::ErrorKind::NotFound {
                    return Ok(None);
                }

                report_and_panic(
                    error,
                    "Could not check if an existing configuration file exists",
                );
            }
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .report_and_panic("Could not read the existing configuration file");

        Self::parse(&contents).map(Some)
    }

    /// Parse a config from TOML.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Write the config file, replacing any existing one.
    pub fn save(&self) {
        let toml_string =
            toml::to_string_pretty(self).report_and_panic("Could not save the configuration file");

        fs::write(Self::file_path(), toml_string.as_bytes())
            .report_and_panic("Could not save the configuration file");
    }

    /// Path to the config file.
    pub fn file_path() -> PathBuf {
        config_dir().join(FILE_NAME)
    }

    /// How overlays show the cursor.
    pub fn cursor_mode(&self) -> CursorMode {
        if self.fallback_cursors {
            CursorMode::Fallback
        } else {
            CursorMode::Curved
        }
    }

    /// Options for every capture session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            corrupt_frame_warning_interval: Duration::from_secs(
                self.corrupt_frame_warning_interval_secs,
            ),
        }
    }

    /// Time between two render ticks, a zero tick rate is treated as one tick per second.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    /// The surface a screen of `size` pixels is shown on.
    pub fn surface(&self, size: [u32; 2]) -> CurvedSurface {
        let aspect = size[1] as f32 / size[0].max(1) as f32;

        CurvedSurface {
            width: self.overlay_width,
            height: self.overlay_width * aspect,
            curvature: self.curvature,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_path: LIBRARY_NAME.to_string(),
            outputs: None,
            fallback_cursors: false,
            cursor_size: 8,
            tick_rate: 90,
            corrupt_frame_warning_interval_secs: 5,
            curvature: 0.0,
            overlay_width: 1.5,
            debug_vulkan: false,
        }
    }
}
