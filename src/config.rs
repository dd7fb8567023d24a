//! Editor configuration.
//!
//! Loaded from a JSON file; every field has a default so partial files are
//! fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Platform whose input latency the persisted pre-delay is expressed for.
///
/// The two supported platforms differ by a fixed 800 ms of input-latency
/// compensation. The correction is applied only when pre-delay crosses the
/// serialization boundary, never inside timing math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Windows,
    MacOs,
}

/// Latency difference between the two platforms.
pub const PLATFORM_LATENCY_DELTA_MS: i64 = 800;

impl Platform {
    /// Milliseconds added to pre-delay when persisting (and subtracted
    /// when restoring).
    pub fn pre_delay_correction_ms(self) -> i64 {
        match self {
            Platform::Windows => 0,
            Platform::MacOs => PLATFORM_LATENCY_DELTA_MS,
        }
    }

    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Windows
        }
    }
}

/// SVG export options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgOptions {
    /// Pixels per world unit
    pub scale: f64,
    /// Blank border around the drawing (pixels)
    pub margin: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            scale: 10.0,
            margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub platform: Platform,
    /// Overrides the chart's speed multiplier when set
    pub speed_multiplier: Option<f64>,
    pub svg: SvgOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            speed_multiplier: None,
            svg: SvgOptions::default(),
        }
    }
}

impl Config {
    /// Read a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChartError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ChartError> {
        let config: Config = serde_json::from_str(text)?;
        if let Some(m) = config.speed_multiplier {
            if m <= 0.0 || m.is_nan() {
                return Err(ChartError::InvalidValue {
                    field: "speedMultiplier",
                    message: format!("{m} is not positive"),
                });
            }
        }
        if config.svg.scale <= 0.0 || config.svg.scale.is_nan() {
            return Err(ChartError::InvalidValue {
                field: "svg.scale",
                message: format!("{} is not positive", config.svg.scale),
            });
        }
        Ok(config)
    }
}
