//! Color mode detection.
//!
//! Stylesheets always carry both modes; detection only matters to callers that
//! want to preselect one, for example by writing the mode attribute into the
//! root element of a generated page.
//!
//! ```rust
//! use spark_core::{detect_color_mode, set_theme_detector, ColorMode};
//!
//! set_theme_detector(|| ColorMode::Dark);
//! assert_eq!(detect_color_mode(), ColorMode::Dark);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::SparkError;

/// A color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Light,
    Dark,
}

impl ColorMode {
    pub const ALL: [ColorMode; 2] = [ColorMode::Light, ColorMode::Dark];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ColorMode::Light),
            "dark" => Ok(ColorMode::Dark),
            other => Err(SparkError::parse(format!(
                "unknown color mode '{}', expected 'light' or 'dark'",
                other
            ))),
        }
    }
}

type ThemeDetector = fn() -> ColorMode;

static THEME_DETECTOR: Lazy<Mutex<ThemeDetector>> = Lazy::new(|| Mutex::new(os_theme_detector));

/// Overrides the detector used by [`detect_color_mode`].
pub fn set_theme_detector(detector: ThemeDetector) {
    let mut guard = THEME_DETECTOR.lock().unwrap_or_else(|e| e.into_inner());
    *guard = detector;
}

/// The OS color mode preference, or whatever the installed detector returns.
///
/// An OS that reports no preference, or cannot be queried, counts as light.
pub fn detect_color_mode() -> ColorMode {
    let detector = THEME_DETECTOR.lock().unwrap_or_else(|e| e.into_inner());
    (*detector)()
}

fn os_theme_detector() -> ColorMode {
    match dark_light::detect() {
        Ok(dark_light::Mode::Dark) => ColorMode::Dark,
        _ => ColorMode::Light,
    }
}
