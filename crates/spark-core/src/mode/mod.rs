//! Color modes.
//!
//! A dark variant of a token or component is a fork whose output is scoped to
//! `[{mode_attribute}="dark"]`. Forking keeps every identifier, so markup does
//! not change between modes; only the cascade does.

mod adaptive;
mod modes;

pub use adaptive::{detect_color_mode, set_theme_detector, ColorMode};
pub use modes::{Forkable, ModeMap};
