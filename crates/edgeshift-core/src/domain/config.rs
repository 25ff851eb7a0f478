//! The immutable run configuration.
//!
//! A [`Configuration`] is assembled once at startup (configuration file, then
//! command line) and passed by reference to every component afterwards.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::buttons::MAX_BUTTONS;
use super::chain::{ChainLayout, DEFAULT_BOUNDARY_PADDING, DEFAULT_TRIGGER_WIDTH};
use super::geometry::Edge;
use crate::keymap::Keysym;

/// Interval between display open attempts under the wait policy.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(10);

/// Errors found while validating a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("source and destination are the same display: {0}")]
    SameDisplay(String),

    #[error("trigger width must be at least one pixel")]
    ZeroTriggerWidth,

    #[error("boundary padding must be at least one cell")]
    ZeroPadding,

    #[error("boundary padding {padding} must not exceed the trigger width {trigger_width}")]
    PaddingExceedsTrigger { padding: u32, trigger_width: u32 },

    #[error("button {0} cannot be mapped to keys (valid buttons are 1..={max})", max = MAX_BUTTONS)]
    ButtonOutOfRange(u32),

    #[error("invalid geometry {0:?}")]
    InvalidGeometry(String),
}

/// Everything the engine needs to know about how it should behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Source display name; `None` uses `$DISPLAY`.
    pub from_display: Option<String>,
    /// Primary destination display name; `None` uses `$DISPLAY`.
    pub to_display: Option<String>,
    /// Extra destinations that receive identical input.
    pub shadows: Vec<String>,
    /// Edge the destination hangs off; `None` runs in window mode.
    pub edge: Option<Edge>,
    /// Window mode only: clicking the trigger window connects.
    pub capture_mouse: bool,
    /// Honour the destination's pointer button mapping.
    pub pointer_map: bool,
    /// Keep PRIMARY selection ownership on the source.
    pub selection: bool,
    /// Release everything held on the destinations when disconnecting.
    pub auto_up: bool,
    /// Refuse to disconnect while a button is held.
    pub button_block: bool,
    pub sticky: Vec<Keysym>,
    /// Buttons that type a key sequence instead of clicking.
    pub button_keys: BTreeMap<u32, Vec<Keysym>>,
    pub trigger_width: u32,
    pub boundary_padding: u32,
    /// Shift added to the orthogonal coordinate on the destination.
    pub offset: i32,
    pub capslock_hack: bool,
    /// Wake destination monitors on every forwarded motion.
    pub dpms_wake: bool,
    /// Retry opening displays instead of failing.
    pub wait: bool,
    pub wait_interval: Duration,
    pub geometry: Option<WindowGeometry>,
    pub label: Option<String>,
    pub title: Option<String>,
    pub font: Option<String>,
    /// Map a full-screen input-only window while connected.
    pub big_window: bool,
    /// Raise the trigger window whenever it gets obscured.
    pub resurface: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            from_display: None,
            to_display: None,
            shadows: Vec::new(),
            edge: None,
            capture_mouse: true,
            pointer_map: true,
            selection: true,
            auto_up: true,
            button_block: false,
            sticky: Vec::new(),
            button_keys: BTreeMap::new(),
            trigger_width: DEFAULT_TRIGGER_WIDTH,
            boundary_padding: DEFAULT_BOUNDARY_PADDING,
            offset: 0,
            capslock_hack: false,
            dpms_wake: false,
            wait: false,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            geometry: None,
            label: None,
            title: None,
            font: None,
            big_window: false,
            resurface: false,
        }
    }
}

impl Configuration {
    /// Returns `true` when crossing a screen edge (rather than clicking a
    /// window) connects.
    pub fn edge_mode(&self) -> bool {
        self.edge.is_some()
    }

    pub fn is_sticky(&self, keysym: Keysym) -> bool {
        self.sticky.contains(&keysym)
    }

    /// Key sequence configured for `button`, if any and non-empty.
    pub fn keys_for_button(&self, button: u32) -> Option<&[Keysym]> {
        self.button_keys
            .get(&button)
            .map(Vec::as_slice)
            .filter(|keys| !keys.is_empty())
    }

    /// Chain shape derived from this configuration.
    pub fn chain_layout(&self) -> ChainLayout {
        ChainLayout {
            edge: self.edge,
            trigger_width: self.trigger_width,
            boundary_padding: self.boundary_padding,
            across_offset: self.offset,
        }
    }

    /// Checks the values that do not depend on any display.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_width == 0 {
            return Err(ConfigError::ZeroTriggerWidth);
        }
        if self.boundary_padding == 0 {
            return Err(ConfigError::ZeroPadding);
        }
        if self.boundary_padding > self.trigger_width {
            return Err(ConfigError::PaddingExceedsTrigger {
                padding: self.boundary_padding,
                trigger_width: self.trigger_width,
            });
        }
        if let Some(&button) = self
            .button_keys
            .keys()
            .find(|&&button| button == 0 || button as usize > MAX_BUTTONS)
        {
            return Err(ConfigError::ButtonOutOfRange(button));
        }
        Ok(())
    }

    /// Rejects a source and destination that resolve to the same display.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SameDisplay`] when the names match ignoring
    /// ASCII case.
    pub fn check_distinct(resolved_from: &str, resolved_to: &str) -> Result<(), ConfigError> {
        if resolved_from.eq_ignore_ascii_case(resolved_to) {
            return Err(ConfigError::SameDisplay(resolved_to.to_string()));
        }
        Ok(())
    }
}

// ── Window geometry ───────────────────────────────────────────────────────────

/// An X geometry specification: `[=][WxH][{+-}X{+-}Y]`.
///
/// Negative offsets are measured from the right or bottom edge of the root
/// window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub x_negative: bool,
    pub y_negative: bool,
}

impl WindowGeometry {
    /// Resolves the window origin and size against the root window size,
    /// falling back to `default_size` for missing dimensions.
    pub fn place(&self, root: (u32, u32), default_size: (u32, u32)) -> (i32, i32, u32, u32) {
        let width = self.width.unwrap_or(default_size.0).max(1);
        let height = self.height.unwrap_or(default_size.1).max(1);
        let x = match (self.x, self.x_negative) {
            (Some(x), true) => root.0 as i32 - width as i32 + x,
            (Some(x), false) => x,
            (None, _) => 0,
        };
        let y = match (self.y, self.y_negative) {
            (Some(y), true) => root.1 as i32 - height as i32 + y,
            (Some(y), false) => y,
            (None, _) => 0,
        };
        (x, y, width, height)
    }
}

impl FromStr for WindowGeometry {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidGeometry(spec.to_string());
        let body = spec.strip_prefix('=').unwrap_or(spec);
        let mut geometry = WindowGeometry::default();

        let offsets_at = body.find(['+', '-']).unwrap_or(body.len());
        let (size, offsets) = body.split_at(offsets_at);

        if !size.is_empty() {
            let (w, h) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
            if !w.is_empty() {
                geometry.width = Some(w.parse().map_err(|_| invalid())?);
            }
            if !h.is_empty() {
                geometry.height = Some(h.parse().map_err(|_| invalid())?);
            }
        }

        if !offsets.is_empty() {
            let (x_part, y_part) = split_offsets(offsets).ok_or_else(invalid)?;
            let (x_negative, x) = parse_offset(x_part).ok_or_else(invalid)?;
            geometry.x = Some(x);
            geometry.x_negative = x_negative;
            if let Some(y_part) = y_part {
                let (y_negative, y) = parse_offset(y_part).ok_or_else(invalid)?;
                geometry.y = Some(y);
                geometry.y_negative = y_negative;
            }
        }

        Ok(geometry)
    }
}

/// Splits `+X-Y` into `("+X", Some("-Y"))`.
fn split_offsets(offsets: &str) -> Option<(&str, Option<&str>)> {
    let rest = offsets.get(1..)?;
    match rest.find(['+', '-']) {
        Some(at) => Some((&offsets[..at + 1], Some(&rest[at..]))),
        None => Some((offsets, None)),
    }
}

/// Parses `+12` / `-12` into `(negative, value)`; the value keeps its sign.
fn parse_offset(part: &str) -> Option<(bool, i32)> {
    let negative = part.starts_with('-');
    let digits = part.get(1..)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: i32 = digits.parse().ok()?;
    Some((negative, if negative { -magnitude } else { magnitude }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn test_default_configuration_matches_documented_defaults() {
        let config = Configuration::default();
        assert!(config.capture_mouse);
        assert!(config.pointer_map);
        assert!(config.selection);
        assert!(config.auto_up);
        assert!(!config.button_block);
        assert_eq!(config.trigger_width, 2);
        assert_eq!(config.boundary_padding, 2);
        assert_eq!(config.wait_interval, Duration::from_secs(10));
        assert!(!config.edge_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_trigger_width() {
        let config = Configuration {
            trigger_width: 0,
            ..Configuration::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTriggerWidth));
    }

    #[test]
    fn test_validate_rejects_padding_wider_than_trigger() {
        // Arrange
        let config = Configuration {
            edge: Some(Edge::West),
            boundary_padding: 5,
            ..Configuration::default()
        };

        // Act
        let result = config.validate();

        // Assert
        assert_eq!(
            result,
            Err(ConfigError::PaddingExceedsTrigger {
                padding: 5,
                trigger_width: 2
            })
        );
    }

    #[test]
    fn test_validate_accepts_padding_equal_to_trigger_width() {
        let config = Configuration {
            trigger_width: 4,
            boundary_padding: 4,
            ..Configuration::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_button_keys() {
        let mut config = Configuration::default();
        config.button_keys.insert(12, vec![Keysym(0x61)]);
        assert_eq!(config.validate(), Err(ConfigError::ButtonOutOfRange(12)));
    }

    #[test]
    fn test_check_distinct_ignores_case() {
        assert_eq!(
            Configuration::check_distinct("Host:0", "host:0"),
            Err(ConfigError::SameDisplay("host:0".to_string()))
        );
        assert!(Configuration::check_distinct(":0", "other:0").is_ok());
    }

    #[test]
    fn test_keys_for_button_skips_empty_sequences() {
        let mut config = Configuration::default();
        config.button_keys.insert(4, Vec::new());
        config.button_keys.insert(5, vec![Keysym(0xff54)]);
        assert_eq!(config.keys_for_button(4), None);
        assert_eq!(config.keys_for_button(5), Some(&[Keysym(0xff54)][..]));
        assert_eq!(config.keys_for_button(1), None);
    }

    #[test]
    fn test_chain_layout_carries_edge_settings() {
        let config = Configuration {
            edge: Some(Edge::South),
            trigger_width: 3,
            boundary_padding: 1,
            offset: -20,
            ..Configuration::default()
        };
        let layout = config.chain_layout();
        assert_eq!(layout.edge, Some(Edge::South));
        assert_eq!(layout.trigger_width, 3);
        assert_eq!(layout.boundary_padding, 1);
        assert_eq!(layout.across_offset, -20);
    }

    // ── WindowGeometry ────────────────────────────────────────────────────────

    #[test]
    fn test_geometry_parses_size_and_offsets() {
        let geometry: WindowGeometry = "200x50+10+20".parse().expect("valid geometry");
        assert_eq!(geometry.width, Some(200));
        assert_eq!(geometry.height, Some(50));
        assert_eq!(geometry.x, Some(10));
        assert_eq!(geometry.y, Some(20));
        assert!(!geometry.x_negative);
    }

    #[test]
    fn test_geometry_parses_negative_offsets_only() {
        let geometry: WindowGeometry = "-0-5".parse().expect("valid geometry");
        assert_eq!(geometry.width, None);
        assert_eq!(geometry.x, Some(0));
        assert!(geometry.x_negative);
        assert_eq!(geometry.y, Some(-5));
        assert!(geometry.y_negative);
    }

    #[test]
    fn test_geometry_place_measures_negative_offsets_from_far_edge() {
        let geometry: WindowGeometry = "100x40-0-0".parse().expect("valid geometry");
        assert_eq!(geometry.place((1920, 1080), (10, 10)), (1820, 1040, 100, 40));
    }

    #[test]
    fn test_geometry_place_uses_default_size() {
        let geometry: WindowGeometry = "+5+6".parse().expect("valid geometry");
        assert_eq!(geometry.place((1920, 1080), (120, 30)), (5, 6, 120, 30));
    }

    #[test]
    fn test_geometry_rejects_garbage() {
        assert!("axb".parse::<WindowGeometry>().is_err());
        assert!("100x50+".parse::<WindowGeometry>().is_err());
        assert!("100".parse::<WindowGeometry>().is_err());
    }
}
