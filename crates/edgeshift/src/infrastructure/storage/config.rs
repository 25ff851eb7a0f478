//! TOML configuration file for edgeshift.
//!
//! Read from `--config <path>` when given, otherwise from the platform
//! config directory:
//! - Linux:  `$XDG_CONFIG_HOME/edgeshift/config.toml` (or `~/.config/...`)
//! - macOS:  `~/Library/Application Support/edgeshift/config.toml`
//!
//! Example:
//!
//! ```toml
//! log_level = "debug"
//!
//! [displays]
//! to = "laptop:0"
//! shadows = ["projector:0"]
//! wait = true
//!
//! [edge]
//! direction = "east"
//! trigger_width = 2
//!
//! [behavior]
//! button_block = true
//!
//! [keys]
//! sticky = ["Num_Lock", "Caps_Lock"]
//!
//! [[keys.button_map]]
//! button = 8
//! keys = ["Alt_L", "Left"]
//! ```
//!
//! Every field has a serde default, so a missing file or a file that only
//! sets a few fields yields the built-in defaults for everything else.
//! Command-line flags are applied on top of the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edgeshift_core::{Configuration, Edge, Keysym, WindowGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum FileConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed as TOML but holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub displays: DisplaysSection,
    #[serde(default)]
    pub edge: EdgeSection,
    #[serde(default)]
    pub behavior: BehaviorSection,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub keys: KeysSection,
}

/// Which displays take part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaysSection {
    /// Source display; `$DISPLAY` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Primary destination display; `$DISPLAY` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub shadows: Vec<String>,
    /// Keep retrying displays that cannot be opened yet.
    #[serde(default)]
    pub wait: bool,
    /// Seconds between retries.
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
}

/// Edge-trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeSection {
    /// `east`, `west`, `north` or `south`; absent selects window mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Edge>,
    #[serde(default = "default_trigger_width")]
    pub trigger_width: u32,
    #[serde(default = "default_padding")]
    pub padding: u32,
    #[serde(default)]
    pub offset: i32,
}

/// Switches that change how input is forwarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorSection {
    #[serde(default = "default_true")]
    pub mouse: bool,
    #[serde(default = "default_true")]
    pub pointer_map: bool,
    #[serde(default = "default_true")]
    pub selection: bool,
    #[serde(default = "default_true")]
    pub auto_up: bool,
    #[serde(default)]
    pub button_block: bool,
    #[serde(default)]
    pub capslock_hack: bool,
    #[serde(default)]
    pub dpms_wake: bool,
    #[serde(default)]
    pub big: bool,
    #[serde(default)]
    pub resurface: bool,
}

/// Trigger window appearance (window mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WindowSection {
    /// X geometry string, e.g. `"200x40-0+0"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

/// Keysym-based settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeysSection {
    /// Keysym names always forwarded as press+release.
    #[serde(default)]
    pub sticky: Vec<String>,
    #[serde(default)]
    pub button_map: Vec<ButtonMapEntry>,
}

/// One `[[keys.button_map]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ButtonMapEntry {
    pub button: u32,
    pub keys: Vec<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_wait_seconds() -> u64 {
    edgeshift_core::domain::config::DEFAULT_WAIT_INTERVAL.as_secs()
}
fn default_trigger_width() -> u32 {
    edgeshift_core::domain::chain::DEFAULT_TRIGGER_WIDTH
}
fn default_padding() -> u32 {
    edgeshift_core::domain::chain::DEFAULT_BOUNDARY_PADDING
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            displays: DisplaysSection::default(),
            edge: EdgeSection::default(),
            behavior: BehaviorSection::default(),
            window: WindowSection::default(),
            keys: KeysSection::default(),
        }
    }
}

impl Default for DisplaysSection {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            shadows: Vec::new(),
            wait: false,
            wait_seconds: default_wait_seconds(),
        }
    }
}

impl Default for EdgeSection {
    fn default() -> Self {
        Self {
            direction: None,
            trigger_width: default_trigger_width(),
            padding: default_padding(),
            offset: 0,
        }
    }
}

impl Default for BehaviorSection {
    fn default() -> Self {
        Self {
            mouse: true,
            pointer_map: true,
            selection: true,
            auto_up: true,
            button_block: false,
            capslock_hack: false,
            dpms_wake: false,
            big: false,
            resurface: false,
        }
    }
}

impl FileConfig {
    /// Builds the base [`Configuration`] the command line is applied to.
    ///
    /// # Errors
    ///
    /// Returns [`FileConfigError::Invalid`] for an unparsable geometry.
    pub fn to_configuration(&self) -> Result<Configuration, FileConfigError> {
        let geometry = self
            .window
            .geometry
            .as_deref()
            .map(str::parse::<WindowGeometry>)
            .transpose()
            .map_err(|e| FileConfigError::Invalid {
                field: "window.geometry",
                reason: e.to_string(),
            })?;

        let mut button_keys = BTreeMap::new();
        for entry in &self.keys.button_map {
            let keys = resolve_keysyms(entry.keys.iter().map(String::as_str));
            button_keys.insert(entry.button, keys);
        }

        Ok(Configuration {
            from_display: self.displays.from.clone(),
            to_display: self.displays.to.clone(),
            shadows: self.displays.shadows.clone(),
            edge: self.edge.direction,
            capture_mouse: self.behavior.mouse,
            pointer_map: self.behavior.pointer_map,
            selection: self.behavior.selection,
            auto_up: self.behavior.auto_up,
            button_block: self.behavior.button_block,
            sticky: resolve_keysyms(self.keys.sticky.iter().map(String::as_str)),
            button_keys,
            trigger_width: self.edge.trigger_width,
            boundary_padding: self.edge.padding,
            offset: self.edge.offset,
            capslock_hack: self.behavior.capslock_hack,
            dpms_wake: self.behavior.dpms_wake,
            wait: self.displays.wait,
            wait_interval: Duration::from_secs(self.displays.wait_seconds.max(1)),
            geometry,
            label: self.window.label.clone(),
            title: self.window.title.clone(),
            font: self.window.font.clone(),
            big_window: self.behavior.big,
            resurface: self.behavior.resurface,
        })
    }
}

/// Resolves keysym names, warning about and skipping unknown ones.
///
/// Names missing from the built-in table are looked up in Xlib's keysym
/// database where Xlib is available.
pub fn resolve_keysyms<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Keysym> {
    names
        .into_iter()
        .filter_map(|name| {
            let keysym = Keysym::from_name(name).or_else(|| system_keysym(name));
            if keysym.is_none() {
                warn!("unknown keysym name {name:?}; ignored");
            }
            keysym
        })
        .collect()
}

#[cfg(target_os = "linux")]
fn system_keysym(name: &str) -> Option<Keysym> {
    crate::infrastructure::display::x11::keysym_from_xlib(name)
}

#[cfg(not(target_os = "linux"))]
fn system_keysym(_name: &str) -> Option<Keysym> {
    None
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default path of the config file.
///
/// # Errors
///
/// Returns [`FileConfigError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn config_file_path() -> Result<PathBuf, FileConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(FileConfigError::NoPlatformConfigDir)
}

/// Loads the configuration file.
///
/// An explicit `path` must exist.  Without one the default path is used and
/// a missing file yields [`FileConfig::default`].
///
/// # Errors
///
/// Returns [`FileConfigError::Io`] for file-system errors and
/// [`FileConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, FileConfigError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match config_file_path() {
            Ok(path) => (path, false),
            Err(_) => return Ok(FileConfig::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(FileConfig::default())
        }
        Err(source) => Err(FileConfigError::Io { path, source }),
    }
}

/// Resolves the platform config base directory including the `edgeshift`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("edgeshift")
        })
    }

    #[cfg(not(target_os = "macos"))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("edgeshift"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
