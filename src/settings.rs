// src/settings.rs
//
// Persistent user settings, stored as pretty-printed JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::{Frame128Options, TextFormat};

// ============================================================================
// Serial line settings
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port opened by `listen` when none is given on the command line
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
}

fn default_baud_rate() -> u32 {
    115_200
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::None,
        }
    }
}

// ============================================================================
// Export settings
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    #[serde(default = "default_true")]
    pub swap_pairs: bool,
    #[serde(default)]
    pub reverse_nibble: bool,
    #[serde(default)]
    pub invert_bits: bool,
    /// C array on one line rather than the commented block
    #[serde(default = "default_true")]
    pub single_line: bool,
    #[serde(default)]
    pub format: TextFormat,
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            swap_pairs: true,
            reverse_nibble: false,
            invert_bits: false,
            single_line: true,
            format: TextFormat::default(),
        }
    }
}

impl ExportSettings {
    pub fn frame128_options(&self) -> Frame128Options {
        Frame128Options {
            swap_pairs: self.swap_pairs,
            reverse_nibble: self.reverse_nibble,
            invert_bits: self.invert_bits,
        }
    }
}

// ============================================================================
// App settings
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppSettings {
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub serial: SerialSettings,
    /// Directory for timestamped log files; no file logging when unset
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Session logs kept in `log_dir`, the current one included
    #[serde(default = "default_log_keep")]
    pub log_keep: usize,
}

fn default_log_keep() -> usize {
    10
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export: ExportSettings::default(),
            serial: SerialSettings::default(),
            log_dir: None,
            log_keep: default_log_keep(),
        }
    }
}

/// `<config dir>/leddot/settings.json`, falling back to the working directory.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leddot")
        .join("settings.json")
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    if !path.exists() {
        tlog!("[settings] No settings at {}, using defaults", path.display());
        return Ok(AppSettings::default());
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read settings: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings dir: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}
