//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Returns the default path for the relay configuration file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/librelay/config.toml`
/// - Fallback: `/etc/librelay/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("librelay")
        .join("config.toml")
}
