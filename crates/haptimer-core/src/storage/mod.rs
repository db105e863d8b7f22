mod config;
mod presets;

pub use config::{Config, HapticsConfig, TimerConfig};
pub use presets::{PointRecord, PresetStore, TimerRecord};

use std::path::PathBuf;

/// Returns `~/.config/haptimer[-dev]/` based on HAPTIMER_ENV.
///
/// Set HAPTIMER_ENV=dev to use development data directory.
/// Set HAPTIMER_HOME to replace `~/.config` as the base directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = match std::env::var_os("HAPTIMER_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };

    let env = std::env::var("HAPTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("haptimer-dev")
    } else {
        base_dir.join("haptimer")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
