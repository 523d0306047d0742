mod company;
mod state;

pub use company::{CaptureSettings, Company, Config, ExportSettings, InvoiceSettings};
pub use state::State;

use crate::error::{RentalError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get the config directory path (XDG config dir, falling back to ~/.rental/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rental") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        RentalError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".rental"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the configured output directory; relative paths live under the config dir
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let path = expand_path(output_dir);
    if path.is_relative() {
        cfg_dir.join(path)
    } else {
        path
    }
}

/// Fail early with a hint when the config directory was never initialized
pub fn ensure_initialized(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        Ok(())
    } else {
        Err(RentalError::ConfigNotFound(cfg_dir.to_path_buf()))
    }
}

/// Load and validate config.toml
pub fn load_config(cfg_dir: &Path) -> Result<Config> {
    let path = cfg_dir.join("config.toml");
    if !path.exists() {
        return Err(RentalError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let config: Config =
        toml::from_str(&content).map_err(|e| RentalError::ConfigParse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// Load state.toml (empty state if missing)
pub fn load_state(cfg_dir: &Path) -> Result<State> {
    let path = cfg_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    let content = fs::read_to_string(&path)?;
    let state: State =
        toml::from_str(&content).map_err(|e| RentalError::ConfigParse { path, source: e })?;
    debug!(orders = state.orders.len(), "loaded state");
    Ok(state)
}

/// Save state.toml
pub fn save_state(cfg_dir: &Path, state: &State) -> Result<()> {
    let path = cfg_dir.join("state.toml");
    let content = toml::to_string_pretty(state)?;
    fs::write(&path, content)?;
    debug!(orders = state.orders.len(), path = %path.display(), "saved state");
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r##"[company]
name = "Your Rental Company"
address = "Jl. Asia Afrika 8"
city = "Bandung"
# phone = "+62 22 123 4567"      # optional
# email = "hello@yourrental.com"  # optional
# logo = "/path/to/logo.png"      # optional, needs allow_external_assets

[invoice]
currency = "IDR"
currency_symbol = "Rp "
# payment_note = "Transfer to BCA 123-456-7890"   # optional

[export]
page_width = 210.0    # A4
page_height = 297.0
unit = "mm"           # "mm" or "pt"
output_dir = "output" # relative to this directory, or absolute / ~/...

[export.capture]
scale = 2.0                      # pixel density multiplier over 96 dpi
allow_external_assets = false    # allow files outside the render workspace (e.g. logo)
background_color = "#ffffff"
"##;
