use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RentalError, Result};
use crate::export::Unit;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: Company,
    pub invoice: InvoiceSettings,
    pub export: ExportSettings,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.export.validate()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Image shown in the invoice header
    #[serde(default)]
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InvoiceSettings {
    pub currency: String,
    pub currency_symbol: String,
    #[serde(default)]
    pub payment_note: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    pub page_width: f64,
    pub page_height: f64,
    #[serde(default)]
    pub unit: Unit,
    pub output_dir: String,
    #[serde(default)]
    pub capture: CaptureSettings,
}

impl ExportSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("export.page_width", self.page_width),
            ("export.page_height", self.page_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RentalError::InvalidConfig(format!(
                    "{name} must be a positive number (got {value})"
                )));
            }
        }
        self.capture.validate()
    }
}

/// Options for rasterising the invoice before it is paginated
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Pixel density multiplier over 96 dpi
    pub scale: f64,
    /// Let the invoice reference files outside its own render workspace
    #[serde(default)]
    pub allow_external_assets: bool,
    /// Page fill as `#rrggbb`
    pub background_color: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            scale: 2.0,
            allow_external_assets: false,
            background_color: "#ffffff".to_string(),
        }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(RentalError::InvalidConfig(format!(
                "export.capture.scale must be a positive number (got {})",
                self.scale
            )));
        }
        if !is_hex_color(&self.background_color) {
            return Err(RentalError::InvalidConfig(format!(
                "export.capture.background_color must look like #rrggbb (got '{}')",
                self.background_color
            )));
        }
        Ok(())
    }

    pub fn ppi(&self) -> f64 {
        96.0 * self.scale
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
