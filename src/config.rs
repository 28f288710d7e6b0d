// src/config.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Vendor/product identifier pair reported by the Seeed Wio Terminal's USB
/// serial endpoint.
pub const WIO_VID: u16 = 10374;
pub const WIO_PID: u16 = 32813;

/// Fixed operating constants, overridable through an optional JSON file next
/// to the binary. Unknown or missing fields fall back to the defaults below.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub baud_rate: u32,
    pub capture_duration_ms: i64,
    pub field_count: usize,
    pub read_timeout_ms: u64,
    /// Hard deadline for one capture call. Keeps a silent or garbage-only
    /// device from blocking the shell past this bound.
    pub capture_wall_timeout_ms: u64,
    pub smoothing_window: usize,
    pub smoothing_poly_order: usize,
    pub base_folder: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            capture_duration_ms: 2_500,
            field_count: 6,
            read_timeout_ms: 100,
            capture_wall_timeout_ms: 10_000,
            smoothing_window: 11,
            smoothing_poly_order: 3,
            base_folder: PathBuf::from("samples"),
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// A missing file is the normal first-run case; a malformed one is worth a
    /// warning but never blocks startup.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("falling back to default config: {e:#}");
                Self::default()
            }
        }
    }
}
