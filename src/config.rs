//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILPDF_CONFIG` (environment variable)
//! 2. `~/.config/mailpdf/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailpdf\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Millimetres per PDF point (1 pt = 1/72 inch).
const MM_PER_POINT: f32 = 25.4 / 72.0;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Body rasterization settings.
    pub render: RenderConfig,
    /// Output page geometry.
    pub page: PageConfig,
    /// Attachment selection.
    pub attachments: AttachmentsConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Body rasterization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width of the offscreen content box in CSS pixels.
    pub width_px: u32,
    /// Padding around the content box in CSS pixels.
    pub padding_px: u32,
    /// Device scale factor applied when capturing.
    pub scale: f32,
    /// External HTML-to-image program.
    pub command: String,
    /// Arguments for `command`. `{input}`, `{output}`, `{width}` and `{zoom}`
    /// are substituted before the program runs.
    pub args: Vec<String>,
}

/// Output page geometry, in millimetres.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Attachment selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    /// Also append attachments marked `Content-Disposition: inline`.
    pub include_inline: bool,
    /// Replace `cid:` references in the body with `data:` URIs before rendering.
    pub inline_cid_images: bool,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name of the produced PDF file.
    pub filename: String,
    /// Default output directory (current directory if unset).
    pub output_dir: Option<PathBuf>,
    /// Replace an existing file instead of picking a numbered name.
    pub overwrite: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width_px: 800,
            padding_px: 10,
            scale: 2.0,
            command: "wkhtmltoimage".to_string(),
            args: [
                "--quiet", "--format", "png", "--width", "{width}", "--zoom", "{zoom}",
                "{input}", "{output}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        // A4 portrait
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            include_inline: true,
            inline_cid_images: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename: crate::export::DEFAULT_FILENAME.to_string(),
            output_dir: None,
            overwrite: false,
        }
    }
}

impl PageConfig {
    /// Page size in PDF points.
    pub fn size_points(&self) -> (f32, f32) {
        (self.width_mm / MM_PER_POINT, self.height_mm / MM_PER_POINT)
    }
}

impl Config {
    /// Reject values that would make the pipeline produce nonsense.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::MailPdfError;

        if self.render.width_px == 0 {
            return Err(MailPdfError::InvalidConfig(
                "render.width_px must be greater than zero".into(),
            ));
        }
        if !(self.render.scale > 0.0) {
            return Err(MailPdfError::InvalidConfig(
                "render.scale must be positive".into(),
            ));
        }
        if self.render.command.trim().is_empty() {
            return Err(MailPdfError::InvalidConfig(
                "render.command must not be empty".into(),
            ));
        }
        if !(self.page.width_mm > 0.0 && self.page.height_mm > 0.0) {
            return Err(MailPdfError::InvalidConfig(
                "page dimensions must be positive".into(),
            ));
        }
        if self.export.filename.trim().is_empty() || self.export.filename.contains(['/', '\\']) {
            return Err(MailPdfError::InvalidConfig(format!(
                "export.filename is not a plain file name: '{}'",
                self.export.filename
            )));
        }
        Ok(())
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILPDF_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailpdf").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpdf")
}
