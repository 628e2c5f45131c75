//! Rasterizer backed by an external HTML-to-image program.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, error};

use crate::config::RenderConfig;
use crate::error::{MailPdfError, Result};

use super::{offscreen_document, RasterImage, Rasterizer, RenderOptions};

/// Runs a configured program (by default `wkhtmltoimage`) on an offscreen
/// document written to a temporary directory, then loads the captured PNG.
///
/// The temporary directory is removed when rasterization returns, whether it
/// succeeded or not.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    program: String,
    args: Vec<String>,
    options: RenderOptions,
}

impl CommandRasterizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, options: RenderOptions) -> Self {
        Self {
            program: program.into(),
            args,
            options,
        }
    }

    pub fn from_config(cfg: &RenderConfig) -> Self {
        Self::new(cfg.command.clone(), cfg.args.clone(), RenderOptions::from(cfg))
    }

    /// Expand `{input}`, `{output}`, `{width}` and `{zoom}` in the argument template.
    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let width = self.options.viewport_width().to_string();
        let zoom = self.options.scale.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{width}", &width)
                    .replace("{zoom}", &zoom)
            })
            .collect()
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&self, html: &str) -> Result<RasterImage> {
        let workdir = tempfile::Builder::new()
            .prefix("mailpdf-render-")
            .tempdir()
            .map_err(|e| MailPdfError::Rasterize(format!("cannot create offscreen directory: {e}")))?;
        let input = workdir.path().join("body.html");
        let output = workdir.path().join("body.png");

        std::fs::write(&input, offscreen_document(html, &self.options))
            .map_err(|e| MailPdfError::io(&input, e))?;

        let args = self.expand_args(&input, &output);
        debug!(program = %self.program, ?args, "Rasterizing body");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                error!(program = %self.program, error = %e, "Failed to start rasterizer");
                MailPdfError::Rasterize(format!("cannot run '{}': {e}", self.program))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!(program = %self.program, status = %result.status, "Rasterizer failed");
            return Err(MailPdfError::Rasterize(format!(
                "'{}' exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        let image = image::open(&output)
            .map_err(|e| MailPdfError::Rasterize(format!("cannot read captured image: {e}")))?
            .to_rgba8();

        if image.width() == 0 || image.height() == 0 {
            return Err(MailPdfError::Rasterize("captured image is empty".into()));
        }

        debug!(
            width = image.width(),
            height = image.height(),
            expected_width = self.options.device_width(),
            "Captured body image"
        );
        Ok(image)
    }
}
