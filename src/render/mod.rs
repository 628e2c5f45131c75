//! Body rasterization: HTML in, bitmap out.
//!
//! The HTML is laid out in an offscreen document with a fixed content width
//! and captured at a device scale factor. The capture itself is delegated to
//! a [`Rasterizer`] implementation.

pub mod command;

use crate::config::RenderConfig;
use crate::error::Result;

/// Bitmap produced from the email body.
pub type RasterImage = image::RgbaImage;

/// Renders an HTML fragment to a bitmap.
pub trait Rasterizer {
    fn rasterize(&self, html: &str) -> Result<RasterImage>;
}

/// Geometry of the offscreen document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Content box width in CSS pixels.
    pub width_px: u32,
    /// Padding on every side in CSS pixels.
    pub padding_px: u32,
    /// Device pixels per CSS pixel.
    pub scale: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(cfg: &RenderConfig) -> Self {
        Self {
            width_px: cfg.width_px,
            padding_px: cfg.padding_px,
            scale: cfg.scale,
        }
    }
}

impl RenderOptions {
    /// Viewport width in CSS pixels: content plus padding on both sides.
    pub fn viewport_width(&self) -> u32 {
        self.width_px + 2 * self.padding_px
    }

    /// Expected width of the captured bitmap in device pixels.
    pub fn device_width(&self) -> u32 {
        (self.viewport_width() as f32 * self.scale).round() as u32
    }
}

/// Wrap an HTML fragment in a standalone document sized for capture.
pub fn offscreen_document(html: &str, options: &RenderOptions) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
<style>html,body{{margin:0;padding:0;background:#fff;}}</style>\n</head>\n<body>\n\
<div style=\"box-sizing:content-box;width:{}px;padding:{}px;\">\n{}\n</div>\n</body>\n</html>\n",
        options.width_px, options.padding_px, html
    )
}
