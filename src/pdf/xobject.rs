//! Image XObjects: bitmaps and attached image files as PDF image streams.

use image::{ImageFormat, RgbaImage};
use lopdf::{dictionary, Stream};
use tracing::debug;

use crate::error::Result;

/// An image stream ready to be added to a document, with its pixel size.
pub struct ImageXObject {
    pub stream: Stream,
    pub width: u32,
    pub height: u32,
}

/// Embed a decoded RGBA bitmap. Transparency is flattened onto white.
pub fn from_rgba(image: &RgbaImage) -> ImageXObject {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha)) / 255;
            rgb.push(blended as u8);
        }
    }

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    ImageXObject {
        stream: Stream::new(dict, rgb),
        width,
        height,
    }
}

/// Decode an encoded image file (PNG, JPEG, GIF, BMP) and embed it.
///
/// JPEGs whose frame header declares one or three components are passed
/// through unchanged as `DCTDecode` streams. Four-component (CMYK/YCCK)
/// JPEGs and all other formats are decoded and re-embedded as RGB.
pub fn from_encoded(bytes: &[u8]) -> Result<ImageXObject> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;

    if format == ImageFormat::Jpeg {
        let color_space = match jpeg_components(bytes) {
            Some(1) => Some("DeviceGray"),
            Some(3) => Some("DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            let (width, height) = (decoded.width(), decoded.height());
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            };
            return Ok(ImageXObject {
                stream: Stream::new(dict, bytes.to_vec()).with_compression(false),
                width,
                height,
            });
        }
        debug!(components = ?jpeg_components(bytes), "Re-encoding JPEG as RGB");
    }

    Ok(from_rgba(&decoded.to_rgba8()))
}

/// Component count from the first SOF segment of a JPEG stream.
///
/// Returns `None` if the stream ends or reaches scan data before a frame
/// header, or if the frame is not 8 bits per sample.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes
        while *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos + 1)?;
        pos += 2;
        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]));
        if len < 2 {
            return None;
        }
        // SOF0..SOF15, excluding DHT (C4), JPG (C8) and DAC (CC)
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let precision = *bytes.get(pos + 2)?;
            let components = *bytes.get(pos + 7)?;
            return (precision == 8).then_some(components);
        }
        pos += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_rgba_flattened_on_white() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let xobject = from_rgba(&image);
        assert_eq!(xobject.stream.content, vec![255, 0, 0, 255, 255, 255]);
        assert_eq!((xobject.width, xobject.height), (2, 1));
    }

    #[test]
    fn test_png_is_reencoded_as_rgb() {
        let png = encode(&RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255])), ImageFormat::Png);
        let xobject = from_encoded(&png).unwrap();
        assert_eq!((xobject.width, xobject.height), (3, 2));
        assert_eq!(xobject.stream.content.len(), 3 * 2 * 3);
        assert!(xobject.stream.dict.get(b"Filter").is_err());
    }

    #[test]
    fn test_jpeg_is_passed_through() {
        let rgb = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 100, 50]));
        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        let jpeg = out.into_inner();

        let xobject = from_encoded(&jpeg).unwrap();
        assert_eq!((xobject.width, xobject.height), (8, 4));
        assert_eq!(xobject.stream.content, jpeg);
        assert_eq!(
            xobject.stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
    }

    #[test]
    fn test_grayscale_jpeg_is_passed_through_as_gray() {
        let gray = image::GrayImage::from_pixel(6, 6, image::Luma([90]));
        let mut out = Cursor::new(Vec::new());
        gray.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        let jpeg = out.into_inner();

        let xobject = from_encoded(&jpeg).unwrap();
        assert_eq!(xobject.stream.content, jpeg);
        assert_eq!(
            xobject.stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_cmyk_jpeg_is_reencoded_as_rgb() {
        let cmyk: Vec<u8> = [0u8, 128, 255, 0].repeat(8 * 8);
        let mut jpeg = Vec::new();
        jpeg_encoder::Encoder::new(&mut jpeg, 90)
            .encode(&cmyk, 8, 8, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        assert_eq!(jpeg_components(&jpeg), Some(4));

        let xobject = from_encoded(&jpeg).unwrap();
        assert_eq!((xobject.width, xobject.height), (8, 8));
        assert_ne!(xobject.stream.content, jpeg);
        assert_eq!(xobject.stream.content.len(), 8 * 8 * 3);
        assert!(xobject.stream.dict.get(b"Filter").is_err());
        assert_eq!(
            xobject.stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }

    #[test]
    fn test_jpeg_components_reads_frame_header() {
        // SOI, APP0 stub, SOF2 (progressive) with 3 components
        let header = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC2, 0x00, 0x11, 0x08,
            0x00, 0x10, 0x00, 0x10, 0x03,
        ];
        assert_eq!(jpeg_components(&header), Some(3));
        assert_eq!(jpeg_components(&[0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02]), None);
        assert_eq!(jpeg_components(b"not a jpeg"), None);
        assert_eq!(jpeg_components(&header[..12]), None);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(from_encoded(b"definitely not an image").is_err());
    }
}
