//! Where an image goes on a page. Coordinates are PDF points, origin bottom-left.

/// Rectangle an image is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale the image to fit the page preserving aspect ratio, flush with the
/// top edge and centered horizontally. Used for the rendered body.
pub fn fit_top(image_width: f32, image_height: f32, page_width: f32, page_height: f32) -> Placement {
    let scale = (page_width / image_width).min(page_height / image_height);
    let width = image_width * scale;
    let height = image_height * scale;
    Placement {
        x: (page_width - width) / 2.0,
        y: page_height - height,
        width,
        height,
    }
}

/// Center the image at its natural size (1 px = 1 pt), shrinking it only
/// when it does not fit. Used for image attachments.
pub fn centered(image_width: f32, image_height: f32, page_width: f32, page_height: f32) -> Placement {
    let scale = (page_width / image_width)
        .min(page_height / image_height)
        .min(1.0);
    let width = image_width * scale;
    let height = image_height * scale;
    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}
