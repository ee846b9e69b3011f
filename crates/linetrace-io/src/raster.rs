//! Raster conversion: image files to frames, annotated frames to RGBA.

use image::{ImageEncoder, Rgba, RgbaImage};
use linetrace_pipeline::annotate::{
    MARK_CENTER, MARK_LEFT_BORDER, MARK_LEFT_CONTOUR, MARK_RIGHT_BORDER, MARK_RIGHT_CONTOUR,
};
use linetrace_pipeline::{BRIGHT, DARK, FRAME_H, FRAME_W, Frame};

/// Errors from decoding captured images or encoding annotated output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The input byte buffer was empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image format could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The decoded image does not match the fixed camera geometry.
    #[error("image is {width}x{height}, expected {expected_w}x{expected_h}")]
    Dimensions {
        /// Decoded image width.
        width: u32,
        /// Decoded image height.
        height: u32,
        /// Required width.
        expected_w: u32,
        /// Required height.
        expected_h: u32,
    },

    /// PNG encoding of the annotated frame failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),
}

/// Decode image bytes (PNG, JPEG, BMP) into a binary [`Frame`].
///
/// The image is converted to grayscale and thresholded: values above
/// 127 become bright, everything else dark.
///
/// # Errors
///
/// Returns [`IoError::EmptyInput`] for an empty buffer,
/// [`IoError::Decode`] for an unrecognized format, and
/// [`IoError::Dimensions`] when the image is not exactly the fixed
/// camera geometry.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, IoError> {
    if bytes.is_empty() {
        return Err(IoError::EmptyInput);
    }
    let gray = image::load_from_memory(bytes)?.to_luma8();
    if gray.width() != FRAME_W as u32 || gray.height() != FRAME_H as u32 {
        return Err(IoError::Dimensions {
            width: gray.width(),
            height: gray.height(),
            expected_w: FRAME_W as u32,
            expected_h: FRAME_H as u32,
        });
    }
    // The frame constructor applies the >127 threshold; the length is
    // correct by construction here.
    Frame::from_raw(gray.as_raw()).map_err(|_| IoError::Dimensions {
        width: gray.width(),
        height: gray.height(),
        expected_w: FRAME_W as u32,
        expected_h: FRAME_H as u32,
    })
}

/// Color for a marker or payload value in the annotated frame.
const fn marker_color(value: u8) -> Rgba<u8> {
    match value {
        DARK => Rgba([16, 16, 16, 255]),
        BRIGHT => Rgba([235, 235, 235, 255]),
        MARK_LEFT_CONTOUR => Rgba([220, 60, 60, 255]),
        MARK_RIGHT_CONTOUR => Rgba([70, 110, 230, 255]),
        MARK_CENTER => Rgba([60, 190, 90, 255]),
        MARK_LEFT_BORDER => Rgba([235, 200, 60, 255]),
        MARK_RIGHT_BORDER => Rgba([70, 200, 220, 255]),
        // Unknown payload: loud magenta so it cannot be missed.
        _ => Rgba([255, 0, 255, 255]),
    }
}

/// Render an annotated frame to RGBA, mapping marker values to colors.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn render_annotated(frame: &Frame) -> RgbaImage {
    RgbaImage::from_fn(FRAME_W as u32, FRAME_H as u32, |x, y| {
        marker_color(frame.get(x as i32, y as i32))
    })
}

/// Render an annotated frame and encode it as PNG bytes.
///
/// # Errors
///
/// Returns [`IoError::PngEncode`] if PNG encoding fails.
pub fn encode_annotated_png(frame: &Frame) -> Result<Vec<u8>, IoError> {
    let rgba = render_annotated(frame);
    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
    encoder
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| IoError::PngEncode(e.to_string()))?;
    Ok(bytes)
}
