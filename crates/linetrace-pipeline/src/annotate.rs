//! Frame edge masking and marker overlay.
//!
//! The overlay writes small marker values -- distinct from the binary
//! 0/255 payload -- into a copy of the cleaned frame. A display shell
//! maps them to colors; nothing in the pipeline reads them back.

use crate::border::Borders;
use crate::tracker::ContourWalk;
use crate::types::{DARK, FRAME_H, FRAME_W, Frame};

/// Marker for raw left-edge contour points.
pub const MARK_LEFT_CONTOUR: u8 = 1;

/// Marker for raw right-edge contour points.
pub const MARK_RIGHT_CONTOUR: u8 = 2;

/// Marker for the synthesized centerline.
pub const MARK_CENTER: u8 = 3;

/// Marker for the extracted (and possibly fixed) left border.
pub const MARK_LEFT_BORDER: u8 = 4;

/// Marker for the extracted (and possibly fixed) right border.
pub const MARK_RIGHT_BORDER: u8 = 5;

/// Black out one pixel of frame edge: both side columns and the top
/// row. The contour walk can then never step outside the frame, and
/// seed scanning always terminates on a dark pixel.
pub fn mask_frame_edges(frame: &mut Frame) {
    for y in 0..FRAME_H {
        frame.put(0, y, DARK);
        frame.put(FRAME_W - 1, y, DARK);
    }
    for x in 0..FRAME_W {
        frame.put(x, 0, DARK);
    }
}

/// Draw contour points, borders and the centerline into `frame`.
///
/// Contour points are plotted at their image coordinates; border and
/// centerline rows are flipped back from bottom-up border indexing.
pub fn draw_overlay(frame: &mut Frame, walk: &ContourWalk, borders: &Borders) {
    for p in walk.left_points() {
        frame.put(usize::from(p.x), usize::from(p.y), MARK_LEFT_CONTOUR);
    }
    for p in walk.right_points() {
        frame.put(usize::from(p.x), usize::from(p.y), MARK_RIGHT_CONTOUR);
    }
    for row in 0..FRAME_H {
        let image_row = FRAME_H - 1 - row;
        frame.put(usize::from(borders.center[row]), image_row, MARK_CENTER);
        frame.put(usize::from(borders.left[row]), image_row, MARK_LEFT_BORDER);
        frame.put(usize::from(borders.right[row]), image_row, MARK_RIGHT_BORDER);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tracker::TrackPoint;
    use crate::types::BRIGHT;

    #[test]
    fn mask_blacks_sides_and_top() {
        let mut frame = Frame::new();
        for y in 0..FRAME_H {
            for x in 0..FRAME_W {
                frame.put(x, y, BRIGHT);
            }
        }
        mask_frame_edges(&mut frame);
        for y in 0..FRAME_H {
            assert_eq!(frame.get(0, y as i32), DARK);
            assert_eq!(frame.get((FRAME_W - 1) as i32, y as i32), DARK);
        }
        for x in 0..FRAME_W {
            assert_eq!(frame.get(x as i32, 0), DARK);
        }
        // The bottom row stays untouched: seed rows live near it.
        assert_eq!(frame.get(5, (FRAME_H - 1) as i32), BRIGHT);
    }

    #[test]
    fn overlay_marks_contour_points_in_image_coordinates() {
        let mut frame = Frame::new();
        let mut walk = ContourWalk::new();
        walk.walk(&frame, TrackPoint::new(10, 20), TrackPoint::new(30, 20));
        // Degenerate walk on a dark frame still records seed points.
        let borders = Borders::new();
        draw_overlay(&mut frame, &walk, &borders);
        assert_eq!(frame.get(10, 20), MARK_LEFT_CONTOUR);
    }

    #[test]
    fn overlay_flips_border_rows() {
        let mut frame = Frame::new();
        let walk = ContourWalk::new();
        let mut borders = Borders::new();
        borders.center[0] = 94;
        draw_overlay(&mut frame, &walk, &borders);
        // Border row 0 is the bottom image row.
        assert_eq!(frame.get(94, (FRAME_H - 1) as i32), MARK_CENTER);
    }

    #[test]
    fn overlay_stays_in_frame_for_sentinel_rows() {
        let mut frame = Frame::new();
        let walk = ContourWalk::new();
        let borders = Borders::new();
        // All rows lost: sentinel columns must still plot in-frame.
        draw_overlay(&mut frame, &walk, &borders);
        for row in 0..FRAME_H {
            let image_row = (FRAME_H - 1 - row) as i32;
            assert_eq!(frame.get(1, image_row), MARK_LEFT_BORDER);
            assert_eq!(frame.get(186, image_row), MARK_RIGHT_BORDER);
        }
    }
}
