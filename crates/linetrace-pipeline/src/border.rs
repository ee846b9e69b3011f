//! Per-row border extraction and centerline synthesis.
//!
//! The tracker produces ordered boundary points in image coordinates
//! (row 0 at the top). Border arrays are indexed bottom-up -- row 0
//! nearest the robot -- so extraction flips each point's row with
//! `FRAME_H - 1 - y`. Rows that receive no point keep their sentinel
//! column and stay flagged lost; loss is data for the steering
//! controller, not an error.

use crate::tracker::TrackPoint;
use crate::types::{BORDER_MAX, BORDER_MIN, BorderArray, FRAME_H, LostArray};

/// Border state for one frame: per-row columns, lost flags and loss
/// counters for both edges plus the synthesized centerline.
#[derive(Debug, Clone)]
pub struct Borders {
    /// Left edge column per row; [`BORDER_MIN`] when lost.
    pub left: BorderArray,
    /// Right edge column per row; [`BORDER_MAX`] when lost.
    pub right: BorderArray,
    /// Centerline column per row.
    pub center: BorderArray,
    /// Per-row left loss flags.
    pub left_lost: LostArray,
    /// Per-row right loss flags.
    pub right_lost: LostArray,
    /// Number of rows with no left boundary point this frame.
    pub left_lost_rows: u8,
    /// Number of rows with no right boundary point this frame.
    pub right_lost_rows: u8,
}

impl Borders {
    /// Create fully-lost borders (every row at its sentinel).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: [BORDER_MIN; FRAME_H],
            right: [BORDER_MAX; FRAME_H],
            center: [0; FRAME_H],
            left_lost: [true; FRAME_H],
            right_lost: [true; FRAME_H],
            left_lost_rows: FRAME_H as u8,
            right_lost_rows: FRAME_H as u8,
        }
    }

    /// Collapse the left point sequence into per-row columns.
    ///
    /// Keeps the *rightmost* column seen per row -- the point nearest
    /// the track center is the reliable one when the walk doubled back
    /// -- and clears the lost flag for every row that received a point.
    pub fn extract_left(&mut self, points: &[TrackPoint]) {
        self.left = [BORDER_MIN; FRAME_H];
        self.left_lost = [true; FRAME_H];

        for p in points {
            let row = FRAME_H - 1 - usize::from(p.y);
            #[allow(clippy::cast_possible_truncation)]
            let col = p.x as u8;
            if self.left_lost[row] || col > self.left[row] {
                self.left[row] = col;
                self.left_lost[row] = false;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            self.left_lost_rows = self.left_lost.iter().filter(|&&lost| lost).count() as u8;
        }
    }

    /// Collapse the right point sequence into per-row columns, keeping
    /// the *leftmost* column seen per row.
    pub fn extract_right(&mut self, points: &[TrackPoint]) {
        self.right = [BORDER_MAX; FRAME_H];
        self.right_lost = [true; FRAME_H];

        for p in points {
            let row = FRAME_H - 1 - usize::from(p.y);
            #[allow(clippy::cast_possible_truncation)]
            let col = p.x as u8;
            if self.right_lost[row] || col < self.right[row] {
                self.right[row] = col;
                self.right_lost[row] = false;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            self.right_lost_rows = self.right_lost.iter().filter(|&&lost| lost).count() as u8;
        }
    }

    /// Synthesize the centerline as the per-row midpoint of the two
    /// borders. Rows lost on both sides produce sentinel-derived
    /// values; the topmost row is left untouched.
    pub fn compute_center(&mut self) {
        for row in 0..FRAME_H - 1 {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.center[row] =
                    ((u16::from(self.left[row]) + u16::from(self.right[row])) >> 1) as u8;
            }
        }
    }
}

impl Default for Borders {
    fn default() -> Self {
        Self::new()
    }
}

/// Least-squares line fit over border rows `start..end`, returning
/// `(slope, intercept)` of `column = slope * row + intercept`.
///
/// A fit over fewer than two rows is degenerate and reports slope 0
/// through the mean column, so callers extrapolate a horizontal line
/// instead of garbage.
#[must_use]
pub fn linear_fit(border: &BorderArray, start: usize, end: usize) -> (f32, f32) {
    let mut x_sum = 0.0f32;
    let mut y_sum = 0.0f32;
    let mut xy_sum = 0.0f32;
    let mut x2_sum = 0.0f32;
    let mut n = 0.0f32;

    for row in start..end.min(FRAME_H) {
        #[allow(clippy::cast_precision_loss)]
        let x = row as f32;
        let y = f32::from(border[row]);
        x_sum += x;
        y_sum += y;
        xy_sum += x * y;
        x2_sum += x * x;
        n += 1.0;
    }

    if n < 1.0 {
        return (0.0, 0.0);
    }

    let denominator = n * x2_sum - x_sum * x_sum;
    let slope = if denominator.abs() > f32::EPSILON {
        (n * xy_sum - x_sum * y_sum) / denominator
    } else {
        0.0
    };
    let intercept = (y_sum - slope * x_sum) / n;
    (slope, intercept)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_borders_are_fully_lost() {
        let borders = Borders::new();
        assert!(borders.left_lost.iter().all(|&l| l));
        assert!(borders.right_lost.iter().all(|&l| l));
        assert_eq!(borders.left_lost_rows as usize, FRAME_H);
        assert_eq!(borders.right_lost_rows as usize, FRAME_H);
    }

    #[test]
    fn extraction_flips_image_rows() {
        let mut borders = Borders::new();
        // A point on image row FRAME_H-3 lands on border row 2.
        borders.extract_left(&[TrackPoint::new(64, (FRAME_H - 3) as u16)]);
        assert!(!borders.left_lost[2]);
        assert_eq!(borders.left[2], 64);
        assert_eq!(borders.left_lost_rows as usize, FRAME_H - 1);
    }

    #[test]
    fn left_keeps_rightmost_point_per_row() {
        let mut borders = Borders::new();
        let y = (FRAME_H - 10) as u16;
        borders.extract_left(&[
            TrackPoint::new(60, y),
            TrackPoint::new(70, y),
            TrackPoint::new(65, y),
        ]);
        assert_eq!(borders.left[9], 70);
    }

    #[test]
    fn right_keeps_leftmost_point_per_row() {
        let mut borders = Borders::new();
        let y = (FRAME_H - 10) as u16;
        borders.extract_right(&[
            TrackPoint::new(130, y),
            TrackPoint::new(120, y),
            TrackPoint::new(125, y),
        ]);
        assert_eq!(borders.right[9], 120);
    }

    #[test]
    fn sentinel_column_point_still_clears_lost_flag() {
        let mut borders = Borders::new();
        // A genuine boundary point at the sentinel column must count.
        borders.extract_left(&[TrackPoint::new(u16::from(BORDER_MIN), 50)]);
        let row = FRAME_H - 1 - 50;
        assert!(!borders.left_lost[row]);
        assert_eq!(borders.left[row], BORDER_MIN);
    }

    #[test]
    fn lost_rows_keep_sentinels() {
        let mut borders = Borders::new();
        borders.extract_left(&[TrackPoint::new(64, 100)]);
        borders.extract_right(&[TrackPoint::new(124, 100)]);
        for row in 0..FRAME_H {
            if borders.left_lost[row] {
                assert_eq!(borders.left[row], BORDER_MIN);
            }
            if borders.right_lost[row] {
                assert_eq!(borders.right[row], BORDER_MAX);
            }
        }
    }

    #[test]
    fn center_is_bracketed_by_borders() {
        let mut borders = Borders::new();
        let points_l: Vec<_> = (10..FRAME_H - 2)
            .map(|y| TrackPoint::new(60, y as u16))
            .collect();
        let points_r: Vec<_> = (10..FRAME_H - 2)
            .map(|y| TrackPoint::new(130, y as u16))
            .collect();
        borders.extract_left(&points_l);
        borders.extract_right(&points_r);
        borders.compute_center();
        for row in 0..FRAME_H - 1 {
            if !borders.left_lost[row] && !borders.right_lost[row] {
                assert!(borders.left[row] <= borders.center[row]);
                assert!(borders.center[row] <= borders.right[row]);
                assert_eq!(borders.center[row], 95);
            }
        }
    }

    #[test]
    fn center_uses_wide_arithmetic() {
        let mut borders = Borders::new();
        borders.left[0] = 180;
        borders.right[0] = 186;
        borders.compute_center();
        // 180 + 186 overflows u8; the midpoint must still be exact.
        assert_eq!(borders.center[0], 183);
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let mut border = [0u8; FRAME_H];
        for (row, value) in border.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *value = (2 * row + 10).min(255) as u8;
            }
        }
        let (slope, intercept) = linear_fit(&border, 20, 60);
        assert!((slope - 2.0).abs() < 1e-3, "slope {slope}");
        assert!((intercept - 10.0).abs() < 0.2, "intercept {intercept}");
    }

    #[test]
    fn linear_fit_degenerate_range_is_flat() {
        let border = [42u8; FRAME_H];
        let (slope, intercept) = linear_fit(&border, 10, 10);
        assert!(slope.abs() < f32::EPSILON);
        assert!(intercept.abs() < f32::EPSILON);

        let (slope, intercept) = linear_fit(&border, 10, 11);
        assert!(slope.abs() < f32::EPSILON);
        assert!((intercept - 42.0).abs() < f32::EPSILON);
    }
}
