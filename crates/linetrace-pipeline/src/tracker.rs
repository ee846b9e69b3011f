//! Dual 8-neighborhood contour tracker.
//!
//! Starting from a seed point on each track edge near the bottom of the
//! frame, both boundaries are walked upward simultaneously, one
//! neighborhood step at a time. Every accepted step records the visited
//! point and a growth code describing the local boundary direction.
//!
//! # Growth codes
//!
//! The neighbor tables are scanned in adjacent pairs `(i, i+1)`. A step
//! candidate is the *bright* neighbor `i+1` of a dark/bright pair, but
//! the recorded code is `i` -- the index of the **rejected dark
//! neighbor**, one slot before the actual movement. Downstream pattern
//! matching (crossroad detection) is calibrated against these
//! off-by-one codes, so the offset is part of the data contract:
//! the true movement offset for a code is [`movement_offset`].
//!
//! For the left edge (clockwise table): code 3 means the boundary grew
//! straight up, 4 up-and-inward, 1 outward, 7 straight down. The right
//! edge uses the mirrored counter-clockwise table with the same
//! interpretation.

use crate::types::{BRIGHT, DARK, FRAME_H, FRAME_W, Frame};

/// Capacity of each contour point buffer. The walk stops at this many
/// steps regardless of progress.
pub const MAX_POINTS: usize = 3 * FRAME_H;

/// Rows probed for a seed pair, nearest first.
pub const SEED_ROWS: [usize; 3] = [FRAME_H - 3, FRAME_H - 5, FRAME_H - 7];

/// Clockwise neighbor offsets for the left-edge walk, starting straight
/// down: down, down-left, left, up-left, up, up-right, right, down-right.
const LEFT_NEIGHBORS: [[i32; 2]; 8] = [
    [0, 1],
    [-1, 1],
    [-1, 0],
    [-1, -1],
    [0, -1],
    [1, -1],
    [1, 0],
    [1, 1],
];

/// Counter-clockwise neighbor offsets for the right-edge walk, the
/// mirror image of [`LEFT_NEIGHBORS`].
const RIGHT_NEIGHBORS: [[i32; 2]; 8] = [
    [0, 1],
    [1, 1],
    [1, 0],
    [1, -1],
    [0, -1],
    [-1, -1],
    [-1, 0],
    [-1, 1],
];

/// Growth code recorded when an edge grows straight down; used by the
/// walk's left-rollback wait state.
const CODE_DOWNWARD: u8 = 7;

/// A traversal position inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackPoint {
    /// Column, 0 at the left frame edge.
    pub x: u16,
    /// Image row, 0 at the top frame edge.
    pub y: u16,
}

impl TrackPoint {
    /// Create a point from in-frame coordinates.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Which edge a neighbor table or growth code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The track's left boundary (clockwise walk).
    Left,
    /// The track's right boundary (counter-clockwise walk).
    Right,
}

/// The true movement offset `[dx, dy]` for a recorded growth code.
///
/// Growth codes carry the rejected-dark-neighbor index; the accepted
/// step is one table slot further, hence `(code + 1) & 7`.
#[must_use]
pub const fn movement_offset(side: Side, code: u8) -> [i32; 2] {
    let table = match side {
        Side::Left => LEFT_NEIGHBORS,
        Side::Right => RIGHT_NEIGHBORS,
    };
    table[((code + 1) & 7) as usize]
}

/// Scan `row` outward from the frame center for a seed point on each
/// edge: the left seed is the first bright pixel whose left neighbor is
/// dark, the right seed the mirror. Returns `None` unless both exist.
#[must_use]
pub fn find_seed_pair(frame: &Frame, row: usize) -> Option<(TrackPoint, TrackPoint)> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let y = row as i32;
    let center = (FRAME_W / 2) as i32;

    let mut left = None;
    let mut x = center;
    while x >= 1 {
        if frame.get(x, y) == BRIGHT && frame.get(x - 1, y) == DARK {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                left = Some(TrackPoint::new(x as u16, row as u16));
            }
            break;
        }
        x -= 1;
    }

    let mut right = None;
    let mut x = center;
    while x <= i32::from(crate::types::BORDER_MAX) {
        if frame.get(x, y) == BRIGHT && frame.get(x + 1, y) == DARK {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                right = Some(TrackPoint::new(x as u16, row as u16));
            }
            break;
        }
        x += 1;
    }

    match (left, right) {
        (Some(l), Some(r)) => Some((l, r)),
        _ => None,
    }
}

/// Result buffers of one dual contour walk.
///
/// The buffers are fixed-capacity and reused across frames; no
/// allocation happens after construction.
pub struct ContourWalk {
    points_l: [TrackPoint; MAX_POINTS],
    points_r: [TrackPoint; MAX_POINTS],
    codes_l: [u8; MAX_POINTS],
    codes_r: [u8; MAX_POINTS],
    len_l: usize,
    len_r: usize,
    apex_y: u8,
}

impl ContourWalk {
    /// Create empty walk buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points_l: [TrackPoint::new(0, 0); MAX_POINTS],
            points_r: [TrackPoint::new(0, 0); MAX_POINTS],
            codes_l: [0; MAX_POINTS],
            codes_r: [0; MAX_POINTS],
            len_l: 0,
            len_r: 0,
            apex_y: 0,
        }
    }

    /// Reset for a new frame.
    pub const fn clear(&mut self) {
        self.len_l = 0;
        self.len_r = 0;
        self.apex_y = 0;
        self.codes_l = [0; MAX_POINTS];
        self.codes_r = [0; MAX_POINTS];
    }

    /// Ordered left-edge points of the last walk.
    #[must_use]
    pub fn left_points(&self) -> &[TrackPoint] {
        &self.points_l[..self.len_l]
    }

    /// Ordered right-edge points of the last walk.
    #[must_use]
    pub fn right_points(&self) -> &[TrackPoint] {
        &self.points_r[..self.len_r]
    }

    /// Growth codes parallel to [`Self::left_points`].
    #[must_use]
    pub fn left_codes(&self) -> &[u8] {
        &self.codes_l[..self.len_l]
    }

    /// Growth codes parallel to [`Self::right_points`].
    #[must_use]
    pub fn right_codes(&self) -> &[u8] {
        &self.codes_r[..self.len_r]
    }

    /// Image row where the two edges met, if they did (0 otherwise).
    #[must_use]
    pub const fn apex_image_row(&self) -> u8 {
        self.apex_y
    }

    /// Walk both boundaries upward from the seed pair.
    ///
    /// Termination, checked in priority order every step: oscillation
    /// (the same point recorded three times in a row on either side),
    /// the edges meeting within Chebyshev distance 1 (recording the
    /// apex row), or the hard cap of [`MAX_POINTS`] steps. Two wait
    /// states keep the edges roughly level: the right side skips a
    /// step while it is above the left, and the left side rolls back
    /// one point after growing downward while the right is still below.
    pub fn walk(&mut self, frame: &Frame, left_seed: TrackPoint, right_seed: TrackPoint) {
        let mut current_l = left_seed;
        let mut current_r = right_seed;

        let mut budget = MAX_POINTS;
        while budget > 0 {
            budget -= 1;

            // Record the current centers. The left count advances now;
            // the right count advances only after the wait checks.
            self.points_l[self.len_l] = current_l;
            self.len_l += 1;
            self.points_r[self.len_r] = current_r;

            if let Some(next) = step(frame, current_l, &LEFT_NEIGHBORS, &mut self.codes_l[self.len_l - 1]) {
                current_l = next;
            }

            if self.oscillating() {
                log::trace!("contour walk stuck, stopping");
                break;
            }

            let recorded_r = self.points_r[self.len_r];
            let recorded_l = self.points_l[self.len_l - 1];
            if chebyshev_adjacent(recorded_r, recorded_l) {
                self.apex_y = mid_row(recorded_r, recorded_l);
                log::trace!("edges met at image row {}", self.apex_y);
                break;
            }

            // Right side is above the left: let the left catch up.
            if recorded_r.y < recorded_l.y {
                continue;
            }

            // Left side grew downward while the right is still below:
            // roll the left back one point and wait.
            if self.codes_l[self.len_l - 1] == CODE_DOWNWARD && recorded_r.y > recorded_l.y {
                current_l = self.points_l[self.len_l - 1];
                self.len_l -= 1;
            }

            self.len_r += 1;

            if let Some(next) = step(frame, current_r, &RIGHT_NEIGHBORS, &mut self.codes_r[self.len_r - 1]) {
                current_r = next;
            }
        }
    }

    /// Test-only: build a walk from prerecorded point/code pairs.
    #[cfg(test)]
    pub(crate) fn from_recorded(left: &[(TrackPoint, u8)], right: &[(TrackPoint, u8)]) -> Self {
        let mut walk = Self::new();
        for (i, &(point, code)) in left.iter().enumerate() {
            walk.points_l[i] = point;
            walk.codes_l[i] = code;
        }
        walk.len_l = left.len();
        for (i, &(point, code)) in right.iter().enumerate() {
            walk.points_r[i] = point;
            walk.codes_r[i] = code;
        }
        walk.len_r = right.len();
        walk
    }

    /// Either side has produced the same point three times running.
    fn oscillating(&self) -> bool {
        let right = self.len_r >= 2 && {
            let p = self.points_r[self.len_r];
            p == self.points_r[self.len_r - 1] && p == self.points_r[self.len_r - 2]
        };
        let left = self.len_l >= 3 && {
            let p = self.points_l[self.len_l - 1];
            p == self.points_l[self.len_l - 2] && p == self.points_l[self.len_l - 3]
        };
        right || left
    }
}

impl Default for ContourWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContourWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContourWalk")
            .field("left_len", &self.len_l)
            .field("right_len", &self.len_r)
            .field("apex_y", &self.apex_y)
            .finish()
    }
}

/// One neighborhood step: collect every bright neighbor that follows a
/// dark one in table order, recording the dark neighbor's index as the
/// growth code (last candidate's code wins), then pick the candidate
/// with the smallest image row. The first minimal candidate is kept;
/// later ones replace it only when strictly smaller.
fn step(
    frame: &Frame,
    center: TrackPoint,
    neighbors: &[[i32; 2]; 8],
    code: &mut u8,
) -> Option<TrackPoint> {
    let cx = i32::from(center.x);
    let cy = i32::from(center.y);

    let mut best: Option<TrackPoint> = None;
    for i in 0..8 {
        let [dx_a, dy_a] = neighbors[i];
        let [dx_b, dy_b] = neighbors[(i + 1) & 7];
        if frame.get(cx + dx_a, cy + dy_a) == DARK && frame.get(cx + dx_b, cy + dy_b) == BRIGHT {
            // A bright pixel is always in-frame, so the cast is safe.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let candidate = TrackPoint::new((cx + dx_b) as u16, (cy + dy_b) as u16);
            #[allow(clippy::cast_possible_truncation)]
            {
                *code = i as u8;
            }
            match best {
                Some(current) if candidate.y >= current.y => {}
                _ => best = Some(candidate),
            }
        }
    }
    best
}

/// Whether two points are within Chebyshev distance 1 of each other.
fn chebyshev_adjacent(a: TrackPoint, b: TrackPoint) -> bool {
    (i32::from(a.x) - i32::from(b.x)).abs() < 2 && (i32::from(a.y) - i32::from(b.y)).abs() < 2
}

/// Mean image row of two points.
#[allow(clippy::cast_possible_truncation)]
const fn mid_row(a: TrackPoint, b: TrackPoint) -> u8 {
    ((a.y + b.y) >> 1) as u8
}
