//! Ring (roundabout) navigation: maneuver phases, geometric detectors
//! and the border line fixes that keep the centerline drivable while
//! the real boundary data is invalid.
//!
//! A left-hand ring is driven in six phases. Every transition is
//! guarded by multi-row predicates over the current border arrays and
//! lost flags; a predicate whose rows are lost simply does not fire
//! that frame, and the phase is re-evaluated on the next one. The state
//! persists across frames and is only cleared by [`RingState::reset`]
//! or by completing the maneuver.
//!
//! Row coordinates here are border rows (bottom-up); probes into the
//! raw camera frame convert back with `FRAME_H - 1 - row`.

use serde::{Deserialize, Serialize};

use crate::border::Borders;
use crate::types::{BRIGHT, DARK, FRAME_H, FRAME_W, Frame};

/// Sentinel for "row anchor not set": one past the last border row.
pub const ROW_UNSET: u8 = FRAME_H as u8;

/// Nearest border row the detectors scan.
const SCAN_NEAR: usize = 20;

/// Farthest border row the detectors scan.
const SCAN_FAR: usize = 100;

/// First border row touched by the line fix.
const FIX_NEAR: usize = 1;

/// Maneuver phase of the ring navigation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RingPhase {
    /// Plain line following; watching for an entry corner.
    #[default]
    Idle,
    /// Ring-entry corner detected and confirmed.
    CornerDetected,
    /// Turning into the ring along the synthesized entry ray.
    Entering,
    /// Committed to the ring; inner border is synthesized.
    Traversing,
    /// Exit geometry spotted; steering toward the exit ray.
    PreparingExit,
    /// Leaving the ring; the entry mouth is sealed off.
    Exiting,
}

/// Persistent ring-navigation state ("watch" block).
///
/// Row anchors are border rows with [`ROW_UNSET`] as the not-set
/// sentinel; column anchors are frame columns. The loss counters are
/// refreshed from the border extractor every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingState {
    /// Current maneuver phase.
    pub phase: RingPhase,
    /// Row of the confirmed outer entry corner.
    pub entry_corner_row: u8,
    /// Row of the entry arc's local apex.
    pub apex_row: u8,
    /// Row of the inner entry corner, re-grabbed every frame while
    /// entering.
    pub inner_corner_row: u8,
    /// Column of the inner entry corner.
    pub inner_corner_col: u8,
    /// Right border column latched when exit preparation begins.
    pub exit_turn_col: u8,
    /// Row of the detected exit corner.
    pub exit_corner_row: u8,
    /// Top column of the most recent synthesized seal line.
    pub seal_top_col: u8,
    /// Rows with no left boundary point this frame.
    pub left_lost_rows: u8,
    /// Rows with no right boundary point this frame.
    pub right_lost_rows: u8,
}

impl Default for RingState {
    fn default() -> Self {
        Self {
            phase: RingPhase::Idle,
            entry_corner_row: ROW_UNSET,
            apex_row: ROW_UNSET,
            inner_corner_row: ROW_UNSET,
            inner_corner_col: 0,
            exit_turn_col: 0,
            exit_corner_row: ROW_UNSET,
            seal_top_col: 0,
            left_lost_rows: FRAME_H as u8,
            right_lost_rows: FRAME_H as u8,
        }
    }
}

impl RingState {
    /// Fresh idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop back to [`RingPhase::Idle`] and clear every anchor.
    pub fn reset(&mut self) {
        let lost = (self.left_lost_rows, self.right_lost_rows);
        *self = Self::default();
        (self.left_lost_rows, self.right_lost_rows) = lost;
    }

    /// Run every detector and transition for the current frame.
    ///
    /// `raw` is the unfiltered camera frame; two detectors probe it
    /// directly because morphology can shave the corner pixels they
    /// look for.
    pub fn update(&mut self, borders: &Borders, raw: &Frame) {
        let phase_before = self.phase;

        self.detect_entry_corner(borders, raw);
        self.detect_apex(borders);
        self.detect_inner_corner(borders, raw);
        self.begin_turn();
        self.commit_traversal();
        self.prepare_exit(borders);
        self.detect_exit_corner(borders, raw);
        self.begin_exit();
        self.finish();

        if self.phase != phase_before {
            log::debug!("ring phase {phase_before:?} -> {:?}", self.phase);
        }
    }

    /// Scan for the ring's outer entry corner: the left border drops
    /// sharply over a few rows while the right border stays valid all
    /// around. A hit is immediately counter-checked by
    /// [`Self::confirm_entry`].
    fn detect_entry_corner(&mut self, b: &Borders, raw: &Frame) {
        if self.phase != RingPhase::Idle {
            return;
        }
        let lb = |row: usize| i32::from(b.left[row]);
        for y in SCAN_NEAR..SCAN_FAR {
            let sharp_drop =
                b.left_lost[y + 1] || lb(y) - lb(y + 1) >= 5 * (lb(y + 1) - lb(y + 2));
            if sharp_drop
                && !b.left_lost[y - 2]
                && !b.left_lost[y - 1]
                && !b.left_lost[y]
                && (y - 5..=y + 5).all(|row| !b.right_lost[row])
                && lb(y) - lb(y + 4) > 10
                && y < usize::from(self.entry_corner_row)
                && y < 75
            {
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.entry_corner_row = y as u8;
                }
                self.confirm_entry(b, raw);
                break;
            }
        }
    }

    /// Counter-check an entry-corner candidate: the right border must
    /// be regular (a crossroad disturbs both sides) and the column
    /// under the corner must be almost free of dark pixels in the raw
    /// frame (a glare artifact is not). Failure clears the anchor.
    fn confirm_entry(&mut self, b: &Borders, raw: &Frame) {
        let mut irregular = 0u32;
        for y in SCAN_NEAR..95 {
            let near = i32::from(b.right[y]);
            let far = i32::from(b.right[y + 2]);
            if far - near > 2 || near - far > 4 {
                irregular += 1;
            }
        }

        if irregular < 3 {
            let corner = usize::from(self.entry_corner_row);
            let col = i32::from(b.left[corner]);
            let mut dark = 0u32;
            let mut y = corner;
            while y > SCAN_NEAR {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let image_row = (FRAME_H - 1 - y) as i32;
                if raw.get(col, image_row) == DARK {
                    dark += 1;
                }
                y -= 1;
            }
            if dark < 10 {
                self.phase = RingPhase::CornerDetected;
                log::debug!(
                    "ring entry corner confirmed at row {}",
                    self.entry_corner_row
                );
                return;
            }
        }

        self.entry_corner_row = ROW_UNSET;
    }

    /// Scan for the entry arc's apex: a valid local maximum of the
    /// left border within a +-3-row window.
    fn detect_apex(&mut self, b: &Borders) {
        if !matches!(self.phase, RingPhase::CornerDetected | RingPhase::Entering) {
            return;
        }
        for y in SCAN_NEAR..SCAN_FAR {
            if y < usize::from(self.inner_corner_row)
                && self.entry_corner_row < 65
                && y < usize::from(self.apex_row)
                && (1..=3usize).all(|d| !b.left_lost[y + d] && !b.left_lost[y - d])
                && (1..=3usize).all(|d| b.left[y + d] <= b.left[y] && b.left[y - d] <= b.left[y])
            {
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.apex_row = y as u8;
                }
                break;
            }
        }
    }

    /// Scan top-down for the ring's inner entry corner, then keep
    /// re-grabbing it each frame so the entry ray stays anchored while
    /// the corner slides down the view.
    fn detect_inner_corner(&mut self, b: &Borders, raw: &Frame) {
        if !matches!(self.phase, RingPhase::CornerDetected | RingPhase::Entering) {
            return;
        }
        if self.inner_corner_row == ROW_UNSET {
            let lb = |row: usize| i32::from(b.left[row]);
            for y in (SCAN_NEAR + 1..=SCAN_FAR).rev() {
                if y > 60
                    && y < SCAN_FAR - 2
                    && y > usize::from(self.apex_row)
                    && !b.left_lost[y + 1]
                    && !b.left_lost[y]
                    && !b.left_lost[y - 4]
                    && b.left[y + 1] > 30
                    && lb(y + 1) - lb(y) <= 2
                    && lb(y) - lb(y - 4) > lb(y) / 2
                {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        self.inner_corner_row = y as u8;
                    }
                    self.inner_corner_col = b.left[y];
                    break;
                }
            }
        }

        if self.inner_corner_row != ROW_UNSET && self.inner_corner_row > 50 {
            self.track_corner_down(raw);
        }
    }

    /// Follow the inner corner downward through the raw frame: descend
    /// the corner column to its dark tip, slide right to the dark/bright
    /// boundary, then crawl row by row toward the robot while a dark
    /// pixel stays within +-3 columns.
    fn track_corner_down(&mut self, raw: &Frame) {
        let w = FRAME_W as i32;
        let h = FRAME_H as i32;
        let mut x = i32::from(self.inner_corner_col).clamp(0, w - 1);
        let mut y = i32::from(self.inner_corner_row).clamp(0, h - 1);

        let top_limit = h - 10;
        while y < top_limit {
            if raw.get(x, h - 1 - y) == DARK {
                break;
            }
            y += 1;
        }

        while x + 1 < w {
            if raw.get(x + 1, h - 1 - y) == BRIGHT {
                break;
            }
            x += 1;
        }

        const PROBES: [i32; 7] = [0, -1, 1, -2, 2, -3, 3];
        while y > 40 {
            let row = h - 1 - y;
            match PROBES.iter().find(|&&d| raw.get(x + d, row) == DARK) {
                Some(&d) => x += d,
                None => break,
            }
            y -= 1;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            self.inner_corner_col = x.clamp(0, w - 1) as u8;
            self.inner_corner_row = y.clamp(0, h - 1) as u8;
        }
    }

    /// `CornerDetected -> Entering` once the inner corner is close
    /// enough to steer against.
    const fn begin_turn(&mut self) {
        if matches!(self.phase, RingPhase::CornerDetected) && self.inner_corner_row <= 90 {
            self.phase = RingPhase::Entering;
        }
    }

    /// `Entering -> Traversing` once the tracked inner corner has
    /// slid down to the bottom scan band -- the entry mouth is behind
    /// the robot.
    const fn commit_traversal(&mut self) {
        if matches!(self.phase, RingPhase::Entering) && self.inner_corner_row <= 50 {
            self.phase = RingPhase::Traversing;
        }
    }

    /// `Traversing -> PreparingExit` when the right border recovers
    /// into the depth band that marks the exit mouth. Latches the
    /// turn-point column for the exit ray.
    fn prepare_exit(&mut self, b: &Borders) {
        if !matches!(self.phase, RingPhase::Traversing) {
            return;
        }
        if !b.right_lost[69] && b.right[69] < 120 && b.right[69] > 95 {
            self.phase = RingPhase::PreparingExit;
            self.exit_turn_col = b.right[69];
        }
    }

    /// Scan top-down for the exit corner: a right-border valley whose
    /// surrounding rows recover outward, with a bright probe two rows
    /// beyond it in the raw frame.
    fn detect_exit_corner(&mut self, b: &Borders, raw: &Frame) {
        if !matches!(self.phase, RingPhase::PreparingExit) {
            return;
        }
        for y in (SCAN_NEAR + 1..=SCAN_FAR).rev() {
            if y < 80
                && (y - 2..=y + 2).all(|row| !b.right_lost[row])
                && b.right[y + 1] >= b.right[y]
                && b.right[y + 2] >= b.right[y + 1]
                && b.right[y - 1] >= b.right[y]
                && b.right[y - 2] >= b.right[y]
                && b.right[y] > 30
            {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let image_row = (FRAME_H - 1 - y - 2) as i32;
                if raw.get(i32::from(b.right[y]), image_row) == BRIGHT
                    && usize::from(self.exit_corner_row) > y
                {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        self.exit_corner_row = y as u8;
                    }
                    break;
                }
            }
        }
    }

    /// `PreparingExit -> Exiting` once the exit corner is nearly under
    /// the robot and the exit ray has done its job.
    const fn begin_exit(&mut self) {
        if matches!(self.phase, RingPhase::PreparingExit) && self.exit_corner_row <= 45 {
            self.phase = RingPhase::Exiting;
        }
    }

    /// `Exiting -> Idle` once the real left border is back in view;
    /// anchors are cleared for the next ring.
    fn finish(&mut self) {
        if matches!(self.phase, RingPhase::Exiting) && self.left_lost_rows < 20 {
            self.reset();
        }
    }

    /// Overwrite border stretches with phase-dependent linear
    /// extrapolations so the centerline never sees ring-corrupted
    /// geometry.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply_line_fix(&mut self, b: &mut Borders) {
        let max_col = (FRAME_W - 1) as f32;
        let clamp_col = |value: f32| -> u8 { value.clamp(0.0, max_col) as u8 };

        match self.phase {
            RingPhase::CornerDetected => {
                if self.entry_corner_row >= self.apex_row || self.inner_corner_row != ROW_UNSET {
                    return;
                }
                // The left edge has opened into the ring; the right
                // edge is still whole. Seal the mouth with a line from
                // the bottom-left toward the right border's vanishing
                // point.
                let slope = (f32::from(b.right[2]) - f32::from(b.right[80])) / 80.0;
                let top = f32::from(b.right[0]) - 118.0 * slope;
                self.seal_top_col = clamp_col(top);
                let seal_slope = (top - f32::from(b.left[0])) / 118.0;
                for y in FIX_NEAR..81 {
                    #[allow(clippy::cast_precision_loss)]
                    let xl = top - seal_slope * (118.0 - y as f32);
                    b.left[y] = clamp_col(xl);
                }
            }
            RingPhase::Entering => {
                // Replace the right border with the entry ray through
                // the inner corner; blank the left beyond the corner.
                let denominator = 115 - i32::from(self.inner_corner_row);
                if denominator == 0 {
                    return;
                }
                #[allow(clippy::cast_precision_loss)]
                let slope = f32::from(self.inner_corner_col) / denominator as f32;
                for y in FIX_NEAR..FRAME_H {
                    #[allow(clippy::cast_precision_loss)]
                    let ray = slope
                        .mul_add(
                            f32::from(self.inner_corner_row) - y as f32,
                            f32::from(self.inner_corner_col),
                        )
                        .min(186.0);
                    b.right[y] = clamp_col(ray);
                    if y > usize::from(self.inner_corner_row) || self.inner_corner_row < 70 {
                        b.left[y] = 0;
                    }
                }
            }
            RingPhase::Traversing => {
                // Inside the ring the left edge is the island: useless
                // beyond mid-frame.
                for y in 51..FRAME_H {
                    b.left[y] = 0;
                }
            }
            RingPhase::PreparingExit => {
                for y in 51..FRAME_H {
                    b.left[y] = 0;
                }
                let corner = usize::from(self.exit_corner_row);
                if corner < FRAME_H && b.right[corner] > 60 {
                    for y in (corner + 1).max(FIX_NEAR)..FRAME_H {
                        #[allow(clippy::cast_possible_wrap)]
                        let ray = i32::from(self.exit_turn_col) + (69 - y as i32);
                        b.right[y] = ray.clamp(0, (FRAME_W - 1) as i32) as u8;
                    }
                }
            }
            RingPhase::Exiting => {
                // Seal the entry mouth behind us: a line from the
                // right border's trend down to the left frame edge.
                let slope = (f32::from(b.right[45]) - f32::from(b.right[75])) / 30.0;
                let top = f32::from(b.right[45]) - 73.0 * slope;
                self.seal_top_col = clamp_col(top);
                let seal_slope = (top - 20.0) / 118.0;
                for y in FIX_NEAR..FRAME_H {
                    #[allow(clippy::cast_precision_loss)]
                    let xl = top - seal_slope * (118.0 - y as f32);
                    b.left[y] = clamp_col(xl);
                }
            }
            RingPhase::Idle => {}
        }
    }
}
