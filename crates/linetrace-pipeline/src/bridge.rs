//! Gap-tolerant growth-code motif matching and crossroad bridging.
//!
//! Near a crossroad (or the mouth of a ring) the physical boundary
//! vanishes and the tracker walks off along the intersecting edge. The
//! detour leaves a characteristic motif in the growth codes: a
//! sustained climb that turns inward. [`match_with_gaps`] finds such a
//! motif despite interleaved noise codes, and [`bridge_crossroad`]
//! replaces the corrupted border columns beyond the detected break with
//! a straight-line extrapolation of the rows just before it.

use crate::border::{Borders, linear_fit};
use crate::tracker::ContourWalk;
use crate::types::{BORDER_MAX, BORDER_MIN, BorderArray, FRAME_H};

/// Edge grows outward, then climbs straight up.
pub const OUTWARD_THEN_CLIMB: [u8; 6] = [1, 1, 1, 3, 3, 3];

/// Edge grows inward, then climbs on the inward diagonal.
pub const INWARD_THEN_CLIMB: [u8; 6] = [5, 5, 5, 4, 4, 4];

/// Edge climbs on the inward diagonal, then breaks outward.
pub const CLIMB_THEN_OUTWARD: [u8; 6] = [4, 4, 4, 1, 1, 1];

/// Edge climbs straight up, then turns inward -- the signature of a
/// boundary opening into a crossroad or ring mouth.
pub const CLIMB_THEN_INWARD: [u8; 6] = [3, 3, 3, 5, 5, 5];

/// Climb that bends outward and arcs back down.
pub const CLIMB_OUTWARD_DOWN_ARC: [u8; 8] = [4, 4, 1, 1, 2, 3, 3, 3];

/// Outward kink resolving into a sustained climb.
pub const OUTWARD_CLIMB_ARC: [u8; 8] = [2, 3, 3, 3, 3, 3, 3, 4];

/// Outcome of matching one growth-code motif against an input sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Whether the full pattern was found.
    pub matched: bool,
    /// Input index of the pattern's final element (valid when matched).
    pub end: usize,
    /// Total noise codes skipped inside the match.
    pub total_gap: u16,
    /// 1.0 for a perfectly contiguous match, approaching 0.0 as the
    /// skipped noise approaches the allowed maximum.
    pub confidence: f32,
}

impl MatchResult {
    const fn no_match() -> Self {
        Self {
            matched: false,
            end: 0,
            total_gap: 0,
            confidence: 0.0,
        }
    }
}

/// Find `pattern` inside `input`, tolerating up to `max_gap` mismatched
/// elements between consecutive pattern elements.
///
/// Every pattern element must match exactly and in order, repeats
/// included. When a gap segment exceeds `max_gap` the match restarts,
/// immediately re-testing the current element against the pattern
/// start. The scan prunes as soon as the remaining input is shorter
/// than the remaining pattern.
#[must_use]
pub fn match_with_gaps(input: &[u8], pattern: &[u8], max_gap: u16) -> MatchResult {
    let mut result = MatchResult::no_match();
    if input.is_empty() || pattern.is_empty() {
        return result;
    }

    let mut pattern_idx = 0usize;
    let mut current_gap = 0u16;
    let mut total_gap = 0u16;

    for (i, &code) in input.iter().enumerate() {
        if input.len() - i < pattern.len() - pattern_idx {
            break;
        }

        if code == pattern[pattern_idx] {
            if pattern_idx > 0 {
                total_gap += current_gap;
            }
            pattern_idx += 1;
            current_gap = 0;

            if pattern_idx == pattern.len() {
                result.matched = true;
                result.end = i;
                result.total_gap = total_gap;
                #[allow(clippy::cast_possible_truncation)]
                let max_possible = (pattern.len() - 1) as u16 * max_gap;
                result.confidence = if max_possible == 0 {
                    1.0
                } else {
                    1.0 - f32::from(total_gap) / f32::from(max_possible)
                };
                return result;
            }
        } else if pattern_idx > 0 {
            current_gap += 1;
            if current_gap > max_gap {
                pattern_idx = 0;
                current_gap = 0;
                total_gap = 0;
                // The element that broke the match may itself start a
                // new one.
                if code == pattern[0] {
                    pattern_idx = 1;
                }
            }
        }
    }

    result
}

/// Result of one crossroad-bridging attempt.
#[derive(Debug, Clone, Copy)]
pub struct BridgeOutcome {
    /// Motif match on the left growth codes.
    pub left: MatchResult,
    /// Motif match on the right growth codes.
    pub right: MatchResult,
    /// Border row of the left break point, when bridging fired.
    pub left_break_row: Option<u8>,
    /// Border row of the right break point, when bridging fired.
    pub right_break_row: Option<u8>,
}

impl BridgeOutcome {
    /// Whether both sides matched and the borders were re-interpolated.
    #[must_use]
    pub const fn bridged(&self) -> bool {
        self.left.matched && self.right.matched
    }
}

/// Number of rows fitted immediately before a break point.
const FIT_ROWS: usize = 10;

/// Rows between the break point and the start of the overwrite; the
/// fit window ends here as well, keeping the geometrically suspect rows
/// nearest the break out of the fit.
const BREAK_MARGIN: usize = 5;

/// Detect a crossroad from the growth codes of both edges and bridge
/// the borders across it.
///
/// [`CLIMB_THEN_INWARD`] is matched independently against each side's
/// codes. Only when **both** sides complete the motif is the geometry
/// treated as a crossroad; each border is then overwritten from just
/// below its break row to the far edge of the frame with a
/// least-squares line fitted to the rows preceding the break, clamped
/// to the valid column range. A one-sided or failed match leaves the
/// borders exactly as extracted.
pub fn bridge_crossroad(walk: &ContourWalk, borders: &mut Borders, max_gap: u16) -> BridgeOutcome {
    let left = match_with_gaps(walk.left_codes(), &CLIMB_THEN_INWARD, max_gap);
    let right = match_with_gaps(walk.right_codes(), &CLIMB_THEN_INWARD, max_gap);

    let mut outcome = BridgeOutcome {
        left,
        right,
        left_break_row: None,
        right_break_row: None,
    };

    if !(left.matched && right.matched) {
        return outcome;
    }

    let left_break = FRAME_H - 1 - usize::from(walk.left_points()[left.end].y);
    let right_break = FRAME_H - 1 - usize::from(walk.right_points()[right.end].y);

    refit_beyond_break(&mut borders.left, left_break);
    refit_beyond_break(&mut borders.right, right_break);

    #[allow(clippy::cast_possible_truncation)]
    {
        outcome.left_break_row = Some(left_break as u8);
        outcome.right_break_row = Some(right_break as u8);
    }
    log::debug!(
        "crossroad bridged: breaks at rows {left_break}/{right_break}, \
         confidence {:.2}/{:.2}",
        left.confidence,
        right.confidence
    );
    outcome
}

/// Overwrite `border` from just below `break_row` to the frame's far
/// edge with a line fitted to the [`FIT_ROWS`] rows preceding the
/// break.
fn refit_beyond_break(border: &mut BorderArray, break_row: usize) {
    if break_row < BREAK_MARGIN {
        // Break too close to the robot: nothing reliable to fit.
        return;
    }
    let fill_from = break_row - BREAK_MARGIN;
    let fit_start = fill_from.saturating_sub(FIT_ROWS);
    let (slope, intercept) = linear_fit(border, fit_start, fill_from);

    for row in fill_from..FRAME_H - 1 {
        #[allow(clippy::cast_precision_loss)]
        let fitted = slope.mul_add(row as f32, intercept);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            border[row] = (fitted.clamp(f32::from(BORDER_MIN), f32::from(BORDER_MAX))) as u8;
        }
    }
}
