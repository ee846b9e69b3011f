//! Per-frame diagnostics: counts, match confidences and the maneuver
//! phase.
//!
//! These are permanent instrumentation for parameter tuning and replay
//! analysis. Every call to [`TrackPipeline::process`](crate::TrackPipeline::process)
//! fills one [`FrameDiagnostics`] alongside the frame output; the CLI
//! prints them per frame or as JSON.

use serde::{Deserialize, Serialize};

use crate::ring::RingPhase;

/// Diagnostics collected from a single processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Image row where the seed pair was found, `None` when every
    /// probe row failed (frame processed as all-lost).
    pub seed_row: Option<u8>,
    /// Points recorded on the left contour.
    pub left_point_count: usize,
    /// Points recorded on the right contour.
    pub right_point_count: usize,
    /// Image row where the two contours met (0 when they did not).
    pub apex_image_row: u8,
    /// Rows with no left boundary point.
    pub left_lost_rows: u8,
    /// Rows with no right boundary point.
    pub right_lost_rows: u8,
    /// Crossroad bridging details, when the matcher ran.
    pub bridge: Option<BridgeDiagnostics>,
    /// Ring-navigation phase after this frame.
    pub ring_phase: RingPhase,
}

/// Crossroad-bridging details for one frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BridgeDiagnostics {
    /// Whether both sides matched and the borders were re-fitted.
    pub bridged: bool,
    /// Left-side match confidence (0 when unmatched).
    pub left_confidence: f32,
    /// Right-side match confidence (0 when unmatched).
    pub right_confidence: f32,
    /// Border row of the left break point.
    pub left_break_row: Option<u8>,
    /// Border row of the right break point.
    pub right_break_row: Option<u8>,
}

impl FrameDiagnostics {
    /// Diagnostics for a frame where no seed pair was found.
    #[must_use]
    pub const fn all_lost() -> Self {
        Self {
            seed_row: None,
            left_point_count: 0,
            right_point_count: 0,
            apex_image_row: 0,
            left_lost_rows: crate::types::FRAME_H as u8,
            right_lost_rows: crate::types::FRAME_H as u8,
            bridge: None,
            ring_phase: RingPhase::Idle,
        }
    }

    /// Human-readable one-frame report.
    #[must_use]
    pub fn report(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        match self.seed_row {
            Some(row) => {
                let _ = writeln!(out, "seed row          {row}");
            }
            None => out.push_str("seed row          not found\n"),
        }
        let _ = writeln!(
            out,
            "contour points    left {} / right {}",
            self.left_point_count, self.right_point_count
        );
        let _ = writeln!(out, "apex image row    {}", self.apex_image_row);
        let _ = writeln!(
            out,
            "lost rows         left {} / right {}",
            self.left_lost_rows, self.right_lost_rows
        );
        if let Some(bridge) = &self.bridge {
            let _ = writeln!(
                out,
                "bridge            {} (confidence {:.2}/{:.2})",
                if bridge.bridged { "fired" } else { "no match" },
                bridge.left_confidence,
                bridge.right_confidence,
            );
        }
        let _ = writeln!(out, "ring phase        {:?}", self.ring_phase);
        out
    }
}

impl Default for FrameDiagnostics {
    fn default() -> Self {
        Self::all_lost()
    }
}
