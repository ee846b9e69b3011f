//! linetrace-pipeline: track-edge perception for a line-following
//! robot (sans-IO).
//!
//! Recovers the left and right track-edge curves from a fixed-geometry
//! binary camera frame, synthesizes a centerline, bridges crossroad
//! discontinuities, and tracks ring (roundabout) maneuvers through:
//! morphological cleanup -> dual contour walk -> border extraction ->
//! crossroad bridging -> ring navigation -> line fix -> centerline ->
//! annotation.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! frames and returns structured data. Image decoding and rendering
//! live in `linetrace-io`.
//!
//! All per-frame buffers are owned by [`TrackPipeline`] and reused
//! across frames: after construction, steady-state processing does not
//! allocate, which keeps the per-frame latency flat for the control
//! loop. The only state carried from frame to frame is the ring
//! navigation ("watch") block.

pub mod annotate;
pub mod bitmap;
pub mod border;
pub mod bridge;
pub mod diagnostics;
pub mod morph;
pub mod ring;
pub mod tracker;
pub mod types;

pub use diagnostics::{BridgeDiagnostics, FrameDiagnostics};
pub use ring::{RingPhase, RingState};
pub use types::{
    BORDER_MAX, BORDER_MIN, BRIGHT, DARK, FRAME_H, FRAME_W, Frame, FrameError, FrameOutput,
    PipelineConfig,
};

use bitmap::PackedBitmap;
use border::Borders;
use tracker::{ContourWalk, SEED_ROWS, find_seed_pair};

/// The perception pipeline with all of its per-frame buffers and the
/// persistent ring-navigation state.
///
/// One instance processes one camera stream; `&mut self` makes the
/// single-writer rule a compile-time guarantee. External collaborators
/// receive copies in [`FrameOutput`], never references into the
/// internal buffers.
pub struct TrackPipeline {
    config: PipelineConfig,
    packed: PackedBitmap,
    scratch: PackedBitmap,
    cleaned_bits: PackedBitmap,
    cleaned: Frame,
    walk: ContourWalk,
    borders: Borders,
    ring: RingState,
}

impl TrackPipeline {
    /// Pipeline with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Pipeline with an explicit configuration.
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            packed: PackedBitmap::new(),
            scratch: PackedBitmap::new(),
            cleaned_bits: PackedBitmap::new(),
            cleaned: Frame::new(),
            walk: ContourWalk::new(),
            borders: Borders::new(),
            ring: RingState::new(),
        }
    }

    /// The persistent ring-navigation state.
    #[must_use]
    pub const fn ring(&self) -> &RingState {
        &self.ring
    }

    /// Drop the ring navigation back to idle. Called by the shell when
    /// the robot is repositioned; never called implicitly.
    pub fn reset(&mut self) {
        self.ring.reset();
    }

    /// Process one camera frame.
    ///
    /// Never fails: a frame without a usable boundary yields an output
    /// with every row flagged lost, and a stuck contour walk yields
    /// borders from whatever points were collected.
    pub fn process(&mut self, frame: &Frame) -> FrameOutput {
        // Morphological cleanup, then the edge mask that pens the
        // contour walk in.
        self.packed.pack(frame);
        morph::clean(&self.packed, &mut self.scratch, &mut self.cleaned_bits);
        self.cleaned_bits.unpack(&mut self.cleaned);
        annotate::mask_frame_edges(&mut self.cleaned);

        // Seed search and dual contour walk.
        self.walk.clear();
        let mut seed_row = None;
        for row in SEED_ROWS {
            if let Some((left, right)) = find_seed_pair(&self.cleaned, row) {
                self.walk.walk(&self.cleaned, left, right);
                seed_row = Some(row);
                break;
            }
        }
        if seed_row.is_none() {
            log::debug!("no seed pair on any probe row; frame is all-lost");
        }

        // Border extraction. With no seeds the point slices are empty
        // and every row stays lost.
        self.borders.extract_left(self.walk.left_points());
        self.borders.extract_right(self.walk.right_points());

        // Crossroad bridging.
        let bridge = if seed_row.is_some() {
            let outcome =
                bridge::bridge_crossroad(&self.walk, &mut self.borders, self.config.bridge_max_gap);
            Some(BridgeDiagnostics {
                bridged: outcome.bridged(),
                left_confidence: outcome.left.confidence,
                right_confidence: outcome.right.confidence,
                left_break_row: outcome.left_break_row,
                right_break_row: outcome.right_break_row,
            })
        } else {
            None
        };

        // Ring navigation: transitions on the bridged borders, then the
        // phase-dependent line fixes.
        self.ring.left_lost_rows = self.borders.left_lost_rows;
        self.ring.right_lost_rows = self.borders.right_lost_rows;
        if self.config.ring_nav {
            self.ring.update(&self.borders, frame);
            self.ring.apply_line_fix(&mut self.borders);
        }

        // Centerline over the (possibly fixed) borders.
        self.borders.compute_center();

        // Annotated copy for the display shell.
        let mut annotated = self.cleaned.clone();
        if self.config.annotate {
            annotate::draw_overlay(&mut annotated, &self.walk, &self.borders);
        }

        #[allow(clippy::cast_possible_truncation)]
        let diagnostics = FrameDiagnostics {
            seed_row: seed_row.map(|row| row as u8),
            left_point_count: self.walk.left_points().len(),
            right_point_count: self.walk.right_points().len(),
            apex_image_row: self.walk.apex_image_row(),
            left_lost_rows: self.borders.left_lost_rows,
            right_lost_rows: self.borders.right_lost_rows,
            bridge,
            ring_phase: self.ring.phase,
        };

        FrameOutput {
            left_border: self.borders.left,
            right_border: self.borders.right,
            center_line: self.borders.center,
            left_lost: self.borders.left_lost,
            right_lost: self.borders.right_lost,
            annotated,
            ring: self.ring,
            diagnostics,
        }
    }
}

impl Default for TrackPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Process a single frame through a fresh pipeline.
///
/// Convenience for one-shot analysis; a control loop should hold a
/// [`TrackPipeline`] so the ring state survives between frames and the
/// buffers are reused.
#[must_use]
pub fn process_frame(frame: &Frame) -> FrameOutput {
    TrackPipeline::new().process(frame)
}
