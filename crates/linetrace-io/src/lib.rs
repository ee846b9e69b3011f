//! linetrace-io: the thin shell between image files and the sans-IO
//! perception pipeline.
//!
//! Decodes captured camera images into binary [`Frame`]s (thresholding
//! at >127, the camera driver's reference behavior) and renders
//! annotated output frames to RGBA for inspection. Nothing here has
//! algorithmic depth; all perception lives in `linetrace-pipeline`.
//!
//! [`Frame`]: linetrace_pipeline::Frame

pub mod raster;

pub use raster::{IoError, decode_frame, encode_annotated_png, render_annotated};
