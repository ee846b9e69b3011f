//! Bit-packed 3x3 binary morphology.
//!
//! Erosion and dilation reduce to word-wide AND/OR over the current
//! word, its horizontal neighbors (with cross-word bit carry), and the
//! rows above and below. Rows outside the frame are treated as
//! all-background, so the outermost rows erode away and get partially
//! rebuilt by the following dilation.
//!
//! [`clean`] is the pipeline's noise filter: open (erode, dilate)
//! removes bright speckles, then close (dilate, erode) fills hairline
//! dark gaps, preserving the coarse track shape.

use crate::bitmap::{PackedBitmap, TAIL_MASK, WORDS_PER_ROW};
use crate::types::FRAME_H;

/// Shift a packed row one pixel to the right in image space, pulling
/// the carry bit in from the word to the left.
#[inline]
const fn shift_from_left(center: u32, left: u32) -> u32 {
    (center << 1) | (left >> 31)
}

/// Shift a packed row one pixel to the left in image space, pulling
/// the carry bit in from the word to the right.
#[inline]
const fn shift_from_right(center: u32, right: u32) -> u32 {
    (center >> 1) | (right << 31)
}

/// Horizontal 1x3 reduction of one word using `op` (AND for erosion,
/// OR for dilation), with cross-word carries.
#[inline]
fn horizontal_1x3(row: &[u32], i: usize, op: fn(u32, u32) -> u32) -> u32 {
    let center = row[i];
    let left = if i > 0 { row[i - 1] } else { 0 };
    let right = if i + 1 < WORDS_PER_ROW { row[i + 1] } else { 0 };
    op(
        op(shift_from_left(center, left), center),
        shift_from_right(center, right),
    )
}

/// Apply a full 3x3 pass with `op`, writing into `dst`.
fn pass_3x3(src: &PackedBitmap, dst: &mut PackedBitmap, op: fn(u32, u32) -> u32) {
    const ZERO_ROW: [u32; WORDS_PER_ROW] = [0; WORDS_PER_ROW];

    for y in 0..FRAME_H {
        let above = if y > 0 {
            src.row_words(y - 1)
        } else {
            &ZERO_ROW[..]
        };
        let center = src.row_words(y);
        let below = if y + 1 < FRAME_H {
            src.row_words(y + 1)
        } else {
            &ZERO_ROW[..]
        };

        for i in 0..WORDS_PER_ROW {
            let a = horizontal_1x3(above, i, op);
            let b = horizontal_1x3(center, i, op);
            let c = horizontal_1x3(below, i, op);
            let mut result = op(op(a, b), c);
            if i == WORDS_PER_ROW - 1 {
                result &= TAIL_MASK;
            }
            dst.row_words_mut(y)[i] = result;
        }
    }
}

/// 3x3 binary erosion: a pixel survives only if its whole 3x3
/// neighborhood is foreground. Out-of-frame pixels count as background.
pub fn erode3x3(src: &PackedBitmap, dst: &mut PackedBitmap) {
    pass_3x3(src, dst, |a, b| a & b);
}

/// 3x3 binary dilation: a pixel turns foreground if any pixel of its
/// 3x3 neighborhood is foreground.
pub fn dilate3x3(src: &PackedBitmap, dst: &mut PackedBitmap) {
    pass_3x3(src, dst, |a, b| a | b);
}

/// Morphological cleanup: open (erode, dilate) then close (dilate,
/// erode). `tmp` is scratch space; the result lands in `out`.
pub fn clean(src: &PackedBitmap, tmp: &mut PackedBitmap, out: &mut PackedBitmap) {
    // Open: drop small bright speckles, then restore the main shape.
    erode3x3(src, tmp);
    dilate3x3(tmp, out);

    // Close: fill small dark gaps, then restore the boundary.
    dilate3x3(out, tmp);
    erode3x3(tmp, out);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BRIGHT, FRAME_W, Frame};

    fn packed(frame: &Frame) -> PackedBitmap {
        let mut bits = PackedBitmap::new();
        bits.pack(frame);
        bits
    }

    /// Frame that is bright everywhere except a `margin`-pixel border.
    fn interior_frame(margin: usize) -> Frame {
        let mut frame = Frame::new();
        for y in margin..FRAME_H - margin {
            for x in margin..FRAME_W - margin {
                frame.put(x, y, BRIGHT);
            }
        }
        frame
    }

    #[test]
    fn erode_all_background_stays_background() {
        let src = PackedBitmap::new();
        let mut dst = PackedBitmap::new();
        erode3x3(&src, &mut dst);
        assert_eq!(dst.count_foreground(), 0);
    }

    #[test]
    fn erode_shrinks_square_by_one() {
        let mut frame = Frame::new();
        for y in 10..20 {
            for x in 10..20 {
                frame.put(x, y, BRIGHT);
            }
        }
        let mut dst = PackedBitmap::new();
        erode3x3(&packed(&frame), &mut dst);
        // 10x10 square erodes to 8x8.
        assert_eq!(dst.count_foreground(), 64);
        assert!(dst.bit(11, 11));
        assert!(!dst.bit(10, 10));
    }

    #[test]
    fn dilate_grows_single_pixel_to_3x3() {
        let mut frame = Frame::new();
        frame.put(50, 50, BRIGHT);
        let mut dst = PackedBitmap::new();
        dilate3x3(&packed(&frame), &mut dst);
        assert_eq!(dst.count_foreground(), 9);
        for y in 49..=51 {
            for x in 49..=51 {
                assert!(dst.bit(x, y));
            }
        }
    }

    #[test]
    fn dilate_carry_crosses_word_boundary() {
        let mut frame = Frame::new();
        frame.put(31, 50, BRIGHT); // last bit of word 0
        let mut dst = PackedBitmap::new();
        dilate3x3(&packed(&frame), &mut dst);
        assert!(dst.bit(30, 50));
        assert!(dst.bit(32, 50), "carry must reach the next word");
    }

    #[test]
    fn dilate_never_sets_tail_bits() {
        let mut frame = Frame::new();
        for y in 0..FRAME_H {
            frame.put(FRAME_W - 1, y, BRIGHT);
        }
        let mut dst = PackedBitmap::new();
        dilate3x3(&packed(&frame), &mut dst);
        for y in 0..FRAME_H {
            assert_eq!(dst.row_words(y)[WORDS_PER_ROW - 1] & !TAIL_MASK, 0);
        }
    }

    #[test]
    fn clean_all_background_is_all_background() {
        let src = PackedBitmap::new();
        let mut tmp = PackedBitmap::new();
        let mut out = PackedBitmap::new();
        clean(&src, &mut tmp, &mut out);
        assert_eq!(out.count_foreground(), 0);
    }

    #[test]
    fn clean_preserves_deep_interior_of_solid_region() {
        let frame = interior_frame(2);
        let src = packed(&frame);
        let mut tmp = PackedBitmap::new();
        let mut out = PackedBitmap::new();
        clean(&src, &mut tmp, &mut out);
        // Two pixels further in, the open/close pair is an identity.
        for y in 4..FRAME_H - 4 {
            for x in 4..FRAME_W - 4 {
                assert!(out.bit(x, y), "interior pixel ({x}, {y}) was lost");
            }
        }
    }

    #[test]
    fn clean_removes_isolated_speckle() {
        let mut frame = interior_frame(2);
        // A lone bright speckle in a dark area does not survive opening.
        frame.put(0, 0, BRIGHT);
        let src = packed(&frame);
        let mut tmp = PackedBitmap::new();
        let mut out = PackedBitmap::new();
        clean(&src, &mut tmp, &mut out);
        assert!(!out.bit(0, 0));
    }

    #[test]
    fn clean_fills_hairline_gap() {
        let mut frame = interior_frame(2);
        // A 1-pixel dark scratch across the track closes up.
        for y in 2..FRAME_H - 2 {
            frame.put(94, y, 0);
        }
        let src = packed(&frame);
        let mut tmp = PackedBitmap::new();
        let mut out = PackedBitmap::new();
        clean(&src, &mut tmp, &mut out);
        for y in 10..FRAME_H - 10 {
            assert!(out.bit(94, y), "gap at row {y} was not closed");
        }
    }

    #[test]
    fn open_does_not_grow_outside_dilated_footprint() {
        // erode(dilate(x)) stays inside dilate(x): closing never reaches beyond
        // the dilation's own footprint.
        let mut frame = Frame::new();
        for y in 40..60 {
            for x in 40..60 {
                frame.put(x, y, BRIGHT);
            }
        }
        let src = packed(&frame);
        let mut dilated = PackedBitmap::new();
        dilate3x3(&src, &mut dilated);
        let mut closed = PackedBitmap::new();
        erode3x3(&dilated, &mut closed);
        for y in 0..FRAME_H {
            for x in 0..FRAME_W {
                if closed.bit(x, y) {
                    assert!(dilated.bit(x, y), "closing grew at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn erode_matches_imageproc_on_interior() {
        use imageproc::distance_transform::Norm;

        let frame = checkerboardish_frame();
        let mut ours = PackedBitmap::new();
        erode3x3(&packed(&frame), &mut ours);

        let reference = imageproc::morphology::erode(&to_gray(&frame), Norm::LInf, 1);
        compare_interior(&ours, &reference);
    }

    #[test]
    fn dilate_matches_imageproc_on_interior() {
        use imageproc::distance_transform::Norm;

        let frame = checkerboardish_frame();
        let mut ours = PackedBitmap::new();
        dilate3x3(&packed(&frame), &mut ours);

        let reference = imageproc::morphology::dilate(&to_gray(&frame), Norm::LInf, 1);
        compare_interior(&ours, &reference);
    }

    /// Deterministic mixed-content frame: blocks, stripes and speckles.
    fn checkerboardish_frame() -> Frame {
        let mut frame = Frame::new();
        for y in 0..FRAME_H {
            for x in 0..FRAME_W {
                let blocks = (x / 7 + y / 5) % 2 == 0;
                let stripe = x % 13 == 0;
                let speckle = (x * 31 + y * 17) % 97 == 0;
                if blocks && !stripe || speckle {
                    frame.put(x, y, BRIGHT);
                }
            }
        }
        frame
    }

    fn to_gray(frame: &Frame) -> image::GrayImage {
        #[allow(clippy::cast_possible_truncation)]
        image::GrayImage::from_fn(FRAME_W as u32, FRAME_H as u32, |x, y| {
            image::Luma([frame.get(x as i32, y as i32)])
        })
    }

    /// Compare against the reference away from the frame edge, where
    /// padding semantics cannot differ.
    fn compare_interior(ours: &PackedBitmap, reference: &image::GrayImage) {
        for y in 1..FRAME_H - 1 {
            for x in 1..FRAME_W - 1 {
                #[allow(clippy::cast_possible_truncation)]
                let expected = reference.get_pixel(x as u32, y as u32).0[0] != 0;
                assert_eq!(
                    ours.bit(x, y),
                    expected,
                    "mismatch against imageproc at ({x}, {y})"
                );
            }
        }
    }
}
