//! Chroma-key mask engine
//!
//! Classifies each pixel as background iff every RGB channel is within
//! `tolerance` of the key color - an axis-aligned cube around the key color
//! in RGB space, not a Euclidean ball. The test is purely per-pixel: no
//! neighborhood, no hysteresis, no state shared between pixels or frames.
//!
//! The resulting transparency is binary. Any graded alpha in the source is
//! discarded: background pixels become alpha 0, everything else alpha 255.

use crate::color::KeyColor;
use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

/// Bytes per RGBA pixel in the raw buffer.
const RGBA_STRIDE: usize = 4;

/// Whether a single RGB sample falls inside the key color's tolerance cube.
#[inline]
pub fn is_background(rgb: [u8; 3], key: KeyColor, tolerance: u8) -> bool {
    rgb.iter()
        .zip(key.channels())
        .all(|(&c, k)| c.abs_diff(k) <= tolerance)
}

/// Compute the binary background mask for a frame.
///
/// Returns a grayscale image of the same dimensions where 255 marks a
/// background pixel and 0 marks a pixel to keep. The frame's own alpha
/// channel plays no part in the classification.
pub fn background_mask(image: &RgbaImage, key: KeyColor, tolerance: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y).0;
        let luma = if is_background([px[0], px[1], px[2]], key, tolerance) {
            255
        } else {
            0
        };
        image::Luma([luma])
    })
}

/// Rewrite a frame's alpha channel in place from the chroma-key test.
///
/// Background pixels get alpha 0, all others alpha 255; RGB channels are
/// left untouched. Rows are processed in parallel - the classification is
/// independent per pixel, so the result is deterministic regardless of
/// scheduling.
pub fn key_out_background(image: &mut RgbaImage, key: KeyColor, tolerance: u8) {
    let row_len = image.width() as usize * RGBA_STRIDE;
    if row_len == 0 {
        return;
    }

    image
        .par_chunks_mut(row_len)
        .for_each(|row| {
            for px in row.chunks_exact_mut(RGBA_STRIDE) {
                px[3] = if is_background([px[0], px[1], px[2]], key, tolerance) {
                    0
                } else {
                    255
                };
            }
        });
}
