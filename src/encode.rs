//! Animated GIF encoding
//!
//! Reassembles transformed frames into an output GIF that:
//! - reserves palette index 0 as the container-wide transparent slot,
//! - marks every frame with the restore-to-background disposal method so
//!   transparency never ghosts stale pixels from the previous frame,
//! - preserves per-frame delays and the loop count.
//!
//! The stream is encoded in memory and published to the destination through
//! a temp file in the same directory, so a failed run never leaves a
//! truncated file at the final path.

use color_quant::NeuQuant;
use image::RgbaImage;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// The palette slot every frame reserves for fully transparent pixels.
pub const TRANSPARENT_INDEX: u8 = 0;

/// Largest frame extent a GIF can declare (u16 fields in the stream).
const MAX_DIMENSION: u32 = u16::MAX as u32;

/// NeuQuant sample factor: 10 trades a little palette quality for speed,
/// the same default the gif crate itself uses for RGBA input.
const QUANTIZER_SPEED: i32 = 10;

/// Error type for GIF encoding failures
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Nothing to encode
    #[error("no frames to encode")]
    NoFrames,
    /// frames and durations must pair up one-to-one
    #[error("frame count {frames} does not match duration count {durations}")]
    LengthMismatch { frames: usize, durations: usize },
    /// All frames must share the canvas dimensions
    #[error("frame {index} is {got_w}x{got_h}, expected {want_w}x{want_h}")]
    DimensionMismatch {
        index: usize,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
    /// Frame exceeds what the container can describe
    #[error("frame dimensions {width}x{height} exceed the GIF limit of {MAX_DIMENSION}")]
    TooLarge { width: u32, height: u32 },
    /// Destination unwritable or write failed mid-stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// GIF stream error
    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),
}

/// A frame reduced to palette indices, with index 0 reserved as transparent.
struct IndexedFrame {
    /// Flat RGB palette, 3 bytes per entry; entry 0 is the transparent slot.
    palette: Vec<u8>,
    /// One palette index per pixel, row-major.
    pixels: Vec<u8>,
}

/// Encode frames into an animated GIF at `path`.
///
/// `durations_ms` must contain one display duration per frame. A
/// `loop_count` of 0 means loop forever (the Netscape convention), any other
/// value plays the animation that many times.
///
/// Pixels with alpha 0 map to the reserved transparent index; all other
/// pixels are treated as fully opaque. Partial alpha is not representable in
/// a GIF and must be resolved before encoding.
///
/// # Errors
///
/// Returns [`EncodeError`] on empty/mismatched input, frames too large for
/// the container, or any write failure. On failure the destination path is
/// left untouched.
pub fn encode_gif(
    frames: &[RgbaImage],
    durations_ms: &[u32],
    loop_count: u16,
    path: &Path,
) -> Result<(), EncodeError> {
    let first = frames.first().ok_or(EncodeError::NoFrames)?;
    if frames.len() != durations_ms.len() {
        return Err(EncodeError::LengthMismatch {
            frames: frames.len(),
            durations: durations_ms.len(),
        });
    }

    let (width, height) = first.dimensions();
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EncodeError::TooLarge { width, height });
    }
    for (index, frame) in frames.iter().enumerate() {
        let (got_w, got_h) = frame.dimensions();
        if (got_w, got_h) != (width, height) {
            return Err(EncodeError::DimensionMismatch {
                index,
                got_w,
                got_h,
                want_w: width,
                want_h: height,
            });
        }
    }

    let mut buffer = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut buffer, width as u16, height as u16, &[])?;
        let repeat = if loop_count == 0 {
            gif::Repeat::Infinite
        } else {
            gif::Repeat::Finite(loop_count)
        };
        encoder.set_repeat(repeat)?;

        for (image, &duration_ms) in frames.iter().zip(durations_ms) {
            let indexed = index_frame(image);
            let frame = gif::Frame {
                width: width as u16,
                height: height as u16,
                buffer: Cow::Owned(indexed.pixels),
                palette: Some(indexed.palette),
                transparent: Some(TRANSPARENT_INDEX),
                dispose: gif::DisposalMethod::Background,
                // Delays are centiseconds; clamp into the representable range
                delay: (duration_ms / 10).clamp(1, u32::from(u16::MAX)) as u16,
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame)?;
        }
    }

    // Publish atomically: the destination only ever sees a complete stream
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&buffer)?;
    tmp.persist(path).map_err(|e| EncodeError::Io(e.error))?;

    Ok(())
}

/// Reduce a frame to palette indices with slot 0 reserved for transparency.
///
/// Uses an exact palette while the frame has at most 255 distinct opaque
/// colors, falling back to NeuQuant quantization beyond that.
fn index_frame(image: &RgbaImage) -> IndexedFrame {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    // Slot 0: transparent. Its RGB is never shown; black keeps re-decoded
    // transparent pixels comparable with a black key color.
    let mut palette = vec![0u8, 0, 0];
    let mut pixels = Vec::with_capacity(image.as_raw().len() / 4);

    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            pixels.push(TRANSPARENT_INDEX);
            continue;
        }
        let next = lookup.len() as u8;
        match lookup.entry([r, g, b]) {
            std::collections::hash_map::Entry::Occupied(entry) => pixels.push(*entry.get()),
            std::collections::hash_map::Entry::Vacant(entry) => {
                if next == u8::MAX {
                    // 256th opaque color: exact palette no longer fits
                    return quantize_frame(image);
                }
                entry.insert(next + 1);
                palette.extend_from_slice(&[r, g, b]);
                pixels.push(next + 1);
            }
        }
    }

    IndexedFrame { palette, pixels }
}

/// Quantization fallback for frames with more than 255 distinct colors.
fn quantize_frame(image: &RgbaImage) -> IndexedFrame {
    let mut samples = Vec::with_capacity(image.as_raw().len());
    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        if a != 0 {
            samples.extend_from_slice(&[r, g, b, 255]);
        }
    }

    let quantizer = NeuQuant::new(QUANTIZER_SPEED, 255, &samples);

    let mut palette = vec![0u8, 0, 0];
    palette.extend_from_slice(&quantizer.color_map_rgb());

    let pixels = image
        .pixels()
        .map(|px| {
            let [r, g, b, a] = px.0;
            if a == 0 {
                TRANSPARENT_INDEX
            } else {
                quantizer.index_of(&[r, g, b, 255]) as u8 + 1
            }
        })
        .collect();

    IndexedFrame { palette, pixels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_gif;
    use image::Rgba;
    use tempfile::tempdir;

    fn solid_frame(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(width, height, color)
    }

    #[test]
    fn test_roundtrip_preserves_count_durations_loop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.gif");

        let frames = vec![
            solid_frame(6, 4, Rgba([255, 0, 0, 255])),
            solid_frame(6, 4, Rgba([0, 255, 0, 255])),
            solid_frame(6, 4, Rgba([0, 0, 255, 255])),
        ];
        encode_gif(&frames, &[100, 150, 200], 3, &path).unwrap();

        let animation = decode_gif(&path).unwrap();
        assert_eq!(animation.frames.len(), 3);
        assert_eq!(animation.loop_count, 3);
        let durations: Vec<u32> = animation.frames.iter().map(|f| f.duration_ms).collect();
        assert_eq!(durations, vec![100, 150, 200]);
    }

    #[test]
    fn test_transparency_survives_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alpha.gif");

        let mut frame = solid_frame(4, 4, Rgba([10, 200, 30, 255]));
        frame.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        frame.put_pixel(2, 3, Rgba([0, 0, 0, 0]));
        encode_gif(&[frame], &[100], 0, &path).unwrap();

        let animation = decode_gif(&path).unwrap();
        let decoded = &animation.frames[0].image;
        assert_eq!(decoded.get_pixel(1, 1)[3], 0);
        assert_eq!(decoded.get_pixel(2, 3)[3], 0);
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn test_disposal_and_transparent_index_declared() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dispose.gif");

        let frames = vec![
            solid_frame(3, 3, Rgba([255, 255, 255, 255])),
            solid_frame(3, 3, Rgba([0, 0, 0, 255])),
        ];
        encode_gif(&frames, &[50, 50], 0, &path).unwrap();

        // Inspect raw frame metadata with the gif crate directly
        let file = std::fs::File::open(&path).unwrap();
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(file).unwrap();
        assert_eq!(decoder.repeat(), gif::Repeat::Infinite);

        let mut seen = 0;
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!(frame.dispose, gif::DisposalMethod::Background);
            assert_eq!(frame.transparent, Some(TRANSPARENT_INDEX));
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_minimum_delay_clamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fast.gif");

        encode_gif(&[solid_frame(2, 2, Rgba([1, 2, 3, 255]))], &[5], 0, &path).unwrap();

        let animation = decode_gif(&path).unwrap();
        // 5ms rounds down to 0cs, clamped up to 1cs = 10ms
        assert_eq!(animation.frames[0].duration_ms, 10);
    }

    #[test]
    fn test_many_colors_falls_back_to_quantizer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.gif");

        // 20x20 gradient-ish frame with 400 distinct colors
        let frame = RgbaImage::from_fn(20, 20, |x, y| {
            Rgba([(x * 12) as u8, (y * 12) as u8, (x + y * 20) as u8, 255])
        });
        encode_gif(&[frame], &[100], 0, &path).unwrap();

        let animation = decode_gif(&path).unwrap();
        assert_eq!(animation.dimensions(), (20, 20));
        assert!(animation.frames[0].image.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn test_empty_frames_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("none.gif");
        let result = encode_gif(&[], &[], 0, &path);
        assert!(matches!(result, Err(EncodeError::NoFrames)));
        assert!(!path.exists());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mismatch.gif");
        let frames = vec![solid_frame(2, 2, Rgba([0, 0, 0, 255]))];
        let result = encode_gif(&frames, &[100, 200], 0, &path);
        assert!(matches!(
            result,
            Err(EncodeError::LengthMismatch { frames: 1, durations: 2 })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dims.gif");
        let frames = vec![
            solid_frame(2, 2, Rgba([0, 0, 0, 255])),
            solid_frame(3, 2, Rgba([0, 0, 0, 255])),
        ];
        let result = encode_gif(&frames, &[100, 100], 0, &path);
        assert!(matches!(
            result,
            Err(EncodeError::DimensionMismatch { index: 1, .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/out.gif");
        encode_gif(&[solid_frame(2, 2, Rgba([5, 5, 5, 255]))], &[100], 0, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_encode_leaves_no_destination() {
        let dir = tempdir().unwrap();
        // Destination's parent is a *file*, so the temp file cannot be created
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.gif");

        let result = encode_gif(&[solid_frame(2, 2, Rgba([5, 5, 5, 255]))], &[100], 0, &path);
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
