//! Animated GIF decoding
//!
//! Reads a GIF into full-canvas RGBA frames. Source frames may be partial
//! sub-rectangles with their own disposal instructions, so each frame is
//! composited against the previous canvas state (via `gif_dispose`) exactly
//! as a playback decoder would before it is handed to the mask engine.

use image::{Rgba, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Fallback display time for frames that declare no delay.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// Error type for GIF decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Source file missing or unreadable
    #[error("cannot open file: {0}")]
    Io(#[from] std::io::Error),
    /// Not a valid GIF stream
    #[error("invalid GIF data: {0}")]
    Gif(#[from] gif::DecodingError),
    /// Frame could not be composited onto the canvas
    #[error("frame compositing failed: {0}")]
    Compositing(#[from] gif_dispose::Error),
    /// The container holds no frames at all
    #[error("GIF contains no frames")]
    NoFrames,
}

/// One decoded frame: a full-canvas RGBA image plus its display time.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub duration_ms: u32,
}

/// A decoded animation: ordered frames plus the container loop count.
///
/// `loop_count` follows the Netscape-extension convention: 0 means loop
/// forever. A GIF without the extension also decodes as 0.
#[derive(Debug, Clone)]
pub struct Animation {
    pub frames: Vec<Frame>,
    pub loop_count: u16,
}

impl Animation {
    /// Canvas dimensions, shared by every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.image.dimensions())
            .unwrap_or((0, 0))
    }
}

/// Decode an animated GIF from a file.
///
/// Every returned frame is a full-canvas RGBA image of the same dimensions,
/// with its declared display duration (falling back to
/// [`DEFAULT_FRAME_DURATION_MS`] when the frame declares none).
///
/// # Errors
///
/// Returns [`DecodeError`] when the file is missing, is not a readable GIF,
/// or contains zero frames.
pub fn decode_gif(path: &Path) -> Result<Animation, DecodeError> {
    let file = File::open(path)?;

    let mut options = gif::DecodeOptions::new();
    // Indexed output is required for palette-aware disposal compositing
    options.set_color_output(gif::ColorOutput::Indexed);

    let mut decoder = options.read_info(BufReader::new(file))?;
    let mut screen = gif_dispose::Screen::new_decoder(&decoder);

    let loop_count = match decoder.repeat() {
        gif::Repeat::Infinite => 0,
        gif::Repeat::Finite(n) => n,
    };

    let mut frames = Vec::new();
    loop {
        let frame = match decoder.read_next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            // A stream that ends before the first image descriptor holds no
            // frames; the gif crate reports that as an unexpected EOF rather
            // than a clean end-of-stream.
            Err(gif::DecodingError::Io(ref io))
                if io.kind() == std::io::ErrorKind::UnexpectedEof && frames.is_empty() =>
            {
                return Err(DecodeError::NoFrames);
            }
            Err(err) => return Err(err.into()),
        };
        // Delays are in centiseconds; 0 means unspecified
        let duration_ms = match u32::from(frame.delay) {
            0 => DEFAULT_FRAME_DURATION_MS,
            cs => cs * 10,
        };

        screen.blit_frame(frame)?;

        let canvas = screen.pixels_rgba();
        let (width, height) = (canvas.width() as u32, canvas.height() as u32);
        let mut image = RgbaImage::new(width, height);
        for (dst, src) in image.pixels_mut().zip(canvas.pixels()) {
            *dst = Rgba([src.r, src.g, src.b, src.a]);
        }

        frames.push(Frame { image, duration_ms });
    }

    if frames.is_empty() {
        return Err(DecodeError::NoFrames);
    }

    Ok(Animation { frames, loop_count })
}
