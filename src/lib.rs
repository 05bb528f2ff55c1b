//! Gifkey - chroma-key background removal for animated GIFs
//!
//! This library provides functionality to:
//! - Decode animated GIFs into full-canvas RGBA frames with their timing
//! - Key out a background color with a per-channel tolerance
//! - Re-encode with a reserved transparent index and background disposal

pub mod chroma;
pub mod cli;
pub mod color;
pub mod decode;
pub mod encode;
pub mod pipeline;
pub mod progress;
