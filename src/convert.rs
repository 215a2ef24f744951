// convert.rs -- Pixel type conversions feeding the tracker.
//
// The detector and LK tracker work on 8-bit intensity. Depth frames get
// there through the palette's near/far band (near = bright); the filters
// then lift any pixel type to f32.

use crate::colorize::DepthPalette;
use crate::image::{Image, Pixel};

/// 8-bit intensity view of a depth frame. Invalid samples become 0.
pub fn depth_to_intensity(depth: &Image<u16>, palette: &DepthPalette) -> Image<u8> {
    depth.map(|s| palette.intensity(s))
}

/// Any pixel type to f32, raw values preserved.
pub fn to_f32_image<T: Pixel>(src: &Image<T>) -> Image<f32> {
    src.map(|p| p.to_f32())
}
