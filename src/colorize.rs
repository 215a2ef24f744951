// colorize.rs -- False-color mapping for depth samples.
//
// A depth sample is decoded to millimeters, clamped into the palette's
// [near, far] band and normalized to t in [0, 1]. t then walks a hue ramp
// made of four linear segments:
//
//   t:     0.00      0.25      0.50      0.75      1.00
//   color: blue  ->  cyan  ->  green -> yellow ->  red
//
// Exactly one channel moves inside each segment, so the ramp is continuous
// and neighbouring depths get neighbouring colors. No point on the ramp is
// black; black is reserved for the invalid sample 65535.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FrameError, FrameResult};
use crate::image::{Image, Rgba};

/// Reserved "no valid reading" sample.
pub const INVALID_DEPTH: u16 = 65535;

/// Fourth channel written for every valid colorized pixel. Invalid pixels get
/// 0, so downstream consumers can tell the two apart by this channel alone.
pub const VALID_ALPHA: u8 = 1;

/// Ramp knots, evenly spaced over t.
const RAMP: [[u8; 3]; 5] = [
    [0, 0, 255],
    [0, 255, 255],
    [0, 255, 0],
    [255, 255, 0],
    [255, 0, 0],
];

/// How a raw 16-bit sample encodes distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthEncoding {
    /// The sample is the distance in millimeters.
    #[default]
    Millimeters,
    /// Kinect v1 packed format: `mm << 3 | player_index`.
    KinectPacked,
}

impl DepthEncoding {
    /// Distance in millimeters carried by `sample`.
    #[inline]
    pub fn millimeters(self, sample: u16) -> u16 {
        match self {
            DepthEncoding::Millimeters => sample,
            DepthEncoding::KinectPacked => sample >> 3,
        }
    }

    /// Player index bits, 0 when the encoding has none.
    #[inline]
    pub fn player_index(self, sample: u16) -> u8 {
        match self {
            DepthEncoding::Millimeters => 0,
            DepthEncoding::KinectPacked => (sample & 0x7) as u8,
        }
    }
}

/// Depth band and encoding used to turn samples into colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthPalette {
    /// Distance mapped to the start of the ramp (blue).
    pub near_mm: u16,
    /// Distance mapped to the end of the ramp (red).
    pub far_mm: u16,
    pub encoding: DepthEncoding,
}

impl Default for DepthPalette {
    /// Kinect v1 default range.
    fn default() -> Self {
        DepthPalette {
            near_mm: 800,
            far_mm: 4000,
            encoding: DepthEncoding::Millimeters,
        }
    }
}

impl DepthPalette {
    /// Palette over `[near_mm, far_mm]`; the band must be non-empty.
    pub fn new(near_mm: u16, far_mm: u16, encoding: DepthEncoding) -> Result<Self, ConfigError> {
        let palette = DepthPalette {
            near_mm,
            far_mm,
            encoding,
        };
        palette.validate()?;
        Ok(palette)
    }

    /// `DepthBand` unless `near_mm < far_mm`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.far_mm <= self.near_mm {
            return Err(ConfigError::DepthBand {
                near_mm: self.near_mm,
                far_mm: self.far_mm,
            });
        }
        Ok(())
    }

    /// Position of `sample` on the ramp, `None` for the invalid sample.
    ///
    /// Distances outside [near, far] saturate at the ends.
    pub fn normalized(&self, sample: u16) -> Option<f32> {
        if sample == INVALID_DEPTH {
            return None;
        }
        let mm = self.encoding.millimeters(sample) as f32;
        let near = self.near_mm as f32;
        let span = (self.far_mm as f32 - near).max(1.0);
        Some(((mm - near) / span).clamp(0.0, 1.0))
    }

    /// RGB for `sample`; `[0, 0, 0]` for the invalid sample.
    pub fn color(&self, sample: u16) -> [u8; 3] {
        match self.normalized(sample) {
            Some(t) => ramp(t),
            None => [0, 0, 0],
        }
    }

    /// Colorized pixel for `sample`: `[r, g, b, VALID_ALPHA]`, or all zero
    /// for the invalid sample.
    #[inline]
    pub fn pixel(&self, sample: u16) -> Rgba {
        if sample == INVALID_DEPTH {
            return Rgba::ZERO;
        }
        let [r, g, b] = self.color(sample);
        Rgba([r, g, b, VALID_ALPHA])
    }

    /// 8-bit intensity for feature tracking: near is bright, far and invalid
    /// are 0.
    pub fn intensity(&self, sample: u16) -> u8 {
        match self.normalized(sample) {
            Some(t) => ((1.0 - t) * 255.0).round() as u8,
            None => 0,
        }
    }
}

fn ramp(t: f32) -> [u8; 3] {
    let segments = (RAMP.len() - 1) as f32;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(RAMP.len() - 2);
    let frac = pos - i as f32;
    let (a, b) = (RAMP[i], RAMP[i + 1]);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = a[c] as f32 + (b[c] as f32 - a[c] as f32) * frac;
        out[c] = v.round() as u8;
    }
    out
}

/// Color for `sample` under the default palette.
pub fn depth_to_color(sample: u16) -> [u8; 3] {
    DepthPalette::default().color(sample)
}

/// Colorize every sample of `depth`.
pub fn colorize_depth_frame(depth: &Image<u16>, palette: &DepthPalette) -> Image<Rgba> {
    depth.map(|s| palette.pixel(s))
}

/// Colorize `depth` into a caller-allocated grid of the same size.
///
/// `dst` is left untouched on error.
pub fn colorize_depth_frame_into(
    depth: &Image<u16>,
    palette: &DepthPalette,
    dst: &mut Image<Rgba>,
) -> FrameResult<()> {
    if depth.dimensions() != dst.dimensions() {
        return Err(FrameError::SizeMismatch {
            expected: depth.dimensions(),
            actual: dst.dimensions(),
        });
    }
    for y in 0..depth.height() {
        for (out, &s) in dst.row_mut(y).iter_mut().zip(depth.row(y)) {
            *out = palette.pixel(s);
        }
    }
    Ok(())
}
