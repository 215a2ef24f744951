// delta.rs -- Inter-frame depth difference.
//
// `current - previous` per pixel, saturating at 0 so that surfaces moving
// away from the sensor show up and surfaces moving closer vanish. A pixel
// that is invalid in either frame stays invalid in the delta.

use crate::colorize::{colorize_depth_frame, DepthPalette, INVALID_DEPTH};
use crate::error::{FrameError, FrameResult};
use crate::image::{Image, Rgba};

/// Saturating per-pixel `current - previous`.
pub fn depth_delta(previous: &Image<u16>, current: &Image<u16>) -> FrameResult<Image<u16>> {
    if previous.dimensions() != current.dimensions() {
        return Err(FrameError::SizeMismatch {
            expected: previous.dimensions(),
            actual: current.dimensions(),
        });
    }

    let mut out = Image::new(current.width(), current.height());
    for y in 0..current.height() {
        let rows = previous.row(y).iter().zip(current.row(y));
        for (d, (&p, &c)) in out.row_mut(y).iter_mut().zip(rows) {
            *d = if p == INVALID_DEPTH || c == INVALID_DEPTH {
                INVALID_DEPTH
            } else {
                c.saturating_sub(p)
            };
        }
    }
    Ok(out)
}

/// Delta of two depth frames, colorized with `palette`.
pub fn colorize_depth_delta(
    previous: &Image<u16>,
    current: &Image<u16>,
    palette: &DepthPalette,
) -> FrameResult<Image<Rgba>> {
    let delta = depth_delta(previous, current)?;
    Ok(colorize_depth_frame(&delta, palette))
}
