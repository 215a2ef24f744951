// frame.rs -- Copy packed sensor buffers into typed grids.
//
// The driver hands us a byte buffer, a row pitch in bytes and the stream's
// resolution. A pitch of zero means the driver has not delivered a frame yet.
//
// Color: 4 bytes per pixel, rows `pitch` bytes apart (pitch may include
// padding). Bytes are copied verbatim, no channel reordering.
//
// Depth: little-endian u16 samples, rows packed back to back (`width`
// samples apart). The depth pitch only gates the no-data check; it is never
// used for indexing, so a padded depth buffer is read as if it were packed.

use tracing::debug;

use crate::error::{FrameError, FrameResult};
use crate::image::{Image, Pixel, Rgba};
use crate::resolution::Resolution;

/// Borrowed view of one driver frame.
#[derive(Debug, Clone, Copy)]
pub struct SensorFrame<'a> {
    data: &'a [u8],
    pitch: usize,
    resolution: Resolution,
}

impl<'a> SensorFrame<'a> {
    pub fn new(data: &'a [u8], pitch: usize, resolution: Resolution) -> Self {
        SensorFrame {
            data,
            pitch,
            resolution,
        }
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// False until the driver has filled the buffer.
    pub fn has_data(&self) -> bool {
        self.pitch != 0
    }

    /// Allocate a grid at this frame's resolution and copy color into it.
    pub fn color_image(&self) -> FrameResult<Image<Rgba>> {
        let (w, h) = self.resolution.size();
        let mut dst = Image::new(w, h);
        copy_color_frame(self, &mut dst)?;
        Ok(dst)
    }

    /// Allocate a grid at this frame's resolution and copy depth into it.
    pub fn depth_image(&self) -> FrameResult<Image<u16>> {
        let (w, h) = self.resolution.size();
        let mut dst = Image::new(w, h);
        copy_depth_frame(self, &mut dst)?;
        Ok(dst)
    }
}

/// Copy a 4-byte-per-pixel color frame into `dst`.
///
/// `dst` is left untouched on error.
///
/// # Panics
/// Panics if the buffer is shorter than `(height - 1) * pitch + width * 4`
/// bytes, i.e. if pitch and resolution do not describe the buffer.
pub fn copy_color_frame(frame: &SensorFrame<'_>, dst: &mut Image<Rgba>) -> FrameResult<()> {
    if !frame.has_data() {
        return Err(FrameError::NoData);
    }
    verify_size(dst, frame.resolution)?;

    let (width, height) = frame.resolution.size();
    for y in 0..height {
        let src = &frame.data[y * frame.pitch..y * frame.pitch + width * 4];
        for (px, bytes) in dst.row_mut(y).iter_mut().zip(src.chunks_exact(4)) {
            *px = Rgba([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
    }
    Ok(())
}

/// Copy a 16-bit depth frame into `dst`.
///
/// Rows are read `width` samples apart regardless of `pitch`. `dst` is left
/// untouched on error.
///
/// # Panics
/// Panics if the buffer is shorter than `width * height * 2` bytes.
pub fn copy_depth_frame(frame: &SensorFrame<'_>, dst: &mut Image<u16>) -> FrameResult<()> {
    if !frame.has_data() {
        return Err(FrameError::NoData);
    }
    verify_size(dst, frame.resolution)?;

    let (width, height) = frame.resolution.size();
    let row_bytes = width * 2;
    for y in 0..height {
        let src = &frame.data[y * row_bytes..(y + 1) * row_bytes];
        for (sample, bytes) in dst.row_mut(y).iter_mut().zip(src.chunks_exact(2)) {
            *sample = u16::from_le_bytes([bytes[0], bytes[1]]);
        }
    }
    Ok(())
}

/// Check that `grid` is exactly the canonical size of `resolution`.
pub fn verify_size<T: Pixel>(grid: &Image<T>, resolution: Resolution) -> FrameResult<()> {
    let expected = resolution.size();
    let actual = grid.dimensions();
    if expected != actual {
        debug!(?expected, ?actual, "destination grid does not match stream resolution");
        return Err(FrameError::SizeMismatch { expected, actual });
    }
    Ok(())
}
