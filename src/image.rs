// image.rs -- Runtime-sized pixel grid shared by every stage of the bridge.
//
// Sensor frames arrive as packed byte buffers; everything downstream works on
// `Image<T>`, a row-major grid whose element type says what the grid holds:
//
//   Image<Rgba>  color frames and colorized depth
//   Image<u16>   raw depth samples
//   Image<u8>    8-bit intensity fed to the feature detector
//   Image<f32>   filter intermediates and pyramid levels
//
// Rows may carry padding (stride >= width). Padding is never visible through
// the accessors, only through `as_slice`.

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Trait for types that can be stored in an `Image`.
///
/// `to_f32` is the scalar view used by filters: the raw value for integer and
/// float samples, BT.601 luma for `Rgba`.
pub trait Pixel: Copy + Default + Send + Sync + PartialEq + 'static {
    fn to_f32(self) -> f32;

    /// Build a pixel from a scalar, clamping and rounding for integer types.
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, 255.0).round() as u8
    }
}

impl Pixel for u16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, 65535.0).round() as u16
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

/// Four 8-bit channels, stored in the order they were written.
///
/// Color frames keep the sensor's byte order (BGRX on the Kinect); colorized
/// depth is `[r, g, b, marker]`. `#[repr(C)]` + `Pod` lets a whole grid be
/// reinterpreted as bytes without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// All four channels zero. Used for invalid depth.
    pub const ZERO: Rgba = Rgba([0, 0, 0, 0]);

    #[inline]
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba([r, g, b, a])
    }

    /// The first three channels.
    #[inline]
    pub fn rgb(self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    #[inline]
    pub fn alpha(self) -> u8 {
        self.0[3]
    }
}

impl Pixel for Rgba {
    #[inline]
    fn to_f32(self) -> f32 {
        let [r, g, b, _] = self.0;
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    }

    /// Gray pixel with full alpha.
    #[inline]
    fn from_f32(v: f32) -> Self {
        let g = u8::from_f32(v);
        Rgba([g, g, g, 255])
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D grid with runtime dimensions, generic over pixel type `T`.
#[derive(Clone)]
pub struct Image<T: Pixel> {
    /// Row-major samples. Length = height * stride.
    data: Vec<T>,
    width: usize,
    height: usize,
    /// Elements (not bytes) between the starts of consecutive rows.
    stride: usize,
}

impl<T: Pixel> Image<T> {
    /// Zero-initialized image, no row padding.
    pub fn new(width: usize, height: usize) -> Self {
        Self::new_with_stride(width, height, width)
    }

    /// Zero-initialized image with `stride - width` padding elements per row.
    ///
    /// # Panics
    /// Panics if `stride < width`.
    pub fn new_with_stride(width: usize, height: usize, stride: usize) -> Self {
        assert!(
            stride >= width,
            "stride ({stride}) must be >= width ({width})"
        );
        Image {
            data: vec![T::default(); height * stride],
            width,
            height,
            stride,
        }
    }

    /// Wrap a tightly packed row-major vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image {
            data,
            width,
            height,
            stride: width,
        }
    }

    /// Image of the given size with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image::from_vec(width, height, vec![value; width * height])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixel at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.stride + x]
    }

    /// Pixel read without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee `x < width` and `y < height`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.stride + x)
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        &mut self.data[idx]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Row `y` without its padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Overwrite every pixel (padding included) with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Iterate over `(x, y, value)` in row-major order, skipping padding.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height).flat_map(move |y| {
            self.row(y).iter().enumerate().map(move |(x, &v)| (x, y, v))
        })
    }

    /// Underlying buffer, padding included.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// New image of the same size with `f` applied to every pixel.
    pub fn map<U: Pixel, F: Fn(T) -> U>(&self, f: F) -> Image<U> {
        let mut dst = Image::new(self.width, self.height);
        for y in 0..self.height {
            for (d, &s) in dst.row_mut(y).iter_mut().zip(self.row(y)) {
                *d = f(s);
            }
        }
        dst
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}x{}",
            self.width,
            self.height,
        );
    }
}

impl Image<Rgba> {
    /// The raw bytes of the buffer, four per pixel, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Copy into an `image::RgbaImage` (padding dropped) for encoding.
    pub fn to_rgba_image(&self) -> ::image::RgbaImage {
        let mut out = ::image::RgbaImage::new(self.width as u32, self.height as u32);
        for (x, y, px) in self.pixels() {
            out.put_pixel(x as u32, y as u32, ::image::Rgba(px.0));
        }
        out
    }
}

/// Two images are equal when their visible pixels are; padding is ignored.
impl<T: Pixel> PartialEq for Image<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && (0..self.height).all(|y| self.row(y) == other.row(y))
    }
}

/// Prints the size and, for small images, every visible pixel.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Image");
        d.field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride);
        if self.width * self.height <= 64 {
            let rows: Vec<&[T]> = (0..self.height).map(|y| self.row(y)).collect();
            d.field("rows", &rows);
        }
        d.finish_non_exhaustive()
    }
}

/// Sub-pixel sample of an f32 image.
///
/// Coordinates outside the image are clamped to the border, so a patch that
/// hangs off the edge replicates edge pixels instead of failing.
///
/// # Panics
/// Panics if the image is empty.
pub fn interpolate_bilinear(img: &Image<f32>, x: f32, y: f32) -> f32 {
    assert!(
        img.width() > 0 && img.height() > 0,
        "cannot interpolate on an empty image"
    );

    let x = x.clamp(0.0, (img.width() - 1) as f32);
    let y = y.clamp(0.0, (img.height() - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    // SAFETY: x0, x1 < width and y0, y1 < height after clamping.
    unsafe {
        let top = (1.0 - fx) * img.get_unchecked(x0, y0) + fx * img.get_unchecked(x1, y0);
        let bottom = (1.0 - fx) * img.get_unchecked(x0, y1) + fx * img.get_unchecked(x1, y1);
        (1.0 - fy) * top + fy * bottom
    }
}
