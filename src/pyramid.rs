// pyramid.rs -- Gaussian image pyramid for coarse-to-fine tracking.
//
// Level 0 is the input converted to f32. Each further level blurs the one
// above it and keeps every other pixel in both directions.

use crate::convert::to_f32_image;
use crate::convolution::{convolve_separable, gaussian_kernel_1d};
use crate::image::{Image, Pixel};

/// Pyramid levels from finest (index 0) to coarsest.
#[derive(Clone)]
pub struct Pyramid {
    pub levels: Vec<Image<f32>>,
}

impl Pyramid {
    /// Build up to `num_levels` levels.
    ///
    /// Stops early once a level would drop below 1x1, so a small frame gets a
    /// shorter pyramid rather than empty levels.
    ///
    /// # Panics
    /// Panics if `num_levels` is 0 or `sigma` is not positive.
    pub fn build<T: Pixel>(src: &Image<T>, num_levels: usize, sigma: f32) -> Self {
        assert!(num_levels >= 1, "pyramid must have at least 1 level");

        // Taps beyond the image side only re-read clamped edge pixels.
        let longest = src.width().max(src.height()).max(1);
        let half_size = ((3.0 * sigma).ceil().max(1.0) as usize).min(longest);
        let kernel = gaussian_kernel_1d(half_size, sigma);

        // Each level halves both sides, so a usize image has at most
        // usize::BITS levels.
        let mut levels = Vec::with_capacity(num_levels.min(usize::BITS as usize));
        levels.push(to_f32_image(src));

        while levels.len() < num_levels {
            let prev = &levels[levels.len() - 1];
            if prev.width() < 2 || prev.height() < 2 {
                break;
            }
            let blurred = convolve_separable(prev, &kernel, &kernel);
            levels.push(downsample_2x(&blurred));
        }

        Pyramid { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &Image<f32> {
        &self.levels[level]
    }
}

/// `dst(x, y) = src(2x, 2y)`; odd trailing rows/columns are dropped.
fn downsample_2x(src: &Image<f32>) -> Image<f32> {
    let (w, h) = (src.width() / 2, src.height() / 2);
    let mut dst = Image::new(w, h);
    for y in 0..h {
        let row = src.row(2 * y);
        for (x, d) in dst.row_mut(y).iter_mut().enumerate() {
            *d = row[2 * x];
        }
    }
    dst
}
