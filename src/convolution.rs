// convolution.rs -- Separable 1D convolution with clamp-to-edge borders.
//
// A separable 2D kernel K = k_col * k_row^T is applied as a row pass followed
// by a column pass. Taps that fall outside the image read the nearest edge
// pixel. Kernels are centered: tap `i` of a length-K kernel reads offset
// `i - K/2`.

use crate::image::{Image, Pixel};

#[inline]
fn clamped(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

fn check_kernel(kernel: &[f32]) {
    assert!(
        kernel.len() % 2 == 1,
        "kernel length must be odd (got {})",
        kernel.len()
    );
}

/// Horizontal pass.
pub fn convolve_rows<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);
    let (w, h) = src.dimensions();
    let half = (kernel.len() / 2) as isize;
    let mut dst = Image::<f32>::new(w, h);
    if w == 0 {
        return dst;
    }

    for y in 0..h {
        let row = src.row(y);
        let out = dst.row_mut(y);
        for (x, o) in out.iter_mut().enumerate() {
            *o = kernel
                .iter()
                .enumerate()
                .map(|(k, &kv)| row[clamped(x as isize + k as isize - half, w)].to_f32() * kv)
                .sum();
        }
    }
    dst
}

/// Vertical pass.
pub fn convolve_cols(src: &Image<f32>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);
    let (w, h) = src.dimensions();
    let half = (kernel.len() / 2) as isize;
    let mut dst = Image::<f32>::new(w, h);
    if h == 0 {
        return dst;
    }

    for y in 0..h {
        for (k, &kv) in kernel.iter().enumerate() {
            let sy = clamped(y as isize + k as isize - half, h);
            // Accumulate whole rows at a time; row slices are contiguous.
            let (src_row, out) = (src.row(sy), dst.row_mut(y));
            for (o, &s) in out.iter_mut().zip(src_row) {
                *o += s * kv;
            }
        }
    }
    dst
}

/// Row pass with `kernel_row`, then column pass with `kernel_col`.
///
/// # Panics
/// Panics if either kernel has even length.
pub fn convolve_separable<T: Pixel>(
    src: &Image<T>,
    kernel_row: &[f32],
    kernel_col: &[f32],
) -> Image<f32> {
    convolve_cols(&convolve_rows(src, kernel_row), kernel_col)
}

/// Normalized Gaussian of length `2 * half_size + 1`.
///
/// ```
/// let k = depthbridge::convolution::gaussian_kernel_1d(2, 1.0);
/// assert_eq!(k.len(), 5);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
/// ```
pub fn gaussian_kernel_1d(half_size: usize, sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "sigma must be positive");
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * half_size)
        .map(|i| {
            let d = i as f32 - half_size as f32;
            (-d * d / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|v| *v /= sum);
    kernel
}
