// features.rs -- "Good features to track" corner detector.
//
// Both measures start from the structure tensor of the image:
//
//   M = sum over window w(u, v) * [ Ix^2   IxIy ]
//                                 [ IxIy   Iy^2 ]
//
// with 3x3 Sobel gradients (central difference across, [1 2 1] smoothing
// along) and a Gaussian window. Shi-Tomasi scores a pixel by
// the smaller eigenvalue of M; Harris by det(M) - k * trace(M)^2.
//
// Selection:
//   1. keep pixels whose score is a 3x3 local maximum and exceeds
//      quality_level * (best score in the image)
//   2. sort by score, strongest first
//   3. greedily accept corners at least min_distance from every corner
//      already accepted, until max_corners are found

use serde::{Deserialize, Serialize};

use crate::convolution::{convolve_separable, gaussian_kernel_1d};
use crate::error::TrackingFailure;
use crate::image::{Image, Pixel};

const CENTRAL_DIFF: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// A detected or tracked point.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Sub-pixel column.
    pub x: f32,
    /// Sub-pixel row.
    pub y: f32,
    /// Corner score at detection time.
    pub score: f32,
    /// Persistent id, assigned when the feature is first detected. 0 means
    /// unassigned.
    pub id: u64,
}

/// Corner response used by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CornerMeasure {
    /// Minimum eigenvalue of the structure tensor (Shi-Tomasi).
    #[default]
    MinEigen,
    /// Harris response with sensitivity `k` (typically 0.04-0.06).
    Harris { k: f32 },
}

/// Corner detector with a bounded, spatially spread output.
#[derive(Debug, Clone)]
pub struct GoodFeaturesDetector {
    /// Upper bound on returned corners.
    pub max_corners: usize,
    /// Fraction of the strongest response a corner must reach.
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners, in pixels.
    pub min_distance: f32,
    /// Half-size of the Gaussian window: 1 -> 3x3, 2 -> 5x5.
    pub block_size: usize,
    pub measure: CornerMeasure,
}

impl GoodFeaturesDetector {
    pub fn new(max_corners: usize, quality_level: f32, min_distance: f32) -> Self {
        GoodFeaturesDetector {
            max_corners,
            quality_level,
            min_distance,
            block_size: 1,
            measure: CornerMeasure::MinEigen,
        }
    }

    pub fn with_measure(mut self, measure: CornerMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Pixels excluded at each image edge.
    pub fn border(&self) -> usize {
        self.block_size.saturating_add(2)
    }

    /// Score of every pixel under the configured measure.
    pub fn corner_response<T: Pixel>(&self, image: &Image<T>) -> Image<f32> {
        let (w, h) = image.dimensions();
        let ix = convolve_separable(image, &CENTRAL_DIFF, &SOBEL_SMOOTH);
        let iy = convolve_separable(image, &SOBEL_SMOOTH, &CENTRAL_DIFF);

        let mut ixx = Image::<f32>::new(w, h);
        let mut iyy = Image::<f32>::new(w, h);
        let mut ixy = Image::<f32>::new(w, h);
        for y in 0..h {
            let grads = ix.row(y).iter().zip(iy.row(y));
            let products = ixx.row_mut(y).iter_mut().zip(iyy.row_mut(y).iter_mut());
            for (((xx, yy), (&gx, &gy)), xy) in products.zip(grads).zip(ixy.row_mut(y).iter_mut()) {
                *xx = gx * gx;
                *yy = gy * gy;
                *xy = gx * gy;
            }
        }

        // A window wider than the image only repeats clamped edge pixels.
        let half = self.block_size.min(w.max(h));
        let sigma = self.block_size as f32 * 0.5 + 0.5;
        let kernel = gaussian_kernel_1d(half, sigma);
        let sxx = convolve_separable(&ixx, &kernel, &kernel);
        let syy = convolve_separable(&iyy, &kernel, &kernel);
        let sxy = convolve_separable(&ixy, &kernel, &kernel);

        let mut response = Image::<f32>::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let (a, b, c) = (sxx.get(x, y), syy.get(x, y), sxy.get(x, y));
                let r = match self.measure {
                    CornerMeasure::MinEigen => {
                        let half_trace = 0.5 * (a + b);
                        let disc = (0.25 * (a - b) * (a - b) + c * c).sqrt();
                        half_trace - disc
                    }
                    CornerMeasure::Harris { k } => {
                        let trace = a + b;
                        a * b - c * c - k * trace * trace
                    }
                };
                response.set(x, y, r);
            }
        }
        response
    }

    /// Detect up to `max_corners` corners, strongest first. Ids are left at 0.
    ///
    /// Returns `FrameTooSmall` if the image has no interior once the border
    /// is removed.
    pub fn detect(&self, image: &Image<u8>) -> Result<Vec<Feature>, TrackingFailure> {
        let (w, h) = image.dimensions();
        let border = self.border();
        let min = border.saturating_mul(2).saturating_add(1);
        if w < min || h < min {
            return Err(TrackingFailure::FrameTooSmall {
                width: w,
                height: h,
                min,
            });
        }
        if self.max_corners == 0 {
            return Ok(Vec::new());
        }

        let response = self.corner_response(image);

        let mut best = 0.0f32;
        for y in border..h - border {
            for &r in &response.row(y)[border..w - border] {
                best = best.max(r);
            }
        }
        if best <= 0.0 {
            return Ok(Vec::new());
        }
        let threshold = best * self.quality_level;

        let mut candidates = Vec::new();
        for y in border..h - border {
            for x in border..w - border {
                let r = response.get(x, y);
                if r > threshold && is_local_max(&response, x, y) {
                    candidates.push(Feature {
                        x: x as f32,
                        y: y as f32,
                        score: r,
                        id: 0,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let min_dist_sq = self.min_distance * self.min_distance;
        let mut accepted: Vec<Feature> = Vec::with_capacity(self.max_corners.min(candidates.len()));
        for c in candidates {
            let far_enough = accepted.iter().all(|a| {
                let (dx, dy) = (a.x - c.x, a.y - c.y);
                dx * dx + dy * dy >= min_dist_sq
            });
            if far_enough {
                accepted.push(c);
                if accepted.len() == self.max_corners {
                    break;
                }
            }
        }
        Ok(accepted)
    }
}

/// `(x, y)` is not exceeded by any 8-neighbour. Caller keeps `(x, y)` off the
/// image edge.
fn is_local_max(response: &Image<f32>, x: usize, y: usize) -> bool {
    let r = response.get(x, y);
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if response.get(nx, ny) > r {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chessboard(size: usize, cell: usize, lo: u8, hi: u8) -> Image<u8> {
        let mut img = Image::new(size, size);
        for y in 0..size {
            for x in 0..size {
                img.set(x, y, if (x / cell + y / cell) % 2 == 0 { lo } else { hi });
            }
        }
        img
    }

    fn make_square(size: usize, x0: usize, side: usize) -> Image<u8> {
        let mut img = Image::filled(size, size, 20u8);
        for y in x0..x0 + side {
            for x in x0..x0 + side {
                img.set(x, y, 220);
            }
        }
        img
    }

    #[test]
    fn test_square_corners_found() {
        let img = make_square(60, 20, 20);
        let det = GoodFeaturesDetector::new(10, 0.1, 5.0);
        let features = det.detect(&img).unwrap();
        assert_eq!(features.len(), 4, "one per square corner: {features:?}");
        for f in &features {
            let near_x = (f.x - 20.0).abs() <= 2.0 || (f.x - 39.0).abs() <= 2.0;
            let near_y = (f.y - 20.0).abs() <= 2.0 || (f.y - 39.0).abs() <= 2.0;
            assert!(near_x && near_y, "corner at ({}, {})", f.x, f.y);
        }
    }

    #[test]
    fn test_max_corners_respected() {
        let img = make_chessboard(100, 10, 20, 230);
        let det = GoodFeaturesDetector::new(7, 0.01, 3.0);
        let features = det.detect(&img).unwrap();
        assert_eq!(features.len(), 7);
    }

    #[test]
    fn test_min_distance_respected() {
        let img = make_chessboard(100, 10, 20, 230);
        let det = GoodFeaturesDetector::new(100, 0.01, 8.0);
        let features = det.detect(&img).unwrap();
        assert!(!features.is_empty());
        for (i, a) in features.iter().enumerate() {
            for b in &features[i + 1..] {
                let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(d >= 8.0, "({},{}) and ({},{}) are {d:.1} apart", a.x, a.y, b.x, b.y);
            }
        }
    }

    #[test]
    fn test_sorted_by_score() {
        let img = make_chessboard(80, 10, 20, 230);
        let det = GoodFeaturesDetector::new(30, 0.01, 3.0);
        let features = det.detect(&img).unwrap();
        assert!(features.windows(2).all(|p| p[0].score >= p[1].score));
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let img = Image::filled(40, 40, 128u8);
        let det = GoodFeaturesDetector::new(20, 0.01, 5.0);
        assert!(det.detect(&img).unwrap().is_empty());
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        let mut img = Image::filled(40, 40, 30u8);
        for y in 0..40 {
            for x in 20..40 {
                img.set(x, y, 220);
            }
        }
        let det = GoodFeaturesDetector::new(20, 0.01, 5.0);
        assert!(det.detect(&img).unwrap().is_empty());
    }

    #[test]
    fn test_harris_measure_finds_square_corners() {
        let img = make_square(60, 20, 20);
        let det = GoodFeaturesDetector::new(10, 0.1, 5.0)
            .with_measure(CornerMeasure::Harris { k: 0.04 });
        let features = det.detect(&img).unwrap();
        assert_eq!(features.len(), 4);
    }

    #[test]
    fn test_linear_ramp_has_no_corner_response() {
        // f(x, y) = 3x: gradients are (24, 0) everywhere inside, so the
        // structure tensor is rank one.
        let mut img = Image::<u8>::new(30, 20);
        for y in 0..20 {
            for x in 0..30 {
                img.set(x, y, (3 * x) as u8);
            }
        }
        let det = GoodFeaturesDetector::new(10, 0.01, 5.0);
        let response = det.corner_response(&img);
        for y in 4..16 {
            for x in 4..26 {
                assert!(response.get(x, y).abs() < 1e-2, "({x},{y}) = {}", response.get(x, y));
            }
        }
    }

    #[test]
    fn test_unbounded_max_corners() {
        let img = make_square(60, 20, 20);
        let det = GoodFeaturesDetector::new(usize::MAX, 0.1, 5.0);
        assert_eq!(det.detect(&img).unwrap().len(), 4);
    }

    #[test]
    fn test_huge_block_size_is_too_small() {
        let img = make_square(60, 20, 20);
        let det = GoodFeaturesDetector {
            block_size: usize::MAX,
            ..GoodFeaturesDetector::new(10, 0.1, 5.0)
        };
        assert_eq!(
            det.detect(&img),
            Err(TrackingFailure::FrameTooSmall { width: 60, height: 60, min: usize::MAX })
        );
    }

    #[test]
    fn test_too_small_frame() {
        let img = Image::filled(5, 5, 0u8);
        let det = GoodFeaturesDetector::new(20, 0.01, 5.0);
        assert!(matches!(
            det.detect(&img),
            Err(TrackingFailure::FrameTooSmall { .. })
        ));
    }
}
