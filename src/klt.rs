// klt.rs -- Pyramidal Lucas-Kanade sparse optical flow.
//
// Each feature is a square patch of side 2 * window_size + 1 around its
// position in the previous frame. We solve for the translation d that best
// aligns the patch with the current frame, coarse to fine:
//
//   at the coarsest level start from d = 0
//   at each level run Gauss-Newton on d, then double d for the next level
//
// Template gradients come from the previous frame (inverse compositional),
// so the 2x2 normal matrix G is built once per level and only the mismatch
// vector b is recomputed per iteration:
//
//   G = sum [gx*gx  gx*gy]      b = sum (T - I(p + d)) * [gx]
//           [gx*gy  gy*gy]                              [gy]
//   d += G^-1 b
//
// A patch whose smallest eigenvalue of G (per pixel) falls under
// `min_eigen_threshold` has no usable texture; the feature is reported Lost.

use crate::error::TrackingFailure;
use crate::features::Feature;
use crate::image::{interpolate_bilinear, Image};
use crate::pyramid::Pyramid;

/// Default for `KltTracker::min_eigen_threshold`.
pub const DEFAULT_MIN_EIGEN_THRESHOLD: f32 = 1e-3;

/// Outcome for one feature after a tracking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Tracked,
    /// Patch too flat to solve, or the solve diverged.
    Lost,
    /// Converged to a position outside the frame.
    OutOfBounds,
}

/// A feature carried to the current frame together with its status.
#[derive(Debug, Clone)]
pub struct TrackedFeature {
    /// Updated position; unreliable unless `status` is `Tracked`.
    pub feature: Feature,
    pub status: TrackStatus,
}

/// Pyramidal LK tracker parameters.
#[derive(Debug, Clone)]
pub struct KltTracker {
    /// Patch half-size; the patch is (2 * window_size + 1)^2 pixels.
    pub window_size: usize,
    /// Gauss-Newton iterations per pyramid level.
    pub max_iterations: usize,
    /// Stop iterating once the update is shorter than this (pixels).
    pub epsilon: f32,
    /// Pyramid levels to use, capped by what both pyramids provide.
    pub max_levels: usize,
    /// Minimum per-pixel eigenvalue of the patch's normal matrix.
    pub min_eigen_threshold: f32,
}

enum Refine {
    Converged(f32, f32),
    Degenerate,
}

impl KltTracker {
    pub fn new(window_size: usize, max_iterations: usize, epsilon: f32, max_levels: usize) -> Self {
        KltTracker {
            window_size,
            max_iterations,
            epsilon,
            max_levels,
            min_eigen_threshold: DEFAULT_MIN_EIGEN_THRESHOLD,
        }
    }

    /// Smallest frame side that can hold one patch.
    pub fn min_frame_size(&self) -> usize {
        self.window_size.saturating_mul(2).saturating_add(1)
    }

    /// Carry `features` from the previous frame to the current one.
    ///
    /// Returns one entry per input feature, in input order.
    pub fn track(
        &self,
        prev_pyramid: &Pyramid,
        curr_pyramid: &Pyramid,
        features: &[Feature],
    ) -> Result<Vec<TrackedFeature>, TrackingFailure> {
        let prev_dims = prev_pyramid.level(0).dimensions();
        let curr_dims = curr_pyramid.level(0).dimensions();
        if prev_dims != curr_dims {
            return Err(TrackingFailure::FrameSizeChanged {
                previous: prev_dims,
                current: curr_dims,
            });
        }
        let min = self.min_frame_size();
        if curr_dims.0 < min || curr_dims.1 < min {
            return Err(TrackingFailure::FrameTooSmall {
                width: curr_dims.0,
                height: curr_dims.1,
                min,
            });
        }

        let available = prev_pyramid.num_levels().min(curr_pyramid.num_levels());
        let num_levels = (0..available.min(self.max_levels.max(1)))
            .take_while(|&l| {
                let (w, h) = curr_pyramid.level(l).dimensions();
                w >= min && h >= min
            })
            .count();

        Ok(features
            .iter()
            .map(|f| self.track_single(prev_pyramid, curr_pyramid, f, num_levels))
            .collect())
    }

    fn track_single(
        &self,
        prev_pyr: &Pyramid,
        curr_pyr: &Pyramid,
        feature: &Feature,
        num_levels: usize,
    ) -> TrackedFeature {
        let (mut dx, mut dy) = (0.0f32, 0.0f32);

        for level in (0..num_levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let refined = self.refine(
                prev_pyr.level(level),
                curr_pyr.level(level),
                feature.x * scale,
                feature.y * scale,
                dx,
                dy,
            );
            match refined {
                Refine::Converged(nx, ny) => {
                    dx = nx;
                    dy = ny;
                }
                Refine::Degenerate => {
                    return TrackedFeature {
                        feature: Feature {
                            x: feature.x + dx / scale,
                            y: feature.y + dy / scale,
                            ..feature.clone()
                        },
                        status: TrackStatus::Lost,
                    };
                }
            }
            if level > 0 {
                dx *= 2.0;
                dy *= 2.0;
            }
        }

        let (x, y) = (feature.x + dx, feature.y + dy);
        let (w, h) = curr_pyr.level(0).dimensions();
        let status = if !x.is_finite() || !y.is_finite() {
            TrackStatus::Lost
        } else if x >= 0.0 && y >= 0.0 && x < w as f32 && y < h as f32 {
            TrackStatus::Tracked
        } else {
            TrackStatus::OutOfBounds
        };

        TrackedFeature {
            feature: Feature {
                x,
                y,
                ..feature.clone()
            },
            status,
        }
    }

    /// Gauss-Newton on the translation at one level, starting from `(dx, dy)`.
    fn refine(
        &self,
        prev: &Image<f32>,
        curr: &Image<f32>,
        fx: f32,
        fy: f32,
        mut dx: f32,
        mut dy: f32,
    ) -> Refine {
        let half = self.window_size as isize;
        let side = 2 * self.window_size + 1;
        let area = (side * side) as f32;

        let mut template = Vec::with_capacity(side * side);
        let (mut g00, mut g01, mut g11) = (0.0f32, 0.0f32, 0.0f32);
        for py in -half..=half {
            for px in -half..=half {
                let (tx, ty) = (fx + px as f32, fy + py as f32);
                let gx = 0.5
                    * (interpolate_bilinear(prev, tx + 1.0, ty)
                        - interpolate_bilinear(prev, tx - 1.0, ty));
                let gy = 0.5
                    * (interpolate_bilinear(prev, tx, ty + 1.0)
                        - interpolate_bilinear(prev, tx, ty - 1.0));
                g00 += gx * gx;
                g01 += gx * gy;
                g11 += gy * gy;
                template.push((px as f32, py as f32, interpolate_bilinear(prev, tx, ty), gx, gy));
            }
        }

        let min_eigen =
            0.5 * (g00 + g11) - (0.25 * (g00 - g11) * (g00 - g11) + g01 * g01).sqrt();
        let det = g00 * g11 - g01 * g01;
        if min_eigen / area < self.min_eigen_threshold || det.abs() < f32::EPSILON {
            return Refine::Degenerate;
        }
        let inv_det = 1.0 / det;

        for _ in 0..self.max_iterations {
            let (mut b0, mut b1) = (0.0f32, 0.0f32);
            for &(ox, oy, t, gx, gy) in &template {
                let e = t - interpolate_bilinear(curr, fx + dx + ox, fy + dy + oy);
                b0 += gx * e;
                b1 += gy * e;
            }

            let ux = inv_det * (g11 * b0 - g01 * b1);
            let uy = inv_det * (g00 * b1 - g01 * b0);
            dx += ux;
            dy += uy;

            if !dx.is_finite() || !dy.is_finite() {
                return Refine::Degenerate;
            }
            if ux * ux + uy * uy < self.epsilon * self.epsilon {
                break;
            }
        }
        Refine::Converged(dx, dy)
    }
}
