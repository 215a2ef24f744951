// tracking.rs -- Colorize a depth stream while tracking corners across frames.
//
// Per call:
//   1. depth -> 8-bit intensity (near bright, invalid black)
//   2. no previous features -> detect up to max_features corners
//      otherwise            -> carry the previous features forward with LK
//   3. colorize the depth frame
//   4. store the intensity frame, depth frame and features for the next call
//
// Step 2 is best effort and starts by checking the configuration. If it
// fails, the failure is logged and returned next to a normal colorized
// frame, and the feature set is cleared so the following call detects
// afresh.
//
// The state is a plain value owned by the caller. One state per stream; the
// `&mut` borrow is the only synchronization.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::colorize::{colorize_depth_frame, DepthPalette};
use crate::convert::depth_to_intensity;
use crate::error::{ConfigError, TrackingFailure};
use crate::features::{CornerMeasure, Feature, GoodFeaturesDetector};
use crate::image::{Image, Rgba};
use crate::klt::{KltTracker, TrackStatus, DEFAULT_MIN_EIGEN_THRESHOLD};
use crate::pyramid::Pyramid;

/// Tracker configuration. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Depth band and encoding for colorizing and for the intensity image.
    pub palette: DepthPalette,
    /// Features detected when the state holds none.
    pub max_features: usize,
    /// Minimum corner strength relative to the strongest corner.
    pub quality_level: f32,
    /// Minimum spacing between detected corners, in pixels.
    pub min_distance: f32,
    /// Structure tensor window half-size.
    pub block_size: usize,
    pub corner_measure: CornerMeasure,
    pub pyramid_levels: usize,
    pub pyramid_sigma: f32,
    /// LK patch half-size.
    pub window_size: usize,
    pub max_iterations: usize,
    /// LK convergence threshold in pixels.
    pub epsilon: f32,
    pub min_eigen_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            palette: DepthPalette::default(),
            max_features: 20,
            quality_level: 0.01,
            min_distance: 10.0,
            block_size: 1,
            corner_measure: CornerMeasure::MinEigen,
            pyramid_levels: 3,
            pyramid_sigma: 1.0,
            window_size: 7,
            max_iterations: 30,
            epsilon: 0.01,
            min_eigen_threshold: DEFAULT_MIN_EIGEN_THRESHOLD,
        }
    }
}

impl TrackerConfig {
    /// Reject values the detector or tracker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.palette.validate()?;

        let param = |name: &'static str, reason: &'static str| -> Result<(), ConfigError> {
            Err(ConfigError::Parameter { name, reason })
        };
        if !(self.pyramid_sigma.is_finite() && self.pyramid_sigma > 0.0) {
            return param("pyramid_sigma", "must be positive and finite");
        }
        if self.pyramid_levels == 0 {
            return param("pyramid_levels", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.quality_level) {
            return param("quality_level", "must be within [0, 1]");
        }
        let non_negative = [
            ("min_distance", self.min_distance),
            ("epsilon", self.epsilon),
            ("min_eigen_threshold", self.min_eigen_threshold),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return param(name, "must be non-negative and finite");
            }
        }
        if let CornerMeasure::Harris { k } = self.corner_measure {
            if !k.is_finite() {
                return param("corner_measure.k", "must be finite");
            }
        }
        Ok(())
    }
}

/// What the caller carries from one frame to the next.
#[derive(Debug, Clone, Default)]
pub struct DepthTrackerState {
    previous_frame: Option<Image<u8>>,
    previous_depth: Option<Image<u16>>,
    previous_features: Vec<Feature>,
    frames: u64,
    next_id: u64,
}

impl DepthTrackerState {
    /// Empty state: the next call detects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intensity image of the last frame.
    pub fn previous_frame(&self) -> Option<&Image<u8>> {
        self.previous_frame.as_ref()
    }

    /// Raw depth of the last frame, for `delta::depth_delta`.
    pub fn previous_depth(&self) -> Option<&Image<u16>> {
        self.previous_depth.as_ref()
    }

    pub fn previous_features(&self) -> &[Feature] {
        &self.previous_features
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Forget everything; the next call detects.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn assign_ids(&mut self, features: &mut [Feature]) {
        for f in features {
            self.next_id += 1;
            f.id = self.next_id;
        }
    }
}

/// How this frame's feature set was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    Detected,
    Tracked,
}

/// Feature set for the current frame.
#[derive(Debug, Clone)]
pub struct TrackingOutcome {
    pub mode: TrackingMode,
    pub features: Vec<Feature>,
    /// One entry per feature. Lost features are kept in `features`; callers
    /// that want only live points filter on this.
    pub status: Vec<TrackStatus>,
}

impl TrackingOutcome {
    pub fn tracked_count(&self) -> usize {
        self.status.iter().filter(|&&s| s == TrackStatus::Tracked).count()
    }
}

/// Result of one colorization call.
#[derive(Debug, Clone)]
pub struct TemporalFrame {
    /// Always produced, regardless of `tracking`.
    pub colorized: Image<Rgba>,
    pub tracking: Result<TrackingOutcome, TrackingFailure>,
}

/// Detector + tracker pair built from a `TrackerConfig`.
#[derive(Debug, Clone)]
pub struct DepthTracker {
    config: TrackerConfig,
    detector: GoodFeaturesDetector,
    klt: KltTracker,
}

impl DepthTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let detector = GoodFeaturesDetector {
            max_corners: config.max_features,
            quality_level: config.quality_level,
            min_distance: config.min_distance,
            block_size: config.block_size,
            measure: config.corner_measure,
        };
        let klt = KltTracker {
            window_size: config.window_size,
            max_iterations: config.max_iterations,
            epsilon: config.epsilon,
            max_levels: config.pyramid_levels,
            min_eigen_threshold: config.min_eigen_threshold,
        };
        DepthTracker {
            config,
            detector,
            klt,
        }
    }

    /// Like `new`, but rejects an unusable configuration up front instead of
    /// on every call.
    pub fn try_new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Colorize `depth` and advance the feature set held in `state`.
    pub fn colorize_with_temporal_tracking(
        &self,
        depth: &Image<u16>,
        state: &mut DepthTrackerState,
    ) -> TemporalFrame {
        let intensity = depth_to_intensity(depth, &self.config.palette);

        let tracking = self.update_features(&intensity, state);
        match &tracking {
            Ok(outcome) => {
                debug!(
                    frame = state.frames,
                    mode = ?outcome.mode,
                    features = outcome.features.len(),
                    tracked = outcome.tracked_count(),
                    "depth features updated"
                );
                state.previous_features = outcome.features.clone();
            }
            Err(err) => {
                warn!(frame = state.frames, error = %err, "feature tracking failed, colorizing without it");
                state.previous_features.clear();
            }
        }

        let colorized = colorize_depth_frame(depth, &self.config.palette);

        state.previous_frame = Some(intensity);
        state.previous_depth = Some(depth.clone());
        state.frames += 1;

        TemporalFrame {
            colorized,
            tracking,
        }
    }

    fn update_features(
        &self,
        intensity: &Image<u8>,
        state: &mut DepthTrackerState,
    ) -> Result<TrackingOutcome, TrackingFailure> {
        self.config.validate()?;

        let previous = match &state.previous_frame {
            Some(prev) if !state.previous_features.is_empty() => prev,
            _ => {
                let mut features = self.detector.detect(intensity)?;
                state.assign_ids(&mut features);
                let status = vec![TrackStatus::Tracked; features.len()];
                return Ok(TrackingOutcome {
                    mode: TrackingMode::Detected,
                    features,
                    status,
                });
            }
        };

        let (levels, sigma) = (self.config.pyramid_levels, self.config.pyramid_sigma);
        let prev_pyr = Pyramid::build(previous, levels, sigma);
        let curr_pyr = Pyramid::build(intensity, levels, sigma);
        let tracked = self.klt.track(&prev_pyr, &curr_pyr, &state.previous_features)?;

        let (features, status) = tracked.into_iter().map(|t| (t.feature, t.status)).unzip();
        Ok(TrackingOutcome {
            mode: TrackingMode::Tracked,
            features,
            status,
        })
    }
}

impl Default for DepthTracker {
    fn default() -> Self {
        DepthTracker::new(TrackerConfig::default())
    }
}
