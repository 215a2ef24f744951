// depthbridge: Kinect-style frame conversion and depth visualization
//
// Raw sensor buffers are copied into typed grids (`frame`), depth grids are
// painted with a near-to-far hue ramp (`colorize`), and a stream of depth
// frames can carry a small set of corner features forward with pyramidal
// Lucas-Kanade (`tracking`).

pub mod image;
pub mod resolution;
pub mod error;

pub mod frame;
pub mod colorize;
pub mod delta;

pub mod convert;
pub mod convolution;
pub mod pyramid;
pub mod features;
pub mod klt;
pub mod tracking;

pub use colorize::{colorize_depth_frame, depth_to_color, DepthEncoding, DepthPalette};
pub use error::{ConfigError, FrameError, FrameResult, TrackingFailure};
pub use frame::{copy_color_frame, copy_depth_frame, verify_size, SensorFrame};
pub use image::{Image, Pixel, Rgba};
pub use resolution::Resolution;
pub use tracking::{DepthTracker, DepthTrackerState, TemporalFrame, TrackerConfig};
