// error.rs -- Error types for frame conversion and feature tracking.

use thiserror::Error;

/// Failure to read a sensor frame into a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The driver has not filled the buffer yet (pitch is zero).
    #[error("frame has no data (pitch is 0)")]
    NoData,
    /// Destination grid dimensions differ from the expected resolution.
    #[error("size mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    SizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// A configuration value the pipeline cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The depth band is empty or inverted.
    #[error("depth band is empty: near {near_mm} mm must be below far {far_mm} mm")]
    DepthBand { near_mm: u16, far_mm: u16 },
    /// A numeric tracker parameter is out of range.
    #[error("{name} {reason}")]
    Parameter {
        name: &'static str,
        reason: &'static str,
    },
}

/// Failure inside feature detection or optical flow.
///
/// Always recoverable: the colorized output of the same call is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingFailure {
    /// The previous frame has different dimensions from the current one.
    #[error(
        "frame size changed from {}x{} to {}x{}",
        .previous.0, .previous.1, .current.0, .current.1
    )]
    FrameSizeChanged {
        previous: (usize, usize),
        current: (usize, usize),
    },
    /// The frame cannot hold a detection border or a tracking window.
    #[error("frame {width}x{height} is too small (need at least {min}x{min})")]
    FrameTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    /// The tracker configuration was rejected before any work was done.
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type FrameResult<T> = Result<T, FrameError>;
