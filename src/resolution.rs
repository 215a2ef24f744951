// resolution.rs -- The fixed set of sensor resolutions.
//
// The depth and color streams each run at one of four resolutions. Every
// destination grid is sized from this table, and `frame::verify_size` checks
// grids against it.

use serde::{Deserialize, Serialize};

/// A supported sensor resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    R80x60,
    R320x240,
    R640x480,
    R1280x960,
}

impl Resolution {
    /// Every supported resolution, smallest first.
    pub const ALL: [Resolution; 4] = [
        Resolution::R80x60,
        Resolution::R320x240,
        Resolution::R640x480,
        Resolution::R1280x960,
    ];

    /// Canonical `(width, height)` in pixels.
    pub const fn size(self) -> (usize, usize) {
        match self {
            Resolution::R80x60 => (80, 60),
            Resolution::R320x240 => (320, 240),
            Resolution::R640x480 => (640, 480),
            Resolution::R1280x960 => (1280, 960),
        }
    }

    pub const fn width(self) -> usize {
        self.size().0
    }

    pub const fn height(self) -> usize {
        self.size().1
    }

    /// Resolution whose canonical size is exactly `(width, height)`.
    pub fn from_size(width: usize, height: usize) -> Option<Resolution> {
        Self::ALL.into_iter().find(|r| r.size() == (width, height))
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::R640x480
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_are_4_by_3() {
        for res in Resolution::ALL {
            let (w, h) = res.size();
            assert_eq!(w * 3, h * 4, "{res:?} is not 4:3");
        }
    }

    #[test]
    fn test_from_size_roundtrip() {
        for res in Resolution::ALL {
            assert_eq!(Resolution::from_size(res.width(), res.height()), Some(res));
        }
        assert_eq!(Resolution::from_size(641, 480), None);
    }
}
