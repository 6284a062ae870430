//! Hand landmark model.
//!
//! A detected hand is always a full set of [`LANDMARK_COUNT`] points; a frame
//! without a hand carries no set at all.  Partial sets cannot be built, so the
//! classifier never sees one.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// Bone connections used to draw the hand skeleton.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (MIDDLE_MCP, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (RING_MCP, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (WRIST, PINKY_MCP),
];

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One tracked point in normalized frame coordinates (`0.0..=1.0`, `y` down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y }
    }

    /// Horizontal flip, as applied to a mirrored camera frame.
    pub fn mirrored(self) -> Self {
        Landmark { x: 1.0 - self.x, y: self.y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LandmarkError {
    #[error("hand landmark set needs 21 points, got {0}")]
    WrongCount(usize),
}

// ════════════════════════════════════════════════════════════════════════════
// HandLandmarkSet
// ════════════════════════════════════════════════════════════════════════════

/// All 21 landmarks of one detected hand, addressable by anatomical index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct HandLandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarkSet {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        HandLandmarkSet { points }
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn mirrored(&self) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            *p = p.mirrored();
        }
        HandLandmarkSet { points }
    }

    /// Build a synthetic upright hand with the given fingers extended.
    ///
    /// `extended` is ordered thumb, index, middle, ring, pinky.  The pose is
    /// drawn as it appears in a mirrored frame: palm facing the camera, thumb
    /// pointing toward smaller `x`.  Handy for simulation and for tests.
    pub fn posed(extended: [bool; 5]) -> Self {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = Landmark::new(0.52, 0.86);

        // Thumb
        points[THUMB_CMC] = Landmark::new(0.44, 0.80);
        points[THUMB_MCP] = Landmark::new(0.38, 0.74);
        points[THUMB_IP]  = Landmark::new(0.33, 0.68);
        points[THUMB_TIP] = if extended[0] {
            Landmark::new(0.27, 0.63)
        } else {
            Landmark::new(0.41, 0.66)
        };

        // Index → pinky, one column each
        const COLUMNS: [f32; 4] = [0.42, 0.50, 0.58, 0.66];
        for (f, &x) in COLUMNS.iter().enumerate() {
            let mcp = INDEX_MCP + f * 4;
            points[mcp] = Landmark::new(x, 0.60);
            if extended[f + 1] {
                points[mcp + 1] = Landmark::new(x, 0.48);
                points[mcp + 2] = Landmark::new(x, 0.40);
                points[mcp + 3] = Landmark::new(x, 0.32);
            } else {
                points[mcp + 1] = Landmark::new(x, 0.52);
                points[mcp + 2] = Landmark::new(x + 0.01, 0.58);
                points[mcp + 3] = Landmark::new(x + 0.01, 0.63);
            }
        }

        HandLandmarkSet { points }
    }

    /// Synthetic hand with the first `n` fingers of index, middle, ring,
    /// pinky, thumb extended (so 1 is a pointing index, 2 a "V").
    pub fn with_count(n: u8) -> Self {
        const ORDER: [usize; 5] = [1, 2, 3, 4, 0];
        let mut extended = [false; 5];
        for &finger in ORDER.iter().take(n.min(5) as usize) {
            extended[finger] = true;
        }
        Self::posed(extended)
    }
}

impl Index<usize> for HandLandmarkSet {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.points[index]
    }
}

impl TryFrom<Vec<Landmark>> for HandLandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, LandmarkError> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|v: Vec<Landmark>| LandmarkError::WrongCount(v.len()))?;
        Ok(HandLandmarkSet { points })
    }
}

impl From<HandLandmarkSet> for Vec<Landmark> {
    fn from(set: HandLandmarkSet) -> Self {
        set.points.to_vec()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
