//! Extended-finger classifier.
//!
//! * **Thumb**: extended iff the tip lies left of the IP joint (`tip.x < ip.x`).
//!   This only holds for a mirrored frame with the palm toward the camera; a
//!   back-facing or opposite hand reads inverted.
//! * **Index … pinky**: extended iff the tip is strictly above the PIP joint,
//!   two landmarks back along the same finger (`tip.y < pip.y`).

use crate::landmark::{
    HandLandmarkSet, INDEX_TIP, MIDDLE_TIP, PINKY_TIP, RING_TIP, THUMB_TIP,
};

/// Number of extended fingers, `0..=5`.
pub type FingerCount = u8;

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb  => THUMB_TIP,
            Finger::Index  => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring   => RING_TIP,
            Finger::Pinky  => PINKY_TIP,
        }
    }

    /// Joint the tip is compared against.
    pub fn reference_joint(self) -> usize {
        match self {
            Finger::Thumb => self.tip() - 1,
            _             => self.tip() - 2,
        }
    }

    pub fn is_extended(self, hand: &HandLandmarkSet) -> bool {
        let tip = hand[self.tip()];
        let joint = hand[self.reference_joint()];
        match self {
            Finger::Thumb => tip.x < joint.x,
            _             => tip.y < joint.y,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerStates
// ════════════════════════════════════════════════════════════════════════════

/// Per-finger extended flags, thumb first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerStates(pub [bool; 5]);

impl FingerStates {
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    pub fn count(&self) -> FingerCount {
        self.0.iter().filter(|&&up| up).count() as FingerCount
    }
}

pub fn finger_states(hand: &HandLandmarkSet) -> FingerStates {
    let mut states = [false; 5];
    for finger in Finger::ALL {
        states[finger as usize] = finger.is_extended(hand);
    }
    FingerStates(states)
}

/// Count extended fingers on one hand.
pub fn count_fingers(hand: &HandLandmarkSet) -> FingerCount {
    finger_states(hand).count()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
