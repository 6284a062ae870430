//! # finger_gesture
//!
//! Counts extended fingers on a 21-point hand landmark set and turns the
//! count into exclusive Up/Down arrow key holds.
//!
//! ## Finger count → Action mapping
//!
//! | Fingers | Action | Keys |
//! |---|---|---|
//! | 1 | Accelerate | Up held, Down released |
//! | 2 | Brake | Down held, Up released |
//! | 0, 3, 4, 5 | Idle | both released |
//!
//! The landmark layout is the usual 21-point hand model: wrist at 0, then four
//! points per finger from base to tip (thumb 1–4, index 5–8, middle 9–12,
//! ring 13–16, pinky 17–20).  Coordinates are normalized to the frame with
//! `y` growing downward.
//!
//! ## Quick start
//!
//! ```rust
//! use finger_gesture::{count_fingers, Action, ActionMapper, HandLandmarkSet, Key, RecordingKeys};
//!
//! let hand = HandLandmarkSet::posed([false, true, false, false, false]);
//! assert_eq!(count_fingers(&hand), 1);
//!
//! let mut keys = RecordingKeys::default();
//! {
//!     let mut mapper = ActionMapper::new(&mut keys);
//!     let (action, _) = mapper.update(count_fingers(&hand));
//!     assert_eq!(action, Action::Accelerate);
//!     assert!(mapper.key_state().is_held(Key::Up));
//! } // dropping the mapper releases Up
//! assert!(!keys.state().is_held(Key::Up));
//! ```

pub mod landmark;
pub mod classifier;
pub mod action;
pub mod mapper;

pub use landmark::{HandLandmarkSet, Landmark, LandmarkError, HAND_CONNECTIONS, LANDMARK_COUNT};
pub use classifier::{count_fingers, finger_states, Finger, FingerCount, FingerStates};
pub use action::{Action, Key, KeyOutput, KeyState, KeyTransition, RecordingKeys};
pub use mapper::ActionMapper;
