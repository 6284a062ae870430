//! # gesture_drive
//!
//! Hand-gesture throttle built on [`finger_gesture`]: one extended finger
//! holds the Up arrow, two hold Down, anything else releases both.
//!
//! ## Pipeline
//!
//! ```text
//! HandSource ─► count_fingers ─► ActionMapper ─► KeyOutput
//!                                      │
//!                                      └────────► FrameSink (overlay)
//! ```
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the overlay window poses a synthetic
//!   hand from the keyboard, keys are logged.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//! * `inject`: presses real Up/Down arrow keys through `enigo`.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Hand |
//! |---|---|
//! | `0`–`5` | Show a hand with that many fingers extended |
//! | `N` | Take the hand out of view |
//! | `Escape` | Exit (held keys are released) |

pub mod error;
pub mod config;
pub mod source;
pub mod record;
pub mod keys;
pub mod visualizer;
pub mod app;

pub use error::DriveError;
