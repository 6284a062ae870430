//! Session recording in the replay format.
//!
//! [`Recorded`] wraps any [`HandSource`] and writes each acquired frame as one
//! JSON line, so a simulated or hardware session can be fed back through
//! [`ReplaySource`](crate::source::ReplaySource).  Every line is flushed as it
//! is written; a session cut short keeps every frame it acquired.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use finger_gesture::HandLandmarkSet;

use crate::error::DriveError;
use crate::source::HandSource;

pub struct Recorded<S, W: Write> {
    inner:  S,
    out:    W,
    frames: u64,
}

impl<S: HandSource> Recorded<S, BufWriter<File>> {
    pub fn create(inner: S, path: &Path) -> Result<Self, DriveError> {
        let file = File::create(path)?;
        tracing::info!(path = %path.display(), "recording frames");
        Ok(Recorded::new(inner, BufWriter::new(file)))
    }
}

impl<S: HandSource, W: Write> Recorded<S, W> {
    pub fn new(inner: S, out: W) -> Self {
        Recorded { inner, out, frames: 0 }
    }

    pub fn frames(&self) -> u64 { self.frames }

    pub fn into_writer(mut self) -> Result<W, DriveError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<S: HandSource, W: Write> HandSource for Recorded<S, W> {
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
        let hands = self.inner.next_frame()?;
        serde_json::to_writer(&mut self.out, &hands).map_err(DriveError::Record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.frames += 1;
        Ok(hands)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
