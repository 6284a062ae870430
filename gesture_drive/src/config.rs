//! Command line and application configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::DriveError;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceConfig {
    /// Keyboard-posed synthetic hand in the overlay window.
    Sim,
    /// JSON-lines replay, optionally paced.
    Replay { path: PathBuf, fps: Option<u32> },
    /// LeapMotion controller (feature `leap`).
    Leap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyBackend {
    /// Log transitions only.
    Log,
    /// Press real Up/Down arrow keys (feature `inject`).
    Inject,
}

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub source:     SourceConfig,
    pub keys:       KeyBackend,
    /// Show the overlay window; `false` runs headless.
    pub window:     bool,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Write every acquired frame to this replay file.
    pub record:     Option<PathBuf>,
    /// Hardware sources report landmarks as seen in a mirrored frame.
    pub mirror:     bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source:     SourceConfig::Sim,
            keys:       KeyBackend::Log,
            window:     true,
            max_frames: None,
            record:     None,
            mirror:     true,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), DriveError> {
        if self.source == SourceConfig::Sim && !self.window {
            return Err(DriveError::Config(
                "the simulated hand is posed from the window; drop --headless or use --source replay".into(),
            ));
        }
        if self.max_frames == Some(0) {
            return Err(DriveError::Config("--max-frames must be at least 1".into()));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Sim,
    Replay,
    Leap,
}

/// Hold Up with one finger, Down with two, nothing otherwise.
#[derive(Parser, Debug)]
#[command(name = "gesture_drive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Where hand landmarks come from
    #[arg(short, long, value_enum, default_value = "sim")]
    pub source: SourceKind,

    /// Replay file (one JSON array of hands per line)
    #[arg(short, long, required_if_eq("source", "replay"))]
    pub replay: Option<PathBuf>,

    /// Replay pacing in frames per second (default: as fast as possible)
    #[arg(long)]
    pub fps: Option<u32>,

    /// Key backend
    #[arg(short, long, value_enum, default_value = "log")]
    pub keys: KeyBackend,

    /// Run without the overlay window
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Record acquired frames to a replay file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Don't mirror hardware landmarks
    #[arg(long)]
    pub no_mirror: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig, DriveError> {
        let source = match self.source {
            SourceKind::Sim  => SourceConfig::Sim,
            SourceKind::Leap => SourceConfig::Leap,
            SourceKind::Replay => {
                let path = self.replay.ok_or_else(|| {
                    DriveError::Config("--source replay needs --replay <path>".into())
                })?;
                SourceConfig::Replay { path, fps: self.fps }
            }
        };

        let cfg = AppConfig {
            source,
            keys:       self.keys,
            window:     !self.headless,
            max_frames: self.max_frames,
            record:     self.record,
            mirror:     !self.no_mirror,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
