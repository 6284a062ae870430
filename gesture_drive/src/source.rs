//! Hand sources: keyboard simulation, replay files and LeapMotion hardware.
//!
//! The public interface is [`HandSource`]: one call per frame, returning every
//! hand seen in that frame.  The frame loop doesn't need to know whether the
//! landmarks came from real hardware, a file, or the keyboard simulator.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use finger_gesture::HandLandmarkSet;
use tracing::debug;

use crate::error::DriveError;

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait: unified interface for hw, replay and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can acquire a frame and report the hands detected in it.
pub trait HandSource {
    /// Acquire the next frame.  An empty list means no hand was seen.
    ///
    /// `Err(DriveError::SourceExhausted)` ends the loop normally; any other
    /// error is an acquisition failure.
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError>;
}

impl<S: HandSource + ?Sized> HandSource for Box<S> {
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
        (**self).next_frame()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    /// Show a hand with this many fingers extended.
    Fingers(u8),   // 0–5
    /// Take the hand out of view.
    HideHand,      // N
}

/// Synthetic hand driven by [`SimInput`] events from the visualizer's window.
///
/// The window sends keys over the channel; each frame this source drains the
/// channel without blocking and reports the current pose.
pub struct SimHandSource {
    rx:   Receiver<SimInput>,
    pose: Option<u8>,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource { rx, pose: None }
    }

    /// Fingers currently shown, or `None` when the hand is hidden.
    pub fn pose(&self) -> Option<u8> { self.pose }
}

impl HandSource for SimHandSource {
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
        loop {
            match self.rx.try_recv() {
                Ok(SimInput::KeyDown(SimKey::Fingers(n))) => self.pose = Some(n.min(5)),
                Ok(SimInput::KeyDown(SimKey::HideHand))   => self.pose = None,
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Err(DriveError::SourceExhausted),
            }
        }
        Ok(self.pose.map(HandLandmarkSet::with_count).into_iter().collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource: JSON lines, one array of hands per frame
// ════════════════════════════════════════════════════════════════════════════

/// Replays frames recorded as JSON lines.
///
/// Each non-blank line is an array of hands; each hand is an array of 21
/// `{"x": .., "y": ..}` points.  `[]` is a frame without a hand.  End of input
/// exhausts the source.
pub struct ReplaySource<R> {
    lines:    Lines<R>,
    line:     usize,
    interval: Option<Duration>,
    last:     Option<Instant>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, DriveError> {
        let file = File::open(path)?;
        debug!(path = %path.display(), "opened replay");
        Ok(ReplaySource::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        ReplaySource { lines: reader.lines(), line: 0, interval: None, last: None }
    }

    /// Pace frames at `fps`; `None` replays as fast as the loop runs.
    pub fn with_fps(mut self, fps: Option<u32>) -> Self {
        self.interval = fps
            .filter(|&f| f > 0)
            .map(|f| Duration::from_secs_f64(1.0 / f as f64));
        self
    }

    fn pace(&mut self) {
        if let Some(interval) = self.interval {
            if let Some(last) = self.last {
                let elapsed = last.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
            self.last = Some(Instant::now());
        }
    }
}

impl<R: BufRead> HandSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
        loop {
            let text = match self.lines.next() {
                None          => return Err(DriveError::SourceExhausted),
                Some(Err(e))  => return Err(DriveError::Io(e)),
                Some(Ok(t))   => t,
            };
            self.line += 1;
            if text.trim().is_empty() { continue; }

            let line = self.line;
            let hands: Vec<HandLandmarkSet> = serde_json::from_str(&text)
                .map_err(|source| DriveError::Replay { line, source })?;
            self.pace();
            return Ok(hands);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackingClock: how recent is the tracker's last frame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Recent enough to reuse the last hands.
    Fresh,
    /// The hand is treated as gone.
    Stale,
    /// The tracker stopped delivering frames; acquisition has failed.
    Lost,
}

/// Ages the last tracking frame of a live source.
#[derive(Clone, Copy, Debug)]
pub struct TrackingClock {
    last_frame:  Instant,
    stale_after: Duration,
    lost_after:  Duration,
}

impl TrackingClock {
    pub const STALE_AFTER: Duration = Duration::from_millis(100);
    pub const LOST_AFTER:  Duration = Duration::from_secs(1);

    /// `start` may lie in the future to give a device time to connect.
    pub fn new(start: Instant) -> Self {
        TrackingClock {
            last_frame:  start,
            stale_after: Self::STALE_AFTER,
            lost_after:  Self::LOST_AFTER,
        }
    }

    pub fn frame_arrived(&mut self, now: Instant) {
        self.last_frame = now;
    }

    pub fn freshness(&self, now: Instant) -> Freshness {
        let age = now.saturating_duration_since(self.last_frame);
        if age >= self.lost_after {
            Freshness::Lost
        } else if age >= self.stale_after {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// # Projection
///
/// The hand is held palm down over the sensor.  Joint positions (mm) are
/// projected onto a virtual camera looking down from above, the user at the
/// bottom edge, so a finger pointing away from the user points "up" in the
/// frame:
///
/// * `x` spans `±LEAP_HALF_WIDTH` mm → `0.0..1.0`
/// * `z` spans `±LEAP_HALF_DEPTH` mm → `0.0..1.0` (away from the user is `0.0`)
///
/// LeapC already reports the user's own left/right, which is what a mirrored
/// camera frame shows, so `mirror = false` flips `x`.
///
/// # Dropouts
///
/// When no tracking frame arrives within a frame's polls the last hands are
/// reused for up to [`TrackingClock::STALE_AFTER`], then reported as absent.
/// After [`TrackingClock::LOST_AFTER`] without a frame (poll errors included)
/// `next_frame` fails with [`DriveError::Tracker`].
#[cfg(feature = "leap")]
pub struct LeapHandSource {
    connection: leaprs::Connection,
    mirror:     bool,
    last:       Vec<HandLandmarkSet>,
    clock:      TrackingClock,
}

#[cfg(feature = "leap")]
const LEAP_HALF_WIDTH: f32 = 200.0;
#[cfg(feature = "leap")]
const LEAP_HALF_DEPTH: f32 = 150.0;
#[cfg(feature = "leap")]
const LEAP_STARTUP_GRACE: Duration = Duration::from_secs(2);

#[cfg(feature = "leap")]
impl LeapHandSource {
    pub fn open(mirror: bool) -> Result<Self, DriveError> {
        use leaprs::*;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| DriveError::Tracker(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| DriveError::Tracker(format!("LeapMotion device: {:?}", e)))?;
        tracing::info!("LeapMotion connection open");

        Ok(LeapHandSource {
            connection,
            mirror,
            last: Vec::new(),
            clock: TrackingClock::new(Instant::now() + LEAP_STARTUP_GRACE),
        })
    }
}

#[cfg(feature = "leap")]
impl HandSource for LeapHandSource {
    fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
        use leaprs::*;

        const POLLS_PER_FRAME: usize = 4;
        let mut last_error = None;
        for _ in 0..POLLS_PER_FRAME {
            let msg = match self.connection.poll(25) {
                Ok(m)  => m,
                Err(e) => {
                    last_error = Some(format!("{:?}", e));
                    continue;
                }
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<HandLandmarkSet> = frame.hands()
                    .take(1)
                    .filter_map(|h| project_hand(&h))
                    .map(|set| if self.mirror { set } else { set.mirrored() })
                    .collect();
                self.clock.frame_arrived(Instant::now());
                self.last = hands;
                return Ok(self.last.clone());
            }
        }

        match self.clock.freshness(Instant::now()) {
            Freshness::Fresh => Ok(self.last.clone()),
            Freshness::Stale => {
                if !self.last.is_empty() {
                    debug!("no tracking frame, dropping last hand");
                    self.last.clear();
                }
                Ok(Vec::new())
            }
            Freshness::Lost => Err(DriveError::Tracker(match last_error {
                Some(e) => format!("no tracking frame for {:?} (last poll error: {})", TrackingClock::LOST_AFTER, e),
                None    => format!("no tracking frame for {:?}", TrackingClock::LOST_AFTER),
            })),
        }
    }
}

/// Map LeapC bones onto the 21-point layout: each finger contributes the
/// base joints of its proximal, intermediate and distal bones and the distal
/// tip.  The middle metacarpal base stands in for the wrist.
#[cfg(feature = "leap")]
fn project_hand(hand: &leaprs::Hand) -> Option<HandLandmarkSet> {
    use finger_gesture::{Landmark, LANDMARK_COUNT};

    let project = |x: f32, z: f32| Landmark::new(
        ((x + LEAP_HALF_WIDTH) / (2.0 * LEAP_HALF_WIDTH)).clamp(0.0, 1.0),
        ((z + LEAP_HALF_DEPTH) / (2.0 * LEAP_HALF_DEPTH)).clamp(0.0, 1.0),
    );

    let fingers: Vec<_> = hand.digits().collect();
    if fingers.len() < 5 { return None; }

    let mut points = [Landmark::default(); LANDMARK_COUNT];
    let wrist = fingers[2].metacarpal().prev_joint();
    points[0] = project(wrist.x, wrist.z);

    for (f, digit) in fingers.iter().take(5).enumerate() {
        let base = 1 + f * 4;
        let joints = [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (j, p) in joints.iter().enumerate() {
            points[base + j] = project(p.x, p.z);
        }
    }
    Some(HandLandmarkSet::new(points))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use finger_gesture::count_fingers;
    use std::io::Cursor;
    use std::sync::mpsc;

    fn hand_json(n: u8) -> String {
        serde_json::to_string(&HandLandmarkSet::with_count(n)).unwrap()
    }

    #[test]
    fn sim_starts_without_hand() {
        let (_tx, rx) = mpsc::channel();
        let mut src = SimHandSource::new(rx);
        assert!(src.next_frame().unwrap().is_empty());
    }

    #[test]
    fn sim_pose_persists_across_frames() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimHandSource::new(rx);
        tx.send(SimInput::KeyDown(SimKey::Fingers(2))).unwrap();
        for _ in 0..3 {
            let hands = src.next_frame().unwrap();
            assert_eq!(hands.len(), 1);
            assert_eq!(count_fingers(&hands[0]), 2);
        }
    }

    #[test]
    fn sim_last_key_wins_and_hide_clears() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimHandSource::new(rx);
        tx.send(SimInput::KeyDown(SimKey::Fingers(1))).unwrap();
        tx.send(SimInput::KeyDown(SimKey::Fingers(4))).unwrap();
        assert_eq!(count_fingers(&src.next_frame().unwrap()[0]), 4);
        tx.send(SimInput::KeyDown(SimKey::HideHand)).unwrap();
        assert!(src.next_frame().unwrap().is_empty());
        assert_eq!(src.pose(), None);
    }

    #[test]
    fn sim_disconnect_exhausts() {
        let (tx, rx) = mpsc::channel::<SimInput>();
        let mut src = SimHandSource::new(rx);
        drop(tx);
        assert!(matches!(src.next_frame(), Err(DriveError::SourceExhausted)));
    }

    #[test]
    fn replay_reads_frames_in_order() {
        let text = format!("[{}]\n[]\n\n[{}]\n", hand_json(1), hand_json(2));
        let mut src = ReplaySource::from_reader(Cursor::new(text));

        assert_eq!(count_fingers(&src.next_frame().unwrap()[0]), 1);
        assert!(src.next_frame().unwrap().is_empty());
        assert_eq!(count_fingers(&src.next_frame().unwrap()[0]), 2);
        assert!(matches!(src.next_frame(), Err(DriveError::SourceExhausted)));
    }

    #[test]
    fn replay_rejects_partial_hand_with_line_number() {
        let text = format!("[{}]\n[[{{\"x\":0.1,\"y\":0.2}}]]\n", hand_json(0));
        let mut src = ReplaySource::from_reader(Cursor::new(text));
        src.next_frame().unwrap();
        match src.next_frame() {
            Err(DriveError::Replay { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected replay error, got {:?}", other.map(|h| h.len())),
        }
    }

    #[test]
    fn replay_fps_paces_frames() {
        let text = "[]\n[]\n[]\n";
        let mut src = ReplaySource::from_reader(Cursor::new(text)).with_fps(Some(100));
        let start = Instant::now();
        for _ in 0..3 { src.next_frame().unwrap(); }
        // Two gaps of 10 ms after the first frame
        assert!(start.elapsed() >= Duration::from_millis(18));
    }

    #[test]
    fn replay_zero_fps_is_unpaced() {
        let src = ReplaySource::from_reader(Cursor::new("")).with_fps(Some(0));
        assert!(src.interval.is_none());
    }

    #[test]
    fn tracking_clock_ages_from_fresh_to_lost() {
        let t0 = Instant::now();
        let mut clock = TrackingClock::new(t0);
        assert_eq!(clock.freshness(t0 + Duration::from_millis(10)), Freshness::Fresh);
        assert_eq!(clock.freshness(t0 + TrackingClock::STALE_AFTER), Freshness::Stale);
        assert_eq!(clock.freshness(t0 + TrackingClock::LOST_AFTER), Freshness::Lost);

        clock.frame_arrived(t0 + TrackingClock::LOST_AFTER);
        assert_eq!(clock.freshness(t0 + TrackingClock::LOST_AFTER), Freshness::Fresh);
    }

    #[test]
    fn tracking_clock_start_in_future_is_fresh() {
        let now = Instant::now();
        let clock = TrackingClock::new(now + Duration::from_secs(2));
        assert_eq!(clock.freshness(now), Freshness::Fresh);
        assert_eq!(clock.freshness(now + Duration::from_secs(3)), Freshness::Lost);
    }
}
