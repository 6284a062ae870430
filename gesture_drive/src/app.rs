//! The frame loop.
//!
//! Each iteration: poll the sink's input (exit signal) → acquire a frame →
//! classify the first hand (0 fingers when there is none) → map to an action
//! → render.  Whatever ends the loop, held keys are released before
//! [`run_loop`] returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use finger_gesture::{
    finger_states, Action, ActionMapper, FingerStates, HandLandmarkSet, KeyOutput, KeyState,
    KeyTransition,
};
use tracing::{debug, error, info, trace};

use crate::config::{AppConfig, SourceConfig};
use crate::error::DriveError;
use crate::keys::open_key_output;
use crate::record::Recorded;
use crate::source::{HandSource, ReplaySource, SimHandSource};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// FrameReport / FrameSink
// ════════════════════════════════════════════════════════════════════════════

/// Everything the loop computed for one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub frame:   u64,
    /// The hand that was classified, if any.
    pub hand:    Option<HandLandmarkSet>,
    pub fingers: FingerStates,
    pub action:  Action,
    /// Transitions sent this frame (empty when the action held).
    pub sent:    Vec<KeyTransition>,
    pub keys:    KeyState,
}

/// Display side of the loop: supplies the exit signal and shows each frame.
pub trait FrameSink {
    /// Returns `false` when the user asked to exit.
    fn poll_input(&mut self) -> bool;
    fn render(&mut self, report: &FrameReport);
}

impl<V: FrameSink + ?Sized> FrameSink for Box<V> {
    fn poll_input(&mut self) -> bool { (**self).poll_input() }
    fn render(&mut self, report: &FrameReport) { (**self).render(report) }
}

/// No window: never asks to exit, traces each frame.
pub struct HeadlessSink;

impl FrameSink for HeadlessSink {
    fn poll_input(&mut self) -> bool { true }

    fn render(&mut self, report: &FrameReport) {
        trace!(
            frame = report.frame,
            fingers = report.fingers.count(),
            hand = report.hand.is_some(),
            "{}", report.action
        );
    }
}

/// Wraps a sink so a raised stop flag (set from the Ctrl-C handler) reads as
/// the exit signal.
pub struct Interruptible<V> {
    inner: V,
    stop:  Arc<AtomicBool>,
}

impl<V: FrameSink> Interruptible<V> {
    pub fn new(inner: V, stop: Arc<AtomicBool>) -> Self {
        Interruptible { inner, stop }
    }
}

impl<V: FrameSink> FrameSink for Interruptible<V> {
    fn poll_input(&mut self) -> bool {
        if self.stop.load(Ordering::SeqCst) {
            info!("interrupted");
            return false;
        }
        self.inner.poll_input()
    }

    fn render(&mut self, report: &FrameReport) {
        self.inner.render(report)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Loop summary
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Escape pressed, window closed, or Ctrl-C.
    UserExit,
    /// Replay finished or the input channel closed.
    SourceExhausted,
    /// `max_frames` reached.
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub exit:   ExitReason,
}

// ════════════════════════════════════════════════════════════════════════════
// run_loop
// ════════════════════════════════════════════════════════════════════════════

/// Drive frames until the exit signal, the end of the source, the frame
/// limit, or an acquisition failure.  Held keys are always released first.
pub fn run_loop<S, V, K>(
    source:     &mut S,
    sink:       &mut V,
    mapper:     &mut ActionMapper<K>,
    max_frames: Option<u64>,
) -> Result<LoopSummary, DriveError>
where
    S: HandSource + ?Sized,
    V: FrameSink + ?Sized,
    K: KeyOutput,
{
    let result = drive_frames(source, sink, mapper, max_frames);

    let released = mapper.release_all();
    if !released.is_empty() {
        info!("released {} on exit", released.iter().map(|t| t.key().to_string()).collect::<Vec<_>>().join(", "));
    }

    match &result {
        Ok(summary) => info!(frames = summary.frames, exit = ?summary.exit, "frame loop finished"),
        Err(e)      => error!("frame loop stopped: {}", e),
    }
    result
}

fn drive_frames<S, V, K>(
    source:     &mut S,
    sink:       &mut V,
    mapper:     &mut ActionMapper<K>,
    max_frames: Option<u64>,
) -> Result<LoopSummary, DriveError>
where
    S: HandSource + ?Sized,
    V: FrameSink + ?Sized,
    K: KeyOutput,
{
    let mut frames = 0u64;
    loop {
        if max_frames.is_some_and(|max| frames >= max) {
            return Ok(LoopSummary { frames, exit: ExitReason::FrameLimit });
        }
        if !sink.poll_input() {
            return Ok(LoopSummary { frames, exit: ExitReason::UserExit });
        }

        let hands = match source.next_frame() {
            Ok(h) => h,
            Err(DriveError::SourceExhausted) => {
                return Ok(LoopSummary { frames, exit: ExitReason::SourceExhausted });
            }
            Err(e) => return Err(e),
        };

        let hand = hands.into_iter().next();
        let fingers = hand.as_ref().map(finger_states).unwrap_or_default();
        let (action, sent) = mapper.update(fingers.count());

        if !sent.is_empty() {
            info!(frame = frames, fingers = fingers.count(), "{}", action);
        } else {
            debug!(frame = frames, fingers = fingers.count(), "{} (held)", action);
        }

        sink.render(&FrameReport {
            frame: frames,
            hand,
            fingers,
            action,
            sent,
            keys: mapper.key_state(),
        });
        frames += 1;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): wire the configured source, sink and keys together
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the sink
/// (overlay window unless headless), the hand source (simulation by default,
/// replay file, or hardware with `--features leap`), the key backend, and
/// drives the frame loop.
pub fn run(cfg: AppConfig) -> Result<LoopSummary, DriveError> {
    cfg.validate()?;

    // ── Sink + source ─────────────────────────────────────────────────────
    let (sink, source): (Box<dyn FrameSink>, Box<dyn HandSource>) = match &cfg.source {
        SourceConfig::Sim => {
            let (sim_tx, sim_rx) = mpsc::channel();
            let vis: Box<dyn FrameSink> = Box::new(Visualizer::new(Some(sim_tx))?);
            let sim: Box<dyn HandSource> = Box::new(SimHandSource::new(sim_rx));
            (vis, sim)
        }
        SourceConfig::Replay { path, fps } => {
            let replay: Box<dyn HandSource> = Box::new(ReplaySource::open(path)?.with_fps(*fps));
            (open_sink(cfg.window)?, replay)
        }
        SourceConfig::Leap => (open_sink(cfg.window)?, open_leap(cfg.mirror)?),
    };

    // ── Ctrl-C ────────────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;
    let mut sink = Interruptible::new(sink, stop);

    // ── Keys ──────────────────────────────────────────────────────────────
    let mut mapper = ActionMapper::new(open_key_output(cfg.keys));

    match &cfg.record {
        Some(path) => {
            let mut recorded = Recorded::create(source, path)?;
            let result = run_loop(&mut recorded, &mut sink, &mut mapper, cfg.max_frames);
            let frames = recorded.frames();
            recorded.into_writer()?;
            info!(frames, path = %path.display(), "recording saved");
            result
        }
        None => {
            let mut source = source;
            run_loop(&mut source, &mut sink, &mut mapper, cfg.max_frames)
        }
    }
}

fn open_sink(window: bool) -> Result<Box<dyn FrameSink>, DriveError> {
    if window {
        Ok(Box::new(Visualizer::new(None)?))
    } else {
        Ok(Box::new(HeadlessSink))
    }
}

#[cfg(feature = "leap")]
fn open_leap(mirror: bool) -> Result<Box<dyn HandSource>, DriveError> {
    Ok(Box::new(crate::source::LeapHandSource::open(mirror)?))
}

#[cfg(not(feature = "leap"))]
fn open_leap(_mirror: bool) -> Result<Box<dyn HandSource>, DriveError> {
    Err(DriveError::Config("LeapMotion support not compiled in (build with --features leap)".into()))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use finger_gesture::{Key, RecordingKeys};
    use std::io::Cursor;
    use KeyTransition::{Press, Release};

    /// Plays back finger counts (`None` = no hand), then fails or runs dry.
    struct Script {
        frames:  Vec<Option<u8>>,
        failure: bool,
    }

    impl Script {
        fn new(frames: &[Option<u8>]) -> Self {
            Script { frames: frames.to_vec(), failure: false }
        }
        fn failing(frames: &[Option<u8>]) -> Self {
            Script { frames: frames.to_vec(), failure: true }
        }
    }

    impl HandSource for Script {
        fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
            if self.frames.is_empty() {
                return Err(if self.failure {
                    DriveError::Tracker("camera unplugged".into())
                } else {
                    DriveError::SourceExhausted
                });
            }
            Ok(self.frames.remove(0).map(HandLandmarkSet::with_count).into_iter().collect())
        }
    }

    /// Collects reports and asks to exit after `exit_after` frames.
    #[derive(Default)]
    struct Capture {
        reports:    Vec<FrameReport>,
        exit_after: Option<usize>,
    }

    impl FrameSink for Capture {
        fn poll_input(&mut self) -> bool {
            self.exit_after.map_or(true, |n| self.reports.len() < n)
        }
        fn render(&mut self, report: &FrameReport) {
            self.reports.push(report.clone());
        }
    }

    fn counts(n: &[u8]) -> Vec<Option<u8>> {
        n.iter().map(|&c| Some(c)).collect()
    }

    #[test]
    fn scenario_actions_follow_counts() {
        let mut rec = RecordingKeys::default();
        let mut sink = Capture::default();
        {
            let mut mapper = ActionMapper::new(&mut rec);
            let mut src = Script::new(&counts(&[0, 1, 1, 2, 3]));
            let summary = run_loop(&mut src, &mut sink, &mut mapper, None).unwrap();
            assert_eq!(summary, LoopSummary { frames: 5, exit: ExitReason::SourceExhausted });
        }

        let actions: Vec<Action> = sink.reports.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![
            Action::Idle, Action::Accelerate, Action::Accelerate, Action::Brake, Action::Idle,
        ]);
        let sent_lens: Vec<usize> = sink.reports.iter().map(|r| r.sent.len()).collect();
        assert_eq!(sent_lens, vec![2, 2, 0, 2, 2]);
        assert!(sink.reports[3].sent.contains(&Press(Key::Down)));
        assert!(sink.reports[3].sent.contains(&Release(Key::Up)));
    }

    #[test]
    fn missing_hand_frames_stay_idle() {
        let mut rec = RecordingKeys::default();
        let mut sink = Capture::default();
        {
            let mut mapper = ActionMapper::new(&mut rec);
            let mut src = Script::new(&[None; 5]);
            run_loop(&mut src, &mut sink, &mut mapper, None).unwrap();
        }
        assert_eq!(sink.reports.len(), 5);
        for (i, r) in sink.reports.iter().enumerate() {
            assert_eq!(r.action, Action::Idle);
            assert!(r.hand.is_none());
            assert_eq!(r.fingers.count(), 0);
            if i > 0 { assert!(r.sent.is_empty()); }
        }
        // Only the first frame's two releases reached the keys
        assert_eq!(rec.log.len(), 2);
    }

    #[test]
    fn only_first_hand_is_classified() {
        struct TwoHands;
        impl HandSource for TwoHands {
            fn next_frame(&mut self) -> Result<Vec<HandLandmarkSet>, DriveError> {
                Ok(vec![HandLandmarkSet::with_count(2), HandLandmarkSet::with_count(1)])
            }
        }
        let mut sink = Capture::default();
        let mut mapper = ActionMapper::new(RecordingKeys::default());
        run_loop(&mut TwoHands, &mut sink, &mut mapper, Some(1)).unwrap();
        assert_eq!(sink.reports[0].action, Action::Brake);
    }

    #[test]
    fn user_exit_releases_held_up() {
        let mut rec = RecordingKeys::default();
        let mut sink = Capture { exit_after: Some(2), ..Capture::default() };
        let mut mapper = ActionMapper::new(&mut rec);
        let mut src = Script::new(&counts(&[1, 1, 1, 1]));

        let summary = run_loop(&mut src, &mut sink, &mut mapper, None).unwrap();
        assert_eq!(summary, LoopSummary { frames: 2, exit: ExitReason::UserExit });
        assert!(!mapper.key_state().any_held());
        drop(mapper);

        assert_eq!(rec.log.last(), Some(&Release(Key::Up)));
        assert!(!rec.state().any_held());
    }

    #[test]
    fn acquisition_failure_releases_and_propagates() {
        let mut rec = RecordingKeys::default();
        let mut sink = Capture::default();
        let mut mapper = ActionMapper::new(&mut rec);
        let mut src = Script::failing(&counts(&[2]));

        let err = run_loop(&mut src, &mut sink, &mut mapper, None).unwrap_err();
        assert!(matches!(err, DriveError::Tracker(_)));
        assert!(!mapper.key_state().any_held());
        drop(mapper);
        assert_eq!(rec.log.last(), Some(&Release(Key::Down)));
    }

    #[test]
    fn stop_flag_ends_loop_and_releases_held_up() {
        let mut rec = RecordingKeys::default();
        let stop = Arc::new(AtomicBool::new(false));
        let mut sink = Interruptible::new(Capture::default(), stop.clone());
        {
            let mut mapper = ActionMapper::new(&mut rec);
            let mut src = Script::new(&counts(&[1; 10]));
            run_loop(&mut src, &mut sink, &mut mapper, Some(2)).unwrap();
            mapper.update(1);
            assert!(mapper.key_state().is_held(Key::Up));

            stop.store(true, Ordering::SeqCst);
            let summary = run_loop(&mut src, &mut sink, &mut mapper, None).unwrap();
            assert_eq!(summary, LoopSummary { frames: 0, exit: ExitReason::UserExit });
            assert!(!mapper.key_state().any_held());
        }
        assert_eq!(rec.log.last(), Some(&Release(Key::Up)));
        assert_eq!(sink.inner.reports.len(), 2);
    }

    #[test]
    fn frame_limit_stops_loop() {
        let mut sink = Capture::default();
        let mut mapper = ActionMapper::new(RecordingKeys::default());
        let mut src = Script::new(&counts(&[1; 10]));
        let summary = run_loop(&mut src, &mut sink, &mut mapper, Some(3)).unwrap();
        assert_eq!(summary, LoopSummary { frames: 3, exit: ExitReason::FrameLimit });
        assert_eq!(sink.reports.len(), 3);
    }

    #[test]
    fn report_keys_match_mapper_state() {
        let mut sink = Capture::default();
        let mut mapper = ActionMapper::new(RecordingKeys::default());
        let mut src = Script::new(&counts(&[1, 2, 0]));
        run_loop(&mut src, &mut sink, &mut mapper, None).unwrap();
        assert!(sink.reports[0].keys.is_held(Key::Up));
        assert!(sink.reports[1].keys.is_held(Key::Down));
        assert!(!sink.reports[1].keys.is_held(Key::Up));
        assert!(!sink.reports[2].keys.any_held());
    }

    #[test]
    fn headless_replay_through_boxed_parts() {
        let line = serde_json::to_string(&vec![HandLandmarkSet::with_count(1)]).unwrap();
        let text = format!("{}\n[]\n", line);
        let mut source: Box<dyn HandSource> = Box::new(ReplaySource::from_reader(Cursor::new(text)));
        let mut sink: Box<dyn FrameSink> = Box::new(HeadlessSink);
        let mut rec = RecordingKeys::default();
        {
            let mut mapper = ActionMapper::new(&mut rec);
            let summary = run_loop(&mut source, &mut sink, &mut mapper, None).unwrap();
            assert_eq!(summary.frames, 2);
        }
        assert_eq!(rec.log, vec![
            Release(Key::Down), Press(Key::Up),
            Release(Key::Up), Release(Key::Down),
        ]);
    }

    #[test]
    fn demo_session_replays_headless() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/session.jsonl");
        let mut source = ReplaySource::open(&path).unwrap();
        let mut sink = Capture::default();
        let mut mapper = ActionMapper::new(RecordingKeys::default());
        let summary = run_loop(&mut source, &mut sink, &mut mapper, None).unwrap();

        assert_eq!(summary, LoopSummary { frames: 23, exit: ExitReason::SourceExhausted });
        let changes: Vec<Action> = sink.reports.iter()
            .filter(|r| !r.sent.is_empty())
            .map(|r| r.action)
            .collect();
        assert_eq!(changes, vec![
            Action::Idle, Action::Accelerate, Action::Brake, Action::Idle, Action::Accelerate, Action::Idle,
        ]);
        assert!(!mapper.key_state().any_held());
    }

    #[test]
    fn run_rejects_headless_sim() {
        let cfg = AppConfig { window: false, ..AppConfig::default() };
        assert!(matches!(run(cfg), Err(DriveError::Config(_))));
    }

    #[cfg(not(feature = "leap"))]
    #[test]
    fn run_without_leap_feature_is_a_config_error() {
        let cfg = AppConfig { source: SourceConfig::Leap, window: false, ..AppConfig::default() };
        assert!(matches!(run(cfg), Err(DriveError::Config(_))));
    }
}
