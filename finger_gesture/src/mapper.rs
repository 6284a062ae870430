//! Finger count → action → key transitions.
//!
//! `ActionMapper` owns the [`KeyState`] and the [`KeyOutput`] it drives.  Each
//! frame's count is mapped independently: there is no debounce or dwell
//! time, so a classifier that flickers between 1 and 2 makes the keys flicker
//! too.
//!
//! When the action changes, the whole transition row for the new action is
//! sent, including releases of keys that are already up.  When it stays the
//! same, nothing is sent.  Before the first update the previous action is
//! unknown, so the first frame always sends its row.

use tracing::debug;

use crate::action::{Action, Key, KeyOutput, KeyState, KeyTransition};
use crate::classifier::FingerCount;

pub struct ActionMapper<K: KeyOutput> {
    keys:   K,
    state:  KeyState,
    action: Option<Action>,
}

impl<K: KeyOutput> ActionMapper<K> {
    pub fn new(keys: K) -> Self {
        ActionMapper { keys, state: KeyState::default(), action: None }
    }

    /// Map one frame's finger count.
    ///
    /// Returns the frame's action and the transitions actually sent, which is
    /// empty when the action did not change.
    pub fn update(&mut self, finger_count: FingerCount) -> (Action, Vec<KeyTransition>) {
        let target = Action::from_finger_count(finger_count);
        if self.action == Some(target) {
            return (target, Vec::new());
        }

        let sent = target.transitions().to_vec();
        for &t in &sent {
            self.keys.send(t);
            self.state.apply(t);
        }
        debug!(
            from = ?self.action, to = %target, fingers = finger_count,
            "action change: {}",
            sent.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
        );
        self.action = Some(target);
        (target, sent)
    }

    /// Release every held key.  The next update sends its full row again.
    pub fn release_all(&mut self) -> Vec<KeyTransition> {
        let held: Vec<Key> = self.state.held().collect();
        let mut sent = Vec::with_capacity(held.len());
        for key in held {
            let t = KeyTransition::Release(key);
            self.keys.send(t);
            self.state.apply(t);
            sent.push(t);
        }
        if !sent.is_empty() {
            debug!("released {} held key(s)", sent.len());
        }
        self.action = None;
        sent
    }

    pub fn key_state(&self) -> KeyState { self.state }
    pub fn action(&self)    -> Option<Action> { self.action }
    pub fn keys(&self)      -> &K { &self.keys }
}

impl<K: KeyOutput> Drop for ActionMapper<K> {
    fn drop(&mut self) {
        self.release_all();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RecordingKeys;
    use KeyTransition::{Press, Release};

    fn same_set(a: &[KeyTransition], b: &[KeyTransition]) -> bool {
        a.len() == b.len() && a.iter().all(|t| b.contains(t))
    }

    #[test]
    fn first_update_sends_full_row() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        let (action, sent) = m.update(0);
        assert_eq!(action, Action::Idle);
        assert!(same_set(&sent, &[Release(Key::Up), Release(Key::Down)]));
    }

    #[test]
    fn repeated_accelerate_is_idempotent() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        m.update(1);
        let (action, sent) = m.update(1);
        assert_eq!(action, Action::Accelerate);
        assert!(sent.is_empty());
        assert!(m.key_state().is_held(Key::Up));
        assert!(!m.key_state().is_held(Key::Down));
    }

    #[test]
    fn scenario_counts_to_actions_and_transitions() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);

        let expected: [(FingerCount, Action, &[KeyTransition]); 5] = [
            (0, Action::Idle,       &[Release(Key::Up), Release(Key::Down)]),
            (1, Action::Accelerate, &[Press(Key::Up), Release(Key::Down)]),
            (1, Action::Accelerate, &[]),
            (2, Action::Brake,      &[Press(Key::Down), Release(Key::Up)]),
            (3, Action::Idle,       &[Release(Key::Up), Release(Key::Down)]),
        ];
        for (count, want_action, want_sent) in expected {
            let (action, sent) = m.update(count);
            assert_eq!(action, want_action, "count {}", count);
            assert!(same_set(&sent, want_sent), "count {}: {:?}", count, sent);
        }
    }

    #[test]
    fn no_hand_frames_settle_on_idle() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        for frame in 0..5 {
            let (action, sent) = m.update(0);
            assert_eq!(action, Action::Idle);
            if frame > 0 { assert!(sent.is_empty()); }
        }
    }

    #[test]
    fn never_both_held() {
        let mut rec = RecordingKeys::default();
        {
            let mut m = ActionMapper::new(&mut rec);
            let counts = [1u8, 2, 1, 2, 2, 0, 1, 5, 2, 1, 3, 2, 4, 1, 1, 2];
            for c in counts {
                m.update(c);
                let st = m.key_state();
                assert!(!(st.is_held(Key::Up) && st.is_held(Key::Down)));
            }
        }
        // The output itself never saw both held either, since releases go first
        let mut st = KeyState::default();
        for &t in &rec.log {
            st.apply(t);
            assert!(!(st.is_held(Key::Up) && st.is_held(Key::Down)));
        }
    }

    #[test]
    fn brake_to_accelerate_releases_down_first() {
        let mut rec = RecordingKeys::default();
        {
            let mut m = ActionMapper::new(&mut rec);
            m.update(2);
            let (_, sent) = m.update(1);
            assert_eq!(sent, vec![Release(Key::Down), Press(Key::Up)]);
        }
    }

    #[test]
    fn key_state_mirrors_output() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        for c in [2u8, 2, 1, 0, 2] {
            m.update(c);
            assert_eq!(m.key_state(), m.keys().state());
        }
    }

    #[test]
    fn release_all_only_touches_held_keys() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        m.update(1);
        assert_eq!(m.release_all(), vec![Release(Key::Up)]);
        assert!(!m.key_state().any_held());
        assert_eq!(m.action(), None);
        // Nothing left to release
        assert!(m.release_all().is_empty());
    }

    #[test]
    fn update_after_release_all_resends_row() {
        let mut rec = RecordingKeys::default();
        let mut m = ActionMapper::new(&mut rec);
        m.update(1);
        m.release_all();
        let (_, sent) = m.update(1);
        assert_eq!(sent.len(), 2);
        assert!(m.key_state().is_held(Key::Up));
    }

    #[test]
    fn drop_releases_held_key() {
        let mut rec = RecordingKeys::default();
        {
            let mut m = ActionMapper::new(&mut rec);
            m.update(1);
        }
        assert_eq!(rec.log.last(), Some(&Release(Key::Up)));
        assert!(!rec.state().any_held());
    }

    #[test]
    fn drop_while_idle_sends_nothing_extra() {
        let mut rec = RecordingKeys::default();
        {
            let mut m = ActionMapper::new(&mut rec);
            m.update(0);
        }
        assert_eq!(rec.log.len(), 2);
    }
}
