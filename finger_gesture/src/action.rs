//! Actions, virtual keys and the key-output seam.

use std::fmt;

use crate::classifier::FingerCount;

// ════════════════════════════════════════════════════════════════════════════
// Action
// ════════════════════════════════════════════════════════════════════════════

/// Control intent for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Accelerate,
    Brake,
    Idle,
}

impl Action {
    pub fn from_finger_count(count: FingerCount) -> Self {
        match count {
            1 => Action::Accelerate,
            2 => Action::Brake,
            _ => Action::Idle,
        }
    }

    /// The key transitions that put the keys into this action's state.
    ///
    /// Releases come first so switching straight from Brake to Accelerate
    /// (or back) never holds both keys.
    pub fn transitions(self) -> &'static [KeyTransition] {
        const ACCELERATE: [KeyTransition; 2] =
            [KeyTransition::Release(Key::Down), KeyTransition::Press(Key::Up)];
        const BRAKE: [KeyTransition; 2] =
            [KeyTransition::Release(Key::Up), KeyTransition::Press(Key::Down)];
        const IDLE: [KeyTransition; 2] =
            [KeyTransition::Release(Key::Up), KeyTransition::Release(Key::Down)];
        match self {
            Action::Accelerate => &ACCELERATE,
            Action::Brake      => &BRAKE,
            Action::Idle       => &IDLE,
        }
    }

    /// Overlay label.
    pub fn label(self) -> &'static str {
        match self {
            Action::Accelerate => "Accelerating",
            Action::Brake      => "Braking",
            Action::Idle       => "Idle",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Key / KeyTransition
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
}

impl Key {
    pub const ALL: [Key; 2] = [Key::Up, Key::Down];
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Up   => f.write_str("UP"),
            Key::Down => f.write_str("DOWN"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    Press(Key),
    Release(Key),
}

impl KeyTransition {
    pub fn key(self) -> Key {
        match self {
            KeyTransition::Press(k) | KeyTransition::Release(k) => k,
        }
    }
}

impl fmt::Display for KeyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTransition::Press(k)   => write!(f, "press {}", k),
            KeyTransition::Release(k) => write!(f, "release {}", k),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KeyState
// ════════════════════════════════════════════════════════════════════════════

/// Held flags for Up and Down.  Never both held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    up:   bool,
    down: bool,
}

impl KeyState {
    pub fn is_held(&self, key: Key) -> bool {
        match key {
            Key::Up   => self.up,
            Key::Down => self.down,
        }
    }

    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.into_iter().filter(move |&k| self.is_held(k))
    }

    pub fn any_held(&self) -> bool {
        self.up || self.down
    }

    pub fn apply(&mut self, transition: KeyTransition) {
        let (key, held) = match transition {
            KeyTransition::Press(k)   => (k, true),
            KeyTransition::Release(k) => (k, false),
        };
        match key {
            Key::Up   => self.up = held,
            Key::Down => self.down = held,
        }
        debug_assert!(!(self.up && self.down), "both keys held");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KeyOutput: abstraction over OS key injection / logging / recording
// ════════════════════════════════════════════════════════════════════════════

/// Level-triggered key sink: pressing a held key or releasing a free key is
/// harmless.
pub trait KeyOutput {
    fn press(&mut self, key: Key);
    fn release(&mut self, key: Key);

    fn send(&mut self, transition: KeyTransition) {
        match transition {
            KeyTransition::Press(k)   => self.press(k),
            KeyTransition::Release(k) => self.release(k),
        }
    }
}

impl<K: KeyOutput + ?Sized> KeyOutput for &mut K {
    fn press(&mut self, key: Key)   { (**self).press(key) }
    fn release(&mut self, key: Key) { (**self).release(key) }
}

impl<K: KeyOutput + ?Sized> KeyOutput for Box<K> {
    fn press(&mut self, key: Key)   { (**self).press(key) }
    fn release(&mut self, key: Key) { (**self).release(key) }
}

// ── recording backend (tests, dry runs) ───────────────────────────────────

/// Remembers every call in order and mirrors the resulting held state.
#[derive(Debug, Default)]
pub struct RecordingKeys {
    pub log: Vec<KeyTransition>,
    state:   KeyState,
}

impl RecordingKeys {
    pub fn state(&self) -> KeyState {
        self.state
    }
}

impl KeyOutput for RecordingKeys {
    fn press(&mut self, key: Key) {
        self.log.push(KeyTransition::Press(key));
        self.state.apply(KeyTransition::Press(key));
    }

    fn release(&mut self, key: Key) {
        self.log.push(KeyTransition::Release(key));
        self.state.apply(KeyTransition::Release(key));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
