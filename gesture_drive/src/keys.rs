//! Key output backends.
//!
//! * [`LogKeys`]: records transitions through `tracing` only (default).
//! * `EnigoKeys`: real Up/Down arrow key holds via `enigo` (feature `inject`).

use finger_gesture::{Key, KeyOutput};
use tracing::info;

use crate::config::KeyBackend;

// ── logging backend ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LogKeys;

impl KeyOutput for LogKeys {
    fn press(&mut self, key: Key) {
        info!(target: "gesture_drive::keys", "press {}", key);
    }
    fn release(&mut self, key: Key) {
        info!(target: "gesture_drive::keys", "release {}", key);
    }
}

// ── enigo backend ─────────────────────────────────────────────────────────

/// Holds the arrow keys at OS level.  `key_down` on a key that is already
/// down just keeps it down, so repeated presses are harmless.
#[cfg(feature = "inject")]
pub struct EnigoKeys {
    enigo: enigo::Enigo,
}

#[cfg(feature = "inject")]
impl EnigoKeys {
    pub fn new() -> Self {
        EnigoKeys { enigo: enigo::Enigo::new() }
    }

    fn arrow(key: Key) -> enigo::Key {
        match key {
            Key::Up   => enigo::Key::UpArrow,
            Key::Down => enigo::Key::DownArrow,
        }
    }
}

#[cfg(feature = "inject")]
impl KeyOutput for EnigoKeys {
    fn press(&mut self, key: Key) {
        use enigo::KeyboardControllable;
        self.enigo.key_down(Self::arrow(key));
    }
    fn release(&mut self, key: Key) {
        use enigo::KeyboardControllable;
        self.enigo.key_up(Self::arrow(key));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_key_output: pick the backend, falling back to logging
// ════════════════════════════════════════════════════════════════════════════

/// Open the requested key backend.
/// Falls back to [`LogKeys`] with a warning if injection isn't compiled in.
pub fn open_key_output(backend: KeyBackend) -> Box<dyn KeyOutput> {
    match backend {
        KeyBackend::Log => Box::new(LogKeys),
        KeyBackend::Inject => {
            #[cfg(feature = "inject")]
            {
                info!("injecting Up/Down arrow keys");
                Box::new(EnigoKeys::new())
            }
            #[cfg(not(feature = "inject"))]
            {
                tracing::warn!("key injection not compiled in (build with --features inject), logging keys instead");
                Box::new(LogKeys)
            }
        }
    }
}
