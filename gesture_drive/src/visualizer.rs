//! Software-rendered overlay using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ACCELERATING            fingers 1           │
//! │                                              │
//! │            hand skeleton (21 landmarks)      │
//! │                                              │
//! │  keys: UP                                    │
//! │  legend                                      │
//! └──────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use finger_gesture::{Action, Finger, HandLandmarkSet, HAND_CONNECTIONS};

use crate::app::{FrameReport, FrameSink};
use crate::error::DriveError;
use crate::source::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 640;
pub const WIN_H:     usize = 480;
const LABEL_SCALE:   usize = 6;
const INFO_SCALE:    usize = 3;
const STATUS_Y:      usize = WIN_H - 48;
const BG_COLOR:      u32   = 0xFF1A1A2E;
const TEXT_BG:       u32   = 0xFF0F3460;
const BONE_COLOR:    u32   = 0xFFEEEEEE;
const JOINT_COLOR:   u32   = 0xFFFF4040;
const TIP_UP_COLOR:  u32   = 0xFF40FF40;

/// Overlay colour for each action.
pub fn action_color(action: Action) -> u32 {
    match action {
        Action::Accelerate => 0xFF00FF00,  // green
        Action::Brake      => 0xFFFF0000,  // red
        Action::Idle       => 0xFF00FFFF,  // cyan
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    /// Present only in simulation mode.
    sim_tx: Option<Sender<SimInput>>,
}

impl Visualizer {
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self, DriveError> {
        let mut window = Window::new(
            "Gesture Drive",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| DriveError::Window(e.to_string()))?;

        window.set_target_fps(60);

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
        })
    }

    fn send_sim(&self, key: SimKey) {
        if let Some(tx) = &self.sim_tx {
            let _ = tx.send(SimInput::KeyDown(key));
        }
    }

    // ── Hand skeleton ─────────────────────────────────────────────────────

    fn draw_hand(&mut self, hand: &HandLandmarkSet, report: &FrameReport) {
        let to_px = |i: usize| {
            let p = hand[i];
            (
                (p.x.clamp(0.0, 1.0) * (WIN_W - 1) as f32) as isize,
                (p.y.clamp(0.0, 1.0) * (WIN_H - 1) as f32) as isize,
            )
        };

        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (x0, y0) = to_px(a);
            let (x1, y1) = to_px(b);
            self.draw_line(x0, y0, x1, y1, BONE_COLOR);
        }
        for i in 0..hand.points().len() {
            let (x, y) = to_px(i);
            self.draw_dot(x, y, 3, JOINT_COLOR);
        }
        // Extended fingertips in green
        for finger in Finger::ALL {
            if report.fingers.is_extended(finger) {
                let (x, y) = to_px(finger.tip());
                self.draw_dot(x, y, 5, TIP_UP_COLOR);
            }
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < WIN_W && (y as usize) < WIN_H {
            self.buf[y as usize * WIN_W + x as usize] = color;
        }
    }

    fn draw_dot(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx*dx + dy*dy <= r*r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham, two pixels thick.
    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let dx =  (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel(x, y, color);
            self.set_pixel(x + 1, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// Minimal bitmap font: 3×5 characters, each pixel drawn `scale`×`scale`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

impl FrameSink for Visualizer {
    /// Poll keyboard input; returns `false` on Escape or window close.
    fn poll_input(&mut self) -> bool {
        if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            return false;
        }

        const POSE_KEYS: [(Key, u8); 6] = [
            (Key::Key0, 0), (Key::Key1, 1), (Key::Key2, 2),
            (Key::Key3, 3), (Key::Key4, 4), (Key::Key5, 5),
        ];
        for (key, n) in POSE_KEYS {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                self.send_sim(SimKey::Fingers(n));
            }
        }
        if self.window.is_key_pressed(Key::N, KeyRepeat::No) {
            self.send_sim(SimKey::HideHand);
        }

        true
    }

    /// Render one frame.
    fn render(&mut self, report: &FrameReport) {
        self.buf.fill(BG_COLOR);

        if let Some(hand) = &report.hand {
            self.draw_hand(hand, report);
        }

        // ── Action label ──────────────────────────────────────────────────
        let color = action_color(report.action);
        self.draw_label(report.action.label(), 20, 20, LABEL_SCALE, color);
        let count = match report.hand {
            Some(_) => format!("fingers {}", report.fingers.count()),
            None    => "no hand".to_string(),
        };
        self.draw_label(&count, 20, 20 + 7 * LABEL_SCALE, INFO_SCALE, 0xFFAADDFF);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        let held: Vec<String> = report.keys.held().map(|k| k.to_string()).collect();
        let status = if held.is_empty() {
            "keys: none".to_string()
        } else {
            format!("keys: {}", held.join(" "))
        };
        self.draw_label(&status, 10, STATUS_Y + 8, INFO_SCALE, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        let legend = if self.sim_tx.is_some() {
            "0-5=fingers  N=no hand  Esc=exit"
        } else {
            "Esc=exit"
        };
        self.draw_label(legend, 10, WIN_H - 14, 2, 0xFF888888);

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
