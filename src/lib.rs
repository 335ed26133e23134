//! Typing-input engine for a touch-typing trainer targeting the
//! Latin-American Spanish keyboard layout.
//!
//! The pipeline runs in four stages: [`layout`] resolves physical key
//! codes to characters, [`dead_key`] composes accented characters from
//! two-key sequences, [`session`] matches the result against the target
//! text, and [`metrics`] turns the keystroke stream into speed and
//! accuracy figures. [`engine::TypingEngine`] wires the stages together
//! for hosts that want a single entry point.

pub mod dead_key;
pub mod engine;
pub mod event;
pub mod latam;
pub mod layout;
pub mod lifecycle;
pub mod metrics;
pub mod session;
pub mod snapshot;
pub mod util;

pub use dead_key::{DeadKeyState, DEAD_KEY_TIMEOUT_MS};
pub use engine::TypingEngine;
pub use event::KeyEvent;
pub use layout::{DeadKeyType, KeyboardLayout, LayoutMapper, ModifierState};
pub use session::{Feedback, SessionSettings, SessionState, TypingMode};
pub use snapshot::MetricsSnapshot;
