//! Normalized inbound key events.
//!
//! Translation from browser/OS events (including AltGr disambiguation)
//! happens in the host; the engine only ever sees this shape.

use crate::layout::ModifierState;

/// One normalized physical-key event.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// Stable physical code ("KeyA", "BracketLeft", "Space", ...).
    pub code: String,
    /// The character the host's input stack produced, when it did.
    /// May already be precomposed on platforms that compose before us.
    pub produced: Option<String>,
    pub modifiers: ModifierState,
    pub timestamp_ms: u64,
    pub is_repeat: bool,
}

impl KeyEvent {
    pub fn new(code: &str, modifiers: ModifierState, timestamp_ms: u64) -> Self {
        KeyEvent {
            code: code.to_string(),
            produced: None,
            modifiers,
            timestamp_ms,
            is_repeat: false,
        }
    }

    pub fn with_produced(mut self, produced: &str) -> Self {
        self.produced = Some(produced.to_string());
        self
    }

    pub fn repeat(mut self) -> Self {
        self.is_repeat = true;
        self
    }
}

/// Modifier-only key codes, both sides. These never produce characters
/// and are rejected outright by the session engine.
pub fn is_modifier_code(code: &str) -> bool {
    matches!(
        code,
        "ShiftLeft"
            | "ShiftRight"
            | "AltLeft"
            | "AltRight"
            | "ControlLeft"
            | "ControlRight"
            | "MetaLeft"
            | "MetaRight"
    )
}
