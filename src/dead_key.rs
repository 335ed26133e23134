//! Dead-key composition: a two-state machine that holds one pending
//! diacritic and combines it with the next base character.
//!
//! The state is a plain value threaded through each call — one value per
//! logical input stream, never shared. Timeouts are evaluated lazily at
//! the next event; nothing mutates without an incoming key.

use crate::layout::DeadKeyType;

/// Pending diacritics expire if the base character takes longer than this.
pub const DEAD_KEY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DeadKeyState {
    #[default]
    Idle,
    AwaitingBase {
        kind: DeadKeyType,
        visual: char,
        since_ms: u64,
    },
}

/// What a single composer transition produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    /// Characters to feed onward, in order. `None` when the input was
    /// swallowed (pending) or silently cancelled.
    pub output: Option<String>,
    /// The input was absorbed into composer state rather than passed on.
    pub consumed: bool,
    /// A table composition (or precomposed reconciliation) succeeded.
    pub composed: bool,
    /// A backspace cancelled the pending diacritic; the caller must not
    /// also delete a committed character.
    pub cancelled_pending: bool,
}

impl Composition {
    fn pending() -> Self {
        Composition {
            consumed: true,
            ..Composition::default()
        }
    }

    fn passthrough(c: char) -> Self {
        Composition {
            output: Some(c.to_string()),
            ..Composition::default()
        }
    }

    fn composed(c: char) -> Self {
        Composition {
            output: Some(c.to_string()),
            consumed: true,
            composed: true,
            ..Composition::default()
        }
    }

    fn fallout(visual: char, c: char) -> Self {
        let mut s = String::with_capacity(8);
        s.push(visual);
        s.push(c);
        Composition {
            output: Some(s),
            ..Composition::default()
        }
    }

    fn bare(visual: char) -> Self {
        Composition {
            output: Some(visual.to_string()),
            consumed: true,
            ..Composition::default()
        }
    }
}

impl DeadKeyState {
    pub fn is_pending(&self) -> bool {
        matches!(self, DeadKeyState::AwaitingBase { .. })
    }

    fn expired(&self, now_ms: u64) -> bool {
        match self {
            DeadKeyState::AwaitingBase { since_ms, .. } => {
                now_ms.saturating_sub(*since_ms) > DEAD_KEY_TIMEOUT_MS
            }
            DeadKeyState::Idle => false,
        }
    }

    /// A dead key was pressed.
    pub fn press_dead_key(self, kind: DeadKeyType, now_ms: u64) -> (Self, Composition) {
        let pend = DeadKeyState::AwaitingBase {
            kind,
            visual: kind.visual(),
            since_ms: now_ms,
        };
        match self {
            DeadKeyState::Idle => (pend, Composition::pending()),
            DeadKeyState::AwaitingBase {
                kind: pending,
                visual,
                ..
            } => {
                if pending == kind && !self.expired(now_ms) {
                    // Double press emits the literal mark.
                    (DeadKeyState::Idle, Composition::bare(visual))
                } else {
                    // A different dead key (or an expired one) flushes the
                    // previous glyph; the new diacritic starts pending.
                    // Two independent events, not a composition.
                    (pend, Composition::bare(visual))
                }
            }
        }
    }

    /// An ordinary character arrived.
    pub fn press_char(self, c: char, now_ms: u64) -> (Self, Composition) {
        match self {
            DeadKeyState::Idle => (DeadKeyState::Idle, Composition::passthrough(c)),
            DeadKeyState::AwaitingBase { kind, visual, .. } => {
                if self.expired(now_ms) {
                    return (DeadKeyState::Idle, Composition::fallout(visual, c));
                }
                // Some platforms pre-compose before the engine sees the
                // event; accept the precomposed form the pending diacritic
                // would have produced.
                if kind.composes_to(c) {
                    return (DeadKeyState::Idle, Composition::composed(c));
                }
                match kind.compose(c) {
                    Some(composed) => (DeadKeyState::Idle, Composition::composed(composed)),
                    None => (DeadKeyState::Idle, Composition::fallout(visual, c)),
                }
            }
        }
    }

    /// Escape silently cancels a pending diacritic.
    pub fn press_escape(self) -> (Self, Composition) {
        match self {
            DeadKeyState::Idle => (DeadKeyState::Idle, Composition::default()),
            DeadKeyState::AwaitingBase { .. } => (
                DeadKeyState::Idle,
                Composition {
                    consumed: true,
                    ..Composition::default()
                },
            ),
        }
    }

    /// Backspace cancels a pending diacritic and says so, so the caller
    /// does not also delete a committed character.
    pub fn press_backspace(self) -> (Self, Composition) {
        match self {
            DeadKeyState::Idle => (DeadKeyState::Idle, Composition::default()),
            DeadKeyState::AwaitingBase { .. } => (
                DeadKeyState::Idle,
                Composition {
                    consumed: true,
                    cancelled_pending: true,
                    ..Composition::default()
                },
            ),
        }
    }

    /// Enter is never composable; a pending diacritic flushes as the
    /// bare mark.
    pub fn press_enter(self) -> (Self, Composition) {
        match self {
            DeadKeyState::Idle => (DeadKeyState::Idle, Composition::default()),
            DeadKeyState::AwaitingBase { visual, .. } => {
                (DeadKeyState::Idle, Composition::bare(visual))
            }
        }
    }
}
