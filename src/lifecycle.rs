//! Coarse session lifecycle for host orchestration, layered over the
//! per-character state in `session`.

use strum_macros::Display;

/// Idle → Ready → Active ⇄ Paused → Completed → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Ready,
    Active,
    Paused,
    Completed,
}

/// Side effects the engine asks its host to perform. The host may
/// comply asynchronously or not at all; the engine never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    AutoSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionLifecycle {
    pub phase: SessionPhase,
    pause_started_ms: Option<u64>,
    pub paused_total_ms: u64,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loading empty text is a no-op; non-empty text arms the session.
    pub fn load_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        *self = SessionLifecycle {
            phase: SessionPhase::Ready,
            ..SessionLifecycle::default()
        };
    }

    /// The first validated keystroke moves Ready → Active.
    pub fn keystroke(&mut self) {
        if self.phase == SessionPhase::Ready {
            self.phase = SessionPhase::Active;
        }
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.phase == SessionPhase::Active {
            self.phase = SessionPhase::Paused;
            self.pause_started_ms = Some(now_ms);
        }
    }

    /// Window blur pauses like an explicit pause, and additionally asks
    /// the host to save in-flight progress.
    pub fn blur(&mut self, now_ms: u64) -> Option<HostAction> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.pause(now_ms);
        Some(HostAction::AutoSave)
    }

    pub fn resume(&mut self, now_ms: u64) {
        if self.phase != SessionPhase::Paused {
            return;
        }
        if let Some(started) = self.pause_started_ms.take() {
            self.paused_total_ms += now_ms.saturating_sub(started);
        }
        self.phase = SessionPhase::Active;
    }

    pub fn complete(&mut self) {
        if matches!(self.phase, SessionPhase::Active | SessionPhase::Ready) {
            self.phase = SessionPhase::Completed;
        }
    }

    pub fn reset(&mut self) {
        *self = SessionLifecycle::default();
    }
}
