//! One object per practice session: owns the session state, the
//! dead-key composer, the lifecycle, and the metrics streams, and feeds
//! every accepted keystroke to all of them.

use chrono::{DateTime, Local};

use crate::dead_key::DeadKeyState;
use crate::event::KeyEvent;
use crate::layout::LayoutMapper;
use crate::lifecycle::{HostAction, SessionLifecycle};
use crate::metrics::{
    calculate_accuracy, calculate_rolling_wpm, generate_improvement_suggestions,
    identify_error_patterns, AccuracyReport, CharacterTracker, ErrorPattern, ErrorRecord,
    Keystroke, Suggestion, WpmStats, DEFAULT_ROLLING_WINDOW_MS,
};
use crate::session::{create_session, process_keystroke, Feedback, SessionSettings, SessionState};
use crate::snapshot::{take_snapshot, MetricsSnapshot};

pub struct TypingEngine<'a> {
    mapper: &'a dyn LayoutMapper,
    pub session: SessionState,
    dead_key: DeadKeyState,
    pub lifecycle: SessionLifecycle,
    keystrokes: Vec<Keystroke>,
    tracker: CharacterTracker,
    error_log: Vec<ErrorRecord>,
}

impl<'a> TypingEngine<'a> {
    pub fn new(mapper: &'a dyn LayoutMapper, text: &str, settings: SessionSettings) -> Self {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.load_text(text);
        TypingEngine {
            mapper,
            session: create_session(text, settings),
            dead_key: DeadKeyState::Idle,
            lifecycle,
            keystrokes: Vec::new(),
            tracker: CharacterTracker::new(),
            error_log: Vec::new(),
        }
    }

    /// Run one event through the input pipeline and fold the outcome
    /// into the metrics streams.
    pub fn key_event(&mut self, event: &KeyEvent) -> Feedback {
        let feedback = process_keystroke(event, &mut self.session, &mut self.dead_key, self.mapper);
        if !feedback.accepted {
            return feedback;
        }
        if !feedback.applied.is_empty() {
            self.lifecycle.keystroke();
        }
        for applied in &feedback.applied {
            self.keystrokes.push(Keystroke {
                timestamp_ms: applied.timestamp_ms,
                correct: applied.correct,
                character: applied.character.clone(),
            });
            // Attempts are tracked against the character the text asked
            // for, not the one that landed.
            let expected = self.session.characters[applied.index].expected.clone();
            self.tracker.record(&expected, applied.correct);
            if !applied.correct {
                self.error_log.push(ErrorRecord {
                    expected,
                    actual: applied.character.clone(),
                    timestamp_ms: applied.timestamp_ms,
                });
            }
        }
        if feedback.session_complete {
            self.lifecycle.complete();
        }
        feedback
    }

    pub fn pause(&mut self, now_ms: u64) {
        self.lifecycle.pause(now_ms);
        self.session.is_paused = true;
        self.session.pause_time_ms = Some(now_ms);
    }

    pub fn resume(&mut self, now_ms: u64) {
        self.lifecycle.resume(now_ms);
        if let Some(started) = self.session.pause_time_ms.take() {
            self.session.paused_total_ms += now_ms.saturating_sub(started);
        }
        self.session.is_paused = false;
    }

    /// Window blur pauses and may ask the host to auto-save.
    pub fn blur(&mut self, now_ms: u64) -> Option<HostAction> {
        let action = self.lifecycle.blur(now_ms);
        if action.is_some() {
            self.session.is_paused = true;
            self.session.pause_time_ms = Some(now_ms);
        }
        action
    }

    pub fn is_pending_dead_key(&self) -> bool {
        self.dead_key.is_pending()
    }

    pub fn rolling_wpm(&self, now_ms: u64) -> WpmStats {
        calculate_rolling_wpm(&self.keystrokes, DEFAULT_ROLLING_WINDOW_MS, now_ms)
    }

    pub fn accuracy(&self) -> AccuracyReport {
        calculate_accuracy(
            self.tracker.total_correct,
            self.tracker.total_attempts,
            &self.tracker,
        )
    }

    pub fn error_patterns(&self) -> Vec<ErrorPattern> {
        identify_error_patterns(&self.error_log)
    }

    pub fn suggestions(&self, now_ms: u64) -> Vec<Suggestion> {
        let report = self.accuracy();
        generate_improvement_suggestions(
            &self.tracker,
            &self.error_log,
            &self.rolling_wpm(now_ms),
            report.overall,
        )
    }

    /// Freeze final figures. Callable at any time; meaningful once the
    /// session is complete.
    pub fn finalize(&self, completed_at: DateTime<Local>) -> MetricsSnapshot {
        take_snapshot(
            &self.session,
            &self.keystrokes,
            &self.tracker,
            self.lifecycle.paused_total_ms,
            completed_at,
        )
    }

    /// Discard all progress and start over on `text`.
    pub fn reset(&mut self, text: &str) {
        let settings = self.session.settings;
        self.session = create_session(text, settings);
        self.dead_key = DeadKeyState::Idle;
        self.lifecycle.reset();
        self.lifecycle.load_text(text);
        self.keystrokes.clear();
        self.tracker.reset();
        self.error_log.clear();
    }
}
