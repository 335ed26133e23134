//! Immutable end-of-session summary, serializable for host persistence.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::metrics::{calculate_accuracy, calculate_wpm, CharacterTracker, Keystroke};
use crate::session::{CharState, SessionState};
use crate::util;

/// Final attempt counters for one character, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub character: String,
    pub correct: u32,
    pub total: u32,
}

/// Everything a host needs to persist or render about a finished
/// session. Values are final; the snapshot never updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub completed_at: DateTime<Local>,
    /// Wall time actually typing; paused stretches are excluded.
    pub elapsed_ms: u64,
    pub gross_wpm: f64,
    pub net_wpm: f64,
    pub cpm: u32,
    pub accuracy: f64,
    /// Standard deviation of correct keystrokes per second. Lower is
    /// steadier; zero for sub-second sessions.
    pub consistency: f64,
    /// Slots that were wrong at some point but right in the end.
    pub corrected: usize,
    pub problematic_chars: Vec<String>,
    pub most_missed: Vec<String>,
    pub per_character: Vec<CharacterEntry>,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Freeze the session and its keystroke stream into a snapshot.
pub fn take_snapshot(
    session: &SessionState,
    keystrokes: &[Keystroke],
    tracker: &CharacterTracker,
    paused_total_ms: u64,
    completed_at: DateTime<Local>,
) -> MetricsSnapshot {
    let elapsed_ms = match (session.start_time_ms, session.end_time_ms) {
        (Some(start), Some(end)) => end.saturating_sub(start).saturating_sub(paused_total_ms),
        _ => 0,
    };
    let errors = keystrokes.iter().filter(|k| !k.correct).count();
    let wpm = calculate_wpm(keystrokes.len(), errors, elapsed_ms as i64);
    let report = calculate_accuracy(tracker.total_correct, tracker.total_attempts, tracker);

    let consistency = match (session.start_time_ms, session.end_time_ms) {
        (Some(start), Some(end)) if end > start => {
            // Pace is judged on correct keystrokes only.
            let timestamps: Vec<u64> = keystrokes
                .iter()
                .filter(|k| k.correct)
                .map(|k| k.timestamp_ms)
                .collect();
            let buckets = util::per_second_buckets(&timestamps, start, end);
            util::std_dev(&buckets).unwrap_or(0.0)
        }
        _ => 0.0,
    };

    let corrected = session
        .characters
        .iter()
        .filter(|c| c.state == CharState::Corrected)
        .count();

    MetricsSnapshot {
        completed_at,
        elapsed_ms,
        gross_wpm: wpm.gross_wpm,
        net_wpm: wpm.net_wpm,
        cpm: wpm.cpm,
        accuracy: report.overall,
        consistency,
        corrected,
        problematic_chars: report.problematic_chars,
        most_missed: report.most_missed,
        per_character: tracker
            .iter()
            .map(|(character, counts)| CharacterEntry {
                character: character.to_string(),
                correct: counts.correct,
                total: counts.total,
            })
            .collect(),
    }
}
