//! Speed and accuracy statistics derived from the session's keystroke
//! stream. Pure functions over timestamped correctness flags; nothing
//! here touches session state.

use std::collections::HashMap;

use itertools::Itertools;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Default sliding window for the rolling WPM figure.
pub const DEFAULT_ROLLING_WINDOW_MS: u64 = 30_000;

/// A character must have at least this many attempts before it can be
/// flagged problematic; avoids false positives from single typos.
pub const MIN_ATTEMPTS_FOR_FLAG: u32 = 3;

/// Per-character accuracy below this marks the character problematic.
pub const PROBLEM_ACCURACY_THRESHOLD: f64 = 90.0;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Words-per-minute figures for one stretch of typing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WpmStats {
    /// `(chars / 5) / minutes`, one decimal.
    pub gross_wpm: f64,
    /// Gross penalized by `(errors / 5) / minutes`, floored at zero.
    pub net_wpm: f64,
    /// Characters per minute, whole number.
    pub cpm: u32,
}

/// One timestamped correctness flag from the session stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Keystroke {
    pub timestamp_ms: u64,
    pub correct: bool,
    pub character: String,
}

/// Zero or negative elapsed time, or zero characters, yields all zeros;
/// never a division error.
pub fn calculate_wpm(chars_typed: usize, errors: usize, elapsed_ms: i64) -> WpmStats {
    if elapsed_ms <= 0 || chars_typed == 0 {
        return WpmStats::default();
    }
    let minutes = elapsed_ms as f64 / 60_000.0;
    let gross = (chars_typed as f64 / 5.0) / minutes;
    let penalty = (errors as f64 / 5.0) / minutes;
    let net = (gross - penalty).max(0.0);
    WpmStats {
        gross_wpm: round1(gross),
        net_wpm: round1(net),
        cpm: (chars_typed as f64 / minutes).round() as u32,
    }
}

/// WPM over the trailing window only. Elapsed time runs from the
/// earliest keystroke remaining in the window to `now_ms`, not the full
/// window size; fewer than two qualifying keystrokes yields zeros.
pub fn calculate_rolling_wpm(keystrokes: &[Keystroke], window_ms: u64, now_ms: u64) -> WpmStats {
    let cutoff = now_ms.saturating_sub(window_ms);
    let in_window: Vec<&Keystroke> = keystrokes
        .iter()
        .filter(|k| k.timestamp_ms >= cutoff)
        .collect();
    if in_window.len() < 2 {
        return WpmStats::default();
    }
    let earliest = in_window
        .iter()
        .map(|k| k.timestamp_ms)
        .min()
        .unwrap_or(now_ms);
    let errors = in_window.iter().filter(|k| !k.correct).count();
    calculate_wpm(
        in_window.len(),
        errors,
        now_ms.saturating_sub(earliest) as i64,
    )
}

/// Attempt counters for one character.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharCounts {
    pub correct: u32,
    pub total: u32,
}

impl CharCounts {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }

    pub fn errors(&self) -> u32 {
        self.total - self.correct
    }
}

/// Per-character attempt counters in insertion order, plus running
/// totals. Purely additive; decremented only by a full reset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharacterTracker {
    entries: Vec<(String, CharCounts)>,
    index: HashMap<String, usize>,
    pub total_correct: u32,
    pub total_attempts: u32,
}

impl CharacterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, character: &str, correct: bool) {
        let i = *self.index.entry(character.to_string()).or_insert_with(|| {
            self.entries.push((character.to_string(), CharCounts::default()));
            self.entries.len() - 1
        });
        let counts = &mut self.entries[i].1;
        counts.total += 1;
        if correct {
            counts.correct += 1;
        }
        self.total_attempts += 1;
        if correct {
            self.total_correct += 1;
        }
    }

    pub fn counts(&self, character: &str) -> Option<CharCounts> {
        self.index.get(character).map(|&i| self.entries[i].1)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CharCounts)> {
        self.entries.iter().map(|(c, n)| (c.as_str(), *n))
    }

    pub fn reset(&mut self) {
        *self = CharacterTracker::default();
    }
}

/// Accuracy summary over one session.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    /// `correct / total * 100`, one decimal; 100.0 when nothing typed.
    pub overall: f64,
    pub per_character: Vec<(String, f64)>,
    pub problematic_chars: Vec<String>,
    /// Up to five lowest-accuracy characters meeting the attempts bar,
    /// ties broken by insertion order.
    pub most_missed: Vec<String>,
}

pub fn calculate_accuracy(correct: u32, total: u32, tracker: &CharacterTracker) -> AccuracyReport {
    let overall = if total == 0 {
        100.0
    } else {
        round1(correct as f64 / total as f64 * 100.0)
    };
    let per_character: Vec<(String, f64)> = tracker
        .iter()
        .map(|(c, n)| (c.to_string(), round1(n.accuracy())))
        .collect();
    let problematic_chars: Vec<String> = tracker
        .iter()
        .filter(|(_, n)| n.total >= MIN_ATTEMPTS_FOR_FLAG && n.accuracy() < PROBLEM_ACCURACY_THRESHOLD)
        .map(|(c, _)| c.to_string())
        .collect();
    let most_missed: Vec<String> = tracker
        .iter()
        .filter(|(_, n)| n.total >= MIN_ATTEMPTS_FOR_FLAG)
        .sorted_by(|a, b| a.1.accuracy().total_cmp(&b.1.accuracy()))
        .take(5)
        .map(|(c, _)| c.to_string())
        .collect();
    AccuracyReport {
        overall,
        per_character,
        problematic_chars,
        most_missed,
    }
}

/// One recorded miss: what was wanted and what landed instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub expected: String,
    pub actual: String,
    pub timestamp_ms: u64,
}

/// All misses against one expected character, with its most frequent
/// substitutions.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPattern {
    pub expected: String,
    pub count: usize,
    /// Up to three substituted characters, most frequent first.
    pub substitutions: Vec<(String, usize)>,
}

pub fn identify_error_patterns(error_log: &[ErrorRecord]) -> Vec<ErrorPattern> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
    for rec in error_log {
        let entry = groups.entry(rec.expected.clone()).or_default();
        if entry.is_empty() {
            order.push(rec.expected.clone());
        }
        entry.push(rec.actual.as_str());
    }

    let mut patterns: Vec<ErrorPattern> = order
        .into_iter()
        .map(|expected| {
            let actuals = &groups[&expected];
            let mut sub_order: Vec<&str> = Vec::new();
            let mut sub_counts: HashMap<&str, usize> = HashMap::new();
            for a in actuals {
                if !sub_counts.contains_key(a) {
                    sub_order.push(a);
                }
                *sub_counts.entry(a).or_insert(0) += 1;
            }
            let substitutions: Vec<(String, usize)> = sub_order
                .into_iter()
                .map(|a| (a.to_string(), sub_counts[a]))
                .sorted_by(|a, b| b.1.cmp(&a.1))
                .take(3)
                .collect();
            ErrorPattern {
                expected,
                count: actuals.len(),
                substitutions,
            }
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count));
    patterns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SuggestionKind {
    CharacterPractice,
    Pacing,
    ModifierKeys,
    AccentPractice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub priority: Priority,
    pub kind: SuggestionKind,
    pub characters: Vec<String>,
    pub message: String,
}

fn is_accented(grapheme: &str) -> bool {
    grapheme.nfd().any(is_combining_mark)
}

/// Prioritized practice advice. Sorted high → medium → low; ties keep
/// insertion order.
pub fn generate_improvement_suggestions(
    tracker: &CharacterTracker,
    error_log: &[ErrorRecord],
    wpm: &WpmStats,
    overall_accuracy: f64,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = Vec::new();

    for (c, counts) in tracker.iter() {
        if counts.errors() >= 3 {
            suggestions.push(Suggestion {
                priority: Priority::High,
                kind: SuggestionKind::CharacterPractice,
                characters: vec![c.to_string()],
                message: format!(
                    "'{c}' missed {} times in {} attempts; drill it in isolation",
                    counts.errors(),
                    counts.total
                ),
            });
        }
    }

    if wpm.gross_wpm > 40.0 && overall_accuracy < 90.0 {
        suggestions.push(Suggestion {
            priority: Priority::Medium,
            kind: SuggestionKind::Pacing,
            characters: vec![],
            message: "fast but sloppy: slow down until accuracy recovers above 90%".to_string(),
        });
    }

    let mut uppercase_misses: Vec<String> = Vec::new();
    for rec in error_log {
        let mut chars = rec.expected.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            continue;
        };
        if !c.is_uppercase() {
            continue;
        }
        if rec.actual == c.to_lowercase().to_string() && !uppercase_misses.contains(&rec.expected)
        {
            uppercase_misses.push(rec.expected.clone());
        }
    }
    if uppercase_misses.len() >= 3 {
        suggestions.push(Suggestion {
            priority: Priority::Medium,
            kind: SuggestionKind::ModifierKeys,
            characters: uppercase_misses,
            message: "uppercase letters keep landing lowercase; practice holding Shift".to_string(),
        });
    }

    let mut accented: Vec<String> = Vec::new();
    for rec in error_log {
        if is_accented(&rec.expected) && !accented.contains(&rec.expected) {
            accented.push(rec.expected.clone());
        }
    }
    if accented.len() >= 2 {
        suggestions.push(Suggestion {
            priority: Priority::Low,
            kind: SuggestionKind::AccentPractice,
            characters: accented,
            message: "several accented characters are missing; practice dead-key sequences"
                .to_string(),
        });
    }

    suggestions.sort_by_key(|s| s.priority);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strokes(specs: &[(u64, bool)]) -> Vec<Keystroke> {
        specs
            .iter()
            .map(|&(timestamp_ms, correct)| Keystroke {
                timestamp_ms,
                correct,
                character: "x".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_wpm_zero_input() {
        assert_eq!(calculate_wpm(0, 0, 60_000), WpmStats::default());
        assert_eq!(calculate_wpm(10, 0, 0), WpmStats::default());
        assert_eq!(calculate_wpm(10, 0, -500), WpmStats::default());
    }

    #[test]
    fn test_wpm_clean_minute() {
        let w = calculate_wpm(50, 0, 60_000);
        assert_eq!(w.gross_wpm, 10.0);
        assert_eq!(w.net_wpm, 10.0);
        assert_eq!(w.cpm, 50);
    }

    #[test]
    fn test_wpm_error_penalty() {
        let w = calculate_wpm(50, 5, 60_000);
        assert_eq!(w.gross_wpm, 10.0);
        assert_eq!(w.net_wpm, 9.0);
        assert_eq!(w.cpm, 50);
    }

    #[test]
    fn test_net_wpm_never_negative() {
        let w = calculate_wpm(5, 500, 60_000);
        assert_eq!(w.net_wpm, 0.0);
        let w = calculate_wpm(1, usize::MAX / 8, 60_000);
        assert_eq!(w.net_wpm, 0.0);
    }

    #[test]
    fn test_wpm_rounding_one_decimal() {
        // 7 chars in 13 s: gross = (7/5)/(13/60) = 6.4615... -> 6.5
        let w = calculate_wpm(7, 0, 13_000);
        assert_eq!(w.gross_wpm, 6.5);
        assert_eq!(w.cpm, 32);
    }

    #[test]
    fn test_hello_scenario() {
        // "hello" at one keystroke per second, start to finish 4 s.
        let w = calculate_wpm(5, 0, 4_000);
        assert_eq!(w.gross_wpm, 15.0);
        assert_eq!(w.net_wpm, 15.0);
        assert_eq!(w.cpm, 75);
    }

    #[test]
    fn test_rolling_needs_two_keystrokes() {
        let ks = strokes(&[(1000, true)]);
        assert_eq!(
            calculate_rolling_wpm(&ks, DEFAULT_ROLLING_WINDOW_MS, 2000),
            WpmStats::default()
        );
        assert_eq!(
            calculate_rolling_wpm(&[], DEFAULT_ROLLING_WINDOW_MS, 2000),
            WpmStats::default()
        );
    }

    #[test]
    fn test_rolling_filters_window() {
        // Two old keystrokes fall outside a 30 s window; three remain.
        let ks = strokes(&[
            (0, true),
            (1_000, true),
            (40_000, true),
            (45_000, false),
            (50_000, true),
        ]);
        let w = calculate_rolling_wpm(&ks, DEFAULT_ROLLING_WINDOW_MS, 60_000);
        // Earliest in window at 40 s, now 60 s: 3 chars, 1 error, 20 s.
        assert_eq!(w, calculate_wpm(3, 1, 20_000));
    }

    #[test]
    fn test_rolling_elapsed_from_earliest_not_window() {
        let ks = strokes(&[(55_000, true), (56_000, true), (57_000, true)]);
        let w = calculate_rolling_wpm(&ks, DEFAULT_ROLLING_WINDOW_MS, 58_000);
        assert_eq!(w, calculate_wpm(3, 0, 3_000));
    }

    #[test]
    fn test_accuracy_empty_is_perfect() {
        let report = calculate_accuracy(0, 0, &CharacterTracker::new());
        assert_eq!(report.overall, 100.0);
        assert!(report.problematic_chars.is_empty());
        assert!(report.most_missed.is_empty());
    }

    #[test]
    fn test_accuracy_overall_rounding() {
        let report = calculate_accuracy(2, 3, &CharacterTracker::new());
        assert_eq!(report.overall, 66.7);
    }

    #[test]
    fn test_two_misses_never_flagged() {
        let mut t = CharacterTracker::new();
        t.record("q", false);
        t.record("q", false);
        let report = calculate_accuracy(0, 2, &t);
        assert!(report.problematic_chars.is_empty());
        assert!(report.most_missed.is_empty());
    }

    #[test]
    fn test_three_misses_always_flagged() {
        let mut t = CharacterTracker::new();
        for _ in 0..3 {
            t.record("q", false);
        }
        let report = calculate_accuracy(0, 3, &t);
        assert_eq!(report.problematic_chars, vec!["q"]);
        assert_eq!(report.most_missed, vec!["q"]);
    }

    #[test]
    fn test_problematic_needs_low_accuracy() {
        let mut t = CharacterTracker::new();
        for _ in 0..9 {
            t.record("a", true);
        }
        t.record("a", false); // 90.0 exactly: not below threshold
        let report = calculate_accuracy(9, 10, &t);
        assert!(report.problematic_chars.is_empty());
    }

    #[test]
    fn test_most_missed_order_and_cap() {
        let mut t = CharacterTracker::new();
        // six characters at or above the attempts bar, varying accuracy
        for (c, hits) in [("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 3), ("f", 2)] {
            for i in 0..4 {
                t.record(c, i < hits);
            }
        }
        let report = calculate_accuracy(9, 24, &t);
        // a(0%) then b/d tie (25%, insertion order), then c/f tie (50%).
        assert_eq!(report.most_missed, vec!["a", "b", "d", "c", "f"]);
        assert_eq!(report.most_missed.len(), 5);
    }

    #[test]
    fn test_error_patterns_empty() {
        assert!(identify_error_patterns(&[]).is_empty());
    }

    fn err(expected: &str, actual: &str, ts: u64) -> ErrorRecord {
        ErrorRecord {
            expected: expected.to_string(),
            actual: actual.to_string(),
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_error_patterns_grouping_and_order() {
        let log = vec![
            err("a", "s", 0),
            err("e", "r", 1),
            err("a", "s", 2),
            err("a", "q", 3),
            err("e", "w", 4),
            err("a", "s", 5),
        ];
        let patterns = identify_error_patterns(&log);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].expected, "a");
        assert_eq!(patterns[0].count, 4);
        assert_eq!(
            patterns[0].substitutions,
            vec![("s".to_string(), 3), ("q".to_string(), 1)]
        );
        assert_eq!(patterns[1].expected, "e");
        assert_eq!(patterns[1].count, 2);
    }

    #[test]
    fn test_error_patterns_top_three_substitutions() {
        let log = vec![
            err("a", "q", 0),
            err("a", "w", 1),
            err("a", "e", 2),
            err("a", "r", 3),
            err("a", "w", 4),
        ];
        let patterns = identify_error_patterns(&log);
        assert_eq!(patterns[0].substitutions.len(), 3);
        assert_eq!(patterns[0].substitutions[0], ("w".to_string(), 2));
    }

    #[test]
    fn test_suggestion_character_practice() {
        let mut t = CharacterTracker::new();
        for _ in 0..3 {
            t.record("ñ", false);
        }
        t.record("a", true);
        let s = generate_improvement_suggestions(&t, &[], &WpmStats::default(), 25.0);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].kind, SuggestionKind::CharacterPractice);
        assert_eq!(s[0].priority, Priority::High);
        assert_eq!(s[0].characters, vec!["ñ"]);
    }

    #[test]
    fn test_suggestion_pacing() {
        let wpm = WpmStats {
            gross_wpm: 45.0,
            net_wpm: 30.0,
            cpm: 225,
        };
        let s = generate_improvement_suggestions(&CharacterTracker::new(), &[], &wpm, 85.0);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].kind, SuggestionKind::Pacing);
        // Accurate or slow typists get no pacing nag.
        let s = generate_improvement_suggestions(&CharacterTracker::new(), &[], &wpm, 95.0);
        assert!(s.is_empty());
    }

    #[test]
    fn test_suggestion_modifier_keys() {
        let log = vec![
            err("A", "a", 0),
            err("B", "b", 1),
            err("C", "c", 2),
            err("D", "x", 3), // not a lowercase substitution
        ];
        let s = generate_improvement_suggestions(
            &CharacterTracker::new(),
            &log,
            &WpmStats::default(),
            100.0,
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].kind, SuggestionKind::ModifierKeys);
        assert_eq!(s[0].characters, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_suggestion_modifier_keys_needs_three() {
        let log = vec![err("A", "a", 0), err("B", "b", 1)];
        let s = generate_improvement_suggestions(
            &CharacterTracker::new(),
            &log,
            &WpmStats::default(),
            100.0,
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_suggestion_accent_practice() {
        let log = vec![err("á", "a", 0), err("é", "e", 1), err("á", "a", 2)];
        let s = generate_improvement_suggestions(
            &CharacterTracker::new(),
            &log,
            &WpmStats::default(),
            100.0,
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].kind, SuggestionKind::AccentPractice);
        assert_eq!(s[0].characters, vec!["á", "é"]);
        assert_eq!(s[0].priority, Priority::Low);
    }

    #[test]
    fn test_suggestions_sorted_by_priority() {
        let mut t = CharacterTracker::new();
        for _ in 0..4 {
            t.record("ñ", false);
        }
        let wpm = WpmStats {
            gross_wpm: 50.0,
            net_wpm: 20.0,
            cpm: 250,
        };
        let log = vec![err("á", "a", 0), err("ú", "u", 1)];
        let s = generate_improvement_suggestions(&t, &log, &wpm, 60.0);
        let priorities: Vec<Priority> = s.iter().map(|x| x.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_tracker_insertion_order_and_totals() {
        let mut t = CharacterTracker::new();
        t.record("b", true);
        t.record("a", false);
        t.record("b", false);
        let order: Vec<&str> = t.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(t.total_attempts, 3);
        assert_eq!(t.total_correct, 1);
        assert_eq!(t.counts("b").unwrap().errors(), 1);
        t.reset();
        assert_eq!(t.total_attempts, 0);
        assert!(t.counts("b").is_none());
    }

    #[test]
    fn test_accented_detection_covers_enie() {
        assert!(is_accented("ñ"));
        assert!(is_accented("á"));
        assert!(!is_accented("n"));
    }
}
