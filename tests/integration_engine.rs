// End-to-end flows through the public API: reverse lookup to key events,
// dead-key composition, session matching, and the resulting metrics.

use chrono::Local;

use teclear::engine::TypingEngine;
use teclear::event::KeyEvent;
use teclear::latam;
use teclear::layout::{LayoutMapper, ModifierState};
use teclear::lifecycle::SessionPhase;
use teclear::session::{CharState, Reason, SessionSettings, TypingMode};

/// Drive the engine with events derived from reverse lookup, one per
/// second. Dead-key sequences expand to their two physical presses.
fn type_text(engine: &mut TypingEngine, text: &str, start_ts: u64) {
    let mut ts = start_ts;
    for c in text.chars() {
        let m = latam::layout()
            .find_key_for_character(c)
            .unwrap_or_else(|| panic!("no key for {c:?}"));
        if let Some((kind, base)) = m.dead_key_sequence {
            let dead = latam::layout()
                .find_key_for_dead_key(kind)
                .expect("dead key present on layout");
            engine.key_event(&KeyEvent::new(dead.code, dead.modifiers, ts));
            ts += 1000;
            let base_match = latam::layout().find_key_for_character(base).unwrap();
            engine.key_event(&KeyEvent::new(base_match.code, base_match.modifiers, ts));
        } else {
            engine.key_event(&KeyEvent::new(m.code, m.modifiers, ts));
        }
        ts += 1000;
    }
}

#[test]
fn lenient_session_end_to_end() {
    let mut engine = TypingEngine::new(latam::layout(), "hello", SessionSettings::default());
    type_text(&mut engine, "hello", 0);

    assert!(engine.session.is_complete);
    assert_eq!(engine.lifecycle.phase, SessionPhase::Completed);
    let snap = engine.finalize(Local::now());
    // Five characters over four seconds.
    assert_eq!(snap.gross_wpm, 15.0);
    assert_eq!(snap.net_wpm, 15.0);
    assert_eq!(snap.cpm, 75);
    assert_eq!(snap.accuracy, 100.0);
    assert_eq!(snap.elapsed_ms, 4000);
    assert_eq!(snap.corrected, 0);
}

#[test]
fn strict_mode_holds_until_correct() {
    let mut engine = TypingEngine::new(
        latam::layout(),
        "ab",
        SessionSettings::with_mode(TypingMode::Strict),
    );
    let fb = engine.key_event(&KeyEvent::new("KeyX", ModifierState::default(), 0));
    assert_eq!(fb.is_correct, Some(false));
    assert_eq!(engine.session.current_index, 0);

    let fb = engine.key_event(&KeyEvent::new("KeyA", ModifierState::default(), 1000));
    assert_eq!(fb.is_correct, Some(true));
    assert_eq!(engine.session.current_index, 1);

    let fb = engine.key_event(&KeyEvent::new("KeyB", ModifierState::default(), 2000));
    assert!(fb.session_complete);

    // The retry is recorded: two attempts on 'a', one wrong.
    let report = engine.accuracy();
    assert_eq!(report.overall, 66.7);
    let patterns = engine.error_patterns();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].expected, "a");
    assert_eq!(patterns[0].substitutions, vec![("x".to_string(), 1)]);
}

#[test]
fn dead_key_sequence_produces_accented_character() {
    let mut engine = TypingEngine::new(latam::layout(), "más", SessionSettings::default());
    type_text(&mut engine, "más", 0);
    assert!(engine.session.is_complete);
    assert_eq!(engine.session.characters[1].actual.as_deref(), Some("á"));
    assert_eq!(engine.accuracy().overall, 100.0);
}

#[test]
fn no_backspace_mode_rejects_deletion() {
    let mut engine = TypingEngine::new(
        latam::layout(),
        "ab",
        SessionSettings::with_mode(TypingMode::NoBackspace),
    );
    engine.key_event(&KeyEvent::new("KeyX", ModifierState::default(), 0));
    let fb = engine.key_event(&KeyEvent::new("Backspace", ModifierState::default(), 1000));
    assert!(!fb.accepted);
    assert_eq!(fb.reason, Some(Reason::BackspaceDisabled));
    assert_eq!(engine.session.current_index, 1);
    assert_eq!(engine.session.characters[0].state, CharState::Incorrect);
}

#[test]
fn backspace_correction_marks_slot_corrected() {
    let mut engine = TypingEngine::new(latam::layout(), "ab", SessionSettings::default());
    engine.key_event(&KeyEvent::new("KeyX", ModifierState::default(), 0));
    engine.key_event(&KeyEvent::new("Backspace", ModifierState::default(), 1000));
    engine.key_event(&KeyEvent::new("KeyA", ModifierState::default(), 2000));
    engine.key_event(&KeyEvent::new("KeyB", ModifierState::default(), 3000));
    assert!(engine.session.is_complete);
    assert_eq!(engine.session.characters[0].state, CharState::Corrected);
    let snap = engine.finalize(Local::now());
    assert_eq!(snap.corrected, 1);
}

#[test]
fn reverse_lookup_round_trips_every_reachable_character() {
    let layout = latam::layout();
    for text in ["¿qué onda?", "año 2024", "ÑÜ @#"] {
        for c in text.chars() {
            let m = layout
                .find_key_for_character(c)
                .unwrap_or_else(|| panic!("no key for {c:?}"));
            if let Some((_, _)) = m.dead_key_sequence {
                continue;
            }
            let res = layout.resolve(m.code, m.modifiers);
            assert_eq!(res.character, Some(c), "round trip failed for {c:?}");
        }
    }
}

#[test]
fn suggestions_surface_repeated_misses() {
    let mut engine = TypingEngine::new(latam::layout(), "ññña", SessionSettings::default());
    // Miss the eñe three times, then land the final character.
    for (i, code) in ["KeyN", "KeyN", "KeyN", "KeyA"].iter().enumerate() {
        engine.key_event(&KeyEvent::new(code, ModifierState::default(), i as u64 * 1000));
    }
    assert!(engine.session.is_complete);
    let suggestions = engine.suggestions(4000);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].characters, vec!["ñ"]);
    let report = engine.accuracy();
    assert_eq!(report.problematic_chars, vec!["ñ"]);
    assert_eq!(report.most_missed, vec!["ñ"]);
}
