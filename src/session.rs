//! Per-session text matching: validates resolved characters against the
//! target text and maintains the authoritative character-state array.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::dead_key::DeadKeyState;
use crate::event::{is_modifier_code, KeyEvent};
use crate::layout::LayoutMapper;

/// Same-code events closer together than this are treated as hardware
/// chatter and rejected.
pub const DEBOUNCE_WINDOW_MS: u64 = 20;

/// Error-handling policy for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TypingMode {
    /// Advance only on correct input; errors stay at the slot.
    Strict,
    /// Always advance; errors are recorded and left behind.
    Lenient,
    /// Like lenient, but backspace is disabled.
    NoBackspace,
}

/// Why a keystroke was not accepted. Closed, stable vocabulary; the
/// kebab-case rendering is part of the host contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Reason {
    ModifierOnly,
    SessionComplete,
    SessionPaused,
    Debounced,
    EmptyText,
    NoCurrentChar,
    BackspaceDisabled,
    AtStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharState {
    Pending,
    Current,
    Correct,
    Incorrect,
    /// Got it right only after a mistake and a backspace.
    Corrected,
}

/// One slot in the target text.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterResult {
    pub index: usize,
    /// One extended grapheme cluster of the target text.
    pub expected: String,
    pub actual: Option<String>,
    pub state: CharState,
    pub timestamp_ms: Option<u64>,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub mode: TypingMode,
    pub case_sensitive: bool,
    pub accent_sensitive: bool,
    /// Permit Ctrl+Backspace to delete through the previous word.
    pub allow_word_delete: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: TypingMode::Lenient,
            case_sensitive: true,
            accent_sensitive: true,
            allow_word_delete: false,
        }
    }
}

impl SessionSettings {
    pub fn with_mode(mode: TypingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// State of one practice attempt. Created fresh per text, discarded on
/// reset. Exactly one slot is current, or none once complete.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub text: String,
    pub characters: Vec<CharacterResult>,
    pub current_index: usize,
    pub settings: SessionSettings,
    pub is_started: bool,
    pub is_paused: bool,
    pub is_complete: bool,
    pub start_time_ms: Option<u64>,
    pub pause_time_ms: Option<u64>,
    pub end_time_ms: Option<u64>,
    pub paused_total_ms: u64,
    last_key_ms: Option<u64>,
    last_key_code: Option<String>,
}

/// One character landed in the session; feeds the metrics stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChar {
    pub index: usize,
    pub character: String,
    pub correct: bool,
    pub timestamp_ms: u64,
}

/// Per-keystroke outcome handed back to the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feedback {
    pub accepted: bool,
    pub is_correct: Option<bool>,
    pub session_complete: bool,
    pub reason: Option<Reason>,
    /// Characters committed by this event, in order. A dead-key fallout
    /// can commit two at once.
    pub applied: Vec<AppliedChar>,
    /// Backspace spent itself cancelling a pending diacritic; nothing
    /// committed was deleted.
    pub cancelled_pending: bool,
}

impl Feedback {
    fn rejected(reason: Reason) -> Self {
        Feedback {
            reason: Some(reason),
            ..Feedback::default()
        }
    }

    /// Rejection that carries no reason (Tab, unmapped non-character keys).
    fn rejected_silent() -> Self {
        Feedback::default()
    }

    fn accepted_noop() -> Self {
        Feedback {
            accepted: true,
            ..Feedback::default()
        }
    }
}

/// Split `text` into grapheme-aware slots; the first starts current.
pub fn create_session(text: &str, settings: SessionSettings) -> SessionState {
    let characters: Vec<CharacterResult> = text
        .graphemes(true)
        .enumerate()
        .map(|(index, g)| CharacterResult {
            index,
            expected: g.to_string(),
            actual: None,
            state: if index == 0 {
                CharState::Current
            } else {
                CharState::Pending
            },
            timestamp_ms: None,
            is_current: index == 0,
        })
        .collect();
    SessionState {
        text: text.to_string(),
        characters,
        current_index: 0,
        settings,
        is_started: false,
        is_paused: false,
        is_complete: false,
        start_time_ms: None,
        pause_time_ms: None,
        end_time_ms: None,
        paused_total_ms: 0,
        last_key_ms: None,
        last_key_code: None,
    }
}

fn normalize_for_match(s: &str, settings: &SessionSettings) -> String {
    // NBSP and a plain space count as the same character.
    let mut out: String = s
        .nfc()
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect();
    if !settings.case_sensitive {
        out = out.to_lowercase();
    }
    if !settings.accent_sensitive {
        out = out.nfd().filter(|c| !is_combining_mark(*c)).collect();
    }
    out
}

/// NFC-normalized comparison; absent operands never match. With default
/// settings the only leniency beyond normalization is the space/NBSP
/// equivalence.
pub fn validate_character(
    typed: Option<&str>,
    expected: Option<&str>,
    settings: &SessionSettings,
) -> bool {
    let (Some(typed), Some(expected)) = (typed, expected) else {
        return false;
    };
    if typed.is_empty() || expected.is_empty() {
        return false;
    }
    normalize_for_match(typed, settings) == normalize_for_match(expected, settings)
}

/// Run one normalized key event through the dead-key composer and the
/// text matcher. Rejected events leave the session untouched.
pub fn process_keystroke(
    event: &KeyEvent,
    session: &mut SessionState,
    dead_key: &mut DeadKeyState,
    mapper: &dyn LayoutMapper,
) -> Feedback {
    let feedback = dispatch(event, session, dead_key, mapper);
    if feedback.accepted {
        session.last_key_ms = Some(event.timestamp_ms);
        session.last_key_code = Some(event.code.clone());
    }
    feedback
}

fn dispatch(
    event: &KeyEvent,
    session: &mut SessionState,
    dead_key: &mut DeadKeyState,
    mapper: &dyn LayoutMapper,
) -> Feedback {
    if is_modifier_code(&event.code) {
        return Feedback::rejected(Reason::ModifierOnly);
    }
    if session.is_complete {
        return Feedback::rejected(Reason::SessionComplete);
    }
    if session.is_paused {
        return Feedback::rejected(Reason::SessionPaused);
    }
    if event.code == "Escape" {
        // Accepted so the host can react (pausing is its concern), but
        // no character effect; a pending diacritic dies silently.
        let (next, _) = dead_key.press_escape();
        *dead_key = next;
        return Feedback::accepted_noop();
    }
    if event.code == "Tab" {
        // Reserved for host focus navigation.
        return Feedback::rejected_silent();
    }
    if event.is_repeat {
        return Feedback::rejected(Reason::Debounced);
    }
    if let (Some(last_ms), Some(last_code)) =
        (session.last_key_ms, session.last_key_code.as_deref())
    {
        if last_code == event.code
            && event.timestamp_ms.saturating_sub(last_ms) < DEBOUNCE_WINDOW_MS
        {
            return Feedback::rejected(Reason::Debounced);
        }
    }
    if event.code == "Backspace" {
        let (next, out) = dead_key.press_backspace();
        *dead_key = next;
        if out.cancelled_pending {
            return Feedback {
                accepted: true,
                cancelled_pending: true,
                ..Feedback::default()
            };
        }
        if event.modifiers.ctrl && session.settings.allow_word_delete {
            return process_word_backspace(session);
        }
        return process_backspace(session);
    }
    if event.code == "Enter" {
        let (next, out) = dead_key.press_enter();
        *dead_key = next;
        return match out.output {
            Some(glyph) => apply_output(session, &glyph, event.timestamp_ms),
            None => apply_output(session, "\n", event.timestamp_ms),
        };
    }

    let res = mapper.resolve(&event.code, event.modifiers);
    if res.is_dead_key {
        if let Some(kind) = res.dead_key {
            let (next, out) = dead_key.press_dead_key(kind, event.timestamp_ms);
            *dead_key = next;
            return match out.output {
                Some(flushed) => apply_output(session, &flushed, event.timestamp_ms),
                None => Feedback::accepted_noop(),
            };
        }
    }

    let typed = event
        .produced
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| res.character.map(|c| c.to_string()));
    let Some(typed) = typed else {
        // No mapping and nothing produced: not a character event.
        return Feedback::rejected_silent();
    };

    let nfc: String = typed.nfc().collect();
    let mut chars = nfc.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let (next, out) = dead_key.press_char(c, event.timestamp_ms);
            *dead_key = next;
            match out.output {
                Some(s) => apply_output(session, &s, event.timestamp_ms),
                None => Feedback::accepted_noop(),
            }
        }
        // Multi-codepoint cluster: the composer works on single scalars,
        // match it against the slot as-is.
        _ => apply_output(session, &nfc, event.timestamp_ms),
    }
}

fn apply_output(session: &mut SessionState, output: &str, timestamp_ms: u64) -> Feedback {
    let mut feedback = Feedback::accepted_noop();
    for g in output.graphemes(true) {
        let step = apply_char(session, g, timestamp_ms);
        if !step.accepted {
            if feedback.applied.is_empty() {
                return step;
            }
            break;
        }
        feedback.is_correct = step.is_correct;
        feedback.session_complete = step.session_complete;
        feedback.applied.extend(step.applied);
    }
    feedback
}

fn apply_char(session: &mut SessionState, typed: &str, timestamp_ms: u64) -> Feedback {
    if session.characters.is_empty() {
        return Feedback::rejected(Reason::EmptyText);
    }
    if session.current_index >= session.characters.len() {
        return Feedback::rejected(Reason::NoCurrentChar);
    }
    if !session.is_started {
        session.is_started = true;
        session.start_time_ms = Some(timestamp_ms);
    }

    let idx = session.current_index;
    let correct = validate_character(
        Some(typed),
        Some(session.characters[idx].expected.as_str()),
        &session.settings,
    );

    let slot = &mut session.characters[idx];
    slot.actual = Some(typed.to_string());
    slot.timestamp_ms = Some(timestamp_ms);
    slot.state = if correct {
        // A slot reached again through backspace keeps its corrected
        // mark; a strict-mode same-slot retry does not acquire one.
        if slot.state == CharState::Corrected {
            CharState::Corrected
        } else {
            CharState::Correct
        }
    } else {
        CharState::Incorrect
    };

    let advance = match session.settings.mode {
        TypingMode::Lenient | TypingMode::NoBackspace => true,
        TypingMode::Strict => correct,
    };
    let mut session_complete = false;
    if advance {
        session.characters[idx].is_current = false;
        session.current_index += 1;
        if session.current_index == session.characters.len() {
            session.is_complete = true;
            session.end_time_ms = Some(timestamp_ms);
            session_complete = true;
        } else {
            let next = &mut session.characters[session.current_index];
            next.is_current = true;
            if next.state == CharState::Pending {
                next.state = CharState::Current;
            }
        }
    }
    debug_assert!(session.current_index <= session.characters.len());

    Feedback {
        accepted: true,
        is_correct: Some(correct),
        session_complete,
        reason: None,
        applied: vec![AppliedChar {
            index: idx,
            character: typed.to_string(),
            correct,
            timestamp_ms,
        }],
        cancelled_pending: false,
    }
}

/// Step back one slot. The vacated slot returns to pending; the slot
/// being returned to becomes corrected if it held an error.
pub fn process_backspace(session: &mut SessionState) -> Feedback {
    if session.settings.mode == TypingMode::NoBackspace {
        return Feedback::rejected(Reason::BackspaceDisabled);
    }
    if session.current_index == 0 {
        return Feedback::rejected(Reason::AtStart);
    }

    if session.current_index < session.characters.len() {
        let vacated = &mut session.characters[session.current_index];
        vacated.is_current = false;
        vacated.state = CharState::Pending;
        vacated.actual = None;
        vacated.timestamp_ms = None;
    } else if session.is_complete {
        // Backspacing away from the terminal index reopens the session.
        session.is_complete = false;
        session.end_time_ms = None;
    }

    session.current_index -= 1;
    let slot = &mut session.characters[session.current_index];
    slot.state = match slot.state {
        CharState::Incorrect | CharState::Corrected => CharState::Corrected,
        _ => CharState::Current,
    };
    slot.actual = None;
    slot.timestamp_ms = None;
    slot.is_current = true;

    Feedback::accepted_noop()
}

/// Ctrl+Backspace: delete through any whitespace behind the cursor and
/// then the word itself. Honors the same mode and boundary rules as a
/// single backspace.
pub fn process_word_backspace(session: &mut SessionState) -> Feedback {
    let first = process_backspace(session);
    if !first.accepted {
        return first;
    }
    while session.current_index > 0
        && session.characters[session.current_index]
            .expected
            .trim()
            .is_empty()
    {
        process_backspace(session);
    }
    while session.current_index > 0
        && !session.characters[session.current_index - 1]
            .expected
            .trim()
            .is_empty()
    {
        process_backspace(session);
    }
    Feedback::accepted_noop()
}
