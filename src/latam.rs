//! The Latin-American Spanish (es-419) physical layout table.
//!
//! Built once behind a `OnceLock` and shared read-only; every session
//! borrows the same instance. Dead keys live on the normal/shift layers
//! of the key right of P (acute / dieresis), matching the physical
//! keyboard; AltGr on that key is a literal bracket.

use std::sync::OnceLock;

use crate::layout::{DeadKeyType, Finger, KeyDefinition, KeyboardLayout};

static LATAM: OnceLock<KeyboardLayout> = OnceLock::new();

/// The shared LATAM layout instance.
pub fn layout() -> &'static KeyboardLayout {
    LATAM.get_or_init(build)
}

struct KeySpec {
    code: &'static str,
    normal: char,
    shift: Option<char>,
    alt_gr: Option<char>,
    dead: Option<DeadKeyType>,
    shift_dead: Option<DeadKeyType>,
    finger: Finger,
    width: f32,
}

fn key(
    code: &'static str,
    normal: char,
    shift: Option<char>,
    alt_gr: Option<char>,
    finger: Finger,
) -> KeySpec {
    KeySpec {
        code,
        normal,
        shift,
        alt_gr,
        dead: None,
        shift_dead: None,
        finger,
        width: 1.0,
    }
}

fn dead_key(
    code: &'static str,
    dead: DeadKeyType,
    shift_dead: DeadKeyType,
    alt_gr: Option<char>,
    finger: Finger,
) -> KeySpec {
    KeySpec {
        code,
        normal: dead.visual(),
        shift: Some(shift_dead.visual()),
        alt_gr,
        dead: Some(dead),
        shift_dead: Some(shift_dead),
        finger,
        width: 1.0,
    }
}

fn wide(mut spec: KeySpec, width: f32) -> KeySpec {
    spec.width = width;
    spec
}

fn build() -> KeyboardLayout {
    use DeadKeyType::*;
    use Finger::*;

    let rows: Vec<Vec<KeySpec>> = vec![
        vec![
            key("Backquote", '|', Some('°'), Some('¬'), LeftPinky),
            key("Digit1", '1', Some('!'), None, LeftPinky),
            key("Digit2", '2', Some('"'), None, LeftRing),
            key("Digit3", '3', Some('#'), None, LeftMiddle),
            key("Digit4", '4', Some('$'), None, LeftIndex),
            key("Digit5", '5', Some('%'), None, LeftIndex),
            key("Digit6", '6', Some('&'), None, RightIndex),
            key("Digit7", '7', Some('/'), None, RightIndex),
            key("Digit8", '8', Some('('), None, RightMiddle),
            key("Digit9", '9', Some(')'), None, RightRing),
            key("Digit0", '0', Some('='), None, RightPinky),
            key("Minus", '\'', Some('?'), Some('\\'), RightPinky),
            key("Equal", '¿', Some('¡'), None, RightPinky),
        ],
        vec![
            key("KeyQ", 'q', Some('Q'), Some('@'), LeftPinky),
            key("KeyW", 'w', Some('W'), None, LeftRing),
            key("KeyE", 'e', Some('E'), None, LeftMiddle),
            key("KeyR", 'r', Some('R'), None, LeftIndex),
            key("KeyT", 't', Some('T'), None, LeftIndex),
            key("KeyY", 'y', Some('Y'), None, RightIndex),
            key("KeyU", 'u', Some('U'), None, RightIndex),
            key("KeyI", 'i', Some('I'), None, RightMiddle),
            key("KeyO", 'o', Some('O'), None, RightRing),
            key("KeyP", 'p', Some('P'), None, RightPinky),
            dead_key("BracketLeft", Acute, Dieresis, Some('['), RightPinky),
            key("BracketRight", '+', Some('*'), Some(']'), RightPinky),
        ],
        vec![
            key("KeyA", 'a', Some('A'), None, LeftPinky),
            key("KeyS", 's', Some('S'), None, LeftRing),
            key("KeyD", 'd', Some('D'), None, LeftMiddle),
            key("KeyF", 'f', Some('F'), None, LeftIndex),
            key("KeyG", 'g', Some('G'), None, LeftIndex),
            key("KeyH", 'h', Some('H'), None, RightIndex),
            key("KeyJ", 'j', Some('J'), None, RightIndex),
            key("KeyK", 'k', Some('K'), None, RightMiddle),
            key("KeyL", 'l', Some('L'), None, RightRing),
            key("Semicolon", 'ñ', Some('Ñ'), None, RightPinky),
            key("Quote", '{', Some('}'), Some('^'), RightPinky),
            wide(key("Enter", '\n', None, None, RightPinky), 1.75),
        ],
        vec![
            key("IntlBackslash", '<', Some('>'), None, LeftPinky),
            key("KeyZ", 'z', Some('Z'), None, LeftPinky),
            key("KeyX", 'x', Some('X'), None, LeftRing),
            key("KeyC", 'c', Some('C'), None, LeftMiddle),
            key("KeyV", 'v', Some('V'), None, LeftIndex),
            key("KeyB", 'b', Some('B'), None, LeftIndex),
            key("KeyN", 'n', Some('N'), None, RightIndex),
            key("KeyM", 'm', Some('M'), None, RightIndex),
            key("Comma", ',', Some(';'), None, RightMiddle),
            key("Period", '.', Some(':'), None, RightRing),
            key("Slash", '-', Some('_'), None, RightPinky),
        ],
        vec![wide(key("Space", ' ', None, None, Thumb), 6.25)],
    ];

    let home_row = 2;
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, spec)| KeyDefinition {
                    code: spec.code,
                    row: r as u8,
                    column: c as u8,
                    width: spec.width,
                    normal: Some(spec.normal),
                    shift: spec.shift,
                    alt_gr: spec.alt_gr,
                    shift_alt_gr: None,
                    dead_key: spec.dead,
                    shift_dead_key: spec.shift_dead,
                    finger: spec.finger,
                    home_row: r == home_row && spec.code != "Enter",
                })
                .collect()
        })
        .collect();

    KeyboardLayout::new("Latin American", "es-419", rows)
}
