use std::collections::HashMap;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Diacritic classes produced by the layout's dead keys.
///
/// Each variant owns exactly one visual glyph and one composition table
/// (vowels in both cases, n/a/o for tilde, and the space identity that
/// yields the bare mark).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeadKeyType {
    Acute,
    Dieresis,
    Grave,
    Circumflex,
    Tilde,
}

impl DeadKeyType {
    /// The standalone mark emitted when the dead key does not combine.
    pub fn visual(self) -> char {
        match self {
            DeadKeyType::Acute => '\u{00B4}',
            DeadKeyType::Dieresis => '\u{00A8}',
            DeadKeyType::Grave => '`',
            DeadKeyType::Circumflex => '^',
            DeadKeyType::Tilde => '~',
        }
    }

    /// Base-to-precomposed pairs for this diacritic. Space is absent here;
    /// `compose` handles the space identity directly.
    pub fn table(self) -> &'static [(char, char)] {
        match self {
            DeadKeyType::Acute => &[
                ('a', 'á'),
                ('e', 'é'),
                ('i', 'í'),
                ('o', 'ó'),
                ('u', 'ú'),
                ('A', 'Á'),
                ('E', 'É'),
                ('I', 'Í'),
                ('O', 'Ó'),
                ('U', 'Ú'),
            ],
            DeadKeyType::Dieresis => &[
                ('a', 'ä'),
                ('e', 'ë'),
                ('i', 'ï'),
                ('o', 'ö'),
                ('u', 'ü'),
                ('A', 'Ä'),
                ('E', 'Ë'),
                ('I', 'Ï'),
                ('O', 'Ö'),
                ('U', 'Ü'),
            ],
            DeadKeyType::Grave => &[
                ('a', 'à'),
                ('e', 'è'),
                ('i', 'ì'),
                ('o', 'ò'),
                ('u', 'ù'),
                ('A', 'À'),
                ('E', 'È'),
                ('I', 'Ì'),
                ('O', 'Ò'),
                ('U', 'Ù'),
            ],
            DeadKeyType::Circumflex => &[
                ('a', 'â'),
                ('e', 'ê'),
                ('i', 'î'),
                ('o', 'ô'),
                ('u', 'û'),
                ('A', 'Â'),
                ('E', 'Ê'),
                ('I', 'Î'),
                ('O', 'Ô'),
                ('U', 'Û'),
            ],
            DeadKeyType::Tilde => &[
                ('a', 'ã'),
                ('o', 'õ'),
                ('n', 'ñ'),
                ('A', 'Ã'),
                ('O', 'Õ'),
                ('N', 'Ñ'),
            ],
        }
    }

    /// Exact, case-sensitive composition. Space composes to the bare mark.
    pub fn compose(self, base: char) -> Option<char> {
        if base == ' ' {
            return Some(self.visual());
        }
        self.table()
            .iter()
            .find(|(b, _)| *b == base)
            .map(|(_, c)| *c)
    }

    /// Whether `c` is a precomposed character this dead key can produce.
    pub fn composes_to(self, c: char) -> bool {
        self.table().iter().any(|(_, composed)| *composed == c)
    }

    /// Map a combining mark (from an NFD decomposition) back to its class.
    pub fn from_combining(mark: char) -> Option<Self> {
        match mark {
            '\u{0301}' => Some(DeadKeyType::Acute),
            '\u{0308}' => Some(DeadKeyType::Dieresis),
            '\u{0300}' => Some(DeadKeyType::Grave),
            '\u{0302}' => Some(DeadKeyType::Circumflex),
            '\u{0303}' => Some(DeadKeyType::Tilde),
            _ => None,
        }
    }
}

/// Recommended finger for a physical key, passed through to rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    LeftPinky,
    LeftRing,
    LeftMiddle,
    LeftIndex,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
    Thumb,
}

/// Snapshot of the modifier keys at the time of a key event.
///
/// AltGr is disambiguated from Ctrl+Alt by the host event normalizer
/// before events reach the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub shift: bool,
    pub alt_gr: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl ModifierState {
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn alt_gr() -> Self {
        Self {
            alt_gr: true,
            ..Self::default()
        }
    }
}

/// Which character layer a resolution or reverse lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Normal,
    Shift,
    AltGr,
    ShiftAltGr,
}

impl Layer {
    fn modifiers(self) -> ModifierState {
        match self {
            Layer::Normal => ModifierState::default(),
            Layer::Shift => ModifierState::shift(),
            Layer::AltGr => ModifierState::alt_gr(),
            Layer::ShiftAltGr => ModifierState {
                shift: true,
                alt_gr: true,
                ..ModifierState::default()
            },
        }
    }
}

/// One physical key: stable code, position, character layers, dead-key
/// classification for the normal/shift layers, and rendering hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDefinition {
    pub code: &'static str,
    pub row: u8,
    pub column: u8,
    /// Relative width for rendering; the engine never interprets it.
    pub width: f32,
    pub normal: Option<char>,
    pub shift: Option<char>,
    pub alt_gr: Option<char>,
    pub shift_alt_gr: Option<char>,
    pub dead_key: Option<DeadKeyType>,
    pub shift_dead_key: Option<DeadKeyType>,
    pub finger: Finger,
    pub home_row: bool,
}

/// Result of a forward lookup. Unknown codes resolve to `empty()`,
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyResolution<'a> {
    pub character: Option<char>,
    pub is_dead_key: bool,
    pub dead_key: Option<DeadKeyType>,
    pub key: Option<&'a KeyDefinition>,
}

impl KeyResolution<'_> {
    pub fn empty() -> Self {
        KeyResolution {
            character: None,
            is_dead_key: false,
            dead_key: None,
            key: None,
        }
    }
}

/// Result of a reverse lookup: where on the keyboard a character lives.
///
/// Precomposed accented characters that no layer carries directly are
/// reported at their base character's position with the dead-key press
/// that precedes it in `dead_key_sequence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMatch {
    pub code: &'static str,
    pub modifiers: ModifierState,
    pub layer: Layer,
    pub dead_key_sequence: Option<(DeadKeyType, char)>,
}

/// Capability interface for keyboard layouts. The LATAM layout in
/// `latam` is the one concrete implementation; future layouts slot in
/// behind the same trait at session-creation time.
pub trait LayoutMapper {
    fn resolve(&self, code: &str, modifiers: ModifierState) -> KeyResolution<'_>;
    fn find_key_for_character(&self, c: char) -> Option<KeyMatch>;
}

/// A named, locale-tagged collection of key rows. Built once at process
/// start and read-only afterwards; the reverse index is materialized
/// lazily and cached for the process lifetime.
#[derive(Debug)]
pub struct KeyboardLayout {
    pub name: &'static str,
    pub locale: &'static str,
    rows: Vec<Vec<KeyDefinition>>,
    by_code: HashMap<&'static str, (usize, usize)>,
    reverse: OnceLock<HashMap<char, KeyMatch>>,
}

impl KeyboardLayout {
    pub fn new(name: &'static str, locale: &'static str, rows: Vec<Vec<KeyDefinition>>) -> Self {
        let mut by_code = HashMap::new();
        for (r, row) in rows.iter().enumerate() {
            for (k, key) in row.iter().enumerate() {
                by_code.insert(key.code, (r, k));
            }
        }
        KeyboardLayout {
            name,
            locale,
            rows,
            by_code,
            reverse: OnceLock::new(),
        }
    }

    pub fn rows(&self) -> &[Vec<KeyDefinition>] {
        &self.rows
    }

    pub fn key(&self, code: &str) -> Option<&KeyDefinition> {
        self.by_code.get(code).map(|&(r, k)| &self.rows[r][k])
    }

    fn select_layer(key: &KeyDefinition, m: ModifierState) -> (Option<char>, Layer) {
        if m.shift && m.alt_gr {
            if key.shift_alt_gr.is_some() {
                return (key.shift_alt_gr, Layer::ShiftAltGr);
            }
            if key.alt_gr.is_some() {
                return (key.alt_gr, Layer::AltGr);
            }
            if key.shift.is_some() {
                return (key.shift, Layer::Shift);
            }
        } else if m.alt_gr {
            if key.alt_gr.is_some() {
                return (key.alt_gr, Layer::AltGr);
            }
        } else if m.shift && key.shift.is_some() {
            return (key.shift, Layer::Shift);
        }
        (key.normal, Layer::Normal)
    }

    fn layer_char(key: &KeyDefinition, layer: Layer) -> Option<char> {
        match layer {
            Layer::Normal => key.normal,
            Layer::Shift => key.shift,
            Layer::AltGr => key.alt_gr,
            Layer::ShiftAltGr => key.shift_alt_gr,
        }
    }

    /// The physical press that arms `kind`, when the layout carries it.
    pub fn find_key_for_dead_key(&self, kind: DeadKeyType) -> Option<KeyMatch> {
        let (key, layer) = self.dead_key_position(kind)?;
        Some(KeyMatch {
            code: key.code,
            modifiers: layer.modifiers(),
            layer,
            dead_key_sequence: None,
        })
    }

    fn dead_key_position(&self, kind: DeadKeyType) -> Option<(&KeyDefinition, Layer)> {
        for row in &self.rows {
            for key in row {
                if key.dead_key == Some(kind) {
                    return Some((key, Layer::Normal));
                }
                if key.shift_dead_key == Some(kind) {
                    return Some((key, Layer::Shift));
                }
            }
        }
        None
    }

    /// Builds the character index: every key's four layers once
    /// (last write wins on duplicates), then every precomposed character
    /// reachable through a dead key whose base has a direct entry.
    fn reverse_index(&self) -> &HashMap<char, KeyMatch> {
        self.reverse.get_or_init(|| {
            let mut index = HashMap::new();
            for row in &self.rows {
                for key in row {
                    for layer in [Layer::Normal, Layer::Shift, Layer::AltGr, Layer::ShiftAltGr] {
                        if let Some(c) = Self::layer_char(key, layer) {
                            index.insert(
                                c,
                                KeyMatch {
                                    code: key.code,
                                    modifiers: layer.modifiers(),
                                    layer,
                                    dead_key_sequence: None,
                                },
                            );
                        }
                    }
                }
            }
            for kind in [
                DeadKeyType::Acute,
                DeadKeyType::Dieresis,
                DeadKeyType::Grave,
                DeadKeyType::Circumflex,
                DeadKeyType::Tilde,
            ] {
                if self.dead_key_position(kind).is_none() {
                    continue;
                }
                for &(base, composed) in kind.table() {
                    if index.contains_key(&composed) {
                        continue;
                    }
                    if let Some(base_match) = index.get(&base).copied() {
                        index.insert(
                            composed,
                            KeyMatch {
                                dead_key_sequence: Some((kind, base)),
                                ..base_match
                            },
                        );
                    }
                }
            }
            index
        })
    }
}

impl LayoutMapper for KeyboardLayout {
    fn resolve(&self, code: &str, modifiers: ModifierState) -> KeyResolution<'_> {
        let Some(&(r, k)) = self.by_code.get(code) else {
            return KeyResolution::empty();
        };
        let key = &self.rows[r][k];
        let (character, layer) = Self::select_layer(key, modifiers);
        let dead_key = match layer {
            Layer::Normal => key.dead_key,
            Layer::Shift => key.shift_dead_key,
            _ => None,
        };
        KeyResolution {
            character,
            is_dead_key: dead_key.is_some(),
            dead_key,
            key: Some(key),
        }
    }

    fn find_key_for_character(&self, c: char) -> Option<KeyMatch> {
        let index = self.reverse_index();
        if let Some(m) = index.get(&c) {
            return Some(*m);
        }
        // Characters the table never mentions may still be canonically
        // equivalent to something it does (e.g. a decomposed sequence
        // was pre-normalized by the host into an unlisted codepoint).
        let nfd: Vec<char> = c.to_string().nfd().collect();
        if let [base, mark] = nfd[..] {
            let kind = DeadKeyType::from_combining(mark)?;
            self.dead_key_position(kind)?;
            let base_match = index.get(&base)?;
            return Some(KeyMatch {
                dead_key_sequence: Some((kind, base)),
                ..*base_match
            });
        }
        None
    }
}
