//! Mask grammar, validation and formatting.
//!
//! A mask is a template mixing literal characters with editable placeholder
//! characters. The placeholder alphabet is fixed:
//!
//! | char | accepts                | transform      |
//! |------|------------------------|----------------|
//! | `1`  | ASCII digit            | -              |
//! | `a`  | ASCII letter           | -              |
//! | `A`  | ASCII letter           | to upper case  |
//! | `*`  | ASCII letter or digit  | -              |
//!
//! A backslash makes the following character literal, so `\1` renders a
//! literal `1`. Unfilled editable positions are shown as [`BLANK`].
//!
//! ```rust
//! use uinput::mask::Mask;
//!
//! let mask = Mask::parse("111-111").unwrap();
//! assert_eq!(mask.placeholder(), "___-___");
//! assert_eq!(mask.format("12345"), "123-45_");
//! assert!(mask.is_blank("___-___"));
//! ```

use thiserror::Error;

/// Marker that makes the next mask character literal.
pub const ESCAPE: char = '\\';

/// Marker shown in editable positions that are not filled yet.
pub const BLANK: char = '_';

/// Validator and optional transform bound to a placeholder character.
#[derive(Debug)]
pub struct FormatChar {
    /// Returns whether a typed character fits the position.
    pub validate: fn(char) -> bool,
    /// Applied to an accepted character before it is stored.
    pub transform: Option<fn(char) -> char>,
}

impl FormatChar {
    /// Validate `c` and return the stored form of it.
    pub fn accept(&self, c: char) -> Option<char> {
        if !(self.validate)(c) {
            return None;
        }
        Some(match self.transform {
            Some(t) => t(c),
            None => c,
        })
    }
}

/// Digit validator, also used to filter numeric input.
pub fn validate_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn validate_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn validate_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn to_upper(c: char) -> char {
    c.to_ascii_uppercase()
}

static DIGIT: FormatChar = FormatChar {
    validate: validate_digit,
    transform: None,
};

static LETTER: FormatChar = FormatChar {
    validate: validate_letter,
    transform: None,
};

static UPPER_LETTER: FormatChar = FormatChar {
    validate: validate_letter,
    transform: Some(to_upper as fn(char) -> char),
};

static ALNUM: FormatChar = FormatChar {
    validate: validate_alnum,
    transform: None,
};

/// Look up the format rule of a placeholder character.
pub fn format_char(c: char) -> Option<&'static FormatChar> {
    match c {
        '1' => Some(&DIGIT),
        'a' => Some(&LETTER),
        'A' => Some(&UPPER_LETTER),
        '*' => Some(&ALNUM),
        _ => None,
    }
}

/// Reasons a mask pattern is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// The pattern is empty.
    #[error("mask is empty")]
    Empty,
    /// A control character appears in the pattern.
    #[error("control character {ch:?} at position {pos}")]
    ControlChar { pos: usize, ch: char },
    /// The pattern ends with an escape marker.
    #[error("escape marker at the end of the mask")]
    DanglingEscape,
    /// The pattern has nothing the user could type into.
    #[error("mask has no editable positions")]
    NoEditable,
}

/// One position of a parsed mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Fixed character, always rendered as-is.
    Literal(char),
    /// Editable position bound to a placeholder character.
    Editable(char),
}

/// A validated mask pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    source: String,
    slots: Vec<Slot>,
}

impl Mask {
    /// Parse and validate a mask pattern.
    pub fn parse(pattern: &str) -> Result<Self, MaskError> {
        if pattern.is_empty() {
            return Err(MaskError::Empty);
        }

        let mut slots = Vec::with_capacity(pattern.len());
        let mut escaped = false;
        for (pos, ch) in pattern.chars().enumerate() {
            if ch.is_control() {
                return Err(MaskError::ControlChar { pos, ch });
            }
            if escaped {
                escaped = false;
                slots.push(Slot::Literal(ch));
                continue;
            }
            if ch == ESCAPE {
                escaped = true;
                continue;
            }
            if format_char(ch).is_some() {
                slots.push(Slot::Editable(ch));
            } else {
                slots.push(Slot::Literal(ch));
            }
        }

        if escaped {
            return Err(MaskError::DanglingEscape);
        }
        if !slots.iter().any(|s| matches!(s, Slot::Editable(_))) {
            return Err(MaskError::NoEditable);
        }

        Ok(Self {
            source: pattern.to_string(),
            slots,
        })
    }

    /// The pattern this mask was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed positions, escape markers removed.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of editable positions.
    pub fn editable_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Editable(_)))
            .count()
    }

    /// Display hint: editable positions become [`BLANK`].
    pub fn placeholder(&self) -> String {
        self.slots
            .iter()
            .map(|s| match s {
                Slot::Literal(c) => *c,
                Slot::Editable(_) => BLANK,
            })
            .collect()
    }

    /// Whether `value` shows no user input at all.
    pub fn is_blank(&self, value: &str) -> bool {
        value.is_empty() || value == self.placeholder()
    }

    /// Format free-form typed or pasted text against the mask.
    ///
    /// Characters that fail the validator of the next editable position are
    /// skipped. A character equal to the next literal is absorbed by it, so
    /// `"123-456"` and `"123456"` format the same way.
    pub fn format(&self, input: &str) -> String {
        self.render(input, true)
    }

    /// Render already-accepted editable characters, in order, into the mask.
    pub fn fill(&self, filled: &str) -> String {
        self.render(filled, false)
    }

    /// Extract the filled editable characters from a formatted value.
    ///
    /// Values that do not line up with the mask are formatted first.
    pub fn filled(&self, value: &str) -> String {
        let formatted;
        let value = if self.conforms(value) {
            value
        } else {
            formatted = self.format(value);
            &formatted
        };

        self.slots
            .iter()
            .zip(value.chars())
            .filter_map(|(slot, c)| match slot {
                Slot::Editable(_) if c != BLANK => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Format rule of the `index`-th editable position.
    pub fn editable_rule(&self, index: usize) -> Option<&'static FormatChar> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                Slot::Editable(c) => Some(*c),
                Slot::Literal(_) => None,
            })
            .nth(index)
            .and_then(format_char)
    }

    fn conforms(&self, value: &str) -> bool {
        value.chars().count() == self.slots.len()
            && self.slots.iter().zip(value.chars()).all(|(slot, c)| match slot {
                Slot::Literal(l) => *l == c,
                Slot::Editable(p) => {
                    c == BLANK || format_char(*p).is_some_and(|f| f.accept(c) == Some(c))
                }
            })
    }

    fn render(&self, input: &str, absorb_literals: bool) -> String {
        let mut out = String::with_capacity(self.slots.len());
        let mut chars = input.chars().peekable();

        for slot in &self.slots {
            match slot {
                Slot::Literal(l) => {
                    out.push(*l);
                    if absorb_literals && chars.peek() == Some(l) {
                        chars.next();
                    }
                }
                Slot::Editable(p) => {
                    let Some(rule) = format_char(*p) else {
                        out.push(BLANK);
                        continue;
                    };
                    let mut placed = BLANK;
                    for c in chars.by_ref() {
                        if let Some(accepted) = rule.accept(c) {
                            placed = accepted;
                            break;
                        }
                    }
                    out.push(placed);
                }
            }
        }

        out
    }
}

/// Whether `pattern` is a usable mask.
pub fn is_valid(pattern: &str) -> bool {
    Mask::parse(pattern).is_ok()
}

/// Display hint for a raw pattern, valid or not.
///
/// Escape markers are dropped and the character after them passes through;
/// every placeholder character becomes [`BLANK`].
pub fn placeholder_mask(pattern: &str) -> String {
    let mut placeholder = String::with_capacity(pattern.len());
    let mut shielding = false;

    for ch in pattern.chars() {
        if shielding {
            shielding = false;
            placeholder.push(ch);
            continue;
        }
        if ch == ESCAPE {
            shielding = true;
            continue;
        }
        if format_char(ch).is_some() {
            placeholder.push(BLANK);
        } else {
            placeholder.push(ch);
        }
    }

    placeholder
}
