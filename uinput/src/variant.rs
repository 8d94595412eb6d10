//! Variant dispatch.
//!
//! A [`FieldConfig`] resolves to exactly one [`Variant`] through an ordered
//! rule chain; the first rule that matches wins:
//!
//! 1. numeric (`type = "number"`)
//! 2. masked (a valid mask; invalid masks fall through)
//! 3. script
//! 4. select (options present)
//! 5. multiline
//! 6. custom content
//!
//! Anything else is a plain single-line text input.

use crate::{
    config::{FieldConfig, InputType},
    mask::Mask,
    select::SelectEntry,
};

/// Rows of the script editor.
pub const SCRIPT_ROWS: u16 = 4;

/// Presentation and interaction mode of an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Digits only.
    Number {
        /// Display the value without editing.
        read_only: bool,
    },
    /// Value formatted against a mask.
    Masked(Mask),
    /// Multi-row editor where every keystroke commits.
    Script {
        /// Fixed row count.
        rows: u16,
    },
    /// Searchable list of options.
    Select(Vec<SelectEntry>),
    /// Text area growing with its content.
    Multiline {
        /// Lower row bound.
        min_rows: u16,
        /// Upper row bound.
        max_rows: u16,
    },
    /// Verbatim content, not editable.
    Custom(String),
    /// Plain single-line text.
    Text,
}

type Rule = fn(&FieldConfig) -> Option<Variant>;

const RULES: [Rule; 6] = [number, masked, script, select, multiline, custom];

fn number(config: &FieldConfig) -> Option<Variant> {
    (config.input_type == InputType::Number).then_some(Variant::Number {
        read_only: config.read_only,
    })
}

fn masked(config: &FieldConfig) -> Option<Variant> {
    let pattern = config.mask.as_deref()?;
    match Mask::parse(pattern) {
        Ok(mask) => Some(Variant::Masked(mask)),
        Err(e) => {
            debug!("field `{}`: ignoring mask {pattern:?}: {e}", config.key);
            None
        }
    }
}

fn script(config: &FieldConfig) -> Option<Variant> {
    config
        .script
        .then_some(Variant::Script { rows: SCRIPT_ROWS })
}

fn select(config: &FieldConfig) -> Option<Variant> {
    config.options.clone().map(Variant::Select)
}

fn multiline(config: &FieldConfig) -> Option<Variant> {
    if !config.multiline {
        return None;
    }
    let min_rows = if config.read_only { 1 } else { config.min_rows.max(1) };
    Some(Variant::Multiline {
        min_rows,
        max_rows: config.max_rows.max(min_rows),
    })
}

fn custom(config: &FieldConfig) -> Option<Variant> {
    config.content.clone().map(Variant::Custom)
}

impl Variant {
    /// Pick the variant for `config`.
    pub fn resolve(config: &FieldConfig) -> Variant {
        RULES
            .iter()
            .find_map(|rule| rule(config))
            .unwrap_or(Variant::Text)
    }

    /// Short name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Number { .. } => "number",
            Variant::Masked(_) => "masked",
            Variant::Script { .. } => "script",
            Variant::Select(_) => "select",
            Variant::Multiline { .. } => "multiline",
            Variant::Custom(_) => "custom",
            Variant::Text => "text",
        }
    }

    /// Whether Tab may be typed into the control.
    pub fn accepts_tabs(&self) -> bool {
        matches!(
            self,
            Variant::Text | Variant::Multiline { .. } | Variant::Script { .. }
        )
    }

    /// Whether Enter inserts a line break.
    pub fn is_multirow(&self) -> bool {
        matches!(self, Variant::Multiline { .. } | Variant::Script { .. })
    }

    /// Whether the control reacts to keys and focus at all.
    pub fn is_interactive(&self) -> bool {
        !matches!(
            self,
            Variant::Custom(_) | Variant::Number { read_only: true }
        )
    }
}
