//! Field configuration consumed by [`crate::UniversalInput`].
//!
//! [`FieldConfig`] is plain data: it deserializes from TOML or JSON and never
//! changes at runtime. Behavior that cannot be expressed as data lives in
//! [`InputHooks`].

use std::{fmt, rc::Rc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::select::SelectEntry;

/// Value kind requested by the `type` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Free text.
    #[default]
    Text,
    /// Digits only.
    Number,
}

/// Presentation hints for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StyleHints {
    /// Width in percent of the form width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    /// Text color, any name or `#rrggbb` understood by ratatui.
    #[serde(alias = "color", skip_serializing_if = "Option::is_none")]
    pub fg: Option<String>,
    /// Background color.
    #[serde(alias = "backgroundColor", skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    /// Draw the border with rounded corners.
    pub rounded: bool,
}

impl StyleHints {
    /// Combine with `base`; values set here win.
    pub fn over(&self, base: &StyleHints) -> StyleHints {
        StyleHints {
            width: self.width.or(base.width),
            fg: self.fg.clone().or_else(|| base.fg.clone()),
            bg: self.bg.clone().or_else(|| base.bg.clone()),
            rounded: self.rounded || base.rounded,
        }
    }
}

/// Visual tone of an action adornment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionTone {
    /// Default text color.
    #[default]
    Normal,
    /// Highlighted.
    Active,
    /// Dimmed.
    Muted,
}

/// Trailing decoration rendered after the control, e.g. a status icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    /// Text of the decoration.
    pub symbol: String,
    /// Short description of what the decoration means.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Visual tone.
    #[serde(default)]
    pub tone: ActionTone,
}

impl Action {
    /// Decoration with the default tone.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            title: None,
            tone: ActionTone::Normal,
        }
    }

    /// Set the tone.
    pub fn with_tone(mut self, tone: ActionTone) -> Self {
        self.tone = tone;
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Static configuration of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FieldConfig {
    /// Key of the field in the values mapping.
    pub key: String,
    /// Value kind.
    #[serde(rename = "type")]
    pub input_type: InputType,
    /// Hint shown while the value is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Mask pattern, see [`crate::mask`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    /// Render a growing text area.
    pub multiline: bool,
    /// Options of a select input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectEntry>>,
    /// Inline presentation hints.
    pub style: StyleHints,
    /// Name of a style preset defined by the form.
    #[serde(alias = "className", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Script editor: every keystroke commits.
    pub script: bool,
    /// Tab inserts a tab character instead of moving focus.
    #[serde(alias = "allowTabs")]
    pub allow_tabs: bool,
    /// Minimum rows of a multiline input.
    #[serde(alias = "minRows")]
    pub min_rows: u16,
    /// Maximum rows of a multiline input.
    #[serde(alias = "maxRows")]
    pub max_rows: u16,
    /// Show the value without allowing edits.
    #[serde(alias = "readOnly")]
    pub read_only: bool,
    /// Take focus when the form opens.
    #[serde(alias = "autoFocus")]
    pub auto_focus: bool,
    /// Show a pending indicator between a change and its commit.
    pub eventable: bool,
    /// Custom content rendered verbatim instead of a text control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Static trailing decorations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            input_type: InputType::Text,
            placeholder: None,
            mask: None,
            multiline: false,
            options: None,
            style: StyleHints::default(),
            class_name: None,
            script: false,
            allow_tabs: false,
            min_rows: 1,
            max_rows: 20,
            read_only: false,
            auto_focus: false,
            eventable: false,
            content: None,
            actions: Vec::new(),
        }
    }
}

impl FieldConfig {
    /// Plain text field with the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}

/// Transform applied to numeric input before it is stored.
pub type PrepareNumber = Rc<dyn Fn(&str) -> String>;

/// Per-field behavior that cannot be described as data.
#[derive(Clone, Default)]
pub struct InputHooks {
    /// Applied to the digits of a numeric field on every edit and on blur,
    /// and to the displayed value of a read-only numeric field.
    pub prepare_number: Option<PrepareNumber>,
}

impl InputHooks {
    /// Hooks with a `prepare_number` transform.
    pub fn with_prepare_number(f: impl Fn(&str) -> String + 'static) -> Self {
        Self {
            prepare_number: Some(Rc::new(f)),
        }
    }

    /// Run `prepare_number`, or return `value` unchanged.
    pub fn prepare(&self, value: &str) -> String {
        match &self.prepare_number {
            Some(f) => f(value),
            None => value.to_string(),
        }
    }
}

impl fmt::Debug for InputHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHooks")
            .field("prepare_number", &self.prepare_number.is_some())
            .finish()
    }
}
