//! The input state machine behind every variant.
//!
//! An [`Input`] keeps a live buffer that follows every keystroke, forwards
//! edits through a trailing-edge debounce, and commits on blur:
//!
//! - **change**: the buffer is updated at once and `on_change` is scheduled
//!   [`DEBOUNCE`] later; a newer edit cancels and reschedules it.
//! - **commit**: the pending change is cancelled, `on_change` fires with the
//!   final value, and `on_end_editing` fires only when the value differs from
//!   the previously committed one.
//!
//! Script inputs commit on every keystroke. Numeric inputs filter to digits
//! and skip the commit when both the new and the committed value are empty.

use std::{rc::Rc, time::Duration};

use ratatui::text::Span;

use crate::{
    config::{Action, FieldConfig, InputHooks},
    key::Key,
    mask::{Mask, validate_digit},
    select::{SelectState, contains_value, find_option},
    timer::{Scheduler, TimerHandle},
    variant::Variant,
};

/// Quiet period before a live change is propagated.
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Receives a field value.
pub type ValueCallback = Rc<dyn Fn(&str)>;

/// Everything an input is created from.
#[derive(Clone, Default)]
pub struct InputProps {
    /// Static field configuration.
    pub config: FieldConfig,
    /// Initial value.
    pub value: String,
    /// Non-data behavior.
    pub hooks: InputHooks,
    /// Debounced live-change callback.
    pub on_change: Option<ValueCallback>,
    /// End-of-editing callback.
    pub on_end_editing: Option<ValueCallback>,
    /// Trailing decorations.
    pub actions: Vec<Action>,
}

impl InputProps {
    /// Props for `config` with an empty value.
    pub fn new(config: FieldConfig) -> Self {
        let actions = config.actions.clone();
        Self {
            config,
            actions,
            ..Default::default()
        }
    }

    /// Set the initial value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the hooks.
    pub fn hooks(mut self, hooks: InputHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the live-change callback.
    pub fn on_change(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_change = Some(Rc::new(f));
        self
    }

    /// Set the end-of-editing callback.
    pub fn on_end_editing(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_end_editing = Some(Rc::new(f));
        self
    }

    /// Set the trailing decorations.
    pub fn actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

enum Edit {
    Ignored,
    Moved,
    Changed(String),
}

/// Editable control with trailing action decorations.
pub struct Input {
    config: FieldConfig,
    variant: Variant,
    hooks: InputHooks,
    scheduler: Rc<dyn Scheduler>,
    on_change: Option<ValueCallback>,
    on_end_editing: Option<ValueCallback>,
    actions: Vec<Action>,
    actions_width: u16,
    current: String,
    committed: String,
    cursor: usize,
    mask_fill: String,
    select: SelectState,
    timer: Option<TimerHandle>,
    focused: bool,
}

impl Input {
    /// Mount an input.
    pub fn new(props: InputProps, scheduler: Rc<dyn Scheduler>) -> Self {
        let variant = Variant::resolve(&props.config);
        debug!(
            "mount input `{}` as {}",
            props.config.key,
            variant.name()
        );

        let mut input = Self {
            config: props.config,
            variant,
            hooks: props.hooks,
            scheduler,
            on_change: props.on_change,
            on_end_editing: props.on_end_editing,
            actions: props.actions,
            actions_width: 0,
            current: String::new(),
            committed: String::new(),
            cursor: 0,
            mask_fill: String::new(),
            select: SelectState::default(),
            timer: None,
            focused: false,
        };
        input.reset_to(&props.value);
        input.recalc_actions_width();
        input
    }

    /// Field key.
    pub fn key(&self) -> &str {
        &self.config.key
    }

    /// Field configuration.
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Resolved variant.
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Live value.
    pub fn value(&self) -> &str {
        &self.current
    }

    /// Last committed value.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the input has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Whether a debounced change is waiting to fire.
    pub fn has_pending_change(&self) -> bool {
        self.timer.as_ref().is_some_and(TimerHandle::is_pending)
    }

    /// Search state of a select input.
    pub fn select_state(&self) -> &SelectState {
        &self.select
    }

    /// Editable characters entered into a masked input.
    pub fn mask_fill(&self) -> &str {
        &self.mask_fill
    }

    /// Trailing decorations.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Measured display width of the decorations.
    pub fn actions_width(&self) -> u16 {
        self.actions_width
    }

    /// Right padding the control reserves for its decorations.
    pub fn reserved_width(&self) -> u16 {
        if self.actions.is_empty() {
            0
        } else {
            self.actions_width
        }
    }

    /// Replace the decorations and re-measure them.
    pub fn set_actions(&mut self, actions: Vec<Action>) {
        if self.actions != actions {
            self.actions = actions;
            self.recalc_actions_width();
        }
    }

    /// Measure the decorations. Called on mount and on terminal resize.
    pub fn recalc_actions_width(&mut self) {
        let symbols: usize = self
            .actions
            .iter()
            .map(|a| Span::raw(a.symbol.as_str()).width())
            .sum();
        let gaps = self.actions.len().saturating_sub(1);
        let width = u16::try_from(symbols + gaps).unwrap_or(u16::MAX);
        if width != self.actions_width {
            self.actions_width = width;
        }
    }

    /// Whether the value is outside the configured options.
    pub fn is_invalid(&self) -> bool {
        match &self.variant {
            Variant::Select(entries) => {
                !self.current.is_empty() && !contains_value(entries, &self.current)
            }
            _ => false,
        }
    }

    /// Hint to show while the value is empty.
    pub fn placeholder(&self) -> Option<String> {
        match &self.variant {
            Variant::Masked(mask) => Some(mask.placeholder()),
            _ => self.config.placeholder.clone(),
        }
    }

    /// Text to render for the current state.
    pub fn display_text(&self) -> String {
        match &self.variant {
            Variant::Number { read_only: true } => self.hooks.prepare(&self.current),
            Variant::Masked(mask) => {
                if self.focused || !self.current.is_empty() {
                    mask.fill(&self.mask_fill)
                } else {
                    String::new()
                }
            }
            Variant::Select(entries) => match find_option(entries, &self.current) {
                Some(o) => match &o.sub_label {
                    Some(sub) => format!("{}  {sub}", o.label()),
                    None => o.label().to_string(),
                },
                None => self.current.clone(),
            },
            Variant::Custom(content) => content.clone(),
            _ => self.current.clone(),
        }
    }

    /// Rows the control occupies, decorations excluded.
    pub fn rows(&self) -> u16 {
        match self.variant {
            Variant::Script { rows } => rows,
            Variant::Multiline { min_rows, max_rows } => {
                let lines = self.current.split('\n').count();
                u16::try_from(lines)
                    .unwrap_or(u16::MAX)
                    .clamp(min_rows, max_rows)
            }
            Variant::Custom(ref content) => {
                u16::try_from(content.lines().count().max(1)).unwrap_or(u16::MAX)
            }
            _ => 1,
        }
    }

    /// Row and column of the cursor, both in characters.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let mut row = 0;
        let mut col = 0;
        for c in self.current.chars().take(self.cursor) {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }

    /// Take focus. Returns false for controls that cannot be focused.
    pub fn focus(&mut self) -> bool {
        if !self.variant.is_interactive() {
            return false;
        }
        self.focused = true;
        self.cursor = self.current.chars().count();
        if let Variant::Select(entries) = &self.variant {
            self.select.clear();
            self.select.highlight_value(entries, &self.current);
        }
        true
    }

    /// Lose focus, committing the value.
    pub fn blur(&mut self) {
        if !self.focused {
            return;
        }
        self.focused = false;
        if self.config.read_only {
            return;
        }

        match self.variant {
            Variant::Number { .. } => {
                let prepared = self.hooks.prepare(&self.current);
                if !prepared.is_empty() || !self.committed.is_empty() {
                    self.commit(prepared);
                } else {
                    self.cancel_pending();
                }
            }
            Variant::Select(_) => {
                self.select.clear();
                self.commit(self.current.clone());
            }
            Variant::Custom(_) => {}
            _ => self.commit(self.current.clone()),
        }
    }

    /// Route a key press. Returns whether the input consumed it.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.focused || self.config.read_only || !self.variant.is_interactive() {
            return false;
        }

        if key == Key::Tab && self.config.allow_tabs && self.variant.accepts_tabs() {
            return self.handle_key(Key::Char('\t'));
        }

        match self.variant {
            Variant::Number { .. } => self.key_number(key),
            Variant::Masked(_) => self.key_masked(key),
            Variant::Script { .. } => self.key_script(key),
            Variant::Select(_) => self.key_select(key),
            Variant::Multiline { .. } | Variant::Text => self.key_text(key),
            Variant::Custom(_) => false,
        }
    }

    /// Adopt a value that changed outside the input.
    ///
    /// A focused input with local edits keeps them; they win on blur.
    /// Returns whether the value was adopted.
    pub fn sync_value(&mut self, value: &str) -> bool {
        if self.current == value && self.committed == value {
            return true;
        }
        if self.focused && (self.current != self.committed || self.has_pending_change()) {
            trace!("input `{}` keeps local edit over {value:?}", self.config.key);
            return false;
        }
        self.reset_to(value);
        true
    }

    fn reset_to(&mut self, value: &str) {
        self.cancel_pending();
        self.current = value.to_string();
        self.committed = value.to_string();
        self.cursor = self.current.chars().count();
        match &self.variant {
            Variant::Masked(mask) => self.mask_fill = mask.filled(value),
            Variant::Select(entries) => self.select.highlight_value(entries, value),
            _ => {}
        }
    }

    fn set_live(&mut self, value: String) {
        self.current = value.clone();
        self.schedule_change(value);
    }

    fn schedule_change(&mut self, value: String) {
        self.cancel_pending();
        let Some(cb) = self.on_change.clone() else {
            return;
        };
        self.timer = Some(
            self.scheduler
                .schedule(DEBOUNCE, Box::new(move || cb(&value))),
        );
    }

    fn cancel_pending(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn commit(&mut self, value: String) {
        self.cancel_pending();
        self.current = value.clone();
        self.cursor = self.cursor.min(self.current.chars().count());

        if let Some(cb) = self.on_change.clone() {
            cb(&value);
        }
        if value != self.committed {
            debug!("input `{}` committed {value:?}", self.config.key);
            if let Some(cb) = self.on_end_editing.clone() {
                cb(&value);
            }
        }
        self.committed = value;
    }

    fn edit_text(&mut self, key: Key, multirow: bool) -> Edit {
        let mut chars: Vec<char> = self.current.chars().collect();
        let len = chars.len();
        self.cursor = self.cursor.min(len);

        match key {
            Key::Char(c) => {
                chars.insert(self.cursor, c);
                self.cursor += 1;
            }
            Key::Enter if multirow => {
                chars.insert(self.cursor, '\n');
                self.cursor += 1;
            }
            Key::Backspace => {
                if self.cursor == 0 {
                    return Edit::Moved;
                }
                self.cursor -= 1;
                chars.remove(self.cursor);
            }
            Key::Delete => {
                if self.cursor >= len {
                    return Edit::Moved;
                }
                chars.remove(self.cursor);
            }
            Key::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                return Edit::Moved;
            }
            Key::Right => {
                self.cursor = (self.cursor + 1).min(len);
                return Edit::Moved;
            }
            Key::Home => {
                let (_, col) = self.cursor_row_col();
                self.cursor -= col;
                return Edit::Moved;
            }
            Key::End => {
                while self.cursor < len && chars[self.cursor] != '\n' {
                    self.cursor += 1;
                }
                return Edit::Moved;
            }
            Key::Up | Key::Down if multirow => {
                self.move_line(&chars, key == Key::Down);
                return Edit::Moved;
            }
            _ => return Edit::Ignored,
        }

        Edit::Changed(chars.into_iter().collect())
    }

    fn move_line(&mut self, chars: &[char], down: bool) {
        let (row, col) = self.cursor_row_col();
        let target = if down {
            row + 1
        } else if row == 0 {
            return;
        } else {
            row - 1
        };

        let mut line_start = None;
        let mut current_row = 0;
        for (i, c) in chars.iter().enumerate() {
            if current_row == target {
                line_start = Some(i);
                break;
            }
            if *c == '\n' {
                current_row += 1;
            }
        }
        if line_start.is_none() && current_row == target {
            line_start = Some(chars.len());
        }
        let Some(start) = line_start else {
            return;
        };

        let line_len = chars[start..].iter().take_while(|c| **c != '\n').count();
        self.cursor = start + col.min(line_len);
    }

    fn key_text(&mut self, key: Key) -> bool {
        match self.edit_text(key, self.variant.is_multirow()) {
            Edit::Ignored => false,
            Edit::Moved => true,
            Edit::Changed(value) => {
                self.set_live(value);
                true
            }
        }
    }

    fn key_script(&mut self, key: Key) -> bool {
        match self.edit_text(key, true) {
            Edit::Ignored => false,
            Edit::Moved => true,
            Edit::Changed(value) => {
                self.commit(value);
                true
            }
        }
    }

    fn key_number(&mut self, key: Key) -> bool {
        let edited = match self.edit_text(key, false) {
            Edit::Ignored => return false,
            Edit::Moved => return true,
            Edit::Changed(value) => value,
        };

        let digits_before_cursor = edited
            .chars()
            .take(self.cursor)
            .filter(|c| validate_digit(*c))
            .count();
        let numeric: String = edited.chars().filter(|c| validate_digit(*c)).collect();
        let prepared = self.hooks.prepare(&numeric);
        self.cursor = digits_before_cursor.min(prepared.chars().count());

        if prepared != self.current {
            self.set_live(prepared);
        }
        true
    }

    fn key_masked(&mut self, key: Key) -> bool {
        let Variant::Masked(mask) = &self.variant else {
            return false;
        };
        let mask: Mask = mask.clone();

        match key {
            Key::Char(c) => {
                let next = self.mask_fill.chars().count();
                match mask.editable_rule(next).and_then(|rule| rule.accept(c)) {
                    Some(accepted) => self.mask_fill.push(accepted),
                    None => return true,
                }
            }
            Key::Backspace => {
                if self.mask_fill.pop().is_none() {
                    return true;
                }
            }
            _ => return false,
        }

        let formatted = mask.fill(&self.mask_fill);
        let value = if mask.is_blank(&formatted) {
            String::new()
        } else {
            formatted
        };
        self.cursor = value.chars().count();
        self.set_live(value);
        true
    }

    fn key_select(&mut self, key: Key) -> bool {
        let Variant::Select(entries) = &self.variant else {
            return false;
        };

        match key {
            Key::Char(c) => self.select.push(c),
            Key::Backspace => {
                self.select.pop();
            }
            Key::Up => self.select.prev(entries),
            Key::Down => self.select.next(entries),
            Key::Esc => {
                if self.select.query().is_empty() {
                    return false;
                }
                self.select.clear();
            }
            Key::Enter => {
                let picked = match self.select.highlighted(entries) {
                    Some(option) => Some(option.value.clone()),
                    None if !self.select.query().is_empty() => {
                        Some(self.select.query().to_string())
                    }
                    None => None,
                };
                self.select.clear();
                if let Some(value) = picked {
                    self.select.highlight_value(entries, &value);
                    self.set_live(value);
                }
            }
            _ => return false,
        }
        true
    }
}
