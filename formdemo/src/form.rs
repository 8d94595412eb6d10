//! The form container.
//!
//! A [`Form`] owns one [`UniversalInput`] per configured field and the
//! values mapping they edit. The mapping is loaded from the store on
//! creation, written back after every change, and replaced when another
//! session writes the store.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use uinput::{
    FieldConfig, InputHooks, InputProps, Key, Scheduler, StyleHints, UniversalInput,
};

use crate::{
    settings::FormSettings,
    store::{StorageEvent, Store, Subscription},
    values::{STORAGE_KEY, Values},
};

struct FormState {
    values: Values,
    defaults: Values,
    store: Rc<dyn Store>,
    /// Set when the mapping was replaced from outside.
    resync: bool,
}

/// One rendered field.
pub struct Field {
    input: UniversalInput,
    style: StyleHints,
}

impl Field {
    /// The field's input.
    pub fn input(&self) -> &UniversalInput {
        &self.input
    }

    /// Effective style, class preset included.
    pub fn style(&self) -> &StyleHints {
        &self.style
    }

    pub fn config(&self) -> &FieldConfig {
        self.input.config()
    }
}

/// Labeled inputs bound to a persisted values mapping.
pub struct Form {
    title: String,
    state: Rc<RefCell<FormState>>,
    fields: Vec<Field>,
    focus: Option<usize>,
    _subscription: Subscription,
}

fn load(store: &dyn Store, defaults: &Values) -> Values {
    match store.get(STORAGE_KEY) {
        Ok(Some(raw)) => match Values::parse(&raw) {
            Ok(values) => values,
            Err(e) => {
                error!("Error parsing saved values: {e}");
                defaults.clone()
            }
        },
        Ok(None) => defaults.clone(),
        Err(e) => {
            error!("Error reading saved values: {e}");
            defaults.clone()
        }
    }
}

fn try_persist(store: &dyn Store, values: &Values) -> anyhow::Result<()> {
    let json = values.to_json()?;
    store.set(STORAGE_KEY, &json)?;
    Ok(())
}

fn persist(store: &dyn Store, values: &Values) {
    if let Err(e) = try_persist(store, values) {
        error!("Error saving values: {e}");
    }
}

fn apply_change(state: &RefCell<FormState>, key: &str, value: &str) {
    let (store, values) = {
        let mut state = state.borrow_mut();
        if !state.values.set(key, value) {
            return;
        }
        (state.store.clone(), state.values.clone())
    };
    debug!("field `{key}` changed");
    persist(&*store, &values);
}

fn on_storage(state: &RefCell<FormState>, event: &StorageEvent) {
    if event.key != STORAGE_KEY {
        return;
    }

    match &event.new_value {
        None => {
            info!("stored values removed, restoring defaults");
            let (store, values) = {
                let mut state = state.borrow_mut();
                state.values = state.defaults.clone();
                state.resync = true;
                (state.store.clone(), state.values.clone())
            };
            persist(&*store, &values);
        }
        Some(raw) => match Values::parse(raw) {
            Ok(values) => {
                let mut state = state.borrow_mut();
                if state.values != values {
                    debug!("adopting values written by another session");
                    state.values = values;
                    state.resync = true;
                }
            }
            Err(e) => error!("Error parsing values from storage event: {e}"),
        },
    }
}

impl Form {
    /// Build the form and load its values from `store`.
    pub fn new(settings: &FormSettings, store: Rc<dyn Store>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_hooks(settings, store, scheduler, BTreeMap::new())
    }

    /// Like [`Form::new`], with per-field hooks keyed by field key.
    pub fn with_hooks(
        settings: &FormSettings,
        store: Rc<dyn Store>,
        scheduler: Rc<dyn Scheduler>,
        mut hooks: BTreeMap<String, InputHooks>,
    ) -> Self {
        let defaults = settings.default_values();
        let values = load(&*store, &defaults);
        persist(&*store, &values);

        let state = Rc::new(RefCell::new(FormState {
            values,
            defaults,
            store: store.clone(),
            resync: false,
        }));

        let subscription = store.subscribe(Rc::new({
            let weak = Rc::downgrade(&state);
            move |event: &StorageEvent| {
                if let Some(state) = weak.upgrade() {
                    on_storage(&state, event);
                }
            }
        }));

        let fields = settings
            .fields
            .iter()
            .map(|config| {
                let key = config.key.clone();
                let value = state.borrow().values.get(&key).to_string();
                let weak = Rc::downgrade(&state);
                let props = InputProps::new(config.clone())
                    .value(value)
                    .hooks(hooks.remove(&key).unwrap_or_default())
                    .on_change(move |v| {
                        if let Some(state) = weak.upgrade() {
                            apply_change(&state, &key, v);
                        }
                    });
                Field {
                    input: UniversalInput::new(props, scheduler.clone()),
                    style: settings.style_for(config),
                }
            })
            .collect();

        let mut form = Self {
            title: settings.title.clone(),
            state,
            fields,
            focus: None,
            _subscription: subscription,
        };
        if let Some(idx) = form.fields.iter().position(|f| f.config().auto_focus) {
            form.focus(idx);
        }
        form
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Index of the focused field.
    pub fn focused(&self) -> Option<usize> {
        self.focus
    }

    /// Current mapping.
    pub fn values(&self) -> Values {
        self.state.borrow().values.clone()
    }

    /// Current value of `key`.
    pub fn value(&self, key: &str) -> String {
        self.state.borrow().values.get(key).to_string()
    }

    /// Move focus to field `idx`, committing the previously focused one.
    /// Returns false when that field cannot take focus.
    pub fn focus(&mut self, idx: usize) -> bool {
        if self.focus == Some(idx) {
            return true;
        }
        let Some(field) = self.fields.get(idx) else {
            return false;
        };
        if !field.input.variant().is_interactive() {
            return false;
        }

        self.blur_all();
        let focused = self.fields[idx].input.focus();
        if focused {
            self.focus = Some(idx);
        }
        self.refresh();
        focused
    }

    /// Focus the next focusable field, wrapping around.
    pub fn focus_next(&mut self) -> bool {
        self.cycle(true)
    }

    /// Focus the previous focusable field, wrapping around.
    pub fn focus_prev(&mut self) -> bool {
        self.cycle(false)
    }

    fn cycle(&mut self, forward: bool) -> bool {
        let len = self.fields.len();
        if len == 0 {
            return false;
        }
        let start = match (self.focus, forward) {
            (Some(i), true) => i + 1,
            (Some(i), false) => i + len - 1,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        for step in 0..len {
            let idx = if forward {
                (start + step) % len
            } else {
                (start + len - step) % len
            };
            if self.focus(idx) {
                return true;
            }
        }
        false
    }

    /// Commit and unfocus the focused field.
    pub fn blur_all(&mut self) {
        if let Some(idx) = self.focus.take() {
            self.fields[idx].input.blur();
        }
        self.refresh();
    }

    /// Route a key press: first to the focused input, then to focus
    /// navigation. Returns whether the key was used.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if let Some(idx) = self.focus
            && self.fields[idx].input.handle_key(key)
        {
            self.refresh();
            return true;
        }

        match key {
            Key::Tab | Key::Down => self.focus_next(),
            Key::BackTab | Key::Up => self.focus_prev(),
            Key::Esc if self.focus.is_some() => {
                self.blur_all();
                true
            }
            _ => false,
        }
    }

    /// Apply external changes to idle inputs and update status decorations.
    ///
    /// Call after store notifications and after timers fired.
    pub fn refresh(&mut self) {
        let resync = std::mem::take(&mut self.state.borrow_mut().resync);
        if resync {
            let values = self.values();
            for field in &mut self.fields {
                let value = values.get(field.input.key()).to_string();
                if !field.input.sync_value(&value) {
                    debug!("field `{}` keeps its local edit", field.input.key());
                }
            }
        }
        for field in &mut self.fields {
            field.input.refresh();
        }
    }

    /// Re-measure decorations, e.g. after a terminal resize.
    pub fn resize(&mut self) {
        for field in &mut self.fields {
            field.input.recalc_actions_width();
        }
    }
}

#[cfg(test)]
mod tests {
    use uinput::{DEBOUNCE, TimerQueue};

    use super::*;
    use crate::store::MemoryStore;

    fn mount(store: &MemoryStore) -> (Form, Rc<TimerQueue>) {
        let timers = Rc::new(TimerQueue::new());
        let form = Form::new(&FormSettings::default(), Rc::new(store.context()), timers.clone());
        (form, timers)
    }

    fn stored(store: &MemoryStore) -> Option<String> {
        store.get(STORAGE_KEY).unwrap()
    }

    fn type_str(form: &mut Form, s: &str) {
        for c in s.chars() {
            form.handle_key(Key::Char(c));
        }
    }

    #[test]
    fn test_load_partial_mapping() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, r#"{"first": "5", "second": "hi"}"#).unwrap();

        let (form, _) = mount(&store);
        assert_eq!(form.value("first"), "5");
        assert_eq!(form.value("second"), "hi");
        for key in ["third", "four", "five"] {
            assert_eq!(form.value(key), "");
        }
        let shown: Vec<_> = form.fields().iter().map(|f| f.input().value()).collect();
        assert_eq!(shown, ["5", "hi", "", "", ""]);
        // written back once in canonical form
        assert_eq!(stored(&store).as_deref(), Some(r#"{"first":"5","second":"hi"}"#));
    }

    #[test]
    fn test_corrupt_mapping_uses_defaults() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, "{oops").unwrap();

        let (form, _) = mount(&store);
        assert_eq!(form.values(), FormSettings::default().default_values());
        assert_eq!(
            Values::parse(&stored(&store).unwrap()).unwrap(),
            form.values()
        );
    }

    #[test]
    fn test_change_is_persisted() {
        let store = MemoryStore::new();
        let (mut form, timers) = mount(&store);
        assert!(form.focus(1));
        type_str(&mut form, "hi");
        assert_eq!(form.value("second"), "");

        timers.advance(DEBOUNCE);
        assert_eq!(form.value("second"), "hi");
        let saved = Values::parse(&stored(&store).unwrap()).unwrap();
        assert_eq!(saved.get("second"), "hi");
    }

    #[test]
    fn test_number_field_keeps_digits() {
        let store = MemoryStore::new();
        let (mut form, timers) = mount(&store);
        assert!(form.focus(0));
        type_str(&mut form, "abc123");
        timers.advance(DEBOUNCE);
        assert_eq!(form.value("first"), "123");
    }

    #[test]
    fn test_external_update_adopted_without_write_back() {
        let store = MemoryStore::new();
        let (mut form, _) = mount(&store);
        let other = store.context();

        let raw = r#"{ "first": "9" }"#;
        other.set(STORAGE_KEY, raw).unwrap();
        assert_eq!(form.value("first"), "9");
        assert_eq!(form.value("second"), "");
        assert_eq!(stored(&store).as_deref(), Some(raw));

        assert_eq!(form.fields()[0].input().value(), "");
        form.refresh();
        assert_eq!(form.fields()[0].input().value(), "9");
    }

    #[test]
    fn test_cleared_number_does_not_overwrite_external_value() {
        let store = MemoryStore::new();
        let (mut form, timers) = mount(&store);
        let other = store.context();

        assert!(form.focus(0));
        type_str(&mut form, "1");
        form.handle_key(Key::Backspace);
        assert!(form.focus(1));

        other.set(STORAGE_KEY, r#"{"first":"9"}"#).unwrap();
        form.refresh();
        assert_eq!(form.fields()[0].input().value(), "9");

        timers.advance(DEBOUNCE * 2);
        assert_eq!(form.value("first"), "9");
        let saved = Values::parse(&stored(&store).unwrap()).unwrap();
        assert_eq!(saved.get("first"), "9");
    }

    #[test]
    fn test_removal_restores_defaults() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, r#"{"first":"5"}"#).unwrap();
        let (mut form, _) = mount(&store);

        store.context().remove(STORAGE_KEY).unwrap();
        assert_eq!(form.value("first"), "");
        form.refresh();
        assert_eq!(form.fields()[0].input().value(), "");

        let saved = Values::parse(&stored(&store).unwrap()).unwrap();
        assert_eq!(saved, FormSettings::default().default_values());
    }

    #[test]
    fn test_unparsable_event_ignored() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, r#"{"first":"5"}"#).unwrap();
        let (form, _) = mount(&store);

        store.context().set(STORAGE_KEY, "[1, 2]").unwrap();
        assert_eq!(form.value("first"), "5");

        store.context().set("unrelated", "{}").unwrap();
        assert_eq!(form.value("first"), "5");
    }

    #[test]
    fn test_local_edit_survives_external_update() {
        let store = MemoryStore::new();
        let (mut form, _) = mount(&store);
        form.focus(1);
        type_str(&mut form, "mine");

        store
            .context()
            .set(STORAGE_KEY, r#"{"first":"1","second":"theirs"}"#)
            .unwrap();
        form.refresh();
        assert_eq!(form.fields()[0].input().value(), "1");
        assert_eq!(form.fields()[1].input().value(), "mine");

        form.blur_all();
        assert_eq!(form.value("second"), "mine");
        assert_eq!(form.value("first"), "1");
    }

    #[test]
    fn test_tab_cycles_focus_and_commits() {
        let store = MemoryStore::new();
        let (mut form, _) = mount(&store);
        assert_eq!(form.focused(), None);

        assert!(form.handle_key(Key::Tab));
        assert_eq!(form.focused(), Some(0));
        type_str(&mut form, "7");
        form.handle_key(Key::Tab);
        assert_eq!(form.focused(), Some(1));
        assert_eq!(form.value("first"), "7");

        form.handle_key(Key::BackTab);
        form.handle_key(Key::BackTab);
        assert_eq!(form.focused(), Some(4));

        assert!(form.handle_key(Key::Esc));
        assert_eq!(form.focused(), None);
    }

    #[test]
    fn test_auto_focus_and_hooks() {
        let mut settings = FormSettings::default();
        settings.fields[0].auto_focus = true;
        let hooks = BTreeMap::from([(
            "first".to_string(),
            InputHooks::with_prepare_number(|v| v.trim_start_matches('0').to_string()),
        )]);
        let timers = Rc::new(TimerQueue::new());
        let mut form = Form::with_hooks(&settings, Rc::new(MemoryStore::new()), timers, hooks);
        assert_eq!(form.focused(), Some(0));

        type_str(&mut form, "007");
        form.blur_all();
        assert_eq!(form.value("first"), "7");
    }
}
