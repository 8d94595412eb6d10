//! Status decoration layered over [`Input`].
//!
//! [`UniversalInput`] tracks whether a propagated change still waits for
//! its commit ("pending") and whether an outside party reports work in
//! progress through a shared [`ProcessFlag`]. While either holds, a status
//! action is appended after the configured decorations.

use std::{
    cell::{Cell, RefCell},
    ops::Deref,
    rc::Rc,
};

use crate::{
    config::{Action, ActionTone},
    input::{Input, InputProps},
    key::Key,
    timer::Scheduler,
};

/// Glyph shown while a change waits for its commit.
pub const PENDING_SYMBOL: &str = "●";
/// Glyph shown while the shared process flag is raised.
pub const IN_PROCESS_SYMBOL: &str = "◌";

/// Shared "work in progress" switch, cloned between the owner and inputs.
#[derive(Debug, Clone, Default)]
pub struct ProcessFlag(Rc<Cell<bool>>);

impl ProcessFlag {
    /// A lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise or lower the flag.
    pub fn set(&self, on: bool) {
        self.0.set(on);
    }

    /// Whether the flag is raised.
    pub fn get(&self) -> bool {
        self.0.get()
    }
}

/// Which status decoration is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing to show.
    Idle,
    /// A change was propagated but not committed yet.
    Pending,
    /// The shared process flag is raised.
    InProcess,
}

impl Status {
    fn action(self) -> Option<Action> {
        match self {
            Status::Idle => None,
            Status::Pending => Some(
                Action::new(PENDING_SYMBOL)
                    .with_tone(ActionTone::Active)
                    .with_title("ready to send"),
            ),
            Status::InProcess => Some(
                Action::new(IN_PROCESS_SYMBOL)
                    .with_tone(ActionTone::Muted)
                    .with_title("in progress"),
            ),
        }
    }
}

/// [`Input`] with a pending/in-progress status decoration.
///
/// Read access goes through `Deref`; every mutation is delegated so the
/// decoration stays current.
pub struct UniversalInput {
    inner: Input,
    pending: Rc<Cell<bool>>,
    last_committed: Rc<RefCell<String>>,
    in_process: Option<ProcessFlag>,
    base_actions: Vec<Action>,
}

impl Deref for UniversalInput {
    type Target = Input;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl UniversalInput {
    /// Mount an input without an external process flag.
    pub fn new(props: InputProps, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::build(props, scheduler, None)
    }

    /// Mount an input that also reflects `flag`.
    pub fn with_process(props: InputProps, scheduler: Rc<dyn Scheduler>, flag: ProcessFlag) -> Self {
        Self::build(props, scheduler, Some(flag))
    }

    fn build(mut props: InputProps, scheduler: Rc<dyn Scheduler>, in_process: Option<ProcessFlag>) -> Self {
        let pending = Rc::new(Cell::new(false));
        let last_committed = Rc::new(RefCell::new(props.value.clone()));
        let eventable = props.config.eventable;

        let user_change = props.on_change.take();
        props.on_change = Some(Rc::new({
            let pending = pending.clone();
            let last = last_committed.clone();
            move |v: &str| {
                pending.set(eventable && *last.borrow() != v);
                if let Some(cb) = &user_change {
                    cb(v);
                }
            }
        }));

        let user_end = props.on_end_editing.take();
        props.on_end_editing = Some(Rc::new({
            let pending = pending.clone();
            let last = last_committed.clone();
            move |v: &str| {
                *last.borrow_mut() = v.to_string();
                pending.set(false);
                if let Some(cb) = &user_end {
                    cb(v);
                }
            }
        }));

        let base_actions = props.actions.clone();
        let mut input = Self {
            inner: Input::new(props, scheduler),
            pending,
            last_committed,
            in_process,
            base_actions,
        };
        input.refresh();
        input
    }

    /// Current status.
    pub fn status(&self) -> Status {
        if self.in_process.as_ref().is_some_and(ProcessFlag::get) {
            Status::InProcess
        } else if self.pending.get() {
            Status::Pending
        } else {
            Status::Idle
        }
    }

    /// Whether a propagated change waits for its commit.
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Bring the decorations in line with the status.
    ///
    /// Timer callbacks change the status behind the input's back, so the
    /// owner calls this after advancing time.
    pub fn refresh(&mut self) {
        let mut actions = self.base_actions.clone();
        actions.extend(self.status().action());
        self.inner.set_actions(actions);
    }

    /// Take focus.
    pub fn focus(&mut self) -> bool {
        let focused = self.inner.focus();
        self.refresh();
        focused
    }

    /// Lose focus, committing the value.
    pub fn blur(&mut self) {
        self.inner.blur();
        self.refresh();
    }

    /// Route a key press.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let consumed = self.inner.handle_key(key);
        self.refresh();
        consumed
    }

    /// Adopt an external value; see [`Input::sync_value`].
    pub fn sync_value(&mut self, value: &str) -> bool {
        let adopted = self.inner.sync_value(value);
        if adopted {
            *self.last_committed.borrow_mut() = value.to_string();
            self.pending.set(false);
        }
        self.refresh();
        adopted
    }

    /// Re-measure decorations after a resize.
    pub fn recalc_actions_width(&mut self) {
        self.inner.recalc_actions_width();
    }
}
