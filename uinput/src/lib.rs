//! # uinput
//!
//! A ratatui-based universal input component for terminal forms.
//!
//! One [`FieldConfig`] describes a field; the input picks its presentation
//! from it (numeric, masked, script editor, select, multiline, custom
//! content or plain text) and reports edits through two callbacks:
//!
//! - `on_change` fires for live edits, debounced by [`DEBOUNCE`];
//! - `on_end_editing` fires on blur when the value actually changed.
//!
//! ## Features
//!
//! - Mask patterns with literal positions and `_` placeholders
//! - Searchable selects with option groups and sub-labels
//! - Deterministic timers: time only moves through [`TimerQueue::advance_to`]
//! - Pending / in-progress status decoration via [`UniversalInput`]
//! - Config loadable from TOML or JSON, schema via `schemars`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use uinput::{FieldConfig, InputProps, Key, TimerQueue, UniversalInput, DEBOUNCE};
//!
//! let timers = Rc::new(TimerQueue::new());
//! let props = InputProps::new(FieldConfig::new("name"))
//!     .on_change(|v| println!("live: {v}"))
//!     .on_end_editing(|v| println!("committed: {v}"));
//! let mut input = UniversalInput::new(props, timers.clone());
//!
//! input.focus();
//! input.handle_key(Key::Char('a'));
//! timers.advance(DEBOUNCE);
//! input.blur();
//! assert_eq!(input.committed(), "a");
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Field configuration and hooks
//! - [`mask`] - Mask parsing and formatting
//! - [`select`] - Options, groups and search
//! - [`variant`] - Variant dispatch
//! - [`input`] - The input state machine
//! - [`process`] - Status decoration wrapper
//! - [`timer`] - Scheduler trait and virtual-time timer queue
//! - [`ui`] - Rendering

#[macro_use]
extern crate log;

pub mod config;
pub mod input;
pub mod key;
pub mod mask;
pub mod process;
pub mod select;
pub mod timer;
pub mod ui;
pub mod variant;

pub use config::{Action, ActionTone, FieldConfig, InputHooks, InputType, StyleHints};
pub use input::{DEBOUNCE, Input, InputProps, ValueCallback};
pub use key::Key;
pub use mask::{Mask, MaskError};
pub use process::{ProcessFlag, Status, UniversalInput};
pub use select::{SelectEntry, SelectGroup, SelectOption};
pub use timer::{Scheduler, TimerHandle, TimerQueue};
pub use ui::InputView;
pub use variant::Variant;
