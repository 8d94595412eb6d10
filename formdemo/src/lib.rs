//! # formdemo
//!
//! A terminal form whose values persist to a key-value store and stay in
//! sync across every session that opens the same store.
//!
//! ## Features
//!
//! - Five demo fields out of the box: number, text, multiline, masked, select
//! - Form layout loadable from TOML or JSON, with a printable JSON schema
//! - Values persisted on every change, adopted from other sessions
//! - Deterministic, terminal-free testing through [`store::MemoryStore`]
//!
//! ## Modules
//!
//! - [`values`] - The persisted values mapping
//! - [`store`] - Store trait, memory and file stores
//! - [`settings`] - Form configuration file
//! - [`form`] - The form container
//! - [`app`] - Terminal event loop and CLI commands
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use formdemo::{form::Form, settings::FormSettings, store::MemoryStore};
//! use uinput::TimerQueue;
//!
//! let store = MemoryStore::new();
//! let form = Form::new(
//!     &FormSettings::default(),
//!     Rc::new(store.context()),
//!     Rc::new(TimerQueue::new()),
//! );
//! assert_eq!(form.fields().len(), 5);
//! ```

#[macro_use]
extern crate log;

/// Terminal event loop and the `dump` / `reset` commands.
pub mod app;

/// The form container: fields, focus and value syncing.
pub mod form;

/// Form configuration file loading and validation.
pub mod settings;

/// Key-value stores with change notifications.
///
/// Provides an in-memory store with multiple contexts and a JSON file store
/// that detects writes from other processes by polling.
pub mod store;

/// The values mapping and its persisted JSON form.
pub mod values;
