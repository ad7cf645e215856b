//! Pie Menu Host
//!
//! Host process of a radial launcher. It decides when the pie menu overlay
//! is shown and hidden, where it appears, and relays the overlay's action
//! requests to the platform.
//!
//! - `backend`: platform capabilities (pointer, focus, shortcuts, input)
//! - `surface`: the overlay window handle and its message channel
//! - `orchestrator`: the show/hide state machine
//! - `settings` / `config`: persisted documents with change notification

pub mod backend;
pub mod config;
pub mod logging;
pub mod menu;
pub mod orchestrator;
pub mod settings;
pub mod surface;
