//! Platform backends
//!
//! Everything the host needs from the window system goes through the
//! [`Backend`] trait: pointer and focused-window queries, global shortcuts,
//! input synthesis and pointer warping. One implementation exists per
//! supported session type; [`create`] picks it once at startup and the rest
//! of the program only sees `Box<dyn Backend>`.

mod accelerator;

#[cfg(target_os = "linux")]
mod hotkeys;
#[cfg(target_os = "linux")]
mod x11;

pub use accelerator::{Accelerator, Modifiers};
#[cfg(target_os = "linux")]
pub use x11::X11Backend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by backends
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no backend available: {0}")]
    Unsupported(String),
    #[error("backend initialisation failed: {0}")]
    Init(String),
    #[error("invalid shortcut {0:?}")]
    InvalidAccelerator(String),
    #[error("shortcut {accelerator} is already bound by {owner}")]
    ShortcutTaken { accelerator: String, owner: String },
    #[error(
        "permission denied accessing {0}. Add user to 'input' group: sudo usermod -aG input $USER"
    )]
    PermissionDenied(String),
    #[error("no keyboard devices found")]
    NoKeyboard,
    #[error("window system query failed: {0}")]
    Query(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Window semantics requested for the overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowTypeHint {
    Dock,
    Toolbar,
    Utility,
    Normal,
}

/// Pointer and focus snapshot taken at the start of a show request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WmInfo {
    /// Absolute screen coordinates
    pub pointer_x: i32,
    pub pointer_y: i32,
    /// Class of the focused window, `None` when nothing has focus
    pub window_class: Option<String>,
}

/// One key event of a simulated sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStroke {
    /// DOM-style key code, e.g. `KeyA` or `ControlLeft`
    pub name: String,
    /// Press when true, release otherwise
    pub down: bool,
    /// Milliseconds to wait before sending this event
    #[serde(default)]
    pub delay: u64,
}

pub type ShortcutAction = Arc<dyn Fn() + Send + Sync>;

/// A global shortcut and the callback it triggers
#[derive(Clone)]
pub struct ShortcutBinding {
    pub id: String,
    pub description: String,
    pub accelerator: String,
    pub action: ShortcutAction,
}

impl fmt::Debug for ShortcutBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutBinding")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("accelerator", &self.accelerator)
            .finish_non_exhaustive()
    }
}

/// Capabilities every platform adapter provides
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// One-time platform setup. An error here aborts startup.
    async fn init(&self) -> Result<(), BackendError>;

    /// Window type the overlay surface should be created with
    fn window_type(&self) -> WindowTypeHint;

    /// Current pointer position and focused window class
    async fn get_wm_info(&self) -> Result<WmInfo, BackendError>;

    /// Register a global shortcut. Fails when the accelerator is taken.
    async fn bind_shortcut(&self, binding: ShortcutBinding) -> Result<(), BackendError>;

    /// Release every binding. Safe to call when nothing is bound.
    async fn unbind_all_shortcuts(&self);

    /// Synthesize the key sequence. Fire-and-forget.
    fn simulate_keys(&self, keys: Vec<KeyStroke>);

    /// Move the pointer by a relative offset. Fire-and-forget.
    fn move_pointer(&self, dx: i32, dy: i32);
}

/// Create the backend for the running session
pub fn create() -> Result<Box<dyn Backend>, BackendError> {
    platform_backend()
}

#[cfg(target_os = "linux")]
fn platform_backend() -> Result<Box<dyn Backend>, BackendError> {
    if std::env::var_os("DISPLAY").is_some() {
        tracing::info!("using x11 backend");
        Ok(Box::new(X11Backend::new()))
    } else {
        Err(BackendError::Unsupported(
            "no X11 display found (DISPLAY is not set)".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
fn platform_backend() -> Result<Box<dyn Backend>, BackendError> {
    Err(BackendError::Unsupported(std::env::consts::OS.to_string()))
}
