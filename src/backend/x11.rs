//! X11 backend
//!
//! Talks to the X server through the `xdotool` command line tool:
//! - pointer position and focused window class for show requests
//! - key and pointer synthesis for menu actions
//!
//! Global shortcuts come from the evdev listener in `hotkeys`, which works
//! for X11 and XWayland sessions alike.

use async_trait::async_trait;
use std::process::Command;
use std::time::Duration;

use super::hotkeys::HotkeyListener;
use super::{Backend, BackendError, KeyStroke, ShortcutBinding, WindowTypeHint, WmInfo};

const XDOTOOL: &str = "xdotool";

pub struct X11Backend {
    hotkeys: HotkeyListener,
}

impl X11Backend {
    pub fn new() -> Self {
        Self {
            hotkeys: HotkeyListener::new(),
        }
    }
}

impl Default for X11Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// Run xdotool asynchronously and return its stdout
async fn xdotool(args: &[&str]) -> Result<String, BackendError> {
    let output = tokio::process::Command::new(XDOTOOL)
        .args(args)
        .output()
        .await
        .map_err(|e| BackendError::Query(format!("failed to run {}: {}", XDOTOOL, e)))?;

    if !output.status.success() {
        return Err(BackendError::Query(format!(
            "{} {} exited with {}: {}",
            XDOTOOL,
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `xdotool getmouselocation --shell` output
///
/// ```text
/// X=812
/// Y=440
/// SCREEN=0
/// WINDOW=65011718
/// ```
fn parse_mouse_location(output: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        if let Some(v) = line.trim().strip_prefix("X=") {
            x = v.parse().ok();
        } else if let Some(v) = line.trim().strip_prefix("Y=") {
            y = v.parse().ok();
        }
    }
    Some((x?, y?))
}

/// Map a DOM key code to the X keysym xdotool expects
fn keysym(code: &str) -> String {
    if let Some(letter) = code.strip_prefix("Key").filter(|l| l.len() == 1) {
        return letter.to_ascii_lowercase();
    }
    if let Some(digit) = code.strip_prefix("Digit").filter(|d| d.len() == 1) {
        return digit.to_string();
    }

    let sym = match code {
        "ControlLeft" => "Control_L",
        "ControlRight" => "Control_R",
        "ShiftLeft" => "Shift_L",
        "ShiftRight" => "Shift_R",
        "AltLeft" => "Alt_L",
        "AltRight" => "Alt_R",
        "MetaLeft" => "Super_L",
        "MetaRight" => "Super_R",
        "Enter" => "Return",
        "Space" => "space",
        "Backspace" => "BackSpace",
        "CapsLock" => "Caps_Lock",
        "PageUp" => "Prior",
        "PageDown" => "Next",
        "ArrowUp" => "Up",
        "ArrowDown" => "Down",
        "ArrowLeft" => "Left",
        "ArrowRight" => "Right",
        "PrintScreen" => "Print",
        "Minus" => "minus",
        "Equal" => "equal",
        "Comma" => "comma",
        "Period" => "period",
        "Slash" => "slash",
        "Backslash" => "backslash",
        "Semicolon" => "semicolon",
        "Quote" => "apostrophe",
        "Backquote" => "grave",
        "BracketLeft" => "bracketleft",
        "BracketRight" => "bracketright",
        // Tab, Escape, Delete, Home, End, Insert and F-keys share their names
        other => other,
    };
    sym.to_string()
}

fn run_xdotool(args: Vec<String>) {
    match Command::new(XDOTOOL).args(&args).status() {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!("{} {} exited with {}", XDOTOOL, args.join(" "), status),
        Err(e) => tracing::warn!("failed to run {}: {}", XDOTOOL, e),
    }
}

#[async_trait]
impl Backend for X11Backend {
    fn name(&self) -> &'static str {
        "x11"
    }

    async fn init(&self) -> Result<(), BackendError> {
        if std::env::var_os("DISPLAY").is_none() {
            return Err(BackendError::Init("DISPLAY is not set".to_string()));
        }
        let version = xdotool(&["version"])
            .await
            .map_err(|e| BackendError::Init(format!("xdotool is required: {}", e)))?;
        tracing::info!("x11 backend ready ({})", version.trim());
        Ok(())
    }

    fn window_type(&self) -> WindowTypeHint {
        WindowTypeHint::Dock
    }

    async fn get_wm_info(&self) -> Result<WmInfo, BackendError> {
        let location = xdotool(&["getmouselocation", "--shell"]).await?;
        let (pointer_x, pointer_y) = parse_mouse_location(&location).ok_or_else(|| {
            BackendError::Query(format!("unexpected pointer output: {:?}", location))
        })?;

        // Fails when no window has focus
        let window_class = match xdotool(&["getactivewindow", "getwindowclassname"]).await {
            Ok(class) => Some(class.trim().to_string()).filter(|c| !c.is_empty()),
            Err(e) => {
                tracing::debug!("no focused window: {}", e);
                None
            }
        };

        Ok(WmInfo {
            pointer_x,
            pointer_y,
            window_class,
        })
    }

    async fn bind_shortcut(&self, binding: ShortcutBinding) -> Result<(), BackendError> {
        self.hotkeys.bind(binding)
    }

    async fn unbind_all_shortcuts(&self) {
        self.hotkeys.unbind_all();
    }

    fn simulate_keys(&self, keys: Vec<KeyStroke>) {
        let spawned = std::thread::Builder::new()
            .name("simulate-keys".to_string())
            .spawn(move || {
                for stroke in keys {
                    if stroke.delay > 0 {
                        std::thread::sleep(Duration::from_millis(stroke.delay));
                    }
                    let action = if stroke.down { "keydown" } else { "keyup" };
                    run_xdotool(vec![action.to_string(), keysym(&stroke.name)]);
                }
            });
        if let Err(e) = spawned {
            tracing::error!("failed to start key simulation: {}", e);
        }
    }

    fn move_pointer(&self, dx: i32, dy: i32) {
        let args = vec![
            "mousemove_relative".to_string(),
            "--".to_string(),
            dx.to_string(),
            dy.to_string(),
        ];
        if let Err(e) = std::thread::Builder::new()
            .name("move-pointer".to_string())
            .spawn(move || run_xdotool(args))
        {
            tracing::error!("failed to move pointer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shell_mouse_location() {
        let out = "X=812\nY=440\nSCREEN=0\nWINDOW=65011718\n";
        assert_eq!(parse_mouse_location(out), Some((812, 440)));
    }

    #[test]
    fn mouse_location_needs_both_axes() {
        assert_eq!(parse_mouse_location("X=1\n"), None);
        assert_eq!(parse_mouse_location("garbage"), None);
    }

    #[test]
    fn dom_codes_map_to_keysyms() {
        assert_eq!(keysym("KeyA"), "a");
        assert_eq!(keysym("Digit7"), "7");
        assert_eq!(keysym("ControlLeft"), "Control_L");
        assert_eq!(keysym("Enter"), "Return");
        assert_eq!(keysym("PageDown"), "Next");
        assert_eq!(keysym("F5"), "F5");
        assert_eq!(keysym("Escape"), "Escape");
    }

    #[test]
    fn prefers_dock_windows() {
        assert_eq!(X11Backend::new().window_type(), WindowTypeHint::Dock);
    }
}
