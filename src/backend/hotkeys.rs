//! Global shortcut detection
//!
//! Reads key events straight from keyboard devices in `/dev/input`, so it
//! works regardless of which window has focus. Requires the user to be in
//! the 'input' group.

use evdev::{Device, InputEventKind, Key};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Accelerator, BackendError, Modifiers, ShortcutAction, ShortcutBinding};

struct ActiveBinding {
    id: String,
    accelerator: Accelerator,
    key: Key,
    action: ShortcutAction,
}

type Bindings = Arc<Mutex<Vec<ActiveBinding>>>;

/// Shared table of active shortcuts plus the device reader threads
pub struct HotkeyListener {
    bindings: Bindings,
    /// Devices that already have a reader thread
    listening: Mutex<HashSet<PathBuf>>,
}

impl Default for HotkeyListener {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyListener {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(Mutex::new(Vec::new())),
            listening: Mutex::new(HashSet::new()),
        }
    }

    /// Add a binding, starting the reader threads on first use.
    ///
    /// A binding with the same id replaces the old one.
    pub fn bind(&self, binding: ShortcutBinding) -> Result<(), BackendError> {
        let accelerator: Accelerator = binding.accelerator.parse()?;
        let key = evdev_key(&accelerator.key)
            .ok_or_else(|| BackendError::InvalidAccelerator(binding.accelerator.clone()))?;

        if let Some(owner) = self
            .bindings()
            .iter()
            .find(|b| b.accelerator == accelerator && b.id != binding.id)
        {
            return Err(BackendError::ShortcutTaken {
                accelerator: accelerator.to_string(),
                owner: owner.id.clone(),
            });
        }

        self.ensure_started()?;

        let mut bindings = self.bindings();
        bindings.retain(|b| b.id != binding.id);
        tracing::info!(id = %binding.id, shortcut = %accelerator, "shortcut bound");
        bindings.push(ActiveBinding {
            id: binding.id,
            accelerator,
            key,
            action: binding.action,
        });
        Ok(())
    }

    /// Drop every binding. Reader threads keep running idle.
    pub fn unbind_all(&self) {
        let mut bindings = self.bindings();
        if !bindings.is_empty() {
            tracing::debug!(count = bindings.len(), "unbinding shortcuts");
        }
        bindings.clear();
    }

    /// A panicking shortcut action must not disable every other shortcut
    fn bindings(&self) -> MutexGuard<'_, Vec<ActiveBinding>> {
        lock_bindings(&self.bindings)
    }

    fn ensure_started(&self) -> Result<(), BackendError> {
        if !self.listening().is_empty() {
            return Ok(());
        }
        self.start_listeners(find_keyboard_paths())
    }

    /// Spawn one reader thread per device not yet read.
    ///
    /// Fails when no device ends up with a reader.
    fn start_listeners(&self, paths: Vec<PathBuf>) -> Result<(), BackendError> {
        let mut listening = self.listening();

        for path in paths {
            if listening.contains(&path) {
                continue;
            }
            let device = match Device::open(&path) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("could not open keyboard {}: {}", path.display(), e);
                    continue;
                }
            };
            let bindings = self.bindings.clone();
            let thread_path = path.clone();
            std::thread::Builder::new()
                .name("hotkey-listener".to_string())
                .spawn(move || keyboard_loop(device, thread_path, bindings))?;
            listening.insert(path);
        }

        if listening.is_empty() {
            return Err(keyboard_access_error());
        }
        tracing::debug!(devices = listening.len(), "hotkey listeners running");
        Ok(())
    }

    fn listening(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.listening.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_bindings(bindings: &Mutex<Vec<ActiveBinding>>) -> MutexGuard<'_, Vec<ActiveBinding>> {
    bindings.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Find all keyboard device paths in /dev/input/
fn find_keyboard_paths() -> Vec<PathBuf> {
    let mut keyboards = Vec::new();

    let input_dir = match std::fs::read_dir("/dev/input") {
        Ok(dir) => dir,
        Err(_) => return keyboards,
    };

    for entry in input_dir.flatten() {
        let path = entry.path();

        if !path.to_string_lossy().contains("event") {
            continue;
        }

        // May fail without permissions
        let device = match Device::open(&path) {
            Ok(d) => d,
            Err(_) => continue,
        };

        if is_keyboard(&device) {
            tracing::debug!(
                "found keyboard: {} ({})",
                device.name().unwrap_or("Unknown"),
                path.display()
            );
            keyboards.push(path);
        }
    }

    keyboards
}

/// A keyboard has letter keys and a space bar
fn is_keyboard(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_SPACE))
        .unwrap_or(false)
}

/// Distinguish "no keyboards" from "not allowed to read them"
fn keyboard_access_error() -> BackendError {
    if let Ok(dir) = std::fs::read_dir("/dev/input") {
        let first_event = dir
            .flatten()
            .map(|e| e.path())
            .find(|p| p.to_string_lossy().contains("event"));
        if let Some(path) = first_event {
            if let Err(e) = Device::open(&path) {
                if e.raw_os_error() == Some(libc::EACCES) {
                    return BackendError::PermissionDenied(path.display().to_string());
                }
            }
        }
    }
    BackendError::NoKeyboard
}

fn keyboard_loop(mut device: Device, path: PathBuf, bindings: Bindings) {
    let mut held = Modifiers::default();

    loop {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                if e.raw_os_error() == Some(libc::ENODEV) {
                    tracing::warn!("keyboard {} disconnected", path.display());
                } else {
                    tracing::error!("reading {} failed: {}", path.display(), e);
                }
                return;
            }
        };

        for event in events {
            let InputEventKind::Key(key) = event.kind() else {
                continue;
            };
            // 0 = release, 1 = press, 2 = autorepeat
            let pressed = match event.value() {
                0 => false,
                1 => true,
                _ => continue,
            };

            if update_modifiers(&mut held, key, pressed) || !pressed {
                continue;
            }

            let action = lock_bindings(&bindings)
                .iter()
                .find(|b| b.key == key && b.accelerator.modifiers == held)
                .map(|b| (b.id.clone(), b.action.clone()));

            if let Some((id, action)) = action {
                tracing::debug!(id = %id, "shortcut pressed");
                action();
            }
        }
    }
}

/// Track modifier state. Returns true if `key` is a modifier.
fn update_modifiers(held: &mut Modifiers, key: Key, pressed: bool) -> bool {
    let slot = match key {
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => &mut held.ctrl,
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => &mut held.alt,
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => &mut held.shift,
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => &mut held.meta,
        _ => return false,
    };
    *slot = pressed;
    true
}

/// Map a normalised accelerator key name to its evdev key code
fn evdev_key(name: &str) -> Option<Key> {
    let key = match name {
        "SPACE" => Key::KEY_SPACE,
        "TAB" => Key::KEY_TAB,
        "ENTER" => Key::KEY_ENTER,
        "ESCAPE" => Key::KEY_ESC,
        "BACKSPACE" => Key::KEY_BACKSPACE,
        "DELETE" => Key::KEY_DELETE,
        "INSERT" => Key::KEY_INSERT,
        "HOME" => Key::KEY_HOME,
        "END" => Key::KEY_END,
        "PAGEUP" => Key::KEY_PAGEUP,
        "PAGEDOWN" => Key::KEY_PAGEDOWN,
        "UP" => Key::KEY_UP,
        "DOWN" => Key::KEY_DOWN,
        "LEFT" => Key::KEY_LEFT,
        "RIGHT" => Key::KEY_RIGHT,
        "A" => Key::KEY_A,
        "B" => Key::KEY_B,
        "C" => Key::KEY_C,
        "D" => Key::KEY_D,
        "E" => Key::KEY_E,
        "F" => Key::KEY_F,
        "G" => Key::KEY_G,
        "H" => Key::KEY_H,
        "I" => Key::KEY_I,
        "J" => Key::KEY_J,
        "K" => Key::KEY_K,
        "L" => Key::KEY_L,
        "M" => Key::KEY_M,
        "N" => Key::KEY_N,
        "O" => Key::KEY_O,
        "P" => Key::KEY_P,
        "Q" => Key::KEY_Q,
        "R" => Key::KEY_R,
        "S" => Key::KEY_S,
        "T" => Key::KEY_T,
        "U" => Key::KEY_U,
        "V" => Key::KEY_V,
        "W" => Key::KEY_W,
        "X" => Key::KEY_X,
        "Y" => Key::KEY_Y,
        "Z" => Key::KEY_Z,
        "0" => Key::KEY_0,
        "1" => Key::KEY_1,
        "2" => Key::KEY_2,
        "3" => Key::KEY_3,
        "4" => Key::KEY_4,
        "5" => Key::KEY_5,
        "6" => Key::KEY_6,
        "7" => Key::KEY_7,
        "8" => Key::KEY_8,
        "9" => Key::KEY_9,
        "F1" => Key::KEY_F1,
        "F2" => Key::KEY_F2,
        "F3" => Key::KEY_F3,
        "F4" => Key::KEY_F4,
        "F5" => Key::KEY_F5,
        "F6" => Key::KEY_F6,
        "F7" => Key::KEY_F7,
        "F8" => Key::KEY_F8,
        "F9" => Key::KEY_F9,
        "F10" => Key::KEY_F10,
        "F11" => Key::KEY_F11,
        "F12" => Key::KEY_F12,
        "F13" => Key::KEY_F13,
        "F14" => Key::KEY_F14,
        "F15" => Key::KEY_F15,
        "F16" => Key::KEY_F16,
        "F17" => Key::KEY_F17,
        "F18" => Key::KEY_F18,
        "F19" => Key::KEY_F19,
        "F20" => Key::KEY_F20,
        "F21" => Key::KEY_F21,
        "F22" => Key::KEY_F22,
        "F23" => Key::KEY_F23,
        "F24" => Key::KEY_F24,
        _ => return None,
    };
    Some(key)
}
