//! Shortcut strings such as `Ctrl+Alt+Space`

use std::fmt;
use std::str::FromStr;

use super::BackendError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

/// A parsed global shortcut: modifier set plus exactly one key.
///
/// Key names are normalised to upper case (`A`, `5`, `F12`, `SPACE`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub modifiers: Modifiers,
    pub key: String,
}

const NAMED_KEYS: &[&str] = &[
    "SPACE", "TAB", "ENTER", "ESCAPE", "BACKSPACE", "DELETE", "INSERT", "HOME", "END", "PAGEUP",
    "PAGEDOWN", "UP", "DOWN", "LEFT", "RIGHT",
];

fn normalize_key(upper: &str) -> Option<String> {
    let key = match upper {
        "RETURN" => "ENTER",
        "ESC" => "ESCAPE",
        "DEL" => "DELETE",
        "ARROWUP" => "UP",
        "ARROWDOWN" => "DOWN",
        "ARROWLEFT" => "LEFT",
        "ARROWRIGHT" => "RIGHT",
        other => other,
    };

    if NAMED_KEYS.contains(&key) {
        return Some(key.to_string());
    }
    if key.len() == 1 && key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(key.to_string());
    }
    if let Some(n) = key.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=24).contains(&n) {
            return Some(key.to_string());
        }
    }
    None
}

impl FromStr for Accelerator {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BackendError::InvalidAccelerator(s.to_string());
        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in s.split('+') {
            let upper = part.trim().to_ascii_uppercase();
            match upper.as_str() {
                "CTRL" | "CONTROL" | "CMDORCTRL" | "COMMANDORCONTROL" => modifiers.ctrl = true,
                "ALT" | "OPTION" => modifiers.alt = true,
                "SHIFT" => modifiers.shift = true,
                "SUPER" | "META" | "WIN" | "CMD" | "COMMAND" => modifiers.meta = true,
                "" => return Err(invalid()),
                other => {
                    if key.is_some() {
                        return Err(invalid());
                    }
                    key = Some(normalize_key(other).ok_or_else(invalid)?);
                }
            }
        }

        key.map(|key| Accelerator { modifiers, key }).ok_or_else(invalid)
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.modifiers;
        let parts = [
            (m.ctrl, "Ctrl"),
            (m.alt, "Alt"),
            (m.shift, "Shift"),
            (m.meta, "Super"),
        ];
        for (on, name) in parts {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifiers_and_key() {
        let acc: Accelerator = "Ctrl+Alt+Space".parse().unwrap();
        assert!(acc.modifiers.ctrl && acc.modifiers.alt);
        assert!(!acc.modifiers.shift && !acc.modifiers.meta);
        assert_eq!(acc.key, "SPACE");
    }

    #[test]
    fn aliases_are_normalised() {
        let a: Accelerator = "control+return".parse().unwrap();
        let b: Accelerator = "Ctrl+Enter".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!("Super+k".parse::<Accelerator>().unwrap().key, "K");
        assert_eq!("Shift+F12".parse::<Accelerator>().unwrap().key, "F12");
    }

    #[test]
    fn rejects_malformed_strings() {
        for s in ["", "Ctrl", "Ctrl+", "Ctrl+A+B", "Ctrl+F25", "Ctrl+Banana"] {
            assert!(
                matches!(s.parse::<Accelerator>(), Err(BackendError::InvalidAccelerator(_))),
                "{s:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_is_canonical() {
        let acc: Accelerator = "shift+ctrl+a".parse().unwrap();
        assert_eq!(acc.to_string(), "Ctrl+Shift+A");
    }
}
