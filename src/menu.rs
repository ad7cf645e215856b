//! Menu definitions
//!
//! The tree of items a pie menu shows, the per-menu configuration stored in
//! the menu document, and the example menu written on first run.

use serde::{Deserialize, Serialize};

/// Icon theme used for the generated example menu
pub const EXAMPLE_ICON_THEME: &str = "material-symbols-rounded";

/// Icons cycled through by the example menu generator
pub const EXAMPLE_ICONS: &[&str] = &[
    "apps",
    "star",
    "favorite",
    "home",
    "terminal",
    "folder",
    "public",
    "music_note",
    "settings",
    "mail",
    "photo_camera",
    "calendar_month",
];

/// Children per level of the bootstrap example menu
pub const EXAMPLE_FAN_OUT: &[usize] = &[6, 4];

/// Shortcut bound to the bootstrap example menu
pub const EXAMPLE_SHORTCUT: &str = "Ctrl+Space";

/// A single node of a menu tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    /// Display label
    pub name: String,
    /// Icon name, resolved by the presentation surface
    #[serde(default)]
    pub icon: String,
    /// Theme the icon name belongs to
    #[serde(default)]
    pub icon_theme: String,
    /// Ordered child items
    #[serde(default)]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(
        name: impl Into<String>,
        icon: impl Into<String>,
        icon_theme: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            icon_theme: icon_theme.into(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuNode::count).sum::<usize>()
    }
}

/// One named pie menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuConfig {
    pub root: MenuNode,
    /// Global accelerator, empty for none
    #[serde(default)]
    pub shortcut: String,
    /// Open at the centre of the screen instead of at the pointer
    #[serde(default)]
    pub centered: bool,
}

/// Build a deterministic example menu tree.
///
/// The root gets `fan_out[0]` children, each of those `fan_out[1]` children
/// and so on. Icons are assigned round-robin from `icons` in pre-order, the
/// root taking the first one. An empty palette leaves every icon empty.
pub fn example_menu(fan_out: &[usize], icons: &[&str]) -> MenuNode {
    let mut next_icon = 0;
    let mut root = MenuNode::new(
        "Example Menu",
        pick_icon(icons, &mut next_icon),
        EXAMPLE_ICON_THEME,
    );
    root.children = example_children(fan_out, icons, &mut next_icon, "");
    root
}

fn example_children(
    fan_out: &[usize],
    icons: &[&str],
    next_icon: &mut usize,
    prefix: &str,
) -> Vec<MenuNode> {
    let Some((&count, rest)) = fan_out.split_first() else {
        return Vec::new();
    };

    (1..=count)
        .map(|i| {
            let label = if prefix.is_empty() {
                i.to_string()
            } else {
                format!("{}.{}", prefix, i)
            };
            let mut node = MenuNode::new(
                format!("Item {}", label),
                pick_icon(icons, next_icon),
                EXAMPLE_ICON_THEME,
            );
            node.children = example_children(rest, icons, next_icon, &label);
            node
        })
        .collect()
}

fn pick_icon(icons: &[&str], next_icon: &mut usize) -> String {
    if icons.is_empty() {
        return String::new();
    }
    let icon = icons[*next_icon % icons.len()];
    *next_icon += 1;
    icon.to_string()
}

/// The menu written to an empty menu document on first run
pub fn bootstrap_menu() -> MenuConfig {
    MenuConfig {
        root: example_menu(EXAMPLE_FAN_OUT, EXAMPLE_ICONS),
        shortcut: EXAMPLE_SHORTCUT.to_string(),
        centered: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_menu_follows_fan_out() {
        let root = example_menu(&[3, 2], &["a", "b"]);
        assert_eq!(root.children.len(), 3);
        assert!(root.children.iter().all(|c| c.children.len() == 2));
        assert!(root.children[0].children[0].children.is_empty());
        assert_eq!(root.count(), 1 + 3 + 6);
    }

    #[test]
    fn example_menu_names_and_icons_are_preorder() {
        let root = example_menu(&[2, 1], &["a", "b", "c"]);
        assert_eq!(root.icon, "a");
        assert_eq!(root.children[0].name, "Item 1");
        assert_eq!(root.children[0].icon, "b");
        assert_eq!(root.children[0].children[0].name, "Item 1.1");
        assert_eq!(root.children[0].children[0].icon, "c");
        assert_eq!(root.children[1].icon, "a");
        assert_eq!(root.children[1].children[0].name, "Item 2.1");
    }

    #[test]
    fn example_menu_is_deterministic() {
        assert_eq!(
            example_menu(EXAMPLE_FAN_OUT, EXAMPLE_ICONS),
            example_menu(EXAMPLE_FAN_OUT, EXAMPLE_ICONS)
        );
    }

    #[test]
    fn empty_fan_out_gives_a_leaf() {
        let root = example_menu(&[], &[]);
        assert!(root.children.is_empty());
        assert!(root.icon.is_empty());
    }

    #[test]
    fn menu_config_uses_camel_case() {
        let json = serde_json::to_value(bootstrap_menu()).unwrap();
        assert!(json["root"].get("iconTheme").is_some());
        assert_eq!(json["shortcut"], "Ctrl+Space");
        assert_eq!(json["centered"], false);
    }

    #[test]
    fn menu_node_missing_fields_default() {
        let node: MenuNode = serde_json::from_str(r#"{"name": "Root"}"#).unwrap();
        assert_eq!(node.name, "Root");
        assert!(node.children.is_empty());
        assert!(node.icon.is_empty());
    }
}
