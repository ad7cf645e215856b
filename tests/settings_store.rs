use pie_menu_host::config::{self, MenuSettings};
use pie_menu_host::menu::{MenuConfig, EXAMPLE_SHORTCUT};
use pie_menu_host::orchestrator::{Document, Orchestrator};
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

mod mock_platform;
use mock_platform::{full_hd, BackendCall, MockBackend, RecordingSurface};

#[test]
fn first_run_writes_example_menu() {
    let dir = tempdir().unwrap();

    let store = config::open_menu_settings(dir.path()).unwrap();
    let menus: Vec<MenuConfig> = store.get_as("menus").unwrap();
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0].shortcut, EXAMPLE_SHORTCUT);

    let content = fs::read_to_string(dir.path().join(MenuSettings::FILE_NAME)).unwrap();
    let written: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(written["menus"][0]["root"]["name"], "Example Menu");
}

#[test]
fn existing_menus_are_left_alone() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(MenuSettings::FILE_NAME),
        r#"{"menus": [{"root": {"name": "Mine"}, "shortcut": "Alt+M"}]}"#,
    )
    .unwrap();

    let store = config::open_menu_settings(dir.path()).unwrap();
    let menus: Vec<MenuConfig> = store.get_as("menus").unwrap();
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0].root.name, "Mine");
}

#[test]
fn app_settings_survive_reopen() {
    let dir = tempdir().unwrap();

    let mut store = config::open_app_settings(dir.path());
    assert_eq!(store.get("refocusDelayMs"), json!(100));
    store.set(json!({"menuTheme": "neon", "refocusDelayMs": 250})).unwrap();
    store.close();

    let reopened = config::open_app_settings(dir.path());
    assert_eq!(reopened.get("menuTheme"), json!("neon"));
    assert_eq!(reopened.document().unwrap().refocus_delay_ms, 250);
    assert_eq!(reopened.get("editorTheme"), json!("default"));
}

#[tokio::test(start_paused = true)]
async fn external_menu_edit_rebinds_after_reload() {
    let dir = tempdir().unwrap();
    let backend = MockBackend::with_pointer(10, 10);
    let mut orch = Orchestrator::start(
        Box::new(backend.clone()),
        |hint| RecordingSurface::new(hint, vec![full_hd()]),
        config::open_app_settings(dir.path()),
        config::open_menu_settings(dir.path()).unwrap(),
    )
    .await
    .unwrap();

    fs::write(
        dir.path().join(MenuSettings::FILE_NAME),
        r#"{"menus": [{"root": {"name": "Edited"}, "shortcut": "Super+E"}]}"#,
    )
    .unwrap();
    orch.handle().reload_settings(Document::Menus);
    orch.process_pending().await;

    let calls = backend.calls();
    assert!(calls.contains(&BackendCall::UnbindAll));
    assert_eq!(
        calls.last(),
        Some(&BackendCall::Bind { id: "menu-0".to_string(), accelerator: "Super+E".to_string() })
    );
}
