#![allow(dead_code)]

use async_trait::async_trait;
use pie_menu_host::backend::{
    Backend, BackendError, KeyStroke, ShortcutBinding, WindowTypeHint, WmInfo,
};
use pie_menu_host::menu::MenuNode;
use pie_menu_host::surface::{Display, Point, Rect, Surface};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Init,
    WmInfo,
    Bind { id: String, accelerator: String },
    UnbindAll,
    SimulateKeys(Vec<KeyStroke>),
    MovePointer(i32, i32),
}

/// Backend double. Clones share state so a test can keep one after boxing
/// another for the orchestrator.
#[derive(Clone)]
pub struct MockBackend {
    pub calls: Arc<Mutex<Vec<BackendCall>>>,
    /// `None` makes `get_wm_info` fail
    pub wm_info: Arc<Mutex<Option<WmInfo>>>,
    pub bindings: Arc<Mutex<Vec<ShortcutBinding>>>,
    pub fail_init: bool,
}

impl MockBackend {
    pub fn with_pointer(x: i32, y: i32) -> Self {
        Self {
            calls: Arc::default(),
            wm_info: Arc::new(Mutex::new(Some(WmInfo {
                pointer_x: x,
                pointer_y: y,
                window_class: None,
            }))),
            bindings: Arc::default(),
            fail_init: false,
        }
    }

    pub fn set_pointer(&self, x: i32, y: i32) {
        *self.wm_info.lock().unwrap() = Some(WmInfo {
            pointer_x: x,
            pointer_y: y,
            window_class: Some("firefox".to_string()),
        });
    }

    pub fn fail_queries(&self) {
        *self.wm_info.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Invoke the action of the binding with `id`, as a key press would
    pub fn press(&self, id: &str) {
        let action = self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.action.clone())
            .expect("shortcut is bound");
        action();
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn init(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Init);
        if self.fail_init {
            return Err(BackendError::Init("no compositor".to_string()));
        }
        Ok(())
    }

    fn window_type(&self) -> WindowTypeHint {
        WindowTypeHint::Utility
    }

    async fn get_wm_info(&self) -> Result<WmInfo, BackendError> {
        self.record(BackendCall::WmInfo);
        self.wm_info
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::Query("compositor went away".to_string()))
    }

    async fn bind_shortcut(&self, binding: ShortcutBinding) -> Result<(), BackendError> {
        self.record(BackendCall::Bind {
            id: binding.id.clone(),
            accelerator: binding.accelerator.clone(),
        });
        let mut bindings = self.bindings.lock().unwrap();
        if let Some(owner) = bindings
            .iter()
            .find(|b| b.accelerator == binding.accelerator && b.id != binding.id)
        {
            return Err(BackendError::ShortcutTaken {
                accelerator: binding.accelerator.clone(),
                owner: owner.id.clone(),
            });
        }
        bindings.push(binding);
        Ok(())
    }

    async fn unbind_all_shortcuts(&self) {
        self.record(BackendCall::UnbindAll);
        self.bindings.lock().unwrap().clear();
    }

    fn simulate_keys(&self, keys: Vec<KeyStroke>) {
        self.record(BackendCall::SimulateKeys(keys));
    }

    fn move_pointer(&self, dx: i32, dy: i32) {
        self.record(BackendCall::MovePointer(dx, dy));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetBounds(Rect),
    ShowMenu { menu: String, position: Point },
    Show,
    Hide,
    Focus,
    DevTools,
}

/// Surface double recording every call
pub struct RecordingSurface {
    pub hint: WindowTypeHint,
    pub displays: Vec<Display>,
    pub calls: Vec<SurfaceCall>,
    pub visible: bool,
}

impl RecordingSurface {
    pub fn new(hint: WindowTypeHint, displays: Vec<Display>) -> Self {
        Self {
            hint,
            displays,
            calls: Vec::new(),
            visible: false,
        }
    }

    pub fn count(&self, call: &SurfaceCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Surface for RecordingSurface {
    fn displays(&self) -> Vec<Display> {
        self.displays.clone()
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.calls.push(SurfaceCall::SetBounds(bounds));
    }

    fn show_menu(&mut self, root: &MenuNode, position: Point) {
        self.calls.push(SurfaceCall::ShowMenu {
            menu: root.name.clone(),
            position,
        });
    }

    fn show(&mut self) {
        self.visible = true;
        self.calls.push(SurfaceCall::Show);
    }

    fn hide(&mut self) {
        self.visible = false;
        self.calls.push(SurfaceCall::Hide);
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn focus(&mut self) {
        if self.visible {
            self.calls.push(SurfaceCall::Focus);
        }
    }

    fn open_dev_tools(&mut self) {
        self.calls.push(SurfaceCall::DevTools);
    }
}

pub fn full_hd() -> Display {
    Display {
        id: 0,
        bounds: Rect::new(0, 0, 1920, 1080),
        work_area: Rect::new(0, 0, 1920, 1080),
    }
}
