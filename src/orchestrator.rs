//! Show/hide orchestration
//!
//! The orchestrator owns the backend, the surface and both settings stores,
//! and processes every input as a [`Command`] from a single channel. Because
//! one task drains that channel, no two transitions ever overlap.
//!
//! Visibility states:
//! - `Hidden`: initial, surface off screen
//! - `Visible`: menu shown
//! - `HidingScheduled`: visible, hide timer armed after the surface started
//!   fading out
//!
//! At most one hide timer exists. It is cancelled before a new one is armed,
//! at the start of every show and on every immediate hide. Each timer carries
//! a generation number so an expiry that was queued before its cancellation
//! is recognised as stale and dropped.

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::backend::{Backend, BackendError, ShortcutBinding, WindowTypeHint};
use crate::config::{AppSettings, MenuSettings};
use crate::menu::MenuConfig;
use crate::settings::SettingsStore;
use crate::surface::{display_at, menu_position, surface_bounds, Surface, SurfaceMessage};

/// Used when `refocusDelayMs` cannot be read
pub const DEFAULT_REFOCUS_DELAY: Duration = Duration::from_millis(100);

/// Which settings document changed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    App,
    Menus,
}

/// Inputs of the orchestrator event loop
#[derive(Debug)]
pub enum Command {
    /// Show a menu; `None` picks the first configured one
    Show { menu: Option<usize> },
    /// Message from the presentation surface
    Surface(SurfaceMessage),
    /// Hide timer with this generation ran out
    HideElapsed { generation: u64 },
    /// Post-show focus delay ran out
    RefocusElapsed,
    /// Menu definitions changed, bind shortcuts again
    RebindShortcuts,
    /// A settings file was edited externally
    ReloadSettings(Document),
    Quit,
}

/// Cloneable sender for orchestrator commands.
///
/// Every method returns false once the orchestrator has gone away.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    tx: UnboundedSender<Command>,
}

impl OrchestratorHandle {
    pub fn channel() -> (Self, UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Show the first configured menu
    pub fn request_show(&self) -> bool {
        self.send(Command::Show { menu: None })
    }

    pub fn show_menu(&self, index: usize) -> bool {
        self.send(Command::Show { menu: Some(index) })
    }

    pub fn post(&self, message: SurfaceMessage) -> bool {
        self.send(Command::Surface(message))
    }

    pub fn reload_settings(&self, document: Document) -> bool {
        self.send(Command::ReloadSettings(document))
    }

    pub fn quit(&self) -> bool {
        self.send(Command::Quit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Hidden,
    Visible,
    HidingScheduled,
}

struct HideTimer {
    generation: u64,
    task: JoinHandle<()>,
}

type UriOpener = Box<dyn Fn(&str) -> io::Result<()>>;

pub struct Orchestrator<S: Surface> {
    backend: Box<dyn Backend>,
    surface: S,
    app_settings: SettingsStore<AppSettings>,
    menu_settings: SettingsStore<MenuSettings>,
    handle: OrchestratorHandle,
    commands: UnboundedReceiver<Command>,
    visible: bool,
    hide_timer: Option<HideTimer>,
    next_generation: u64,
    open_uri: UriOpener,
}

impl<S: Surface> Orchestrator<S> {
    /// Initialise the backend, create the surface and bind menu shortcuts.
    ///
    /// Fails only when the backend cannot be initialised; the surface is not
    /// created in that case. Shortcut failures are logged.
    pub async fn start<F>(
        backend: Box<dyn Backend>,
        create_surface: F,
        app_settings: SettingsStore<AppSettings>,
        menu_settings: SettingsStore<MenuSettings>,
    ) -> Result<Self, BackendError>
    where
        F: FnOnce(WindowTypeHint) -> S,
    {
        backend.init().await?;
        let surface = create_surface(backend.window_type());
        tracing::info!(backend = backend.name(), "surface created");

        let (handle, commands) = OrchestratorHandle::channel();
        let mut orchestrator = Self {
            backend,
            surface,
            app_settings,
            menu_settings,
            handle,
            commands,
            visible: false,
            hide_timer: None,
            next_generation: 0,
            open_uri: Box::new(|uri: &str| open::that_detached(uri)),
        };

        let rebind = orchestrator.handle.clone();
        orchestrator.menu_settings.on_change("menus", move |_, _| {
            rebind.send(Command::RebindShortcuts);
        });

        orchestrator.bind_shortcuts().await;
        Ok(orchestrator)
    }

    /// Replace how `open-uri` messages are handled
    pub fn with_uri_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&str) -> io::Result<()> + 'static,
    {
        self.open_uri = Box::new(opener);
        self
    }

    pub fn handle(&self) -> OrchestratorHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> VisibilityState {
        if self.hide_timer.is_some() {
            VisibilityState::HidingScheduled
        } else if self.visible {
            VisibilityState::Visible
        } else {
            VisibilityState::Hidden
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn app_settings(&self) -> &SettingsStore<AppSettings> {
        &self.app_settings
    }

    pub fn app_settings_mut(&mut self) -> &mut SettingsStore<AppSettings> {
        &mut self.app_settings
    }

    pub fn menu_settings(&self) -> &SettingsStore<MenuSettings> {
        &self.menu_settings
    }

    pub fn menu_settings_mut(&mut self) -> &mut SettingsStore<MenuSettings> {
        &mut self.menu_settings
    }

    /// Process commands until `Quit`, then shut down
    pub async fn run(mut self) {
        tracing::info!("orchestrator running");
        while let Some(command) = self.commands.recv().await {
            if !self.dispatch(command).await {
                break;
            }
        }
        self.shutdown().await;
    }

    /// Process every command queued right now. Returns false after `Quit`.
    pub async fn process_pending(&mut self) -> bool {
        while let Ok(command) = self.commands.try_recv() {
            if !self.dispatch(command).await {
                return false;
            }
        }
        true
    }

    async fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Show { menu } => self.request_show(menu).await,
            Command::Surface(message) => self.handle_message(message),
            Command::HideElapsed { generation } => self.hide_elapsed(generation),
            Command::RefocusElapsed => self.refocus(),
            Command::RebindShortcuts => {
                self.backend.unbind_all_shortcuts().await;
                self.bind_shortcuts().await;
            }
            Command::ReloadSettings(document) => self.reload_settings(document),
            Command::Quit => return false,
        }
        true
    }

    /// Show a menu at the pointer.
    ///
    /// A request that cannot be completed (failing pointer query, no
    /// displays, no usable menu) is aborted before anything changes, so an
    /// armed hide timer keeps running.
    pub async fn request_show(&mut self, menu: Option<usize>) {
        let info = match self.backend.get_wm_info().await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("cannot show menu, pointer query failed: {}", e);
                return;
            }
        };

        let displays = self.surface.displays();
        let Some(target) = display_at(&displays, info.pointer_x, info.pointer_y) else {
            tracing::warn!("cannot show menu, no displays reported");
            return;
        };

        let menus: Vec<MenuConfig> = match self.menu_settings.get_as("menus") {
            Ok(menus) => menus,
            Err(e) => {
                tracing::warn!("cannot show menu, menu settings are invalid: {}", e);
                return;
            }
        };
        let index = menu.unwrap_or(0);
        let Some(selected) = menus.get(index).or_else(|| menus.first()) else {
            tracing::warn!("cannot show menu, no menus configured");
            return;
        };

        self.cancel_hide_timer();

        let bounds = surface_bounds(target.work_area);
        let position = menu_position(
            target.work_area,
            info.pointer_x,
            info.pointer_y,
            selected.centered,
        );

        tracing::debug!(
            menu = %selected.root.name,
            display_id = target.id,
            pointer_x = info.pointer_x,
            pointer_y = info.pointer_y,
            window_class = ?info.window_class,
            "showing menu"
        );

        self.surface.set_bounds(bounds);
        self.surface.show_menu(&selected.root, position);
        self.surface.show();
        self.visible = true;

        self.schedule_refocus();
    }

    /// Arm the hide timer. Only meaningful while the menu is visible.
    pub fn request_hide(&mut self, delay_ms: u64) {
        if !self.visible {
            tracing::debug!("hide requested while hidden, ignoring");
            return;
        }

        self.cancel_hide_timer();

        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = self.handle.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            handle.send(Command::HideElapsed { generation });
        });

        tracing::debug!(delay_ms, generation, "hide scheduled");
        self.hide_timer = Some(HideTimer { generation, task });
    }

    /// Relay a message from the surface
    pub fn handle_message(&mut self, message: SurfaceMessage) {
        match message {
            SurfaceMessage::HideWindow { delay } => self.request_hide(delay),
            SurfaceMessage::ShowDevTools => self.surface.open_dev_tools(),
            SurfaceMessage::Log { message } => tracing::info!(target: "surface", "{}", message),
            SurfaceMessage::SimulateKeys { keys } => {
                self.hide_now();
                tracing::debug!(count = keys.len(), "simulating keys");
                self.backend.simulate_keys(keys);
            }
            SurfaceMessage::MovePointer { x, y } => {
                self.backend.move_pointer(pointer_delta(x), pointer_delta(y));
            }
            SurfaceMessage::OpenUri { uri } => {
                self.hide_now();
                if let Err(e) = (self.open_uri)(&uri) {
                    tracing::warn!("failed to open {}: {}", uri, e);
                }
            }
        }
    }

    fn hide_elapsed(&mut self, generation: u64) {
        match &self.hide_timer {
            Some(timer) if timer.generation == generation => {
                self.hide_timer = None;
                self.surface.hide();
                self.visible = false;
                tracing::debug!("menu hidden");
            }
            _ => tracing::debug!(generation, "stale hide timer ignored"),
        }
    }

    /// Hide without waiting for a fade-out
    fn hide_now(&mut self) {
        self.cancel_hide_timer();
        self.surface.hide();
        self.visible = false;
    }

    fn cancel_hide_timer(&mut self) {
        if let Some(timer) = self.hide_timer.take() {
            timer.task.abort();
            tracing::debug!(generation = timer.generation, "hide timer cancelled");
        }
    }

    fn refocus_delay(&self) -> Duration {
        self.app_settings
            .get_as::<u64>("refocusDelayMs")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REFOCUS_DELAY)
    }

    /// Some window managers do not focus new overlay windows, so focus is
    /// forced once after a short delay.
    fn schedule_refocus(&self) {
        let delay = self.refocus_delay();
        let handle = self.handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.send(Command::RefocusElapsed);
        });
    }

    fn refocus(&mut self) {
        if self.visible {
            self.surface.focus();
        } else {
            tracing::debug!("surface hidden before refocus, skipping");
        }
    }

    async fn bind_shortcuts(&mut self) {
        let menus: Vec<MenuConfig> = match self.menu_settings.get_as("menus") {
            Ok(menus) => menus,
            Err(e) => {
                tracing::warn!("cannot bind shortcuts, menu settings are invalid: {}", e);
                return;
            }
        };

        for (index, menu) in menus.iter().enumerate() {
            if menu.shortcut.trim().is_empty() {
                continue;
            }
            let handle = self.handle.clone();
            let binding = ShortcutBinding {
                id: format!("menu-{}", index),
                description: format!("Open {}", menu.root.name),
                accelerator: menu.shortcut.clone(),
                action: Arc::new(move || {
                    handle.show_menu(index);
                }),
            };
            if let Err(e) = self.backend.bind_shortcut(binding).await {
                tracing::warn!("failed to bind {} for {}: {}", menu.shortcut, menu.root.name, e);
            }
        }
    }

    fn reload_settings(&mut self, document: Document) {
        let result = match document {
            Document::App => self.app_settings.reload(),
            Document::Menus => self.menu_settings.reload(),
        };
        match result {
            Ok(()) => tracing::debug!(?document, "settings reloaded"),
            Err(e) => tracing::warn!(?document, "failed to reload settings: {}", e),
        }
    }

    async fn shutdown(&mut self) {
        tracing::info!("shutting down");
        self.cancel_hide_timer();
        self.backend.unbind_all_shortcuts().await;
        self.app_settings.close();
        self.menu_settings.close();
    }
}

/// Fractional pointer deltas are truncated toward zero
fn pointer_delta(value: f64) -> i32 {
    value.trunc() as i32
}
