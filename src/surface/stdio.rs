//! JSON-lines surface
//!
//! Lets an external renderer act as the presentation surface: every command
//! is written as one JSON object per line, and every line the renderer
//! writes back is parsed as a [`SurfaceMessage`].

use serde::Serialize;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::{Display, Point, Rect, Surface, SurfaceMessage};
use crate::backend::WindowTypeHint;
use crate::menu::MenuNode;
use crate::orchestrator::OrchestratorHandle;

/// Lines written to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceCommand<'a> {
    WindowType { hint: WindowTypeHint },
    SetBounds { bounds: Rect },
    ShowMenu { root: &'a MenuNode, position: Point },
    Show,
    Hide,
    Focus,
    ShowDevTools,
}

pub struct StdioSurface<W: Write> {
    out: W,
    displays: Vec<Display>,
    visible: bool,
}

impl StdioSurface<io::Stdout> {
    /// Surface writing to this process's stdout
    pub fn stdout(hint: WindowTypeHint, displays: Vec<Display>) -> Self {
        Self::new(io::stdout(), hint, displays)
    }
}

impl<W: Write> StdioSurface<W> {
    pub fn new(out: W, hint: WindowTypeHint, displays: Vec<Display>) -> Self {
        let mut surface = Self {
            out,
            displays,
            visible: false,
        };
        surface.emit(&SurfaceCommand::WindowType { hint });
        surface
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn emit(&mut self, command: &SurfaceCommand<'_>) {
        let result = serde_json::to_string(command)
            .map_err(io::Error::from)
            .and_then(|line| {
                writeln!(self.out, "{}", line)?;
                self.out.flush()
            });
        if let Err(e) = result {
            tracing::error!("failed to write surface command: {}", e);
        }
    }
}

impl<W: Write> Surface for StdioSurface<W> {
    fn displays(&self) -> Vec<Display> {
        self.displays.clone()
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.emit(&SurfaceCommand::SetBounds { bounds });
    }

    fn show_menu(&mut self, root: &MenuNode, position: Point) {
        self.emit(&SurfaceCommand::ShowMenu { root, position });
    }

    fn show(&mut self) {
        self.visible = true;
        self.emit(&SurfaceCommand::Show);
    }

    fn hide(&mut self) {
        self.visible = false;
        self.emit(&SurfaceCommand::Hide);
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn focus(&mut self) {
        if self.visible {
            self.emit(&SurfaceCommand::Focus);
        }
    }

    fn open_dev_tools(&mut self) {
        self.emit(&SurfaceCommand::ShowDevTools);
    }
}

/// Read renderer messages line by line and post them to the orchestrator.
///
/// Malformed lines are logged and skipped. When the renderer closes its end
/// the orchestrator is asked to quit.
pub async fn forward_messages<R>(reader: R, handle: OrchestratorHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<SurfaceMessage>(line) {
                    Ok(message) => {
                        if !handle.post(message) {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("ignoring malformed surface message {:?}: {}", line, e)
                    }
                }
            }
            Ok(None) => {
                tracing::info!("surface closed its channel, shutting down");
                handle.quit();
                return;
            }
            Err(e) => {
                tracing::error!("reading surface messages failed: {}", e);
                handle.quit();
                return;
            }
        }
    }
}
