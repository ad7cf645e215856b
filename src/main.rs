//! Pie Menu Host
//!
//! Starts the platform backend, loads settings and menus, binds the menu
//! shortcuts and runs the show/hide loop. The overlay renderer is attached
//! through stdin/stdout as JSON lines.
//!
//! Flags:
//! - `--config-dir <path>`: read settings from `path` instead of the user config dir
//! - `--display X,Y,W,H`: a monitor rectangle, repeat for each monitor
//! - `--debug`: log at debug level
//! - `--show`: open the first menu right after startup

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

use pie_menu_host::backend::{self, Backend, BackendError};
use pie_menu_host::config::{self, AppSettings, MenuSettings};
use pie_menu_host::logging;
use pie_menu_host::orchestrator::{Document, Orchestrator};
use pie_menu_host::settings::SettingsStore;
use pie_menu_host::surface::{forward_messages, Display, Rect, StdioSurface};

#[derive(Debug, Default)]
struct Options {
    config_dir: Option<PathBuf>,
    displays: Vec<Display>,
    debug: bool,
    show: bool,
}

fn parse_display(id: u32, value: &str) -> anyhow::Result<Display> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid --display {:?}, expected X,Y,W,H", value))?;
    let [x, y, width, height] = parts[..] else {
        bail!("invalid --display {:?}, expected X,Y,W,H", value);
    };
    if width <= 0 || height <= 0 {
        bail!("invalid --display {:?}, size must be positive", value);
    }
    let rect = Rect::new(x, y, width, height);
    Ok(Display {
        id,
        bounds: rect,
        work_area: rect,
    })
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config-dir" => {
                let dir = iter.next().context("--config-dir needs a path")?;
                options.config_dir = Some(PathBuf::from(dir));
            }
            "--display" => {
                let value = iter.next().context("--display needs X,Y,W,H")?;
                let id = options.displays.len() as u32;
                options.displays.push(parse_display(id, value)?);
            }
            "--debug" => options.debug = true,
            "--show" => options.show = true,
            other => bail!("unknown argument {:?}", other),
        }
    }

    if options.displays.is_empty() {
        options.displays.push(parse_display(0, "0,0,1920,1080")?);
    }
    Ok(options)
}

struct Startup {
    backend: Box<dyn Backend>,
    app_settings: SettingsStore<AppSettings>,
    menu_settings: SettingsStore<MenuSettings>,
}

/// Pick the backend, then open the settings documents.
///
/// Without a backend nothing is read or written, so a failed launch leaves
/// no example menu behind.
fn prepare<F>(config_dir: &Path, create_backend: F) -> anyhow::Result<Startup>
where
    F: FnOnce() -> Result<Box<dyn Backend>, BackendError>,
{
    // No backend means no way to place or trigger the menu
    let backend = create_backend().context("no usable backend for this platform")?;

    let app_settings = config::open_app_settings(config_dir);
    let menu_settings = config::open_menu_settings(config_dir).context("failed to load menus")?;

    Ok(Startup {
        backend,
        app_settings,
        menu_settings,
    })
}

async fn run(options: Options, config_dir: PathBuf) -> anyhow::Result<()> {
    let Startup {
        backend,
        app_settings,
        menu_settings,
    } = prepare(&config_dir, backend::create)?;

    let displays = options.displays;
    let orchestrator = Orchestrator::start(
        backend,
        |hint| StdioSurface::stdout(hint, displays),
        app_settings,
        menu_settings,
    )
    .await
    .context("backend initialisation failed")?;

    let handle = orchestrator.handle();

    // Watchers stop when dropped, keep them until the loop ends
    let app_watcher = {
        let handle = handle.clone();
        orchestrator.app_settings().watch(move || {
            handle.reload_settings(Document::App);
        })
    };
    let menu_watcher = {
        let handle = handle.clone();
        orchestrator.menu_settings().watch(move || {
            handle.reload_settings(Document::Menus);
        })
    };
    let _watchers = match (app_watcher, menu_watcher) {
        (Ok(app), Ok(menus)) => Some((app, menus)),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("settings will not reload on external edits: {}", e);
            None
        }
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::spawn(forward_messages(stdin, handle.clone()));

    let quit = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted");
            quit.quit();
        }
    });

    if options.show {
        handle.request_show();
    }

    orchestrator.run().await;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    let config_dir = options.config_dir.clone().unwrap_or_else(config::config_dir);

    let debug = options.debug || {
        let settings = config::open_app_settings(&config_dir);
        settings.get_as::<bool>("debugLogging").unwrap_or(false)
    };
    logging::init(debug);
    tracing::info!("pie-menu-host v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(options, config_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pie-menu-host")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_to_one_full_hd_display() {
        let options = parse_args(&args(&[])).unwrap();
        assert_eq!(options.displays.len(), 1);
        assert_eq!(options.displays[0].work_area, Rect::new(0, 0, 1920, 1080));
        assert!(!options.show);
    }

    #[test]
    fn parses_repeated_displays_and_flags() {
        let options = parse_args(&args(&[
            "--display",
            "0,0,1920,1080",
            "--display",
            "1920,0,2560,1440",
            "--show",
            "--config-dir",
            "/tmp/x",
        ]))
        .unwrap();
        assert_eq!(options.displays.len(), 2);
        assert_eq!(options.displays[1].id, 1);
        assert_eq!(options.displays[1].bounds.x, 1920);
        assert!(options.show);
        assert_eq!(options.config_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn missing_backend_writes_no_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("pie-menu-host");

        let result = prepare(&config_dir, || {
            Err(BackendError::Unsupported("test".to_string()))
        });

        assert!(result.is_err());
        assert!(!config_dir.join(MenuSettings::FILE_NAME).exists());
        assert!(!config_dir.join(AppSettings::FILE_NAME).exists());
        assert!(!config_dir.exists());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&["--display", "1,2,3"])).is_err());
        assert!(parse_args(&args(&["--display", "0,0,0,10"])).is_err());
        assert!(parse_args(&args(&["--display"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
