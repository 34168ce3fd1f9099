mod backend;
mod capture;
mod config;
mod directory;
mod error;
mod identity;
mod overlay;
mod restore;
mod session;
mod settings;
mod store;
#[cfg(test)]
mod testing;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::{
    collections::BTreeSet,
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use crate::backend::{DesktopLauncher, Flatpak, ProcFs};
use crate::overlay::WaylandOverlay;
use crate::session::{Desktop, ListingRow, Session};
use crate::settings::{Settings, SettingsStore};
use crate::store::SnapshotStore;
use crate::types::{AppKey, BackendKind};

/// Pump interval while a preview is on screen.
const PREVIEW_TICK: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "relayout", version, about = "Save and restore window layouts")]
struct Cli {
    /// Window manager to talk to.
    #[arg(long, value_enum)]
    backend: BackendKind,

    /// Directory holding window_positions.json and config.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show open and saved applications.
    List,
    /// Save the position of the given applications, replacing the snapshot.
    Capture {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Put saved applications back, launching the ones that are not running.
    Restore {
        keys: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Show where saved applications will land.
    Preview {
        #[arg(long, default_value_t = config::PREVIEW_SECONDS)]
        seconds: u64,
        keys: Vec<String>,
    },
    /// Change persistent settings.
    Settings {
        #[arg(long)]
        confirm_start: Option<bool>,
    },
    /// Interactive session with a live preview.
    Shell,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data directory {}", data_dir.display()))?;

    let mut settings = SettingsStore::load(data_dir.join(config::SETTINGS_FILE));
    if let Command::Settings { confirm_start } = cli.command {
        return update_settings(&mut settings, confirm_start);
    }

    let wm = backend::window_manager(cli.backend);
    let processes = ProcFs::new();
    let catalog = Flatpak;
    let launcher = DesktopLauncher::new();
    let desktop = Desktop {
        wm: wm.as_ref(),
        processes: &processes,
        catalog: &catalog,
        launcher: &launcher,
    };
    let store = SnapshotStore::open(data_dir.join(config::SNAPSHOT_FILE))?;
    let mut session = Session::new(desktop, store);

    match cli.command {
        Command::List => {
            let rows = session.refresh()?;
            print_listing(&rows);
        }
        Command::Capture { keys } => {
            session.refresh()?;
            session.replace_selection(to_keys(keys))?;
            session.capture()?;
            println!(
                "saved {} applications to {}",
                session.store().snapshot().len(),
                session.store().path().display()
            );
        }
        Command::Restore { keys, yes } => {
            if settings.settings().confirm_start && !yes && !confirm("Restore saved layout?")? {
                info!("restore cancelled");
                return Ok(());
            }
            if session.store().snapshot().is_empty() {
                println!("nothing saved in {}", session.store().path().display());
                return Ok(());
            }
            let keys = to_keys(keys);
            let selected = (!keys.is_empty()).then_some(&keys);
            let report = session.restore(selected, config::SETTLE_INTERVAL, &thread::sleep)?;
            println!("{report}");
            if !report.is_success() {
                return Err(anyhow::anyhow!(
                    "{} applications could not be restored",
                    report.failures().count()
                ));
            }
        }
        Command::Preview { seconds, keys } => {
            session.refresh()?;
            if !keys.is_empty() {
                session.replace_selection(to_keys(keys))?;
            }
            let overlay = WaylandOverlay::connect()?;
            let mut session = session.with_overlay(Box::new(overlay));
            session.redraw_overlay()?;
            let deadline = Instant::now() + Duration::from_secs(seconds);
            while Instant::now() < deadline {
                session.pump_overlay()?;
                thread::sleep(PREVIEW_TICK);
            }
            session.close_overlay()?;
        }
        Command::Shell => run_shell(session, &settings)?,
        Command::Settings { .. } => unreachable!("handled above"),
    }
    Ok(())
}

fn update_settings(store: &mut SettingsStore, confirm_start: Option<bool>) -> Result<()> {
    let mut updated = store.settings().clone();
    if let Some(confirm_start) = confirm_start {
        updated.confirm_start = confirm_start;
        store.update(updated)?;
    }
    let Settings { confirm_start } = store.settings();
    println!("confirm_start = {confirm_start}");
    Ok(())
}

fn to_keys(keys: Vec<String>) -> BTreeSet<AppKey> {
    keys.into_iter().map(AppKey::new).collect()
}

fn print_listing(rows: &[ListingRow]) {
    for row in rows {
        let mark = if row.selected { '*' } else { ' ' };
        let saved = if row.saved { " [Saved]" } else { "" };
        let closed = if row.open { "" } else { " (not running)" };
        println!("{mark} {}{saved}{closed}", row.key);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn run_shell(session: Session<'_>, settings: &SettingsStore) -> Result<()> {
    let mut session = match WaylandOverlay::connect() {
        Ok(overlay) => session.with_overlay(Box::new(overlay)),
        Err(err) => {
            warn!("preview unavailable: {err:#}");
            session
        }
    };
    print_listing(&session.refresh()?);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
        let argument = argument.trim();

        let outcome = match command {
            "" => Ok(()),
            "quit" | "exit" => break,
            "list" => {
                print_listing(&session.listing());
                Ok(())
            }
            "refresh" => session.refresh().map(|rows| print_listing(&rows)),
            "select" => session.select(AppKey::new(argument)).map(|_| ()),
            "deselect" => session.deselect(&AppKey::new(argument)).map(|_| ()),
            "capture" => session.capture().map(|()| println!("saved")),
            "restore" => {
                if settings.settings().confirm_start && !confirm("Restore selected applications?")? {
                    continue;
                }
                let selected = session.selection().clone();
                session
                    .restore(Some(&selected), config::SETTLE_INTERVAL, &thread::sleep)
                    .map(|report| println!("{report}"))
            }
            other => Err(anyhow::anyhow!(
                "unknown command {other:?} (select, deselect, list, refresh, capture, restore, quit)"
            )),
        };
        if let Err(err) = outcome {
            eprintln!("error: {err:#}");
        }
    }
    session.close_overlay()
}
