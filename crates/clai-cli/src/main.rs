mod admin;
mod dispatch;
mod handoff;
mod logging;
mod ui;

use std::io;
use std::io::BufRead;
use std::io::Write;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use clai_core::AppPaths;
use clai_core::Config;
use clai_core::HistoryStore;
use clai_exec::CommandModel;
use clai_exec::OpenAiModel;
use clai_exec::ShellExecutor;
use clai_exec::SystemClipboard;

use crate::dispatch::EffectDispatcher;
use crate::dispatch::Services;

/// Turn a plain-language request into a shell command.
#[derive(Debug, Parser)]
#[command(name = "clai", version, about)]
struct Cli {
    /// Show where configuration and history are stored, then exit.
    #[arg(long)]
    configs: bool,

    /// Delete all saved queries after confirmation, then exit.
    #[arg(long = "clear-store")]
    clear_store: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = AppPaths::discover()?;
    paths.ensure_dir()?;
    let _log_guard = logging::init(&paths)?;

    if run_admin(&cli, &paths, &mut io::stdin().lock(), &mut io::stdout().lock())? {
        return Ok(());
    }

    let config = Config::load(&paths.config_file())?;
    let store = HistoryStore::new(paths.history_file());

    let model = OpenAiModel::new(
        &config.model.name,
        &config.model.base_url,
        &config.model.api_key_env,
    )?;
    tracing::info!(
        model = model.name(),
        shell = %config.shell.program,
        history = %store.path().display(),
        "starting session"
    );

    // The copied selection is released only after the output is printed.
    let clipboard = Arc::new(SystemClipboard::new());
    let (results_tx, results_rx) = mpsc::channel();
    let dispatcher = EffectDispatcher::new(
        results_tx,
        Services {
            model: Arc::new(model),
            shell: Arc::new(ShellExecutor::new(config.shell.program.clone())),
            clipboard: clipboard.clone(),
        },
        store,
    )?;

    let (handoff_tx, handoff_rx) = handoff::channel();
    let ui_thread = thread::Builder::new()
        .name("clai-ui".to_string())
        .spawn(move || ui::run(dispatcher, results_rx, handoff_tx))?;

    // The loop restores the terminal before handing off, so the output lands
    // on the normal screen buffer.
    match handoff_rx.recv() {
        Ok(output) => {
            if ui_thread.join().is_err() {
                tracing::warn!("ui thread panicked after handoff");
            }
            println!("{output}");
            drop(clipboard);
            Ok(())
        }
        Err(_) => match ui_thread.join() {
            Ok(Ok(())) => Err("session ended without output".into()),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "interactive session failed");
                Err(err.into())
            }
            Err(_) => Err("interactive session panicked".into()),
        },
    }
}

/// Runs the requested maintenance action, if any, and reports whether one ran.
/// A malformed config file does not block either action.
fn run_admin(
    cli: &Cli,
    paths: &AppPaths,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<bool> {
    if cli.configs {
        let config = Config::load(&paths.config_file());
        admin::print_configs(paths, &config, out)?;
        return Ok(true);
    }
    if cli.clear_store {
        let store = HistoryStore::new(paths.history_file());
        admin::clear_store(&store, input, out)?;
        return Ok(true);
    }
    Ok(false)
}
