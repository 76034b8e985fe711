//! Non-interactive maintenance commands.

use std::io;
use std::io::BufRead;
use std::io::Write;

use clai_core::AppPaths;
use clai_core::Config;
use clai_core::ConfigError;
use clai_core::HistoryStore;

/// A broken config file is reported here rather than treated as fatal.
pub fn print_configs(
    paths: &AppPaths,
    config: &Result<Config, ConfigError>,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Config directory: {}", paths.dir.display())?;
    writeln!(out, "Config file:      {}", paths.config_file().display())?;
    writeln!(out, "History file:     {}", paths.history_file().display())?;
    writeln!(out, "Log file:         {}", paths.log_file().display())?;

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            writeln!(out, "Config error:     {err}")?;
            return Ok(());
        }
    };
    let key_state = match std::env::var(&config.model.api_key_env) {
        Ok(value) if !value.trim().is_empty() => "set",
        _ => "not set",
    };
    writeln!(out, "Model:            {}", config.model.name)?;
    writeln!(out, "Shell:            {}", config.shell.program)?;
    writeln!(out, "{}: {key_state}", config.model.api_key_env)?;
    Ok(())
}

/// Asks before deleting the history file. Returns whether it was cleared.
pub fn clear_store(
    store: &HistoryStore,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<bool> {
    write!(
        out,
        "Delete all past queries in {}? [y/N] ",
        store.path().display()
    )?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if !matches!(answer.trim(), "y" | "Y" | "yes") {
        writeln!(out, "Aborted.")?;
        return Ok(false);
    }

    match store.clear() {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    tracing::info!(path = %store.path().display(), "history cleared");
    writeln!(out, "History cleared.")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use clai_core::HistoryEntry;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn seeded_store(dir: &std::path::Path) -> HistoryStore {
        let store = HistoryStore::in_dir(dir);
        store
            .append(HistoryEntry::new(Utc::now(), "list files", "ls"))
            .expect("append");
        store
    }

    #[test]
    fn configs_lists_every_location() {
        let dir = tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path());
        let mut config = Config::default();
        config.model.api_key_env = "CLAI_TEST_KEY_FOR_CONFIGS".to_string();
        let mut out = Vec::new();

        print_configs(&paths, &Ok(config), &mut out).expect("print");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains(&paths.log_file().display().to_string()));
        assert!(text.contains(&paths.config_file().display().to_string()));
        assert!(text.contains(&paths.history_file().display().to_string()));
        assert!(text.contains("CLAI_TEST_KEY_FOR_CONFIGS: not set"));
    }

    #[test]
    fn confirmed_clear_removes_history() {
        let dir = tempdir().expect("tempdir");
        let store = seeded_store(dir.path());
        let mut out = Vec::new();

        let cleared = clear_store(&store, &mut "y\n".as_bytes(), &mut out).expect("clear");

        assert!(cleared);
        assert!(!store.path().exists());
    }

    #[test]
    fn anything_but_yes_aborts() {
        let dir = tempdir().expect("tempdir");
        let store = seeded_store(dir.path());
        let mut out = Vec::new();

        let cleared = clear_store(&store, &mut "\n".as_bytes(), &mut out).expect("clear");

        assert!(!cleared);
        assert_eq!(store.load().expect("load").len(), 1);
        assert!(String::from_utf8(out).expect("utf8").ends_with("Aborted.\n"));
    }

    #[test]
    fn clearing_missing_store_is_fine() {
        let dir = tempdir().expect("tempdir");
        let store = HistoryStore::in_dir(dir.path());
        let mut out = Vec::new();

        assert!(clear_store(&store, &mut "yes\n".as_bytes(), &mut out).expect("clear"));
    }
}
