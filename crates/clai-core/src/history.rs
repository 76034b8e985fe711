use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub const HISTORY_FILE_NAME: &str = "store.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub created_at: DateTime<Utc>,
    pub prompt_text: String,
    pub response_code: String,
    #[serde(default)]
    pub response_explanation: String,
}

impl HistoryEntry {
    pub fn new(
        created_at: DateTime<Utc>,
        prompt_text: impl Into<String>,
        response_code: impl Into<String>,
    ) -> Self {
        Self {
            created_at,
            prompt_text: prompt_text.into(),
            response_code: response_code.into(),
            response_explanation: String::new(),
        }
    }
}

/// Whole-file JSON store of past interactions, oldest entry first on disk.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(HISTORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every entry in append order. A missing file is an empty store.
    pub fn load(&self) -> std::io::Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice::<Vec<HistoryEntry>>(&bytes)
            .map_err(|err| std::io::Error::other(format!("parse history: {err}")))
    }

    /// Entries for display, most recent first. Unreadable history is empty history.
    pub fn load_newest_first(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Ok(mut entries) => {
                entries.reverse();
                entries
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "history unreadable, showing none");
                Vec::new()
            }
        }
    }

    pub fn save(&self, entries: &[HistoryEntry]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_vec_pretty(entries)
            .map_err(|err| std::io::Error::other(format!("serialize history: {err}")))?;
        std::fs::write(&self.path, encoded)
    }

    pub fn append(&self, entry: HistoryEntry) -> std::io::Result<()> {
        let mut entries = self.load()?;
        entries.push(entry);
        self.save(&entries)
    }

    /// Back-fills the explanation of the most recent entry. Returns false when
    /// the store is empty.
    pub fn patch_last_explanation(&self, explanation: &str) -> std::io::Result<bool> {
        let mut entries = self.load()?;
        let Some(last) = entries.last_mut() else {
            return Ok(false);
        };
        last.response_explanation = explanation.to_string();
        self.save(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }
}
