// =============================================================================
// history.rs - Historique des couleurs récentes et stockage durable
// history.rs - Recent-color history and durable storage
// =============================================================================
//
// Liste bornée de "#RRGGBB", la plus récente en premier, sans doublons.
// Chaque appel relit et réécrit le stockage : plusieurs `HistoryStore`
// partageant un backend voient la même liste.
// Bounded list of "#RRGGBB", most recent first, without duplicates.
// Every call reads and writes the store: several `HistoryStore` values
// sharing one backend see the same list.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::color::normalize_hex;
use crate::config;
use crate::error::{ColorError, StorageError, StorageResult};

// =============================================================================
// BACKENDS DE STOCKAGE
// STORAGE BACKENDS
// =============================================================================

/// Stockage clé/valeur durable utilisé par l'historique
/// Key/value durable storage used by the history
pub trait StorageBackend: Send + Sync {
    /// Valeur brute sous `key`, `None` si absente
    /// Raw value under `key`, `None` when absent
    fn read(&self, key: &str) -> StorageResult<Option<String>>;
    /// Remplace la valeur sous `key`
    /// Replaces the value under `key`
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Supprime la valeur sous `key` (sans effet si absente)
    /// Removes the value under `key` (no-op when absent)
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Backend en mémoire, pour les tests et en repli
/// In-memory backend, for tests and as a fallback
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// Backend fichier : un `<key>.json` par clé dans un dossier
/// File backend: one `<key>.json` per key inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backend dans le dossier de données de la plateforme (`<data_dir>/cca`)
    /// Backend in the platform data directory (`<data_dir>/cca`)
    pub fn in_app_data_dir() -> Self {
        let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(config::APP_DATA_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path)?;
        debug!(?path, "Loaded storage record");
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            info!(dir = ?self.dir, "Created storage directory");
        }
        let path = self.path_for(key);
        fs::write(&path, value)?;
        debug!(?path, "Saved storage record");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// =============================================================================
// HISTORIQUE
// HISTORY STORE
// =============================================================================

/// Historique borné, dédoublonné, le plus récent en premier
/// Bounded, deduplicated, most-recent-first color history
pub struct HistoryStore<B: StorageBackend> {
    backend: B,
    key: String,
    capacity: usize,
}

impl<B: StorageBackend> HistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, config::HISTORY_STORAGE_KEY, config::HISTORY_CAPACITY)
    }

    pub fn with_settings(backend: B, key: impl Into<String>, capacity: usize) -> Self {
        Self { backend, key: key.into(), capacity }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Place `hex` en tête et persiste la liste
    /// Moves `hex` to the front and persists the list
    ///
    /// Seule une couleur invalide est une erreur ; les échecs de stockage
    /// sont journalisés et ignorés.
    /// A malformed color is the only error; storage failures are logged
    /// and swallowed.
    pub fn add(&self, hex: &str) -> Result<Vec<String>, ColorError> {
        let hex = normalize_hex(hex)?;

        let mut colors = self.list();
        colors.retain(|existing| !existing.eq_ignore_ascii_case(&hex));
        colors.insert(0, hex);
        colors.truncate(self.capacity);

        if let Err(e) = self.save(&colors) {
            warn!(error = %e, "History persistence unavailable, keeping going");
        }
        Ok(colors)
    }

    /// Copie de l'historique, le plus récent en premier
    /// Snapshot of the history, most recent first
    pub fn list(&self) -> Vec<String> {
        match self.load() {
            Ok(colors) => colors,
            Err(e) => {
                warn!(error = %e, "Unreadable color history, treating it as empty");
                Vec::new()
            }
        }
    }

    /// Vide l'enregistrement durable
    /// Empties the durable record
    pub fn clear(&self) {
        match self.backend.remove(&self.key) {
            Ok(()) => info!("Cleared color history"),
            Err(e) => warn!(error = %e, "Failed to clear color history"),
        }
    }

    fn load(&self) -> StorageResult<Vec<String>> {
        let Some(raw) = self.backend.read(&self.key)? else {
            return Ok(Vec::new());
        };
        let stored: Vec<String> = serde_json::from_str(&raw)?;

        let mut colors: Vec<String> = Vec::with_capacity(stored.len());
        for entry in &stored {
            let hex = normalize_hex(entry)
                .map_err(|e| StorageError::Unavailable(format!("malformed history entry: {e}")))?;
            if !colors.contains(&hex) {
                colors.push(hex);
            }
        }
        colors.truncate(self.capacity);
        Ok(colors)
    }

    fn save(&self, colors: &[String]) -> StorageResult<()> {
        let json = serde_json::to_string(colors)?;
        self.backend.write(&self.key, &json)
    }
}

// =============================================================================
// TESTS
// =============================================================================
