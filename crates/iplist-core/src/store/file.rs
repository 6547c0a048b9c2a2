// # File Config Source
//
// Loads the app catalog from a local JSON file, with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: `write_atomically` writes a unique temp file, then renames it
// - Automatic backup: the previous copy is kept as `.backup`
// - Recovery: a corrupt catalog falls back to the backup, which is then
//   restored over the corrupt file

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

use crate::catalog::AppCatalog;
use crate::error::{Error, Result};
use crate::traits::ConfigSource;

/// Catalog stored in a local JSON file
///
/// # Example
///
/// ```rust,no_run
/// use iplist_core::store::FileConfigSource;
/// use iplist_core::traits::ConfigSource;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = FileConfigSource::new("iplist_config/config.json");
///     let catalog = source.load().await?;
///     println!("{} apps", catalog.apps.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the catalog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a local copy exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the catalog with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main file
    /// 2. If it does not parse, try the backup and restore it
    /// 3. If the backup fails too, report the original error
    async fn load_with_recovery(&self) -> Result<AppCatalog> {
        let err = match read_catalog(&self.path).await {
            Ok(catalog) => {
                tracing::debug!(
                    "Loaded catalog from {}: {} apps",
                    self.path.display(),
                    catalog.apps.len()
                );
                return Ok(catalog);
            }
            Err(e @ Error::Config(_)) => e,
            Err(e) => return Err(e),
        };

        let backup = backup_path(&self.path);
        if !backup.exists() {
            tracing::warn!("Catalog {} is invalid and has no backup", self.path.display());
            return Err(err);
        }

        tracing::warn!("Catalog appears corrupted: {}. Attempting recovery from backup.", err);
        match read_catalog(&backup).await {
            Ok(catalog) => {
                if let Err(restore_err) = fs::copy(&backup, &self.path).await {
                    tracing::error!("Failed to restore catalog from backup: {}", restore_err);
                } else {
                    tracing::info!("Restored catalog {} from backup", self.path.display());
                }
                Ok(catalog)
            }
            Err(backup_err) => {
                tracing::error!("Backup also invalid: {}", backup_err);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<AppCatalog> {
        self.load_with_recovery().await
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

async fn read_catalog(path: &Path) -> Result<AppCatalog> {
    let bytes = fs::read(path).await.map_err(|e| {
        Error::config_load(format!("Failed to read catalog {}: {}", path.display(), e))
    })?;
    AppCatalog::from_slice(&bytes)
}

/// Write `bytes` to `path`, replacing any previous copy atomically
///
/// Parent directories are created as needed. The previous copy (if any)
/// is kept next to the file with a `.backup` extension. Every write goes
/// through its own temp file in the target directory, so concurrent writers
/// of the same path never see each other's partial data.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || replace_file(&target, &bytes))
        .await
        .map_err(|e| {
            io_error(
                format!("Write of {} was interrupted", path.display()),
                std::io::Error::other(e),
            )
        })?
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| io_error(format!("Failed to create directory {}", dir.display()), e))?;

    if path.exists() {
        if let Err(e) = copy_replacing(&dir, path, &backup_path(path)) {
            tracing::warn!("Failed to create backup of {}: {}", path.display(), e);
        }
    }

    let mut temp = NamedTempFile::new_in(&dir)
        .map_err(|e| io_error(format!("Failed to create temp file in {}", dir.display()), e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| io_error(format!("Failed to write {}", temp.path().display()), e))?;
    temp.persist(path)
        .map_err(|e| io_error(format!("Failed to replace {}", path.display()), e.error))?;

    tracing::trace!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Copy `from` over `to` through a temp file in `dir`
fn copy_replacing(dir: &Path, from: &Path, to: &Path) -> std::io::Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    let mut source = std::fs::File::open(from)?;
    std::io::copy(&mut source, temp.as_file_mut())?;
    temp.persist(to).map_err(|e| e.error)?;
    Ok(())
}

fn io_error(context: String, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", context, e)))
}

/// Path of the backup kept next to `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.to_path_buf();
    backup.set_extension("backup");
    backup
}
