use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the per-project (or per-user) data directory
pub const DATA_DIR_NAME: &str = ".tracker-helper";

/// Data directory for `cwd`: the nearest `.tracker-helper/` in `cwd` or above,
/// else `.tracker-helper/` under `home`.
pub fn resolve_data_dir(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .find(|candidate| candidate.is_dir())
        .or_else(|| home.map(|home| home.join(DATA_DIR_NAME)))
}

/// Data directory for the current process
pub fn get_data_dir() -> Result<PathBuf> {
    let cwd = env::current_dir().context("Could not determine current directory")?;
    resolve_data_dir(&cwd, dirs::home_dir().as_deref())
        .context("Could not determine home directory")
}

/// Resolve the data directory and create it when missing
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    Ok(dir)
}

/// Create a project-local data directory in the working directory
pub fn init_local_data_dir() -> Result<PathBuf> {
    let cwd = env::current_dir().context("Could not determine current directory")?;
    create_data_dir_in(&cwd)
}

/// Create `<parent>/.tracker-helper`, failing if it is already there
fn create_data_dir_in(parent: &Path) -> Result<PathBuf> {
    let data_dir = parent.join(DATA_DIR_NAME);
    match fs::create_dir(&data_dir) {
        Ok(()) => Ok(data_dir),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            anyhow::bail!("Data directory already exists: {}", data_dir.display())
        }
        Err(e) => Err(e)
            .with_context(|| format!("Failed to create directory: {}", data_dir.display())),
    }
}

/// Path to config.json inside `dir`
pub fn config_file(dir: &Path) -> PathBuf {
    dir.join("config.json")
}

/// Path to the log file inside `dir`
pub fn log_file(dir: &Path) -> PathBuf {
    dir.join("tracker-helper.log")
}

/// Atomically write content to a file using temp file + rename
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .context("File path has no parent directory")?;

    let mut temp_file = NamedTempFile::new_in(dir)
        .context("Failed to create temporary file")?;

    temp_file
        .write_all(content.as_bytes())
        .context("Failed to write to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to sync temporary file")?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file: {}", path.display()))?;

    Ok(())
}

/// Read file content, `None` if the file doesn't exist
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Remove a file if present
pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(())
}
