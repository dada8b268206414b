//! Where docchat keeps its own files (currently just `config.toml`).
//!
//! Documents are read from wherever the user points us; nothing derived from them
//! is written here.

use std::path::PathBuf;

/// Returns the directory where docchat stores config.
/// On Linux: `~/.local/share/docchat/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "docchat", "docchat")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
