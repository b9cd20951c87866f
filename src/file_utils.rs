use anyhow::Result;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// File name the discovery walk looks for
pub const LOCALIZATION_FILE_NAME: &str = "Localization.txt";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }
}

/// Recursively collect localization files under `root`.
///
/// A file path passed directly is returned as-is if it exists. Already
/// translated outputs (`*.translated.txt`) are never picked up.
pub fn find_localization_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            // Translated outputs carry the .translated. marker and so
            // never match the exact discovery name
            entry.file_name().to_string_lossy() == LOCALIZATION_FILE_NAME
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("[FILES] Found {} localization files under {}", files.len(), root.display());
    files
}
