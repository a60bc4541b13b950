use std::path::{Path, PathBuf};

use imgrepo_core::{RepoError, Result};
use regex::Regex;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Walk `dirs` recursively and return the regular files whose path matches
/// `pattern`, sorted. Symlinks are not followed.
pub fn find_files<P: AsRef<Path>>(pattern: &Regex, dirs: &[P]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|e| walk_error(dir, e))?;
            if is_match(&entry, pattern) {
                found.push(entry.into_path());
            }
        }
    }
    found.sort();
    found.dedup();
    debug!(pattern = %pattern, matches = found.len(), "file search finished");
    Ok(found)
}

fn is_match(entry: &DirEntry, pattern: &Regex) -> bool {
    entry.file_type().is_file() && pattern.is_match(&entry.path().to_string_lossy())
}

fn walk_error(root: &Path, err: walkdir::Error) -> RepoError {
    let at = err.path().unwrap_or(root).display().to_string();
    RepoError::Validation(format!("cannot read directory {at}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn finds_matching_files_recursively() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join("top.png"), b"1").unwrap();
        fs::write(nested.join("deep.png"), b"2").unwrap();
        fs::write(nested.join("notes.txt"), b"3").unwrap();
        fs::create_dir(root.path().join("dir.png")).unwrap();

        let pattern = Regex::new(r"\.png$").unwrap();
        let found = find_files(&pattern, &[root.path()]).unwrap();

        assert_eq!(found, vec![nested.join("deep.png"), root.path().join("top.png")]);
    }

    #[test]
    fn overlapping_roots_are_deduplicated() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("one.jpg"), b"1").unwrap();

        let pattern = Regex::new(r"\.jpg$").unwrap();
        let found = find_files(&pattern, &[root.path(), nested.as_path()]).unwrap();

        assert_eq!(found, vec![nested.join("one.jpg")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("hidden.png"), b"1").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let pattern = Regex::new(r"\.png$").unwrap();
        let found = find_files(&pattern, &[root.path()]).unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn missing_directory_is_a_validation_error() {
        let pattern = Regex::new(".*").unwrap();
        let err = find_files(&pattern, &["/definitely/not/here"]).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
