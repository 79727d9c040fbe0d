//! Durable cursor storage.
//!
//! The checkpoint is a text file holding the decimal count of characters
//! already typed. Writes go to a sibling temp file which is then renamed
//! over the checkpoint, so a reader sees either the old or the new value.
//! Anything unreadable loads as zero: a damaged checkpoint means "start
//! over", never a failed run.

use crate::error::{Result, TeleTypeError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    pub fn save(&self, cursor: usize) -> Result<()> {
        let tmp = self.temp_path();
        fs::write(&tmp, cursor.to_string())
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| TeleTypeError::checkpoint(self.path.display().to_string(), e))
    }

    /// Stored cursor, or 0 when the file is missing, empty or not a number.
    pub fn load(&self) -> usize {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable checkpoint, starting over");
                return 0;
            }
        };

        match content.trim().parse::<usize>() {
            Ok(cursor) => {
                debug!(path = %self.path.display(), cursor, "loaded checkpoint");
                cursor
            }
            Err(_) => {
                if !content.trim().is_empty() {
                    warn!(path = %self.path.display(), "corrupt checkpoint, starting over");
                }
                0
            }
        }
    }

    /// Like `load`, but a cursor past the end of the payload counts as corrupt.
    pub fn load_within(&self, len: usize) -> usize {
        let cursor = self.load();
        if cursor > len {
            warn!(
                path = %self.path.display(),
                cursor,
                len,
                "checkpoint is beyond the payload, starting over"
            );
            return 0;
        }
        cursor
    }

    pub fn clear(&self) -> Result<()> {
        for path in [self.path.clone(), self.temp_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(TeleTypeError::checkpoint(path.display().to_string(), e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("input.bin.offset"))
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for cursor in [0, 1, 10, 4096, 123_456_789] {
            store.save(cursor).unwrap();
            assert_eq!(store.load(), cursor);
        }
    }

    #[test]
    fn test_missing_loads_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store(&dir).load(), 0);
    }

    #[test]
    fn test_garbage_loads_zero() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for content in ["", "   ", "abc", "-3", "12abc", "1.5"] {
            fs::write(store.path(), content).unwrap();
            assert_eq!(store.load(), 0, "content {content:?}");
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path(), "42\n").unwrap();
        assert_eq!(store.load(), 42);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(7).unwrap();
        assert!(!store.temp_path().exists());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "7");
    }

    #[test]
    fn test_load_within_rejects_overshoot() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(12).unwrap();
        assert_eq!(store.load_within(12), 12);
        assert_eq!(store.load_within(11), 0);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(3).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("nope").join("x.offset"));
        assert!(matches!(store.save(1), Err(TeleTypeError::Checkpoint { .. })));
    }
}
