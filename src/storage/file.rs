use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::{Result, TrackerError};

use super::KeyValueStore;

/// Stores each key as `{root}/{key}.json`.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of `key`.
    ///
    /// Characters that are unsafe in file names, and `%` itself, are written
    /// as `%XX` per UTF-8 byte, so distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for c in key.chars() {
            if needs_escape(c) {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    file_name.push_str(&format!("%{byte:02X}"));
                }
            } else {
                file_name.push(c);
            }
        }
        self.root.join(format!("{file_name}.json"))
    }
}

fn needs_escape(c: char) -> bool {
    matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            TrackerError::Io(format!(
                "Failed to create data directory '{}': {}",
                self.root.display(),
                e
            ))
        })?;

        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(value.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(self.path_for(key))
            .map_err(|e| TrackerError::Io(format!("Failed to replace '{key}': {}", e.error)))?;
        Ok(())
    }
}
