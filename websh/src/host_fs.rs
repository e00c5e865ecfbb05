//! Host filesystem access for scripts and the command loop.
//!
//! Every path a script names is resolved against the shell's working
//! directory. There is no sandboxing: absolute paths and `..` are honored.

use crate::bridge::BridgedValue;
use indexmap::IndexMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One `{isFile, isDirectory, name}` record handed to scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub is_file: bool,
    pub is_directory: bool,
    pub name: String,
}

impl EntryDescriptor {
    /// A file entry that was named rather than found; nothing is checked.
    pub fn synthetic_file(name: impl Into<String>) -> Self {
        Self {
            is_file: true,
            is_directory: false,
            name: name.into(),
        }
    }

    fn from_dir_entry(entry: &fs::DirEntry) -> Self {
        let (is_file, is_directory) = entry
            .file_type()
            .map_or((false, false), |ft| (ft.is_file(), ft.is_dir()));
        Self {
            is_file,
            is_directory,
            name: entry.file_name().to_string_lossy().into_owned(),
        }
    }
}

impl From<EntryDescriptor> for BridgedValue {
    fn from(entry: EntryDescriptor) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("isFile".to_string(), BridgedValue::Bool(entry.is_file));
        fields.insert("isDirectory".to_string(), BridgedValue::Bool(entry.is_directory));
        fields.insert("name".to_string(), BridgedValue::String(entry.name));
        BridgedValue::Record(fields)
    }
}

#[derive(Debug, Clone)]
pub struct HostFs {
    root: PathBuf,
}

impl HostFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// List the working directory in native iteration order.
    ///
    /// A directory that cannot be opened lists as empty. Symlinks are
    /// reported by their own type, so they are neither file nor directory.
    pub fn list_entries(&self) -> Vec<EntryDescriptor> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "directory open failed, listing as empty");
                return Vec::new();
            }
        };

        dir.filter_map(|entry| match entry {
            Ok(entry) => Some(EntryDescriptor::from_dir_entry(&entry)),
            Err(e) => {
                debug!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .collect()
    }

    /// Read a whole file as text. Invalid UTF-8 is replaced, not rejected.
    pub fn read_text(&self, name: &str) -> io::Result<String> {
        let bytes = fs::read(self.resolve(name))?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Load the source of the script backing `command`.
    ///
    /// `None` means there is no such script: the caller reports it as an
    /// unknown command.
    pub fn read_script(&self, command: &str, extension: &str) -> Option<String> {
        let file_name = format!("{command}.{extension}");
        match self.read_text(&file_name) {
            Ok(source) => Some(source),
            Err(e) => {
                debug!(script = %file_name, error = %e, "script not loadable");
                None
            }
        }
    }
}
