//! Line-oriented text files.
//!
//! A [`TextFile`] reads the whole file into memory on open and only touches
//! the disk again on [`TextFile::save`]. Edits work on line indexes; an index
//! past the end is ignored or reported as `None`, never an error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read '{path}': {message}")]
    ReadFailed { path: String, message: String },

    #[error("Failed to write '{path}': {message}")]
    WriteFailed { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    path: PathBuf,
    lines: Vec<String>,
    cursor: usize,
}

impl TextFile {
    /// Read `path`. A file that does not exist opens empty and is created by
    /// the first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        let lines = match fs::read_to_string(&path) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{} does not exist, opening empty", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(FileError::ReadFailed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        Ok(Self {
            path,
            lines,
            cursor: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every line, without line terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// The line under the cursor, moving the cursor forward.
    pub fn next_line(&mut self) -> Option<&str> {
        let index = self.cursor;
        if index >= self.lines.len() {
            return None;
        }
        self.cursor += 1;
        self.line(index)
    }

    /// Move the cursor back to the first line.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Insert `line` before `index`, or append it when `index` is `None` or
    /// past the end.
    pub fn insert_line(&mut self, line: impl Into<String>, index: Option<usize>) {
        let index = index.unwrap_or(self.lines.len()).min(self.lines.len());
        self.lines.insert(index, line.into());
    }

    /// Replace the line at `index`. Returns `false` when there is none.
    pub fn replace_line(&mut self, index: usize, line: impl Into<String>) -> bool {
        match self.lines.get_mut(index) {
            Some(slot) => {
                *slot = line.into();
                true
            }
            None => false,
        }
    }

    /// Remove and return the line at `index`.
    pub fn delete_line(&mut self, index: usize) -> Option<String> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.cursor = 0;
    }

    /// Write every line back to disk, each followed by a newline.
    pub fn save(&self) -> Result<(), FileError> {
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(&self.path, content).map_err(|e| FileError::WriteFailed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}
