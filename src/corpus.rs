use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::CorpusError;
use crate::mail_reader::message::Message;

pub const DEFAULT_MIN_MESSAGES: usize = 10;

/// Run-wide file name allocator. Passed into each write and handed back
/// advanced, so documents are numbered uniquely across all categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentCounter(u64);

impl DocumentCounter {
    pub fn value(self) -> u64 {
        self.0
    }

    fn allocate(self) -> (u64, Self) {
        (self.0, DocumentCounter(self.0 + 1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Fewer messages than the threshold; nothing written.
    TooFew { found: usize },
    Written { directory: PathBuf, files: usize },
}

/// Directory name for a folder: separators become `__`, spaces `_`.
pub fn category_directory_name(folder: &str) -> String {
    folder
        .replace(['/', '\\'], "__")
        .replace(' ', "_")
}

fn document_bytes(message: &Message) -> Vec<u8> {
    let mut content = Vec::with_capacity(message.subject.len() + message.body.len());
    content.extend_from_slice(message.subject.as_bytes());
    if let Some(to) = &message.to {
        content.extend_from_slice(to.as_bytes());
    }
    if let Some(from) = &message.from {
        content.extend_from_slice(from.as_bytes());
    }
    content.extend_from_slice(message.body.as_bytes());
    content
}

fn write_document(path: &Path, message: &Message) -> Result<(), CorpusError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| CorpusError::io(path, e))?;
    file.write_all(&document_bytes(message))
        .map_err(|e| CorpusError::io(path, e))
}

/// Lays messages out as `root/<category>/<number>`.
#[derive(Debug, Clone)]
pub struct CorpusWriter {
    root: PathBuf,
    min_messages: usize,
}

impl CorpusWriter {
    pub fn new(root: impl Into<PathBuf>, min_messages: usize) -> Self {
        CorpusWriter {
            root: root.into(),
            min_messages,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn min_messages(&self) -> usize {
        self.min_messages
    }

    pub fn category_path(&self, folder: &str) -> PathBuf {
        self.root.join(category_directory_name(folder))
    }

    pub fn write(
        &self,
        folder: &str,
        messages: &[Message],
        counter: DocumentCounter,
    ) -> Result<(DocumentCounter, CategoryOutcome), CorpusError> {
        if messages.len() < self.min_messages {
            return Ok((
                counter,
                CategoryOutcome::TooFew {
                    found: messages.len(),
                },
            ));
        }

        let directory = self.category_path(folder);
        fs::create_dir_all(&directory).map_err(|e| CorpusError::io(&directory, e))?;

        let mut counter = counter;
        for message in messages {
            let (number, next) = counter.allocate();
            write_document(&directory.join(number.to_string()), message)?;
            debug!("{} -> {}", message.subject, number);
            counter = next;
        }

        Ok((
            counter,
            CategoryOutcome::Written {
                directory,
                files: messages.len(),
            },
        ))
    }
}
