use std::path::PathBuf;
use thiserror::Error;

/// No usable encoding was found for a payload.
///
/// Callers treat this as "this payload has no text", never as a reason to
/// stop the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no usable encoding for payload (declared charset: {declared:?})")]
pub struct DecodeFailure {
    pub declared: Option<String>,
}

/// A folder-list line that does not have the `(flags) "delimiter" name` shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed folder list line: {line:?}")]
pub struct FolderParseError {
    pub line: String,
}

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mailbox protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    FolderList(#[from] FolderParseError),
}

/// A message that cannot be parsed at all. Skipped, never fatal.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Parse(#[from] mailparse::MailParseError),
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CorpusError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.into(),
            source,
        }
    }
}
