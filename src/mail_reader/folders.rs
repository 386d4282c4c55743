use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::error::{FolderParseError, MailboxError};
use crate::mail_reader::mailbox::Mailbox;

const NO_CHILDREN: &str = "\\HasNoChildren";

static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\((?P<flags>[^)]*)\) (?:"(?P<delimiter>\\.|[^"\\])"|NIL) (?P<name>.+)$"#)
        .expect("folder list pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Name as the server knows it, used to select the folder.
    pub name: String,
    /// Name decoded from modified UTF-7.
    pub display_name: String,
    pub flags: BTreeSet<String>,
    pub delimiter: Option<char>,
}

impl Folder {
    /// A leaf has exactly the "no children" marker and nothing else.
    pub fn is_leaf(&self) -> bool {
        self.flags.len() == 1
            && self
                .flags
                .iter()
                .all(|flag| flag.eq_ignore_ascii_case(NO_CHILDREN))
    }
}

fn unquote(name: &str) -> String {
    let name = name.trim();
    match name
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => out.extend(chars.next()),
                    c => out.push(c),
                }
            }
            out
        }
        None => name.to_string(),
    }
}

pub fn parse_folder_line(line: &str) -> Result<Folder, FolderParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let captures = LIST_LINE.captures(line).ok_or_else(|| FolderParseError {
        line: line.to_string(),
    })?;

    let flags = captures["flags"]
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let delimiter = captures
        .name("delimiter")
        .and_then(|d| d.as_str().chars().last());
    // An unresolved literal marker is not a name.
    let raw_name = captures["name"].trim();
    if raw_name.starts_with('{') && raw_name.ends_with('}') {
        return Err(FolderParseError {
            line: line.to_string(),
        });
    }
    let name = unquote(raw_name);
    let display_name = utf7_imap::decode_utf7_imap(name.clone());

    Ok(Folder {
        name,
        display_name,
        flags,
        delimiter,
    })
}

/// Leaf folders of the mailbox, in server order.
///
/// A single malformed line fails the whole listing.
pub async fn list_leaf_folders<M: Mailbox>(mailbox: &mut M) -> Result<Vec<Folder>, MailboxError> {
    let lines = mailbox.list_folders().await?;
    let folders = lines
        .iter()
        .map(|line| parse_folder_line(line))
        .collect::<Result<Vec<_>, _>>()?;

    for folder in &folders {
        debug!(
            "Folder {} delimiter {:?} flags {:?}",
            folder.display_name, folder.delimiter, folder.flags
        );
    }
    Ok(folders.into_iter().filter(Folder::is_leaf).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_name() {
        let folder = parse_folder_line(r#"(\HasNoChildren) "/" "Work/Projects""#).unwrap();
        assert_eq!(folder.name, "Work/Projects");
        assert_eq!(folder.delimiter, Some('/'));
        assert!(folder.is_leaf());
    }

    #[test]
    fn test_parse_unquoted_name_and_escaped_delimiter() {
        let folder = parse_folder_line(r#"(\HasChildren) "\\" Archive"#).unwrap();
        assert_eq!(folder.name, "Archive");
        assert_eq!(folder.delimiter, Some('\\'));
        assert!(!folder.is_leaf());
    }

    #[test]
    fn test_nil_delimiter() {
        let folder = parse_folder_line(r#"(\HasNoChildren) NIL "INBOX""#).unwrap();
        assert_eq!(folder.delimiter, None);
    }

    #[test]
    fn test_extra_flags_are_not_leaves() {
        let folder = parse_folder_line(r#"(\HasNoChildren \Sent) "/" "Sent""#).unwrap();
        assert!(!folder.is_leaf());
    }

    #[test]
    fn test_modified_utf7_name_is_decoded() {
        let folder = parse_folder_line(r#"(\HasNoChildren) "." "Entw&APw-rfe""#).unwrap();
        assert_eq!(folder.name, "Entw&APw-rfe");
        assert_eq!(folder.display_name, "Entwürfe");
    }

    #[test]
    fn test_literal_marker_is_not_a_name() {
        let err = parse_folder_line(r#"(\HasNoChildren) "/" {12}"#).unwrap_err();
        assert_eq!(err.line, r#"(\HasNoChildren) "/" {12}"#);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let err = parse_folder_line("garbage without flags").unwrap_err();
        assert_eq!(err.line, "garbage without flags");
    }
}
