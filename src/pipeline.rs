use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::corpus::{CategoryOutcome, CorpusWriter, DocumentCounter};
use crate::mail_reader::folders::list_leaf_folders;
use crate::mail_reader::mailbox::Mailbox;
use crate::mail_reader::retriever::retrieve_all;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReport {
    pub folder: String,
    pub retrieved: usize,
    pub outcome: CategoryOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub folders: Vec<FolderReport>,
    /// Category directory back to the folders written into it, in run order.
    pub categories: HashMap<PathBuf, Vec<String>>,
    pub next_document: DocumentCounter,
}

impl RunSummary {
    pub fn documents_written(&self) -> usize {
        self.folders
            .iter()
            .map(|report| match report.outcome {
                CategoryOutcome::Written { files, .. } => files,
                CategoryOutcome::TooFew { .. } => 0,
            })
            .sum()
    }

    pub fn messages_retrieved(&self) -> usize {
        self.folders.iter().map(|report| report.retrieved).sum()
    }
}

fn is_ignored(folder: &str, ignored: &[String]) -> bool {
    ignored.iter().any(|name| name.eq_ignore_ascii_case(folder))
}

/// Turn every eligible leaf folder of `mailbox` into a corpus category.
///
/// A malformed folder list aborts the run. A folder that cannot be selected
/// is reported and skipped; categories already written stay on disk.
pub async fn harvest<M: Mailbox>(
    mailbox: &mut M,
    writer: &CorpusWriter,
    ignored: &[String],
) -> Result<RunSummary> {
    let folders = list_leaf_folders(mailbox)
        .await
        .context("Cannot list mailbox folders")?;
    info!("{} leaf folders", folders.len());

    let mut summary = RunSummary::default();
    let mut counter = DocumentCounter::default();

    for folder in &folders {
        if is_ignored(&folder.display_name, ignored) {
            debug!("Ignoring folder {}", folder.display_name);
            continue;
        }

        info!("{}:", folder.display_name.to_uppercase());

        let messages = match retrieve_all(mailbox, folder).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Cannot retrieve {}: {}", folder.display_name, e);
                continue;
            }
        };

        let (next, outcome) = writer
            .write(&folder.display_name, &messages, counter)
            .with_context(|| format!("Cannot write category for {}", folder.display_name))?;
        counter = next;

        match &outcome {
            CategoryOutcome::Written { directory, files } => {
                info!("{} mails written to {}", files, directory.display());
                let sources = summary.categories.entry(directory.clone()).or_default();
                if !sources.is_empty() {
                    warn!(
                        "Folders {} and {} share the category {}",
                        sources.join(", "),
                        folder.display_name,
                        directory.display()
                    );
                }
                sources.push(folder.display_name.clone());
            }
            CategoryOutcome::TooFew { found } => {
                info!(
                    "Not enough mails to train ({} of {} needed).",
                    found,
                    writer.min_messages()
                );
            }
        }

        summary.folders.push(FolderReport {
            folder: folder.display_name.clone(),
            retrieved: messages.len(),
            outcome,
        });
    }

    summary.next_document = counter;
    Ok(summary)
}
