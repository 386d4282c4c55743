use log::{debug, info, warn};

use crate::error::MailboxError;
use crate::mail_reader::folders::Folder;
use crate::mail_reader::mailbox::Mailbox;
use crate::mail_reader::message::{process_message, Message};

/// What the next sequential fetch produced.
///
/// A protocol error and an empty response both mean the folder has no more
/// messages and end up in the same terminal state.
#[derive(Debug)]
enum FetchState {
    Message(Vec<u8>),
    Exhausted,
}

async fn fetch_next<M: Mailbox>(mailbox: &mut M, seq: u32) -> FetchState {
    match mailbox.fetch(seq).await {
        Ok(Some(raw)) if !raw.is_empty() => FetchState::Message(raw),
        Ok(_) => {
            debug!("-- no data for message {}, folder exhausted", seq);
            FetchState::Exhausted
        }
        Err(e) => {
            debug!("-- fetch of message {} failed ({}), folder exhausted", seq, e);
            FetchState::Exhausted
        }
    }
}

/// Fetch every message of `folder` from sequence number 1 until the server
/// has nothing more, keeping the ones with a usable text body.
pub async fn retrieve_all<M: Mailbox>(
    mailbox: &mut M,
    folder: &Folder,
) -> Result<Vec<Message>, MailboxError> {
    mailbox.select_read_only(&folder.name).await?;
    debug!("-- {} selected read-only", folder.name);

    let mut messages = Vec::new();
    let mut seq: u32 = 1;
    let mut fetched = 0usize;

    loop {
        let raw = match fetch_next(mailbox, seq).await {
            FetchState::Message(raw) => raw,
            FetchState::Exhausted => break,
        };
        fetched += 1;

        match process_message(&raw) {
            Ok(Some(message)) => {
                debug!(
                    "Message {} kept ({})",
                    seq,
                    if message.is_html() { "html" } else { "plain text" }
                );
                messages.push(message);
            }
            Ok(None) => debug!("Message {} has no usable text, skipped", seq),
            Err(e) => warn!("Message {} in {} skipped: {}", seq, folder.name, e),
        }

        seq += 1;
    }

    info!(
        "-- {}: {} messages fetched, {} with text",
        folder.display_name,
        fetched,
        messages.len()
    );
    Ok(messages)
}
