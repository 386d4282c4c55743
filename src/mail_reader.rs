use anyhow::Result;
use log::{error, info};

pub mod charset;
pub mod credentials;
pub mod folders;
pub mod header;
pub mod html;
pub mod imap;
pub mod mailbox;
pub mod message;
pub mod retriever;

use crate::corpus::CorpusWriter;
use crate::pipeline;
use crate::settings::Settings;

pub async fn main(settings: Settings) -> Result<()> {
    let (username, password) = credentials::get_credentials(settings.username.as_deref())?;

    let mut mailbox =
        imap::ImapMailbox::connect(&settings.imap_server, settings.port, &username, &password)
            .await?;

    let writer = CorpusWriter::new(&settings.output_dir, settings.min_messages);
    let result = pipeline::harvest(&mut mailbox, &writer, &settings.ignored_folders).await;

    if let Err(e) = mailbox.logout().await {
        error!("Logout failed: {}", e);
    }

    let summary = result?;
    info!(
        "{} documents out of {} usable messages in {} categories under {}",
        summary.documents_written(),
        summary.messages_retrieved(),
        summary.categories.len(),
        writer.root().display()
    );
    Ok(())
}
