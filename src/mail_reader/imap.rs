use async_imap::{Client, Session};
use futures::TryStreamExt;
use log::info;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::error::MailboxError;
use crate::mail_reader::mailbox::Mailbox;

type ImapSession = Session<Compat<tokio_native_tls::TlsStream<TcpStream>>>;

const LIST_PREFIX: &str = "* LIST ";

fn literal_length(line: &str) -> Option<usize> {
    line.strip_suffix('}')
        .and_then(|rest| rest.rsplit_once('{'))
        .and_then(|(_, digits)| digits.parse().ok())
}

/// Pull the `* LIST` lines out of a raw response. A name sent as a literal
/// (`{n}` then the name on its own line) is folded back in as a quoted name.
fn list_lines(response: &str) -> Result<Vec<String>, MailboxError> {
    let mut lines = response.lines();
    let mut folders = Vec::new();

    while let Some(line) = lines.next() {
        let Some(entry) = line.strip_prefix(LIST_PREFIX) else {
            continue;
        };
        let entry = entry.trim_end();

        match literal_length(entry) {
            Some(length) => {
                let name = lines.next().ok_or_else(|| {
                    MailboxError::Protocol(format!("LIST literal without a name: {}", entry))
                })?;
                let name = name.get(..length).unwrap_or(name);
                let prefix = &entry[..entry.rfind('{').unwrap_or(entry.len())];
                let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
                folders.push(format!("{}\"{}\"", prefix, quoted));
            }
            None => folders.push(entry.to_string()),
        }
    }

    Ok(folders)
}

// Establish a TLS-encrypted connection to the IMAP server
async fn connect_to_server(
    server: &str,
    port: u16,
) -> Result<tokio_native_tls::TlsStream<TcpStream>, MailboxError> {
    let imap_addr = (server, port);
    let tcp_stream = TcpStream::connect(imap_addr).await?;
    let tls = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
    let tls_stream = tls.connect(server, tcp_stream).await?;

    info!("-- connected to {}:{}", server, port);
    Ok(tls_stream)
}

/// IMAP over TLS, the only mailbox the binary talks to.
pub struct ImapMailbox {
    session: ImapSession,
}

impl ImapMailbox {
    pub async fn connect(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, MailboxError> {
        let tls_stream = connect_to_server(server, port).await?;
        let client = Client::new(tls_stream.compat());

        let session = client
            .login(username, password)
            .await
            .map_err(|e| e.0)?;

        info!("-- logged in as {}", username);
        Ok(ImapMailbox { session })
    }

    // Be nice to the server and log out
    pub async fn logout(mut self) -> Result<(), MailboxError> {
        self.session.logout().await?;
        Ok(())
    }
}

impl Mailbox for ImapMailbox {
    async fn list_folders(&mut self) -> Result<Vec<String>, MailboxError> {
        let response = self
            .session
            .run_command_and_read_response("LIST \"\" \"*\"")
            .await?;

        list_lines(&String::from_utf8_lossy(&response))
    }

    async fn select_read_only(&mut self, folder: &str) -> Result<(), MailboxError> {
        self.session.examine(folder).await?;
        Ok(())
    }

    async fn fetch(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailboxError> {
        let messages_stream = self.session.fetch(seq.to_string(), "RFC822").await?;
        let messages: Vec<_> = messages_stream.try_collect().await?;

        Ok(messages
            .iter()
            .find_map(|message| message.body())
            .map(<[u8]>::to_vec))
    }
}
