use crate::error::MailboxError;

/// An authenticated session bound to one server.
///
/// Calls are strictly sequential: each one is awaited before the next is made.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Raw folder-list lines, `(flags) "delimiter" name`, in server order.
    async fn list_folders(&mut self) -> Result<Vec<String>, MailboxError>;

    /// Select `folder` without allowing any change to it.
    async fn select_read_only(&mut self, folder: &str) -> Result<(), MailboxError>;

    /// Raw bytes of the message at 1-based sequence number `seq` in the
    /// selected folder, or `None` when the server returned no data.
    async fn fetch(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailboxError>;
}
