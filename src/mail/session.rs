use anyhow::Result;

use crate::domain::email::MessageSeq;

/// The IMAP commands the reader needs from an authenticated session.
pub trait MailSession {
    fn list_mailboxes(&mut self) -> Result<Vec<String>>;
    fn select(&mut self, mailbox: &str) -> Result<()>;
    fn search_all(&mut self) -> Result<Vec<MessageSeq>>;
    /// Raw RFC 822 bytes of one message.
    fn fetch_rfc822(&mut self, seq: MessageSeq) -> Result<Vec<u8>>;
    fn logout(&mut self) -> Result<()>;
}
