use anyhow::Result;
use log::{debug, info, warn};

use crate::config::Settings;
use crate::domain::email::{MessageSeq, MessageSummary};
use crate::mail::decoders::parse_summary;
use crate::mail::imap_client::{ImapAuth, ImapClient};
use crate::mail::session::MailSession;

/// Read the newest message in `mailbox`. `None` when the mailbox is empty.
pub fn read_latest<S: MailSession>(
    session: &mut S,
    mailbox: &str,
) -> Result<Option<MessageSummary>> {
    Ok(read_recent(session, mailbox, 1)?.into_iter().next())
}

/// Read up to `count` of the newest messages in `mailbox`, newest first.
///
/// "Newest" is the highest sequence number; the order SEARCH returns them in
/// is not relied upon.
pub fn read_recent<S: MailSession>(
    session: &mut S,
    mailbox: &str,
    count: usize,
) -> Result<Vec<MessageSummary>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let names = session.list_mailboxes()?;
    debug!("mailboxes: {names:?}");

    session.select(mailbox)?;

    let seqs = newest_first(session.search_all()?, count);
    if seqs.is_empty() {
        info!("no emails found in {mailbox}");
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(seqs.len());
    for seq in seqs {
        debug!("fetching message {seq}");
        let raw = session.fetch_rfc822(seq)?;
        out.push(parse_summary(seq, &raw)?);
    }
    Ok(out)
}

fn newest_first(mut seqs: Vec<MessageSeq>, count: usize) -> Vec<MessageSeq> {
    seqs.sort_unstable_by(|a, b| b.cmp(a));
    seqs.dedup();
    seqs.truncate(count);
    seqs
}

/// Run `read_recent`, then LOGOUT whether or not the read succeeded.
///
/// A failed LOGOUT is only logged; the read's own result is returned.
pub fn read_then_logout<S: MailSession>(
    session: &mut S,
    mailbox: &str,
    count: usize,
) -> Result<Vec<MessageSummary>> {
    let result = read_recent(session, mailbox, count);
    if let Err(e) = session.logout() {
        warn!("logout failed: {e:#}");
    }
    result
}

/// Connect, authenticate, read, and log out.
pub fn read_recent_for(
    email: &str,
    auth: &ImapAuth,
    settings: &Settings,
    count: usize,
) -> Result<Vec<MessageSummary>> {
    let imap = ImapClient::new(settings.imap_host.as_str(), settings.imap_port, email);
    let mut session = imap.connect_and_auth(auth)?;
    read_then_logout(&mut session, &settings.mailbox, count)
}

pub fn read_latest_for(
    email: &str,
    auth: &ImapAuth,
    settings: &Settings,
) -> Result<Option<MessageSummary>> {
    Ok(read_recent_for(email, auth, settings, 1)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_ignores_server_order() {
        assert_eq!(newest_first(vec![3, 9, 1, 9, 4], 3), vec![9, 4, 3]);
        assert_eq!(newest_first(vec![2], 5), vec![2]);
        assert!(newest_first(vec![], 1).is_empty());
    }
}
