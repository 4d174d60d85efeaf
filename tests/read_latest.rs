use anyhow::{Result, anyhow};
use std::collections::HashMap;

use outlook_reader::domain::email::{BodyExcerpt, MessageSeq};
use outlook_reader::mail::reader::{read_latest, read_recent, read_then_logout};
use outlook_reader::mail::session::MailSession;

#[derive(Default)]
struct FakeSession {
    messages: HashMap<MessageSeq, Vec<u8>>,
    search_order: Vec<MessageSeq>,
    commands: Vec<String>,
    fail_logout: bool,
}

impl FakeSession {
    fn with(messages: Vec<(MessageSeq, String)>) -> Self {
        let search_order = messages.iter().map(|(s, _)| *s).collect();
        Self {
            messages: messages
                .into_iter()
                .map(|(s, m)| (s, m.into_bytes()))
                .collect(),
            search_order,
            ..Self::default()
        }
    }

    fn fetches(&self) -> Vec<&String> {
        self.commands
            .iter()
            .filter(|c| c.starts_with("FETCH"))
            .collect()
    }
}

impl MailSession for FakeSession {
    fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        self.commands.push("LIST".into());
        Ok(vec!["INBOX".into(), "Sent".into()])
    }

    fn select(&mut self, mailbox: &str) -> Result<()> {
        self.commands.push(format!("SELECT {mailbox}"));
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<MessageSeq>> {
        self.commands.push("SEARCH ALL".into());
        Ok(self.search_order.clone())
    }

    fn fetch_rfc822(&mut self, seq: MessageSeq) -> Result<Vec<u8>> {
        self.commands.push(format!("FETCH {seq} RFC822"));
        self.messages
            .get(&seq)
            .cloned()
            .ok_or_else(|| anyhow!("no message {seq}"))
    }

    fn logout(&mut self) -> Result<()> {
        self.commands.push("LOGOUT".into());
        if self.fail_logout {
            return Err(anyhow!("connection reset"));
        }
        Ok(())
    }
}

fn plain(subject: &str, body: &str) -> String {
    format!(
        "Subject: {subject}\r\nFrom: sender@example.com\r\nDate: Wed, 3 Jan 2024 12:00:00 +0000\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    )
}

#[test]
fn empty_mailbox_returns_none_without_fetch() {
    let mut session = FakeSession::default();
    let result = read_latest(&mut session, "INBOX").unwrap();
    assert!(result.is_none());
    assert!(session.fetches().is_empty());
    assert_eq!(session.commands, vec!["LIST", "SELECT INBOX", "SEARCH ALL"]);
}

#[test]
fn plain_message_reports_full_body() {
    let mut session = FakeSession::with(vec![(1, plain("Greeting", "Hello world"))]);
    let summary = read_latest(&mut session, "INBOX").unwrap().unwrap();
    assert_eq!(summary.subject, "Greeting");
    assert_eq!(summary.from, "sender@example.com");
    assert_eq!(summary.date, "Wed, 3 Jan 2024 12:00:00 +0000");
    assert_eq!(summary.body, Some(BodyExcerpt::full("Hello world")));
}

#[test]
fn multipart_excerpt_is_first_200_chars_of_plain_part() {
    let text: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let raw = format!(
        "Subject: long\r\nFrom: sender@example.com\r\n\
         Content-Type: multipart/alternative; boundary=\"sep\"\r\n\r\n\
         --sep\r\nContent-Type: text/html\r\n\r\n<p>ignored</p>\r\n\
         --sep\r\nContent-Type: text/plain\r\n\r\n{text}\r\n\
         --sep--\r\n"
    );
    let mut session = FakeSession::with(vec![(5, raw)]);
    let summary = read_latest(&mut session, "INBOX").unwrap().unwrap();
    let body = summary.body.unwrap();
    assert_eq!(body.text, text[..200]);
    assert_eq!(body.text.chars().count(), 200);
    assert!(body.truncated);
}

#[test]
fn newest_is_highest_sequence_regardless_of_search_order() {
    let mut session = FakeSession::with(vec![
        (7, plain("newest", "n")),
        (2, plain("old", "o")),
        (4, plain("middle", "m")),
    ]);
    let summary = read_latest(&mut session, "INBOX").unwrap().unwrap();
    assert_eq!(summary.seq, 7);
    assert_eq!(summary.subject, "newest");
    assert_eq!(session.fetches(), vec!["FETCH 7 RFC822"]);
}

#[test]
fn read_recent_returns_newest_first_from_named_mailbox() {
    let mut session = FakeSession::with(vec![
        (1, plain("one", "1")),
        (2, plain("two", "2")),
        (3, plain("three", "3")),
    ]);
    let summaries = read_recent(&mut session, "Archive", 2).unwrap();
    let subjects: Vec<_> = summaries.iter().map(|s| s.subject.as_str()).collect();
    assert_eq!(subjects, vec!["three", "two"]);
    assert!(session.commands.contains(&"SELECT Archive".to_string()));
}

#[test]
fn fetch_error_propagates() {
    let mut session = FakeSession::with(vec![(3, plain("x", "y"))]);
    session.search_order.push(9);
    let err = read_latest(&mut session, "INBOX").unwrap_err();
    assert!(err.to_string().contains("no message 9"));
}

#[test]
fn zero_count_sends_nothing() {
    let mut session = FakeSession::with(vec![(1, plain("one", "1"))]);
    let summaries = read_recent(&mut session, "INBOX", 0).unwrap();
    assert!(summaries.is_empty());
    assert!(session.commands.is_empty());
}

#[test]
fn logout_follows_a_successful_read() {
    let mut session = FakeSession::with(vec![(1, plain("one", "1"))]);
    let summaries = read_then_logout(&mut session, "INBOX", 1).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(session.commands.last().map(String::as_str), Some("LOGOUT"));
}

#[test]
fn logout_still_runs_when_fetch_fails() {
    let mut session = FakeSession::with(vec![(3, plain("x", "y"))]);
    session.search_order.push(9);
    let err = read_then_logout(&mut session, "INBOX", 1).unwrap_err();
    assert!(err.to_string().contains("no message 9"));
    assert_eq!(
        session.commands,
        vec!["LIST", "SELECT INBOX", "SEARCH ALL", "FETCH 9 RFC822", "LOGOUT"]
    );
}

#[test]
fn failed_logout_does_not_mask_the_messages() {
    let mut session = FakeSession::with(vec![(2, plain("kept", "k"))]);
    session.fail_logout = true;
    let summaries = read_then_logout(&mut session, "INBOX", 1).unwrap();
    assert_eq!(summaries[0].subject, "kept");
}
