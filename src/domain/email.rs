use anyhow::{Result, anyhow};
use std::io::Write;

use crate::config::DEFAULT_IMAP_HOST;

pub type MessageSeq = u32;

/// Longest body excerpt shown for a multipart message, in characters.
pub const EXCERPT_CHARS: usize = 200;

/// Credentials for one run: the mailbox owner plus either an OAuth client and
/// refresh token, a password, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
}

/// How to open the IMAP session for a given host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignIn<'a> {
    OAuth {
        client_id: &'a str,
        refresh_token: &'a str,
    },
    Password(&'a str),
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: None,
            client_id: Some(client_id.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn with_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Some(password.into()),
            client_id: None,
            refresh_token: None,
        }
    }

    /// Parse `email----password----client_id----refresh_token[----access_token]`.
    ///
    /// Any trailing access token is stale by the time it is used and is
    /// dropped. Empty password or OAuth fields are allowed as long as one
    /// way of signing in remains.
    pub fn from_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split("----").map(str::trim).collect();
        if fields.len() != 4 && fields.len() != 5 {
            return Err(anyhow!(
                "credential line must have 4 or 5 '----' separated fields, got {}",
                fields.len()
            ));
        }

        let creds = Self {
            email: non_empty(fields[0])
                .ok_or_else(|| anyhow!("credential line has an empty email field"))?,
            password: non_empty(fields[1]),
            client_id: non_empty(fields[2]),
            refresh_token: non_empty(fields[3]),
        };

        match (&creds.client_id, &creds.refresh_token, &creds.password) {
            (Some(_), None, _) => Err(anyhow!(
                "credential line has a client_id but an empty refresh_token field"
            )),
            (None, Some(_), _) => Err(anyhow!(
                "credential line has a refresh_token but an empty client_id field"
            )),
            (None, None, None) => Err(anyhow!(
                "credential line has neither a password nor a client_id/refresh_token pair"
            )),
            _ => Ok(creds),
        }
    }

    /// Outlook is always reached through XOAUTH2; other hosts take the
    /// password when one is known.
    pub fn sign_in(&self, imap_host: &str) -> Result<SignIn<'_>> {
        let is_outlook = imap_host.eq_ignore_ascii_case(DEFAULT_IMAP_HOST);
        let oauth = match (&self.client_id, &self.refresh_token) {
            (Some(client_id), Some(refresh_token)) => Some(SignIn::OAuth {
                client_id,
                refresh_token,
            }),
            _ => None,
        };

        match (oauth, &self.password) {
            (Some(oauth), _) if is_outlook => Ok(oauth),
            (_, Some(password)) => Ok(SignIn::Password(password)),
            (Some(oauth), None) => Ok(oauth),
            (None, None) => Err(anyhow!(
                "no way to sign in to {imap_host}: need a password or a client id and refresh token"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyExcerpt {
    pub text: String,
    pub truncated: bool,
}

impl BodyExcerpt {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: false,
        }
    }

    /// Keep at most `max_chars` characters (not bytes).
    pub fn truncate(text: &str, max_chars: usize) -> Self {
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => Self {
                text: text[..cut].to_string(),
                truncated: true,
            },
            None => Self::full(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub seq: MessageSeq,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub date: String,
    pub body: Option<BodyExcerpt>,
    pub attachments: Vec<Attachment>,
}

impl MessageSummary {
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Subject: {}", self.subject)?;
        writeln!(out, "From: {}", self.from)?;
        if !self.to.is_empty() {
            writeln!(out, "To: {}", self.to)?;
        }
        if !self.cc.is_empty() {
            writeln!(out, "Cc: {}", self.cc)?;
        }
        writeln!(out, "Date: {}", self.date)?;
        // Only text that was actually cut gets the ellipsis, so a short
        // multipart body prints exactly like a single-part one.
        match &self.body {
            Some(b) if b.truncated => writeln!(out, "Body: {}...", b.text)?,
            Some(b) => writeln!(out, "Body: {}", b.text)?,
            None => {}
        }
        if !self.attachments.is_empty() {
            let names: Vec<String> = self
                .attachments
                .iter()
                .map(|a| format!("{} ({})", a.filename, a.content_type))
                .collect();
            writeln!(out, "Attachments: {}", names.join(", "))?;
        }
        writeln!(out, "{}", "-".repeat(50))?;
        Ok(())
    }
}
