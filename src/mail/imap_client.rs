use anyhow::{Result, anyhow};
use log::{debug, info};
use native_tls::TlsConnector;
use std::io::{Read, Write};

use crate::domain::email::MessageSeq;
use crate::mail::session::MailSession;

pub type TlsSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Build canonical XOAUTH2 auth string as bytes.
pub fn build_xoauth2_bytes(user: &str, access_token: &str) -> Vec<u8> {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01").into_bytes()
}

struct OAuth2Authenticator {
    response: Vec<u8>,
}

impl imap::Authenticator for OAuth2Authenticator {
    type Response = Vec<u8>;
    // imap base64-encodes the response itself.
    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.response.clone()
    }
}

/// Secret used to open the session. No `Debug`, it holds credentials.
pub enum ImapAuth {
    XOAuth2(String),
    Login(String),
}

pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub user: String,
}

impl ImapClient {
    pub fn new(server: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            user: user.into(),
        }
    }

    pub fn connect_and_auth(&self, auth: &ImapAuth) -> Result<TlsSession> {
        info!("connecting to {}:{}", self.server, self.port);
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect(
            (self.server.as_str(), self.port),
            self.server.as_str(),
            &tls,
        )?;

        let session = match auth {
            ImapAuth::XOAuth2(access_token) => {
                let authenticator = OAuth2Authenticator {
                    response: build_xoauth2_bytes(&self.user, access_token),
                };
                client
                    .authenticate("XOAUTH2", &authenticator)
                    .map_err(|(e, _client)| {
                        anyhow!("XOAUTH2 authentication failed for {}: {e}", self.user)
                    })?
            }
            ImapAuth::Login(password) => client
                .login(&self.user, password)
                .map_err(|(e, _client)| anyhow!("LOGIN failed for {}: {e}", self.user))?,
        };
        info!("authenticated as {}", self.user);
        Ok(session)
    }
}

impl<T: Read + Write> MailSession for imap::Session<T> {
    fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        let names = self.list(None, Some("*"))?;
        Ok(names.iter().map(|n| n.name().to_string()).collect())
    }

    fn select(&mut self, mailbox: &str) -> Result<()> {
        let mb = imap::Session::select(self, mailbox)?;
        debug!("{mailbox} has {} messages", mb.exists);
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<MessageSeq>> {
        Ok(self.search("ALL")?.into_iter().collect())
    }

    fn fetch_rfc822(&mut self, seq: MessageSeq) -> Result<Vec<u8>> {
        let fetches = self.fetch(seq.to_string(), "RFC822")?;
        let f = fetches
            .iter()
            .next()
            .ok_or_else(|| anyhow!("message {seq} not found"))?;
        f.body()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| anyhow!("message {seq}: server returned no RFC822 body"))
    }

    fn logout(&mut self) -> Result<()> {
        imap::Session::logout(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xoauth2_payload_framing() {
        let raw = build_xoauth2_bytes("me@hotmail.com", "EwBIA+token");
        assert_eq!(
            raw,
            b"user=me@hotmail.com\x01auth=Bearer EwBIA+token\x01\x01".to_vec()
        );
    }
}
