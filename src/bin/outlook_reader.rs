use anyhow::{Result, anyhow};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use outlook_reader::auth::http::HttpTransport;
use outlook_reader::auth::oauth::{self, Endpoints, TokenResult};
use outlook_reader::config::load_settings;
use outlook_reader::domain::email::{Credentials, SignIn};
use outlook_reader::mail::imap_client::ImapAuth;
use outlook_reader::mail::reader::read_recent_for;

#[derive(Parser)]
#[command(name = "outlook_reader")]
#[command(about = "Refresh an Outlook OAuth token and print the newest inbox message", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/outlook_reader/config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mailbox to read (overrides settings)
    #[arg(long)]
    mailbox: Option<String>,

    /// How many of the newest messages to print
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Credential line: email----password----client_id----refresh_token[----access_token]
    #[arg(long, env = "OUTLOOK_CREDENTIAL_LINE", hide_env_values = true)]
    line: Option<String>,

    #[arg(long, env = "OUTLOOK_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "OUTLOOK_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "OUTLOOK_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// IMAP password, used for hosts other than Outlook or when no refresh token is given
    #[arg(long, env = "OUTLOOK_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Cli {
    fn credentials(&self) -> Result<Credentials> {
        if let Some(line) = &self.line {
            return Credentials::from_line(line);
        }
        let email = self
            .email
            .as_ref()
            .ok_or_else(|| anyhow!("pass --line, or --email with a password or OAuth pair"))?;
        let mut creds = match (&self.client_id, &self.refresh_token, &self.password) {
            (Some(client_id), Some(rt), _) => Credentials::new(email, client_id, rt),
            (_, _, Some(password)) => Credentials::with_password(email, password),
            _ => {
                return Err(anyhow!(
                    "pass --password, or both --client-id and --refresh-token"
                ));
            }
        };
        creds.password = self.password.clone();
        Ok(creds)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let creds = cli.credentials()?;

    let mut settings =
        load_settings(cli.config.as_deref()).map_err(|e| anyhow!("Configuration error: {e:#}"))?;
    if let Some(mailbox) = &cli.mailbox {
        settings.mailbox = mailbox.clone();
    }

    let auth = match creds.sign_in(&settings.imap_host)? {
        SignIn::OAuth {
            client_id,
            refresh_token,
        } => {
            let transport = HttpTransport::new(settings.http_timeout())?;
            match oauth::exchange_with(
                &Endpoints::from(&settings),
                refresh_token,
                client_id,
                |req| transport.send(req),
            )? {
                TokenResult::Success { access_token, .. } => ImapAuth::XOAuth2(access_token),
                TokenResult::Failure { reason, .. } => return Err(anyhow!(reason.message())),
            }
        }
        SignIn::Password(password) => ImapAuth::Login(password.to_string()),
    };

    let summaries = read_recent_for(&creds.email, &auth, &settings, cli.count as usize)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if summaries.is_empty() {
        writeln!(out, "no emails found")?;
        return Ok(());
    }
    for s in &summaries {
        s.write_to(&mut out)?;
    }
    Ok(())
}
