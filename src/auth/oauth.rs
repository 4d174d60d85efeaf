use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, ClientId, HttpRequest, HttpResponse, RefreshToken, RequestTokenError, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;

use crate::auth::http::apply_fixed_headers;
use crate::config::{DEFAULT_AUTH_URL, DEFAULT_TOKEN_URL, Settings};

/// Marker Microsoft puts in `error_description` for suspended accounts.
const ABUSE_MARKER: &str = "service abuse mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Blocked,
    Generic,
}

impl FailureReason {
    pub fn message(self) -> &'static str {
        match self {
            FailureReason::Blocked => "account blocked or invalid credential set",
            FailureReason::Generic => "token exchange failed",
        }
    }
}

/// Outcome of one refresh-token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResult {
    Success {
        access_token: String,
        refresh_token: Option<String>,
    },
    Failure {
        reason: FailureReason,
        /// Provider `error` code, kept for diagnostics.
        error: String,
        description: Option<String>,
    },
}

/// Loose view of a token endpoint body, for replies the typed oauth2 parser
/// rejects (no `token_type`, or an `error` sent with status 200).
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl RawTokenResponse {
    fn into_result(self) -> Option<TokenResult> {
        match (self.error, self.access_token) {
            (Some(error), _) => Some(classify(error, self.error_description)),
            (None, Some(access_token)) => Some(TokenResult::Success {
                access_token,
                refresh_token: self.refresh_token,
            }),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl From<&Settings> for Endpoints {
    fn from(s: &Settings) -> Self {
        Self {
            auth_url: s.auth_url.clone(),
            token_url: s.token_url.clone(),
        }
    }
}

/// Exchange a refresh token against the default Microsoft endpoint.
pub fn exchange<F, RE>(refresh_token: &str, client_id: &str, http: F) -> Result<TokenResult>
where
    F: FnOnce(HttpRequest) -> std::result::Result<HttpResponse, RE>,
    RE: std::error::Error + 'static,
{
    exchange_with(&Endpoints::default(), refresh_token, client_id, http)
}

/// Exchange a refresh token for a new access token using the oauth2 crate.
///
/// Provider-side rejections come back as `TokenResult::Failure`; transport
/// and parse errors are returned as `Err`.
pub fn exchange_with<F, RE>(
    endpoints: &Endpoints,
    refresh_token: &str,
    client_id: &str,
    http: F,
) -> Result<TokenResult>
where
    F: FnOnce(HttpRequest) -> std::result::Result<HttpResponse, RE>,
    RE: std::error::Error + 'static,
{
    let auth_url = AuthUrl::new(endpoints.auth_url.clone())?;
    let token_url = TokenUrl::new(endpoints.token_url.clone())?;

    // No client secret: public client, client_id travels in the form body.
    let oauth_client = BasicClient::new(
        ClientId::new(client_id.to_string()),
        None,
        auth_url,
        Some(token_url),
    );

    info!("exchanging refresh token for client {client_id}");
    let rt = RefreshToken::new(refresh_token.to_string());
    let mut raw_body: Option<Vec<u8>> = None;
    let outcome = oauth_client
        .exchange_refresh_token(&rt)
        .request(|mut request: HttpRequest| {
            apply_fixed_headers(&mut request);
            let response = http(request)?;
            raw_body = Some(response.body.clone());
            Ok::<HttpResponse, RE>(response)
        });

    match outcome {
        Ok(token) => {
            info!("token exchange succeeded");
            Ok(TokenResult::Success {
                access_token: token.access_token().secret().to_string(),
                refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
            })
        }
        Err(RequestTokenError::ServerResponse(resp)) => Ok(classify_error(&resp)),
        Err(e @ (RequestTokenError::Parse(..) | RequestTokenError::Other(_))) => {
            // Fall back to the `error` key alone, as the endpoint contract defines it.
            match raw_body.as_deref().and_then(classify_raw) {
                Some(result) => Ok(result),
                None => Err(anyhow!("token request failed: {e}")),
            }
        }
        Err(e) => Err(anyhow!("token request failed: {e}")),
    }
}

fn classify_raw(body: &[u8]) -> Option<TokenResult> {
    let raw: RawTokenResponse = serde_json::from_slice(body).ok()?;
    debug!("token response classified from raw body");
    raw.into_result()
}

fn classify_error(resp: &BasicErrorResponse) -> TokenResult {
    let error = AsRef::<str>::as_ref(resp.error()).to_string();
    classify(error, resp.error_description().cloned())
}

fn classify(error: String, description: Option<String>) -> TokenResult {
    let blocked = description
        .as_deref()
        .is_some_and(|d| d.contains(ABUSE_MARKER));

    let reason = if blocked {
        warn!("provider reports the account is in service abuse mode");
        FailureReason::Blocked
    } else {
        warn!("token exchange rejected by provider: {error}");
        FailureReason::Generic
    };

    TokenResult::Failure {
        reason,
        error,
        description,
    }
}
