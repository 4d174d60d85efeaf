use oauth2::http::header::{CONTENT_TYPE, HOST, HeaderValue};
use oauth2::{HttpRequest, HttpResponse};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::time::Duration;

pub const TOKEN_HOST: &str = "login.microsoftonline.com";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Blocking HTTP transport for the token endpoint, with a request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .body(request.body)
            .send()?;
        let status_code = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}

/// Headers sent with every token request regardless of transport.
pub fn apply_fixed_headers(request: &mut HttpRequest) {
    request
        .headers
        .insert(HOST, HeaderValue::from_static(TOKEN_HOST));
    request
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
}
