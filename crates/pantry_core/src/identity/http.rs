//! HTTP seam for the identity client.

use crate::identity::error::{IdentityError, IdentityResult};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("pantry/", env!("CARGO_PKG_VERSION"));

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal blocking HTTP client used by identity flows.
pub trait HttpTransport {
    fn get(&self, url: &str) -> IdentityResult<HttpResponse>;
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> IdentityResult<HttpResponse>;
}

/// GETs `url` and decodes a JSON body, failing on non-2xx statuses.
pub fn get_json<T, H>(http: &H, url: &str) -> IdentityResult<T>
where
    T: DeserializeOwned,
    H: HttpTransport + ?Sized,
{
    let response = http.get(url)?;
    decode_json(url, &response)
}

/// GETs `url` and returns the trimmed text body.
pub fn get_text<H: HttpTransport + ?Sized>(http: &H, url: &str) -> IdentityResult<String> {
    let response = http.get(url)?;
    ensure_success(url, &response)?;
    Ok(response.body.trim().to_string())
}

/// POSTs a form and decodes a JSON body, failing on non-2xx statuses.
pub fn post_form_json<T, H>(http: &H, url: &str, form: &[(&str, &str)]) -> IdentityResult<T>
where
    T: DeserializeOwned,
    H: HttpTransport + ?Sized,
{
    let response = http.post_form(url, form)?;
    decode_json(url, &response)
}

fn ensure_success(url: &str, response: &HttpResponse) -> IdentityResult<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(IdentityError::Status {
        url: url.to_string(),
        status: response.status,
    })
}

fn decode_json<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> IdentityResult<T> {
    ensure_success(url, response)?;
    serde_json::from_str(&response.body).map_err(|err| IdentityError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

/// `reqwest` blocking implementation.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> IdentityResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| IdentityError::Http {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }

    fn finish(
        url: &str,
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> IdentityResult<HttpResponse> {
        let http_error = |err: reqwest::Error| IdentityError::Http {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = result.map_err(http_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(http_error)?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> IdentityResult<HttpResponse> {
        Self::finish(url, self.client.get(url).header(ACCEPT, "application/json, text/plain").send())
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> IdentityResult<HttpResponse> {
        Self::finish(
            url,
            self.client
                .post(url)
                .header(ACCEPT, "application/json")
                .form(form)
                .send(),
        )
    }
}
