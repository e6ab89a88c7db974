//! JSON-over-HTTP client used to talk to the Gemini REST API.
//!
//! Every call is a single attempt: [`HttpClient::get_json`] and
//! [`HttpClient::post_json`] either decode the reply or return an [`HttpError`]
//! carrying the upstream status and message. Credentials travel as query
//! parameters ([`Auth::Query`]) and are replaced by `<redacted>` wherever a URL
//! is logged.
//!
//! ```no_run
//! # async fn demo() -> Result<(), factcheck_http::HttpError> {
//! let client = factcheck_http::HttpClient::new("https://api.example.com/v1/")?;
//! let listing: serde_json::Value = client
//!     .get_json("models", factcheck_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Each request logs `http.request.start`, `http.response.headers` and, on
//! failure, `http.error` at debug/warn. Setting `FACTCHECK_HTTP_RAW=1` adds a
//! redacted curl reproduction under the `http.raw` target.

use reqwest::header::HeaderValue;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

const RAW_ENV: &str = "FACTCHECK_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_PARAMS.contains(&lower.as_str())
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Curl reproduction of a request with credentials masked.
fn make_curl(method: &Method, url: &Url, body: Option<&[u8]>) -> String {
    let mut cmd = format!("curl -X{method}");
    if body.is_some() {
        cmd.push_str(" -H 'content-type: application/json'");
    }
    match body.map(std::str::from_utf8) {
        Some(Ok(text)) => {
            let mut text = text.to_string();
            if text.len() > RAW_MAX_BODY {
                truncate_on_char_boundary(&mut text, RAW_MAX_BODY);
                text.push('…');
            }
            cmd.push_str(&format!(" -d {}", shell_quote(&text)));
        }
        Some(Err(_)) => {
            let len = body.map_or(0, <[u8]>::len);
            cmd.push_str(&format!(" --data-binary @- # ({len} bytes)"));
        }
        None => {}
    }
    cmd.push(' ');
    cmd.push_str(&shell_quote(&redacted_url(url)));
    cmd
}

/// Copy of `url` with every secret query value replaced by `<redacted>`.
fn redacted_url(url: &Url) -> String {
    let mut safe = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        return safe.to_string();
    }
    safe.query_pairs_mut().clear().extend_pairs(pairs);
    safe.to_string()
}

/// `reqwest` errors render the full request URL, query key included.
fn network_message(err: reqwest::Error) -> String {
    let url = err.url().map(redacted_url);
    let err = err.without_url();
    match url {
        Some(url) => format!("{err} ({url})"),
        None => err.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
    },
}

/// Authentication strategies supported by the client.
///
/// ```
/// use factcheck_http::Auth;
/// use std::borrow::Cow;
///
/// let auth = Auth::Query { name: "key", value: Cow::Borrowed("secret") };
/// assert_eq!(auth.kind(), "query");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Credential passed as a query parameter (e.g. Gemini's `?key=`).
    Query { name: &'a str, value: Cow<'a, str> },
}

impl Auth<'_> {
    /// Short label used in logs in place of the secret.
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Query { .. } => "query",
        }
    }
}

/// Per-request authentication and query parameters.
///
/// ```
/// use factcheck_http::RequestOpts;
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     query: Some(vec![("pageSize", Cow::Borrowed("50"))]),
///     ..Default::default()
/// };
///
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub auth: Option<Auth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL. Paths passed to the request
    /// helpers are joined onto it, so keep a trailing `/` on the base.
    ///
    /// Connect timeout is 10s and each request is capped at 60s.
    ///
    /// ```no_run
    /// use factcheck_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.base_url().path(), "/v1/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json(Method::GET, path, None::<&()>, opts).await
    }

    /// POST a JSON body and decode a JSON reply.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts).await
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut query: Vec<(&str, &str)> = opts
            .query
            .as_ref()
            .map(|q| q.iter().map(|(k, v)| (*k, v.as_ref())).collect())
            .unwrap_or_default();
        if let Some(Auth::Query { name, value }) = &opts.auth {
            query.push((*name, value.as_ref()));
        }

        let timeout = self.timeout;
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if !query.is_empty() {
            rb = rb.query(&query);
        }

        let request_body_bytes = match body {
            Some(b) => {
                let bytes = serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?;
                rb = rb
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    )
                    .body(bytes.clone());
                Some(bytes)
            }
            None => None,
        };

        let redacted_q: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| {
                let v = if is_secret_param(k) {
                    "<redacted>".to_string()
                } else {
                    (*v).to_string()
                };
                ((*k).to_string(), v)
            })
            .collect();
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let req_id = format!("r{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            auth_kind,
            has_body=%body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let mut shown = url.clone();
            if !query.is_empty() {
                shown.query_pairs_mut().extend_pairs(query.iter());
            }
            let curl = make_curl(&method, &shown, request_body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = network_message(err);
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = network_message(err);
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-goog-request-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let truncated = bytes.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            x_request_id=%request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api { status, message })
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands the Google style `{"error":{"message":"..."}}` envelope and the
/// flat `{"message"|"detail"|"error": "..."}` shapes; otherwise the body snippet.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
        #[serde(default)]
        status: Option<String>,
    }

    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return match env.error.status {
            Some(status) if !status.is_empty() => format!("{} ({})", env.error.message, status),
            _ => env.error.message,
        };
    }
    if let Ok(m) = serde_json::from_slice::<Flat>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        truncate_on_char_boundary(&mut snip, SNIPPET_MAX);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_is_understood() {
        let body = br#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            extract_error_message(body),
            "API key not valid. (PERMISSION_DENIED)"
        );
    }

    #[test]
    fn flat_error_shapes_fall_through_in_order() {
        assert_eq!(extract_error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(extract_error_message(br#"{"error":"bad"}"#), "bad");
        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn snippets_are_capped_without_splitting_chars() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn secret_query_values_never_reach_rendered_urls() {
        let url = Url::parse("https://example.com/v1beta/models?key=sk-live&pageSize=50").unwrap();
        let shown = redacted_url(&url);
        assert!(!shown.contains("sk-live"));
        assert!(shown.contains("pageSize=50"));

        let curl = make_curl(&Method::GET, &url, None);
        assert!(!curl.contains("sk-live"));
    }
}
