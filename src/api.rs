// API client module: a small blocking HTTP client that sends session-
// authenticated requests to the configured backend. Every call goes
// through the same checks (session cookie, then base URL) before a single
// request is made, and every failure ends up as a `DispatchError`.

use crate::config::{self, EnvSource, ProcessEnv};
use crate::error::DispatchError;
use crate::session::{
    is_valid_cookie_value, CookieSource, SessionFile, SESSION_COOKIE,
};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::cookie::Jar;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fallback message for failed GET/POST requests.
pub const REQUEST_FAILED: &str = "请求失败";
/// Fallback message for failed uploads.
pub const UPLOAD_FAILED: &str = "上传失败";

/// Request body. Forwarded to the backend as-is.
#[derive(Debug, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
    Multipart(multipart::Form),
}

impl Payload {
    fn apply(self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Payload::Empty => req,
            Payload::Json(value) => req.json(&value),
            Payload::Bytes(bytes) => req.body(bytes),
            Payload::Multipart(form) => req.multipart(form),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<multipart::Form> for Payload {
    fn from(form: multipart::Form) -> Self {
        Payload::Multipart(form)
    }
}

/// Build a one-file multipart form. reqwest picks the part's filename and
/// MIME type from the path.
pub fn file_form(field: &str, path: &Path) -> Result<multipart::Form> {
    multipart::Form::new()
        .file(field.to_string(), path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

/// Pull a usable `message` out of a JSON object error body. Non-empty
/// strings are taken as-is, non-zero numbers and `true` are stringified;
/// anything else (including arrays and nested objects) falls back.
fn server_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    match parsed.as_object()?.get("message")? {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn failure(fallback: &str, status: Option<StatusCode>) -> DispatchError {
    DispatchError::Failed {
        message: fallback.to_string(),
        status,
    }
}

/// Blocking client holding the HTTP connection pool and cookie jar plus the
/// two lookups every request depends on: where the session cookie comes
/// from and where the base URL comes from.
#[derive(Clone)]
pub struct ApiClient<C = SessionFile, E = ProcessEnv> {
    client: Client,
    jar: Arc<Jar>,
    cookies: C,
    env: E,
}

impl ApiClient {
    /// Client reading cookies from the default session file and the base
    /// URL from the process environment.
    pub fn from_env() -> Result<Self> {
        ApiClient::new(SessionFile::default_location(), ProcessEnv)
    }
}

impl<C: CookieSource, E: EnvSource> ApiClient<C, E> {
    pub fn new(cookies: C, env: E) -> Result<Self> {
        // The jar carries the session cookie and anything the backend sets.
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            jar,
            cookies,
            env,
        })
    }

    pub fn cookies(&self) -> &C {
        &self.cookies
    }

    /// POST `body` as JSON to `path`. Nothing is returned on success.
    pub fn post_data<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), DispatchError> {
        let (session, base) = self.preconditions()?;
        let payload = match serde_json::to_value(body) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                error!("Failed to serialize request body: {}", e);
                return Err(failure(REQUEST_FAILED, None));
            }
        };
        self.send(Method::POST, &session, &base, path, payload, REQUEST_FAILED)?;
        Ok(())
    }

    /// GET `path` and return the response body.
    pub fn fetch_data(&self, path: &str) -> Result<Value, DispatchError> {
        self.send_request(Method::GET, path, Payload::Empty)
    }

    /// POST an upload payload to `path`. The response is logged, not
    /// returned.
    pub fn upload_data(
        &self,
        path: &str,
        payload: impl Into<Payload>,
    ) -> Result<(), DispatchError> {
        let res = self.dispatch(Method::POST, path, payload.into(), UPLOAD_FAILED)?;
        let data = read_body(res, UPLOAD_FAILED)?;
        info!(%data, "Upload response");
        Ok(())
    }

    /// Send any request through the same checks as `fetch_data` and
    /// return the parsed body.
    pub fn send_request(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Value, DispatchError> {
        let res = self.dispatch(method, path, payload, REQUEST_FAILED)?;
        read_body(res, REQUEST_FAILED)
    }

    fn dispatch(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        fallback: &str,
    ) -> Result<Response, DispatchError> {
        let (session, base) = self.preconditions()?;
        self.send(method, &session, &base, path, payload, fallback)
    }

    /// Session credential and base URL, in that order. Nothing leaves the
    /// process unless both are present.
    fn preconditions(&self) -> Result<(String, String), DispatchError> {
        let Some(session) = self.cookies.cookie(SESSION_COOKIE) else {
            info!("Not logged in");
            return Err(DispatchError::NotAuthenticated);
        };
        if !is_valid_cookie_value(&session) {
            warn!("Stored session is not a valid cookie value, treating as not logged in");
            return Err(DispatchError::NotAuthenticated);
        }
        let base = config::base_url(&self.env).map_err(|e| {
            error!("{} is not defined", config::API_URL_VAR);
            e
        })?;
        Ok((session, base))
    }

    fn send(
        &self,
        method: Method,
        session: &str,
        base: &str,
        path: &str,
        payload: Payload,
        fallback: &str,
    ) -> Result<Response, DispatchError> {
        let url = Url::parse(&format!("{}{}", base, path)).map_err(|e| {
            error!("Invalid request URL {}{}: {}", base, path, e);
            failure(fallback, None)
        })?;
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, session), &url);

        debug!(%method, %url, "Sending request");
        let req = self.client.request(method, url.clone());
        let res = payload.apply(req).send().map_err(|e| {
            error!(%url, "Request failed: {}", e);
            failure(fallback, None)
        })?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().unwrap_or_default();
        error!(%url, %status, %body, "Request failed");
        Err(DispatchError::Failed {
            message: server_message(&body).unwrap_or_else(|| fallback.to_string()),
            status: Some(status),
        })
    }
}

/// Parse a successful response body: JSON when possible, the raw text
/// otherwise, `null` when empty.
fn read_body(res: Response, fallback: &str) -> Result<Value, DispatchError> {
    let status = res.status();
    let text = res.text().map_err(|e| {
        error!(%status, "Failed to read response body: {}", e);
        failure(fallback, Some(status))
    })?;
    if text.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
