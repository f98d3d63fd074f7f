use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::Error;
use crate::request::{Method, Request, RequestOptions};
use crate::token::TokenProvider;

/// Sends one HTTP request and classifies the outcome.
///
/// The executor never retries and never looks inside response envelopes. A
/// 2xx response yields the negotiated body; anything else becomes
/// [`Error::Http`], [`Error::Timeout`] or [`Error::Transport`].
#[derive(Clone)]
pub struct RequestExecutor {
    http_client: Client,
    config: Config,
    default_headers: HeaderMap,
    credentials: Option<Arc<dyn TokenProvider>>,
}

/// Result of one attempt plus the access token it carried.
pub(crate) struct Attempt {
    pub bearer: Option<String>,
    pub result: Result<Value, Error>,
}

impl RequestExecutor {
    /// Build an executor that sends no `Authorization` header.
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: Config, http_client: Client) -> Result<Self, Error> {
        config.validate()?;
        let default_headers = header_map(&config.default_headers)?;
        Ok(Self {
            http_client,
            config,
            default_headers,
            credentials: None,
        })
    }

    /// Attach the access token from `provider` to every request.
    pub fn with_credentials(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<Value, Error> {
        let mut request = Request::new(method, path);
        request.body = body;
        self.execute(&request, options).await
    }

    pub async fn execute(
        &self,
        request: &Request,
        options: &RequestOptions,
    ) -> Result<Value, Error> {
        self.attempt(request, options).await.result
    }

    pub(crate) async fn attempt(&self, request: &Request, options: &RequestOptions) -> Attempt {
        let bearer = self
            .credentials
            .as_ref()
            .and_then(|provider| provider.access_token())
            .filter(|token| !token.is_empty());
        let result = self.send(request, options, bearer.as_deref()).await;
        Attempt { bearer, result }
    }

    async fn send(
        &self,
        request: &Request,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<Value, Error> {
        let url = self.config.url_for(&request.path);
        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());

        let mut headers = self.default_headers.clone();
        for (name, value) in &request.headers {
            let (name, value) = header_pair(name, value)?;
            headers.insert(name, value);
        }
        if let Some(token) = bearer {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("Access token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .http_client
            .request(request.method.as_reqwest(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = bearer.is_some(),
            timeout_ms = timeout.as_millis() as u64,
            "http.request"
        );

        // Dropping the exchange on timeout cancels the in-flight call.
        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, text))
        };
        let (status, content_type, text) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) if e.is_timeout() => return Err(self.timed_out(request, timeout)),
            Ok(Err(e)) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "http.transport_error"
                );
                return Err(Error::Transport(e));
            }
            Err(_) => return Err(self.timed_out(request, timeout)),
        };

        let body = negotiate_body(content_type.as_deref(), &text);
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "http.response"
        );
        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body);
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                "{} {} rejected with 401: '{}'",
                request.method, request.path, message
            );
        } else {
            warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                message = %message,
                "http.error"
            );
        }
        Err(Error::Http {
            status,
            message,
            body,
        })
    }

    fn timed_out(&self, request: &Request, timeout: Duration) -> Error {
        warn!(
            method = %request.method,
            path = %request.path,
            timeout_ms = timeout.as_millis() as u64,
            "http.timeout"
        );
        Error::Timeout(timeout)
    }
}

/// JSON content types are parsed; everything else comes back as text.
/// Unparseable or empty bodies collapse to `Null` so they never mask the status.
pub(crate) fn negotiate_body(content_type: Option<&str>, text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase())
        .is_some_and(|ct| ct.contains("application/json") || ct.contains("+json"));
    if !is_json {
        return Value::String(text.to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        debug!(error = %e, "response declared JSON but did not parse; treating as empty");
        Value::Null
    })
}

/// Prefer a `message` field, then a plain-text body, else nothing.
fn error_message(body: &Value) -> String {
    match body {
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => String::new(),
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
    Ok((header_name, header_value))
}

fn header_map<'a>(
    pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let (name, value) = header_pair(name, value)?;
        headers.insert(name, value);
    }
    Ok(headers)
}
