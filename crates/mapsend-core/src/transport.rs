//! HTTP POST plumbing on libcurl.
//!
//! Uses the curl crate's Easy handle for multipart form and JSON bodies.
//! Requests block the current thread; async callers go through
//! `spawn_blocking` (see `run_blocking`).

use std::fmt;
use std::time::Duration;

use crate::retry::{Classify, FailureKind};

/// Connect and total timeouts for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(120),
        }
    }
}

/// One multipart field.
#[derive(Debug, Clone)]
pub enum FormField {
    Text { name: String, value: String },
    File {
        name: String,
        file_name: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// Error from a single request (local I/O, curl failure, or HTTP error).
/// Used so we can classify and decide retries before converting to anyhow.
#[derive(Debug)]
pub enum RequestError {
    /// Curl reported an error (timeout, connection, bad URL, etc.).
    Curl(curl::Error),
    /// Multipart form could not be assembled.
    Form(curl::FormError),
    /// HTTP response had a non-2xx status.
    Status { status: u32, body: String },
    /// Reading the local file to send failed.
    Io(std::io::Error),
    /// The request could not be built (bad endpoint, unserializable body).
    Invalid(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Curl(e) => write!(f, "{}", e),
            RequestError::Form(e) => write!(f, "invalid form: {}", e),
            RequestError::Status { status, body } if body.trim().is_empty() => {
                write!(f, "HTTP {}", status)
            }
            RequestError::Status { status, body } => write!(f, "HTTP {}: {}", status, body.trim()),
            RequestError::Io(e) => write!(f, "{}", e),
            RequestError::Invalid(msg) => write!(f, "invalid request: {}", msg),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Curl(e) => Some(e),
            RequestError::Form(e) => Some(e),
            RequestError::Io(e) => Some(e),
            RequestError::Status { .. } | RequestError::Invalid(_) => None,
        }
    }
}

impl From<curl::Error> for RequestError {
    fn from(e: curl::Error) -> Self {
        RequestError::Curl(e)
    }
}

impl From<curl::FormError> for RequestError {
    fn from(e: curl::FormError) -> Self {
        RequestError::Form(e)
    }
}

impl Classify for RequestError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            RequestError::Curl(e) => classify_curl_error(e),
            RequestError::Status { .. } => FailureKind::Retryable,
            RequestError::Form(_) | RequestError::Io(_) | RequestError::Invalid(_) => {
                FailureKind::Fatal
            }
        }
    }
}

/// Classify a curl error: request-construction mistakes are fatal, anything
/// on the wire is worth another attempt.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_url_malformed()
        || e.is_unsupported_protocol()
        || e.is_bad_function_argument()
        || e.is_unknown_option()
    {
        return FailureKind::Fatal;
    }
    FailureKind::Retryable
}

/// Status and body of a 2xx response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    pub body: String,
}

/// POST a multipart form.
pub fn post_form(url: &str, fields: Vec<FormField>, opts: HttpOptions) -> Result<HttpResponse, RequestError> {
    let mut form = curl::easy::Form::new();
    for field in fields {
        match field {
            FormField::Text { name, value } => {
                form.part(&name).contents(value.as_bytes()).add()?;
            }
            FormField::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                form.part(&name)
                    .buffer(&file_name, data)
                    .content_type(&content_type)
                    .add()?;
            }
        }
    }

    let mut easy = new_handle(url, opts)?;
    easy.httppost(form)?;
    perform(easy)
}

/// POST a JSON document.
pub fn post_json(url: &str, body: &[u8], opts: HttpOptions) -> Result<HttpResponse, RequestError> {
    let mut easy = new_handle(url, opts)?;
    easy.post(true)?;
    easy.post_fields_copy(body)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    list.append("Expect:")?;
    easy.http_headers(list)?;
    perform(easy)
}

fn new_handle(url: &str, opts: HttpOptions) -> Result<curl::easy::Easy, RequestError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;
    easy.useragent(concat!("mapsend/", env!("CARGO_PKG_VERSION")))?;

    let mut list = curl::easy::List::new();
    list.append("Expect:")?;
    easy.http_headers(list)?;
    Ok(easy)
}

fn perform(mut easy: curl::easy::Easy) -> Result<HttpResponse, RequestError> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    let body = String::from_utf8_lossy(&body).into_owned();
    if !(200..300).contains(&status) {
        return Err(RequestError::Status { status, body });
    }
    Ok(HttpResponse { status, body })
}

/// Run a blocking request on the blocking pool. A panic inside `f` is
/// re-raised on the calling task.
pub async fn run_blocking<T, F>(f: F) -> Result<T, RequestError>
where
    F: FnOnce() -> Result<T, RequestError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(RequestError::Io(std::io::Error::new(
            std::io::ErrorKind::Interrupted,
            format!("request task cancelled: {}", e),
        ))),
    }
}
