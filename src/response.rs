//! Buffered response sink and content-type helpers.
//!
//! Handlers never build a [`Response`] themselves: they write through the
//! [`Context`](crate::Context), which owns exactly one `Response` per
//! request. When the chain finishes the router hands the buffer back to the
//! server, which turns it into an `http::Response`.
//!
//! Semantics follow a streaming writer: the first status written sticks,
//! later body writes append.

use std::path::Path;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    Gif,          // image/gif
    Html,         // text/html; charset=utf-8
    Ico,          // image/x-icon
    Jpeg,         // image/jpeg
    JavaScript,   // text/javascript
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / unknown)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Wasm,         // application/wasm
    Woff2,        // font/woff2
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html; charset=utf-8",
            Self::Ico         => "image/x-icon",
            Self::Jpeg        => "image/jpeg",
            Self::JavaScript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Wasm        => "application/wasm",
            Self::Woff2       => "font/woff2",
            Self::Xml         => "application/xml",
        }
    }

    /// Guesses from a file extension. Unknown extensions are octet-stream.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("css")                => Self::Css,
            Some("csv")                => Self::Csv,
            Some("gif")                => Self::Gif,
            Some("htm" | "html")       => Self::Html,
            Some("ico")                => Self::Ico,
            Some("jpg" | "jpeg")       => Self::Jpeg,
            Some("js" | "mjs")         => Self::JavaScript,
            Some("json" | "map")       => Self::Json,
            Some("pdf")                => Self::Pdf,
            Some("png")                => Self::Png,
            Some("svg")                => Self::Svg,
            Some("txt" | "md")         => Self::Text,
            Some("wasm")               => Self::Wasm,
            Some("woff2")              => Self::Woff2,
            Some("xml")                => Self::Xml,
            _                          => Self::OctetStream,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// The response buffer for one request.
#[derive(Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// The status that will go on the wire. `200 OK` if nothing set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has been written yet.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// First value of header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, lossily. Handy in tests and logs.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Latches `status` unless one was already written.
    pub(crate) fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    pub(crate) fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    /// Replaces any existing value of `name`.
    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.add_header(name, value);
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Drops everything written so far.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// A bare response with only a status and a plain-text body.
    pub(crate) fn plain(status: StatusCode, body: &str) -> Self {
        let mut res = Self::default();
        res.write_status(status);
        res.set_header("content-type", ContentType::Text.as_str());
        res.write(body.as_bytes());
        res
    }

    /// Converts the buffer into the hyper response type. Headers whose name
    /// or value is not valid HTTP are dropped with a warning.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => {
                    headers.append(n, v);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}
