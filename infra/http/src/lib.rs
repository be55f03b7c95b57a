//! Thin async HTTP client wrapper.
//!
//! [`HttpClient`] holds a shared `reqwest` client configured once through
//! its builder (default headers, timeouts, user agent). Verb methods
//! return the raw [`Response`]; `*_text` and `*_json` forms decode the
//! body. Form fields are sent as multipart text parts. Responses are
//! passed through whatever their status; only downloads insist on
//! success before touching the disk.
//!
//! ```no_run
//! use shed_http::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shed_http::HttpError> {
//!     let client = HttpClient::new()?;
//!     let body = client.get_text("https://example.com", &[("q", "rust")]).await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```

mod error;

pub use crate::error::{HttpError, HttpErrorExt};
pub use reqwest::{Method, Response, StatusCode, multipart};

use std::{path::Path, time::Duration};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Per-chunk download callback: bytes written so far and the total from
/// `Content-Length` when the server sent one.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, Option<u64>) + Send);

/// Cloneable HTTP handle; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::builder().init()
    }

    /// Creates a new [`HttpClientBuilder`].
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// The underlying `reqwest` client.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// A request builder for anything this surface lacks (per-request
    /// timeouts, streaming bodies, extra headers).
    #[must_use]
    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// `GET` with query parameters.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        let mut builder = self.client.get(url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder.send().await.context(format!("GET {url}"))
    }

    /// `GET` returning the body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, HttpError> {
        self.get(url, query).await?.text().await.context("Reading response body")
    }

    /// `GET` decoding the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        self.get(url, query).await?.json().await.context("Decoding response body")
    }

    /// `POST` with form fields sent as multipart text parts.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        self.send_form(Method::POST, url, fields).await
    }

    /// `POST` with a JSON body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, HttpError> {
        self.client.post(url).json(body).send().await.context(format!("POST {url}"))
    }

    /// `POST` with a JSON body, returning the response as text.
    pub async fn post_json_text<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<String, HttpError> {
        self.post_json(url, body).await?.text().await.context("Reading response body")
    }

    /// `POST` with a JSON body, decoding the response as JSON.
    pub async fn post_json_as<B, T>(&self, url: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json(url, body).await?.json().await.context("Decoding response body")
    }

    /// `POST` with a prebuilt multipart form.
    pub async fn post_multipart(
        &self,
        url: &str,
        form: multipart::Form,
    ) -> Result<Response, HttpError> {
        self.client.post(url).multipart(form).send().await.context(format!("POST {url}"))
    }

    /// `PUT` with a JSON body.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, HttpError> {
        self.client.put(url).json(body).send().await.context(format!("PUT {url}"))
    }

    /// `PUT` with form fields sent as multipart text parts.
    pub async fn put_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        self.send_form(Method::PUT, url, fields).await
    }

    /// `DELETE` with query parameters.
    pub async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        let mut builder = self.client.delete(url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder.send().await.context(format!("DELETE {url}"))
    }

    /// `DELETE` with a JSON body.
    pub async fn delete_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, HttpError> {
        self.client.delete(url).json(body).send().await.context(format!("DELETE {url}"))
    }

    /// `OPTIONS` request.
    pub async fn options(&self, url: &str) -> Result<Response, HttpError> {
        self.client
            .request(Method::OPTIONS, url)
            .send()
            .await
            .context(format!("OPTIONS {url}"))
    }

    /// Streams a `GET` body into `path` in chunks, creating missing parent
    /// directories. Returns the byte count.
    ///
    /// `progress` is invoked after every chunk. Non-success statuses abort
    /// before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Request`] for connection and status failures
    /// and [`HttpError::Io`] when the file cannot be written.
    pub async fn download(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<u64, HttpError> {
        self.download_via(Method::GET, url, None, path, progress).await
    }

    /// [`download`](Self::download) with an explicit method and optional
    /// JSON body, for download endpoints that want a `POST`.
    pub async fn download_via(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        path: impl AsRef<Path>,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<u64, HttpError> {
        let label = format!("{method} {url}");
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut response = builder
            .send()
            .await
            .context(label.clone())?
            .error_for_status()
            .context(label)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Creating {}", parent.display()))?;
        }
        let total = response.content_length();
        let mut file = tokio::fs::File::create(path)
            .await
            .context(format!("Creating {}", path.display()))?;
        let mut done: u64 = 0;
        while let Some(chunk) = response.chunk().await.context("Reading download chunk")? {
            file.write_all(&chunk).await.context("Writing download chunk")?;
            done += chunk.len() as u64;
            if let Some(on_progress) = progress.as_mut() {
                on_progress(done, total);
            }
        }
        file.flush().await.context("Flushing download")?;
        debug!(bytes = done, "Downloaded {url} into {}", path.display());
        Ok(done)
    }

    /// Multipart upload of a file, with the part file name taken from the
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Validation`] when the path carries no file name
    /// and [`HttpError::Io`] when it cannot be read.
    pub async fn upload_file(
        &self,
        url: &str,
        field: &str,
        path: impl AsRef<Path>,
        extra_fields: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| HttpError::Validation {
                message: format!("no file name in {}", path.display()).into(),
                context: None,
            })?;
        let bytes =
            tokio::fs::read(path).await.context(format!("Reading {}", path.display()))?;
        self.upload_bytes(url, field, &file_name, bytes, None, extra_fields).await
    }

    /// Multipart upload of an in-memory payload under `field`, with an
    /// optional MIME type and extra text fields.
    pub async fn upload_bytes(
        &self,
        url: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime: Option<&str>,
        extra_fields: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        let mut part = multipart::Part::bytes(bytes).file_name(file_name.to_owned());
        if let Some(mime) = mime {
            part = part.mime_str(mime).context(format!("MIME type {mime}"))?;
        }
        let mut form = multipart::Form::new().part(field.to_owned(), part);
        for (name, value) in extra_fields {
            form = form.text((*name).to_owned(), (*value).to_owned());
        }
        self.post_multipart(url, form).await
    }

    async fn send_form(
        &self,
        method: Method,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        let label = format!("{method} {url}");
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            form = form.text((*name).to_owned(), (*value).to_owned());
        }
        self.client.request(method, url).multipart(form).send().await.context(label)
    }
}

/// A fluent builder for configuring an [`HttpClient`].
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: Vec<(String, String)>,
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    /// Total request timeout, connect through body.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Connect-phase timeout.
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// A default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The `User-Agent` header value.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Validation`] for malformed header names or
    /// values.
    pub fn init(self) -> Result<HttpClient, HttpError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                HttpError::Validation {
                    message: format!("invalid header name: {name}").into(),
                    context: None,
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| HttpError::Validation {
                message: format!("invalid value for header {name}").into(),
                context: None,
            })?;
            headers.insert(name, value);
        }
        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect) = self.connect_timeout {
            builder = builder.connect_timeout(connect);
        }
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().context("Building HTTP client")?;
        debug!("HTTP client ready");
        Ok(HttpClient { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_malformed_headers() {
        let err = HttpClient::builder().header("bad header", "x").init().unwrap_err();
        assert!(matches!(err, HttpError::Validation { .. }));

        let err = HttpClient::builder().header("x-ok", "bad\nvalue").init().unwrap_err();
        assert!(matches!(err, HttpError::Validation { .. }));
    }

    #[test]
    fn builder_accepts_full_configuration() {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .header("x-api-key", "secret")
            .user_agent("toolshed-tests")
            .init();
        assert!(client.is_ok());
    }
}
