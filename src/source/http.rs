//! Shared HTTP plumbing for the catalog clients and archive downloads.
//!
//! Status codes are mapped onto [`ResolveError`] here so every catalog client
//! treats "404", "401" and a garbled body the same way.

use super::ResolveError;
use crate::constants::{HTTP_DOWNLOAD_TIMEOUT, HTTP_REQUEST_TIMEOUT, USER_AGENT};
use crate::core::WamError;
use crate::utils::fs::ensure_parent_dir;
use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;

/// Appends `segments` to the path of `base`, percent-encoding each one so an
/// identifier can never add path levels or a query string.
///
/// Empty, `.` and `..` segments name no add-on and resolve to
/// [`ResolveError::NotFound`] without a request.
pub fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, ResolveError> {
    if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
        return Err(ResolveError::NotFound);
    }
    let invalid = |reason: String| ResolveError::Network(format!("invalid endpoint {base}: {reason}"));
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot hold a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// A cloneable `reqwest` client with WAM defaults.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
        })
    }

    /// GETs `url` and decodes the body as JSON.
    ///
    /// 404 becomes [`ResolveError::NotFound`], 401/403 become
    /// [`ResolveError::NoApiKey`], a body that is not JSON becomes
    /// [`ResolveError::InvalidResponse`].
    pub async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, ResolveError> {
        tracing::debug!(target: "source", "GET {}", url);
        let start = Instant::now();

        let mut request = self.client.get(url).timeout(HTTP_REQUEST_TIMEOUT);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(target: "source", "Request to {} failed: {}", url, e);
            ResolveError::Network(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(target: "source", "Response: {} in {:?}", status, start.elapsed());
        check_status(status)?;

        let body = response.text().await.map_err(|e| ResolveError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            ResolveError::InvalidResponse(format!("Response from {url} is not valid JSON: {e}"))
        })
    }

    /// Downloads `url` into `dest`.
    ///
    /// `file://` URLs are copied from the local file system.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        ensure_parent_dir(dest)?;

        if let Some(path) = file_url_path(url) {
            tokio::fs::copy(&path, dest).await.map_err(|e| WamError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(());
        }

        tracing::debug!(target: "source", "Downloading {}", url);
        let start = Instant::now();

        let download_failed = |reason: String| WamError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .timeout(HTTP_DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| download_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_failed(format!("HTTP {}", response.status())).into());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| download_failed(e.to_string()))? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(target: "source", "Downloaded {} bytes in {:?}", written, start.elapsed());
        Ok(())
    }
}

fn check_status(status: StatusCode) -> Result<(), ResolveError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(ResolveError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ResolveError::NoApiKey),
        s => Err(ResolveError::Network(format!("HTTP {s}"))),
    }
}

/// The local path of a `file://` URL.
#[must_use]
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file://")?;
    // file:///C:/x on Windows
    let rest = match rest.as_bytes() {
        [b'/', _, b':', ..] => &rest[1..],
        _ => rest,
    };
    Some(PathBuf::from(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let url = endpoint_url("https://api.tukui.org/v1", &["addon", "elvui"]).unwrap();
        assert_eq!(url.as_str(), "https://api.tukui.org/v1/addon/elvui");

        let url = endpoint_url("https://addons.wago.io/api", &["addons", "a/b?x=1#y"]).unwrap();
        assert_eq!(url.path(), "/api/addons/a%2Fb%3Fx=1%23y");
        assert_eq!(url.query(), None);

        assert_eq!(endpoint_url("https://api.tukui.org/v1", &["addon", ".."]), Err(ResolveError::NotFound));
        assert_eq!(endpoint_url("https://api.tukui.org/v1", &["addon", ""]), Err(ResolveError::NotFound));
        assert!(matches!(endpoint_url("not a url", &["x"]), Err(ResolveError::Network(_))));
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(StatusCode::OK), Ok(()));
        assert_eq!(check_status(StatusCode::NOT_FOUND), Err(ResolveError::NotFound));
        assert_eq!(check_status(StatusCode::UNAUTHORIZED), Err(ResolveError::NoApiKey));
        assert_eq!(check_status(StatusCode::FORBIDDEN), Err(ResolveError::NoApiKey));
        assert!(matches!(
            check_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(ResolveError::Network(_))
        ));
    }

    #[test]
    fn test_file_url_path() {
        assert_eq!(file_url_path("file:///tmp/a.zip"), Some(PathBuf::from("/tmp/a.zip")));
        assert_eq!(file_url_path("file:///C:/a.zip"), Some(PathBuf::from("C:/a.zip")));
        assert_eq!(file_url_path("https://example.com/a.zip"), None);
    }

    #[tokio::test]
    async fn test_download_file_url() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src.zip");
        std::fs::write(&src, b"PK").unwrap();
        let dest = temp.path().join("out").join("dest.zip");

        let http = HttpClient::new().unwrap();
        http.download(&format!("file://{}", src.display()), &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_download_missing_file_url() {
        let temp = tempfile::tempdir().unwrap();
        let http = HttpClient::new().unwrap();
        let err = http
            .download(
                &format!("file://{}/missing.zip", temp.path().display()),
                &temp.path().join("out.zip"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<WamError>(), Some(WamError::DownloadFailed { .. })));
    }
}
