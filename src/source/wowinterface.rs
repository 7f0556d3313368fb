//! WoWInterface client.
//!
//! `GET {base}/filedetails/{id}.json` answers with a one-element array describing
//! the file, or with an `{"ERROR": ...}` object for unknown ids.

use super::http::endpoint_url;
use super::{HttpClient, Release, RemoteMetadata, ResolveError, SourceClient, json_string};
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use futures::future::BoxFuture;
use regex::Regex;
use std::sync::LazyLock;

static INFO_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)/(?:info|download|landing\.php\?fileid=)(\d+)").ok());

pub struct WowInterfaceClient {
    http: HttpClient,
    base_url: String,
}

impl WowInterfaceClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl SourceClient for WowInterfaceClient {
    fn addon_type(&self) -> AddonType {
        AddonType::WowInterface
    }

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        _flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>> {
        Box::pin(async move {
            if identifier.is_empty() {
                return Err(ResolveError::NotFound);
            }
            let url = endpoint_url(&self.base_url, &["filedetails", &format!("{identifier}.json")])?;
            let body = self.http.get_json(url.as_str(), None).await?;
            parse_file_details(identifier, &body)
        })
    }
}

/// Builds metadata from a `filedetails` response body.
pub fn parse_file_details(
    id: &str,
    body: &serde_json::Value,
) -> Result<RemoteMetadata, ResolveError> {
    if body.get("ERROR").is_some() {
        return Err(ResolveError::NotFound);
    }
    let entry = match body {
        serde_json::Value::Array(entries) => entries.first().ok_or(ResolveError::NotFound)?,
        _ => {
            return Err(ResolveError::InvalidResponse(
                "expected an array of file details".to_string(),
            ));
        }
    };

    let field = |key: &str| {
        json_string(entry, key)
            .ok_or_else(|| ResolveError::InvalidResponse(format!("missing field {key}")))
    };

    let name = field("UIName")?;
    let version = field("UIVersion")?;
    let download_url = field("UIDownload")?;
    let author = json_string(entry, "UIAuthorName").unwrap_or_default();
    let target_name = json_string(entry, "UIFileName")
        .map(|f| strip_extension(&f).to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| name.clone());

    Ok(RemoteMetadata {
        secondary_name: Some(name.clone()),
        name,
        target_name,
        author,
        source: AddonSource::WowInterface {
            id: id.to_string(),
            url: format!("https://www.wowinterface.com/downloads/info{id}"),
        },
        declared_folders: Vec::new(),
        releases: vec![Release {
            channel: Channel::Stable,
            version,
            download_url,
        }],
    })
}

fn strip_extension(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
}

/// Extracts the file id from a WoWInterface page URL.
pub fn id_from_url(url: &str) -> Option<String> {
    INFO_ID.as_ref()?.captures(url).map(|c| c[1].to_string())
}
