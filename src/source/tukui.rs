//! Tukui client.
//!
//! `GET {base}/addon/{slug}` returns a single add-on object. Tukui releases name
//! their folders up front in `directories`; the first entry is the parent.

use super::http::endpoint_url;
use super::{HttpClient, Release, RemoteMetadata, ResolveError, SourceClient, json_string};
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use futures::future::BoxFuture;

pub struct TukuiClient {
    http: HttpClient,
    base_url: String,
}

impl TukuiClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl SourceClient for TukuiClient {
    fn addon_type(&self) -> AddonType {
        AddonType::Tukui
    }

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        _flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>> {
        Box::pin(async move {
            let slug = identifier.to_ascii_lowercase();
            let url = endpoint_url(&self.base_url, &["addon", &slug])?;
            let body = self.http.get_json(url.as_str(), None).await?;
            parse_addon(identifier, &body)
        })
    }
}

/// Builds metadata from an `addon/{slug}` response body.
pub fn parse_addon(slug: &str, body: &serde_json::Value) -> Result<RemoteMetadata, ResolveError> {
    if !body.is_object() {
        return Err(ResolveError::InvalidResponse("expected an add-on object".to_string()));
    }
    if body.get("error").is_some() {
        return Err(ResolveError::NotFound);
    }

    let field = |key: &str| {
        json_string(body, key)
            .ok_or_else(|| ResolveError::InvalidResponse(format!("missing field {key}")))
    };

    let name = field("name")?;
    let version = field("version")?;
    let download_url = field("url")?;
    let author = json_string(body, "author").unwrap_or_default();
    let slug = json_string(body, "slug").unwrap_or_else(|| slug.to_ascii_lowercase());
    let page_url =
        json_string(body, "web_url").unwrap_or_else(|| format!("https://tukui.org/{slug}"));

    let declared_folders: Vec<String> = body
        .get("directories")
        .and_then(serde_json::Value::as_array)
        .map(|dirs| dirs.iter().filter_map(|d| d.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let target_name = declared_folders.first().cloned().unwrap_or_else(|| name.clone());

    Ok(RemoteMetadata {
        name,
        target_name,
        secondary_name: None,
        author,
        source: AddonSource::Tukui {
            slug,
            url: page_url,
        },
        declared_folders,
        releases: vec![Release {
            channel: Channel::Stable,
            version,
            download_url,
        }],
    })
}

/// Extracts the slug from a Tukui page URL.
///
/// Accepts `https://tukui.org/elvui`, `https://www.tukui.org/addon/elvui` and the
/// legacy `download.php?ui=elvui` form.
pub fn slug_from_url(url: &str) -> Option<String> {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    for pair in query.split('&') {
        if let Some(("ui" | "id", value)) = pair.split_once('=')
            && !value.is_empty()
        {
            return Some(value.to_ascii_lowercase());
        }
    }

    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let segment = path.trim_end_matches('/').split('/').skip(1).last()?;
    (!segment.is_empty() && !segment.contains('.')).then(|| segment.to_ascii_lowercase())
}
