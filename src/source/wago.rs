//! Wago client.
//!
//! `GET {base}/addons/{id}?game_version={flavor}` with a bearer token. The body
//! lists releases tagged with a stability; older API versions call the download
//! URL `link`, newer ones `download_link`, so both are read.

use super::http::endpoint_url;
use super::{HttpClient, Release, RemoteMetadata, ResolveError, SourceClient, json_string};
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use futures::future::BoxFuture;

pub struct WagoClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl WagoClient {
    pub fn new(http: HttpClient, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl SourceClient for WagoClient {
    fn addon_type(&self) -> AddonType {
        AddonType::Wago
    }

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>> {
        Box::pin(async move {
            let Some(api_key) = self.api_key.as_deref() else {
                tracing::debug!(target: "source", "No Wago API key configured");
                return Err(ResolveError::NoApiKey);
            };
            let mut url = endpoint_url(&self.base_url, &["addons", identifier])?;
            url.query_pairs_mut().append_pair("game_version", flavor.game_version());
            let body = self.http.get_json(url.as_str(), Some(api_key)).await?;
            parse_addon(identifier, &body)
        })
    }
}

/// Builds metadata from an `addons/{id}` response body.
///
/// Releases keep the order of the payload, which lists the newest first.
/// Releases with an unknown stability or without a download URL are skipped.
pub fn parse_addon(id: &str, body: &serde_json::Value) -> Result<RemoteMetadata, ResolveError> {
    if !body.is_object() {
        return Err(ResolveError::InvalidResponse("expected an add-on object".to_string()));
    }
    if body.get("error").is_some() {
        return Err(ResolveError::NotFound);
    }

    let name = json_string(body, "display_name")
        .or_else(|| json_string(body, "name"))
        .ok_or_else(|| ResolveError::InvalidResponse("missing field display_name".to_string()))?;

    let author = body
        .get("authors")
        .and_then(serde_json::Value::as_array)
        .map(|authors| {
            authors.iter().filter_map(serde_json::Value::as_str).collect::<Vec<_>>().join(", ")
        })
        .unwrap_or_default();

    let releases: Vec<Release> = body
        .get("releases")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ResolveError::InvalidResponse("missing field releases".to_string()))?
        .iter()
        .filter_map(parse_release)
        .collect();

    if releases.is_empty() {
        return Err(ResolveError::NotFound);
    }

    let page_url = json_string(body, "website_url")
        .unwrap_or_else(|| format!("https://addons.wago.io/addons/{id}"));

    Ok(RemoteMetadata {
        target_name: name.clone(),
        name,
        secondary_name: None,
        author,
        source: AddonSource::Wago {
            id: id.to_string(),
            url: page_url,
            channel: Channel::default(),
        },
        declared_folders: Vec::new(),
        releases,
    })
}

fn parse_release(value: &serde_json::Value) -> Option<Release> {
    let channel = json_string(value, "stability")?.parse::<Channel>().ok()?;
    let version = json_string(value, "label")?;
    let download_url = json_string(value, "download_link").or_else(|| json_string(value, "link"))?;
    Some(Release {
        channel,
        version,
        download_url,
    })
}

/// Extracts the id from an `addons.wago.io/addons/{id}` URL.
pub fn id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let mut segments = path.split('/').skip_while(|s| *s != "addons").skip(1);
    segments.next().filter(|s| !s.is_empty()).map(str::to_string)
}
