//! Git host client.
//!
//! The identifier is the clone URL. The remote `HEAD` commit acts as the version,
//! so an add-on tracked from git updates whenever the default branch moves.

use super::{Artifact, Release, RemoteMetadata, ResolveError, SourceClient};
use crate::git;
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use futures::future::BoxFuture;

#[derive(Debug, Clone, Copy, Default)]
pub struct GitClient;

impl GitClient {
    pub const fn new() -> Self {
        Self
    }
}

impl SourceClient for GitClient {
    fn addon_type(&self) -> AddonType {
        AddonType::Git
    }

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        _flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>> {
        Box::pin(async move {
            let head = git::remote_head(identifier).await.ok_or_else(|| {
                ResolveError::Network(format!(
                    "unable to read HEAD of {}",
                    git::strip_auth_from_url(identifier)
                ))
            })?;
            let name = git::repo_name_from_url(identifier);

            Ok(RemoteMetadata {
                name: name.clone(),
                target_name: name,
                secondary_name: None,
                author: String::new(),
                source: AddonSource::Git {
                    url: identifier.to_string(),
                    commit: Some(head.clone()),
                },
                declared_folders: Vec::new(),
                releases: vec![Release {
                    channel: Channel::Stable,
                    version: head,
                    download_url: identifier.to_string(),
                }],
            })
        })
    }

    fn artifact_location(
        &self,
        metadata: &RemoteMetadata,
        channel: Option<Channel>,
    ) -> Option<Artifact> {
        metadata.release(channel).map(|r| Artifact::Clone {
            url: r.download_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::GitFixture;

    #[tokio::test]
    async fn test_resolve_local_repository() {
        let fixture = GitFixture::new("RepoAddon").await.unwrap();
        fixture.write("RepoAddon.toc", "## Title: RepoAddon\n").unwrap();
        let commit = fixture.commit("initial").await.unwrap();

        let client = GitClient::new();
        let meta = client.resolve_metadata(&fixture.url(), Flavor::Retail).await.unwrap();
        assert_eq!(meta.target_name, "RepoAddon");
        assert_eq!(meta.version(None), Some(commit.as_str()));
        assert_eq!(meta.source.commit_hash(), Some(commit.as_str()));
        assert_eq!(
            client.artifact_location(&meta, None),
            Some(Artifact::Clone {
                url: fixture.url()
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_remote() {
        let temp = tempfile::tempdir().unwrap();
        let url = format!("file://{}/nothing-here", temp.path().display());
        assert!(matches!(
            GitClient::new().resolve_metadata(&url, Flavor::Retail).await,
            Err(ResolveError::Network(_))
        ));
    }
}
