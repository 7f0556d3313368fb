//! Installs an add-on from a URL or a catalog id.
//!
//! ```text
//! resolve metadata -> fetch -> extract -> discover -> choose parent
//!     -> copy folders -> record parent -> claim owned rows -> scan
//! ```
//!
//! Nothing touches the destination before the copy step. From then on every
//! folder is recorded before it is written, so a failure at any later point
//! lets [`undo`](AddonCommand::undo) delete exactly the folders and rows this
//! install created. Install takes no backup of a folder it overwrites; use
//! [`UpdateCommand`](super::UpdateCommand) for anything already tracked.

use super::{AddonCommand, CommandContext, CommandError, Failure, ScanCommand, delete_folder, source_error};
use crate::events::{Operation, Stage};
use crate::installer::DiscoveredFolder;
use crate::models::{AddonRecord, AddonSource, AddonType, Channel};
use crate::ownership::{self, Ownership, ParentHints};
use crate::source::{self, ParsedSource, RemoteMetadata, ResolveError};
use chrono::Utc;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Folder tracked as the add-on
    pub parent: String,
    /// Every folder written to the destination, sorted
    pub installed_addons: Vec<String>,
}

#[derive(Debug, Clone)]
enum Request {
    Url(String),
    Catalog(ParsedSource),
}

pub struct InstallCommand {
    request: Request,
    channel: Option<Channel>,
    destination: Option<PathBuf>,
    copied: Vec<String>,
}

impl InstallCommand {
    /// Installs from a user supplied URL, classified by [`source::parse_source`].
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_request(Request::Url(url.into()))
    }

    /// Installs `identifier` from the catalog of `addon_type`.
    pub fn from_catalog(addon_type: AddonType, identifier: impl Into<String>) -> Self {
        Self::with_request(Request::Catalog(ParsedSource {
            addon_type,
            identifier: identifier.into(),
        }))
    }

    fn with_request(request: Request) -> Self {
        Self {
            request,
            channel: None,
            destination: None,
            copied: Vec::new(),
        }
    }

    /// Follows `channel` instead of stable releases, where the source has channels.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        self.channel
    }

    fn parsed(&self) -> Result<ParsedSource, CommandError> {
        match &self.request {
            Request::Url(url) => source::parse_source(url).map_err(|e| CommandError::Failed {
                message: e.to_string(),
            }),
            Request::Catalog(parsed) => Ok(parsed.clone()),
        }
    }

    async fn install(&mut self, ctx: &CommandContext) -> Result<InstallReport, Failure> {
        let destination = ctx.destination()?;
        self.destination = Some(destination.clone());
        let parsed = self.parsed()?;
        let subject = self.subject();
        let client = ctx.client(parsed.addon_type)?;
        let settings = ctx.settings();

        ctx.emit(Operation::Install, Stage::Start, &subject);
        let metadata = client
            .resolve_metadata(&parsed.identifier, settings.flavor)
            .await
            .map_err(source_error(parsed.addon_type))?;
        let release = metadata
            .release(self.channel)
            .cloned()
            .ok_or(CommandError::Source {
                origin: parsed.addon_type,
                error: ResolveError::NotFound,
            })?;
        let artifact = client.artifact_location(&metadata, self.channel).ok_or(CommandError::Source {
            origin: parsed.addon_type,
            error: ResolveError::NotFound,
        })?;

        ctx.emit(Operation::Install, Stage::Downloading, &subject);
        let mut staging = ctx.installer.fetch(&artifact).await?;
        ctx.emit(Operation::Install, Stage::Extracting, &subject);
        staging.extract().await?;
        let folders = staging.discover(&parsed.identifier)?;
        let ownership = choose_parent(&folders, &metadata);
        tracing::info!(
            target: "commands",
            "Installing {} as '{}' ({} owned folder(s))",
            subject,
            ownership.parent,
            ownership.owned.len()
        );

        ctx.emit(Operation::Install, Stage::Copying, &subject);
        for folder in &folders {
            self.copied.push(folder.name.clone());
            ctx.installer.copy_folder(folder, &destination).await?;
        }

        let now = Utc::now();
        let mut record = AddonRecord::new(&ownership.parent, now);
        if let Some(existing) = ctx.repository.get(&ownership.parent) {
            record.install_date = existing.install_date;
            record.kind = existing.kind;
            record.kind_override = existing.kind_override;
        }
        record.name.clone_from(&metadata.name);
        record.author.clone_from(&metadata.author);
        record.version.clone_from(&release.version);
        record.remote_version = Some(release.version.clone());
        record.last_checked = Some(now);
        record.source = with_channel(metadata.source.clone(), self.channel);
        record.flavor = settings.flavor;
        record.owned_folders = ownership.owned.clone();
        ctx.repository.upsert(record)?;
        ctx.repository.claim_owned_folders(&ownership.parent, &ownership.owned)?;

        ScanCommand::restricted_to([ownership.parent.clone()]).scan(ctx).await?;

        ctx.emit(Operation::Install, Stage::Complete, &subject);
        let mut installed_addons: Vec<String> = folders.into_iter().map(|f| f.name).collect();
        installed_addons.sort();
        Ok(InstallReport {
            parent: ownership.parent,
            installed_addons,
        })
    }
}

/// Picks the parent folder. A source that declares its folders names the
/// parent first; otherwise the ownership rules decide.
fn choose_parent(folders: &[DiscoveredFolder], metadata: &RemoteMetadata) -> Ownership {
    let names: Vec<String> = folders.iter().map(|f| f.name.clone()).collect();

    if let Some(declared) = metadata.declared_folders.first()
        && let Some(parent) = names.iter().find(|n| n.eq_ignore_ascii_case(declared))
    {
        return ownership::with_parent(&names, parent.clone());
    }

    let hints = ParentHints {
        target_name: &metadata.target_name,
        secondary_name: metadata.secondary_name.as_deref(),
    };
    ownership::classify(&names, &hints)
        .unwrap_or_else(|| ownership::with_parent(&names, metadata.target_name.clone()))
}

/// Stamps the requested channel onto channel-aware sources.
fn with_channel(source: AddonSource, requested: Option<Channel>) -> AddonSource {
    match (source, requested) {
        (
            AddonSource::Wago {
                id,
                url,
                ..
            },
            Some(channel),
        ) => AddonSource::Wago {
            id,
            url,
            channel,
        },
        (source, _) => source,
    }
}

impl AddonCommand for InstallCommand {
    type Output = InstallReport;

    fn operation(&self) -> Operation {
        Operation::Install
    }

    fn subject(&self) -> String {
        match &self.request {
            Request::Url(url) => crate::git::strip_auth_from_url(url),
            Request::Catalog(parsed) => format!("{}:{}", parsed.addon_type, parsed.identifier),
        }
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a CommandContext,
    ) -> BoxFuture<'a, Result<Self::Output, Failure>> {
        Box::pin(self.install(ctx))
    }

    fn undo<'a>(&'a mut self, ctx: &'a CommandContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(destination) = self.destination.clone() else {
                return;
            };
            for folder in self.copied.drain(..).rev() {
                if let Err(e) = delete_folder(&destination.join(&folder)).await {
                    tracing::error!(target: "commands", "Rollback could not delete '{}': {:#}", folder, e);
                }
                if let Err(e) = ctx.repository.remove(&folder) {
                    tracing::error!(target: "commands", "Rollback could not drop row '{}': {:#}", folder, e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn discovered(names: &[&str]) -> Vec<DiscoveredFolder> {
        names
            .iter()
            .map(|n| DiscoveredFolder {
                name: (*n).to_string(),
                path: Path::new("/stage").join(n),
            })
            .collect()
    }

    fn metadata(target: &str, declared: &[&str]) -> RemoteMetadata {
        RemoteMetadata {
            name: target.to_string(),
            target_name: target.to_string(),
            secondary_name: None,
            author: String::new(),
            source: AddonSource::Manual,
            declared_folders: declared.iter().map(|s| (*s).to_string()).collect(),
            releases: Vec::new(),
        }
    }

    #[test]
    fn test_declared_folders_name_the_parent() {
        let folders = discovered(&["ElvUI_Options", "ElvUI", "ElvUI_Libraries"]);
        let ownership =
            choose_parent(&folders, &metadata("whatever", &["ElvUI", "ElvUI_Options", "ElvUI_Libraries"]));
        assert_eq!(ownership.parent, "ElvUI");
        assert_eq!(ownership.owned.len(), 2);
    }

    #[test]
    fn test_declared_parent_missing_falls_back_to_rules() {
        let folders = discovered(&["DBM-Core", "DBM-GUI"]);
        let ownership = choose_parent(&folders, &metadata("DBM-GUI", &["Other"]));
        assert_eq!(ownership.parent, "DBM-GUI");
    }

    #[test]
    fn test_channel_stamped_on_wago_only() {
        let wago = AddonSource::Wago {
            id: "x".to_string(),
            url: "u".to_string(),
            channel: Channel::Stable,
        };
        assert_eq!(with_channel(wago, Some(Channel::Alpha)).channel(), Some(Channel::Alpha));
        assert_eq!(with_channel(AddonSource::Manual, Some(Channel::Alpha)), AddonSource::Manual);
    }

    #[test]
    fn test_subject() {
        assert_eq!(InstallCommand::from_catalog(AddonType::Tukui, "elvui").subject(), "tukui:elvui");
        assert_eq!(
            InstallCommand::from_url("https://u:t@github.com/user/RepoAddon").subject(),
            "https://github.com/user/RepoAddon"
        );
    }
}
