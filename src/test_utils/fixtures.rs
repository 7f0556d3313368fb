//! On-disk fixtures: zip archives, add-on folders and local git repositories.

use crate::git::command_builder::GitCommand;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Writes a zip at `path` holding `entries` as `(name, content)` pairs.
///
/// Names are stored verbatim, so traversal entries such as `../x` can be
/// produced for negative tests.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create fixture zip {}", path.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}

/// Manifest content with the given title and version.
#[must_use]
pub fn toc(title: &str, version: &str) -> String {
    format!("## Interface: 110002\n## Title: {title}\n## Version: {version}\n## Author: Fixture\n")
}

/// Creates `<dest>/<folder>/<folder>.toc` plus a Lua file, returning the folder path.
pub fn write_addon(dest: &Path, folder: &str, version: &str) -> Result<PathBuf> {
    let dir = dest.join(folder);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(format!("{folder}.toc")), toc(folder, version))?;
    std::fs::write(dir.join("core.lua"), format!("-- {folder} {version}\n"))?;
    Ok(dir)
}

/// A git repository in a temporary directory, reachable through a `file://` URL.
pub struct GitFixture {
    _temp: tempfile::TempDir,
    path: PathBuf,
}

impl GitFixture {
    /// Initializes an empty repository in a directory called `name`.
    pub async fn new(name: &str) -> Result<Self> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join(name);
        std::fs::create_dir_all(&path)?;
        GitCommand::init().current_dir(&path).execute_success().await?;
        Ok(Self {
            _temp: temp,
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Writes `content` to `rel` inside the working tree.
    pub fn write(&self, rel: &str, content: &str) -> Result<()> {
        let file = self.path.join(rel);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, content)
            .with_context(|| format!("Failed to write fixture file {}", file.display()))
    }

    /// Commits everything and returns the new `HEAD` hash.
    pub async fn commit(&self, message: &str) -> Result<String> {
        GitCommand::add(".").current_dir(&self.path).execute_success().await?;
        GitCommand::commit(message).current_dir(&self.path).execute_success().await?;
        let head = GitCommand::current_commit().current_dir(&self.path).execute_stdout().await?;
        Ok(head.trim().to_string())
    }
}
