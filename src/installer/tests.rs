use super::*;
use crate::core::WamError;
use crate::test_utils::fixtures::{GitFixture, toc, write_zip};
use crate::test_utils::FailingCopier;
use tempfile::TempDir as TestDir;

fn installer() -> Installer {
    Installer::new(HttpClient::new().unwrap())
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[tokio::test]
async fn test_fetch_extract_discover_archive() {
    let temp = TestDir::new().unwrap();
    let archive = temp.path().join("dbm.zip");
    write_zip(
        &archive,
        &[
            ("DBM-Core/DBM-Core.toc", &toc("DBM", "10.0")),
            ("DBM-GUI/DBM-GUI.toc", &toc("DBM GUI", "10.0")),
            ("README.md", "docs"),
        ],
    )
    .unwrap();

    let mut staging = installer()
        .fetch(&Artifact::Archive {
            url: file_url(&archive),
        })
        .await
        .unwrap();
    staging.extract().await.unwrap();
    let folders = staging.discover("dbm").unwrap();
    let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["DBM-Core", "DBM-GUI"]);
    assert!(folders[0].path.starts_with(staging.tree()));
}

#[tokio::test]
async fn test_staging_removed_on_drop() {
    let temp = TestDir::new().unwrap();
    let archive = temp.path().join("a.zip");
    write_zip(&archive, &[("A/A.toc", "")]).unwrap();

    let staging = installer()
        .fetch(&Artifact::Archive {
            url: file_url(&archive),
        })
        .await
        .unwrap();
    let dir = staging.dir().to_path_buf();
    assert!(dir.join("download.zip").is_file());
    drop(staging);
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_fetch_missing_archive() {
    let temp = TestDir::new().unwrap();
    let err = installer()
        .fetch(&Artifact::Archive {
            url: file_url(&temp.path().join("missing.zip")),
        })
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<WamError>(), Some(WamError::DownloadFailed { .. })));
}

#[tokio::test]
async fn test_fetch_clone() {
    let fixture = GitFixture::new("RepoAddon").await.unwrap();
    fixture.write("RepoAddon/RepoAddon.toc", &toc("RepoAddon", "1.0")).unwrap();
    fixture.commit("initial").await.unwrap();

    let mut staging = installer()
        .fetch(&Artifact::Clone {
            url: fixture.url(),
        })
        .await
        .unwrap();
    // no-op for clones
    staging.extract().await.unwrap();
    let folders = staging.discover("RepoAddon").unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, "RepoAddon");
}

#[tokio::test]
async fn test_fetch_clone_failure() {
    let temp = TestDir::new().unwrap();
    let err = installer()
        .fetch(&Artifact::Clone {
            url: file_url(&temp.path().join("nothing")),
        })
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<WamError>(), Some(WamError::GitCloneFailed { .. })));
}

#[tokio::test]
async fn test_copy_folder_replaces_existing() {
    let temp = TestDir::new().unwrap();
    let staged = temp.path().join("stage").join("Bagnon");
    std::fs::create_dir_all(&staged).unwrap();
    std::fs::write(staged.join("Bagnon.toc"), "new").unwrap();

    let destination = temp.path().join("AddOns");
    std::fs::create_dir_all(destination.join("Bagnon")).unwrap();
    std::fs::write(destination.join("Bagnon/stale.lua"), "old").unwrap();

    let folder = DiscoveredFolder {
        name: "Bagnon".to_string(),
        path: staged,
    };
    installer().copy_folder(&folder, &destination).await.unwrap();
    assert_eq!(std::fs::read_to_string(destination.join("Bagnon/Bagnon.toc")).unwrap(), "new");
    assert!(!destination.join("Bagnon/stale.lua").exists());
}

#[tokio::test]
async fn test_copy_folder_through_injected_copier() {
    let temp = TestDir::new().unwrap();
    let staged = temp.path().join("Details");
    std::fs::create_dir_all(&staged).unwrap();
    let destination = temp.path().join("AddOns");

    let copier = Arc::new(FailingCopier::new("Details"));
    let installer = installer().with_copier(copier.clone());
    let folder = DiscoveredFolder {
        name: "Details".to_string(),
        path: staged,
    };

    let err = installer.copy_folder(&folder, &destination).await.unwrap_err();
    assert!(format!("{err:#}").contains("simulated copy failure"));
    assert_eq!(copier.attempts(), 1);
    assert!(destination.join("Details/partial.lua").exists());
}
