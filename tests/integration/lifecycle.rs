use std::sync::Arc;
use wam_cli::commands::{self, CommandError, InstallCommand, RemoveCommand, UpdateCommand};
use wam_cli::models::{AddonSource, AddonType};
use wam_cli::test_utils::doubles::archive_metadata;
use wam_cli::test_utils::fixtures::toc;
use wam_cli::test_utils::{FixtureClient, TestEnvironment, write_zip};
use walkdir::WalkDir;

fn wowi_source(id: &str) -> AddonSource {
    AddonSource::WowInterface {
        id: id.to_string(),
        url: format!("https://www.wowinterface.com/downloads/info{id}"),
    }
}

async fn wowi_env() -> (TestEnvironment, Arc<FixtureClient>) {
    let mut env = TestEnvironment::new().await.unwrap();
    let client = Arc::new(FixtureClient::new(AddonType::WowInterface));
    env.register(client.clone());
    (env, client)
}

fn files(root: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_loose_archive_installs_as_one_folder() {
    let (env, client) = wowi_env().await;
    let archive = env.archive("loose.zip");
    write_zip(&archive, &[("Loose.toc", &toc("Loose", "1.2")), ("core.lua", "-- loose")]).unwrap();
    client.set("100", archive_metadata(wowi_source("100"), "Loose", "1.2", &archive));

    let ctx = env.context().unwrap();
    let report =
        commands::run(&mut InstallCommand::from_catalog(AddonType::WowInterface, "100"), &ctx)
            .await
            .unwrap();
    assert_eq!(report.parent, "Loose");
    assert_eq!(report.installed_addons, vec!["Loose"]);
    assert_eq!(files(&env.destination), vec!["Loose", "Loose/Loose.toc", "Loose/core.lua"]);

    let record = env.repository.get("Loose").unwrap();
    assert_eq!(record.version, "1.2");
    assert_eq!(record.source, wowi_source("100"));
}

#[tokio::test]
async fn test_multi_folder_release_lifecycle() {
    let (env, client) = wowi_env().await;
    let archive = env.archive("dbm.zip");
    write_zip(
        &archive,
        &[
            ("DBM-Core/DBM-Core.toc", &toc("Deadly Boss Mods", "11.0.1")),
            ("DBM-GUI/DBM-GUI.toc", &toc("DBM GUI", "11.0.1")),
            ("DBM-StatusBarTimers/DBM-StatusBarTimers.toc", &toc("DBM Timers", "11.0.1")),
        ],
    )
    .unwrap();
    let mut metadata = archive_metadata(wowi_source("8814"), "Deadly Boss Mods", "11.0.1", &archive);
    metadata.secondary_name = Some("DBM-Core".to_string());
    client.set("8814", metadata);

    let ctx = env.context().unwrap();
    let report =
        commands::run(&mut InstallCommand::from_catalog(AddonType::WowInterface, "8814"), &ctx)
            .await
            .unwrap();
    assert_eq!(report.parent, "DBM-Core");
    assert_eq!(report.installed_addons, vec!["DBM-Core", "DBM-GUI", "DBM-StatusBarTimers"]);

    // one record owning the other two folders
    assert_eq!(env.repository.len(), 1);
    assert_eq!(env.repository.owner_of("DBM-GUI").unwrap().folder, "DBM-Core");

    let gui = wam_cli::models::AddonRecord::new("DBM-GUI", chrono::Utc::now());
    let err = commands::run(&mut UpdateCommand::new(gui, false), &ctx).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::OwnedBy {
            folder: "DBM-GUI".to_string(),
            owner: "DBM-Core".to_string(),
        }
    );

    let removed = commands::run(&mut RemoveCommand::new("DBM-Core"), &ctx).await.unwrap();
    assert_eq!(removed.removed_folders.len(), 3);
    assert!(files(&env.destination).is_empty());
    assert!(env.repository.is_empty());

    let store = std::fs::read_to_string(env.repository.path()).unwrap();
    assert!(!store.contains("DBM"));
}
