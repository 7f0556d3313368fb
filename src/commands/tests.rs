use super::*;
use crate::models::{AddonKind, AddonRecord, AddonSource};
use crate::test_utils::doubles::archive_metadata;
use crate::test_utils::fixtures::toc;
use crate::test_utils::{FailingCopier, FixtureClient, GitFixture, TestEnvironment, write_addon, write_zip};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use walkdir::WalkDir;

fn tukui_source() -> AddonSource {
    AddonSource::Tukui {
        slug: "elvui".to_string(),
        url: "https://tukui.org/elvui".to_string(),
    }
}

/// Every file below `root` with its bytes, keyed by relative path.
fn tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

fn elvui_archive(env: &TestEnvironment, version: &str) -> std::path::PathBuf {
    let archive = env.archive(&format!("elvui-{version}.zip"));
    let core = format!("-- ElvUI {version}");
    write_zip(
        &archive,
        &[
            ("ElvUI/ElvUI.toc", &toc("|cff1784d1ElvUI|r", version)),
            ("ElvUI/Core/init.lua", &core),
            ("ElvUI_Options/ElvUI_Options.toc", &toc("ElvUI Options", version)),
            ("ElvUI_Libraries/ElvUI_Libraries.toc", &toc("ElvUI Libraries", version)),
            ("ElvUI_Libraries/Libs/LibStub/LibStub.toc", "## Title: LibStub\n"),
        ],
    )
    .unwrap();
    archive
}

fn elvui_metadata(env: &TestEnvironment, version: &str) -> crate::source::RemoteMetadata {
    let archive = elvui_archive(env, version);
    let mut metadata = archive_metadata(tukui_source(), "ElvUI", version, &archive);
    metadata.declared_folders =
        vec!["ElvUI".to_string(), "ElvUI_Options".to_string(), "ElvUI_Libraries".to_string()];
    metadata
}

async fn tukui_env() -> (TestEnvironment, Arc<FixtureClient>) {
    let mut env = TestEnvironment::new().await.unwrap();
    let client = Arc::new(FixtureClient::new(AddonType::Tukui));
    client.set("elvui", elvui_metadata(&env, "13.74"));
    env.register(client.clone());
    (env, client)
}

async fn install_elvui(env: &TestEnvironment) -> InstallReport {
    let ctx = env.context().unwrap();
    run(&mut InstallCommand::from_catalog(AddonType::Tukui, "elvui"), &ctx).await.unwrap()
}

#[tokio::test]
async fn test_install_requires_destination() {
    let env = TestEnvironment::unconfigured().await.unwrap();
    let ctx = env.context().unwrap();

    let err = run(&mut InstallCommand::from_url("https://github.com/user/RepoAddon"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err, CommandError::NotConfigured);
    assert_eq!(env.events.names(), vec!["error"]);
}

#[tokio::test]
async fn test_install_catalog_with_declared_folders() {
    let (env, _client) = tukui_env().await;
    env.repository.insert(AddonRecord::new("ElvUI_Options", Utc::now())).unwrap();

    let report = install_elvui(&env).await;
    assert_eq!(report.parent, "ElvUI");
    assert_eq!(report.installed_addons, vec!["ElvUI", "ElvUI_Libraries", "ElvUI_Options"]);

    let record = env.repository.get("ElvUI").unwrap();
    assert_eq!(record.source, tukui_source());
    assert_eq!(record.version, "13.74");
    assert_eq!(record.name, "ElvUI");
    assert_eq!(
        record.owned_folders,
        BTreeSet::from(["ElvUI_Libraries".to_string(), "ElvUI_Options".to_string()])
    );
    assert!(env.repository.get("ElvUI_Options").is_none());
    assert!(env.repository.get("ElvUI_Libraries").is_none());
    assert_eq!(env.repository.len(), 1);

    assert!(env.folder("ElvUI/Core/init.lua").is_file());
    assert_eq!(
        env.events.names(),
        vec![
            "install:start",
            "install:downloading",
            "install:extracting",
            "install:copying",
            "install:complete"
        ]
    );
}

#[tokio::test]
async fn test_install_loose_root_manifest() {
    let mut env = TestEnvironment::new().await.unwrap();
    let archive = env.archive("loose.zip");
    write_zip(&archive, &[("Loose.toc", &toc("Loose", "1.0")), ("core.lua", "-- loose")]).unwrap();

    let client = Arc::new(FixtureClient::new(AddonType::WowInterface));
    let source = AddonSource::WowInterface {
        id: "100".to_string(),
        url: "https://www.wowinterface.com/downloads/info100".to_string(),
    };
    client.set("100", archive_metadata(source, "Loose", "1.0", &archive));
    env.register(client);

    let ctx = env.context().unwrap();
    let report = run(&mut InstallCommand::from_url("https://www.wowinterface.com/downloads/info100-Loose.html"), &ctx)
        .await
        .unwrap();
    assert_eq!(report.installed_addons, vec!["Loose"]);
    assert!(env.folder("Loose/Loose.toc").is_file());
    assert!(env.folder("Loose/core.lua").is_file());
}

#[tokio::test]
async fn test_install_from_git_repository() {
    let env = TestEnvironment::new().await.unwrap();
    let fixture = GitFixture::new("RepoAddon").await.unwrap();
    fixture.write("RepoAddon/RepoAddon.toc", &toc("RepoAddon", "1.0")).unwrap();
    let head = fixture.commit("initial").await.unwrap();

    let ctx = env.context().unwrap();
    let report = run(&mut InstallCommand::from_url(fixture.url()), &ctx).await.unwrap();
    assert_eq!(report.installed_addons, vec!["RepoAddon"]);

    let record = env.repository.get("RepoAddon").unwrap();
    assert_eq!(record.addon_type(), AddonType::Git);
    assert_eq!(record.source.commit_hash(), Some(head.as_str()));
    assert!(env.folder("RepoAddon/RepoAddon.toc").is_file());
}

#[tokio::test]
async fn test_install_source_not_found() {
    let (env, client) = tukui_env().await;
    let ctx = env.context().unwrap();

    let err = run(&mut InstallCommand::from_catalog(AddonType::Tukui, "nope"), &ctx).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::Source {
            origin: AddonType::Tukui,
            error: ResolveError::NotFound
        }
    );
    assert_eq!(client.calls(), 1);
    assert!(env.repository.is_empty());
}

#[tokio::test]
async fn test_install_unsupported_url() {
    let env = TestEnvironment::new().await.unwrap();
    let ctx = env.context().unwrap();
    let err = run(&mut InstallCommand::from_url("https://example.com/addon.zip"), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { message } if message.contains("Unsupported")));
}

#[tokio::test]
async fn test_install_failure_rolls_back_copied_folders() {
    let (mut env, _client) = tukui_env().await;
    env.set_copier(Arc::new(FailingCopier::new("ElvUI_Options")));
    let ctx = env.context().unwrap();

    let err = run(&mut InstallCommand::from_catalog(AddonType::Tukui, "elvui"), &ctx).await.unwrap_err();
    assert!(matches!(&err, CommandError::Failed { message } if message.contains("simulated copy failure")));

    assert!(tree(&env.destination).is_empty());
    assert!(env.repository.is_empty());
    assert_eq!(env.events.names().last().map(String::as_str), Some("error"));
}

#[tokio::test]
async fn test_install_rejects_path_traversal() {
    let mut env = TestEnvironment::new().await.unwrap();
    let archive = env.archive("evil.zip");
    write_zip(&archive, &[("Evil/Evil.toc", "## Title: Evil\n"), ("../../../escape.lua", "x")]).unwrap();
    let client = Arc::new(FixtureClient::new(AddonType::Tukui));
    client.set("evil", archive_metadata(tukui_source(), "Evil", "1", &archive));
    env.register(client);

    let ctx = env.context().unwrap();
    let err = run(&mut InstallCommand::from_catalog(AddonType::Tukui, "evil"), &ctx).await.unwrap_err();
    assert!(matches!(&err, CommandError::Failed { message } if message.contains("escapes")));
    assert!(tree(&env.destination).is_empty());
    assert!(env.repository.is_empty());
}

#[tokio::test]
async fn test_update_up_to_date_writes_nothing() {
    let (env, client) = tukui_env().await;
    install_elvui(&env).await;
    let store = env.repository.path().to_path_buf();
    let store_before = std::fs::read(&store).unwrap();
    let store_mtime = std::fs::metadata(&store).unwrap().modified().unwrap();
    let files_before = tree(&env.destination);

    let ctx = env.context().unwrap();
    for _ in 0..2 {
        let record = env.repository.get("ElvUI").unwrap();
        let report = run(&mut UpdateCommand::new(record, false), &ctx).await.unwrap();
        assert!(!report.updated);
        assert_eq!(report.remote_version, "13.74");
    }

    assert_eq!(std::fs::read(&store).unwrap(), store_before);
    assert_eq!(std::fs::metadata(&store).unwrap().modified().unwrap(), store_mtime);
    assert_eq!(tree(&env.destination), files_before);
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn test_update_installs_new_version() {
    let (env, client) = tukui_env().await;
    install_elvui(&env).await;
    client.set("elvui", elvui_metadata(&env, "13.80"));
    env.events.clear();

    let ctx = env.context().unwrap();
    let record = env.repository.get("ElvUI").unwrap();
    let report = run(&mut UpdateCommand::new(record.clone(), false), &ctx).await.unwrap();
    assert!(report.updated);
    assert_eq!(report.previous_version, "13.74");

    let updated = env.repository.get("ElvUI").unwrap();
    assert_eq!(updated.version, "13.80");
    assert_eq!(updated.owned_folders, record.owned_folders);
    assert_eq!(updated.install_date, record.install_date);
    assert_eq!(std::fs::read_to_string(env.folder("ElvUI/Core/init.lua")).unwrap(), "-- ElvUI 13.80");
    assert_eq!(
        env.events.names(),
        vec![
            "update:start",
            "update:downloading",
            "update:extracting",
            "update:copying",
            "update:complete"
        ]
    );
}

#[tokio::test]
async fn test_forced_update_reinstalls() {
    let (env, _client) = tukui_env().await;
    install_elvui(&env).await;
    std::fs::remove_file(env.folder("ElvUI/Core/init.lua")).unwrap();

    let ctx = env.context().unwrap();
    let record = env.repository.get("ElvUI").unwrap();
    let report = run(&mut UpdateCommand::new(record, true), &ctx).await.unwrap();
    assert!(report.updated);
    assert!(env.folder("ElvUI/Core/init.lua").is_file());
}

#[tokio::test]
async fn test_update_failure_restores_backup_byte_for_byte() {
    let (mut env, client) = tukui_env().await;
    install_elvui(&env).await;
    // local edits must survive a failed update
    std::fs::write(env.folder("ElvUI_Options/custom.lua"), b"\x00\x01local").unwrap();
    let before = tree(&env.destination);

    client.set("elvui", elvui_metadata(&env, "13.80"));
    env.set_copier(Arc::new(FailingCopier::new("ElvUI_Options")));
    let ctx = env.context().unwrap();

    let record = env.repository.get("ElvUI").unwrap();
    let err = run(&mut UpdateCommand::new(record.clone(), false), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { .. }));

    assert_eq!(tree(&env.destination), before);
    assert_eq!(env.repository.get("ElvUI").unwrap(), record);
}

#[tokio::test]
async fn test_update_owned_folder_names_owner() {
    let (env, client) = tukui_env().await;
    install_elvui(&env).await;
    let ctx = env.context().unwrap();

    let owned = AddonRecord::new("ElvUI_Options", Utc::now());
    let err = run(&mut UpdateCommand::new(owned, false), &ctx).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::OwnedBy {
            folder: "ElvUI_Options".to_string(),
            owner: "ElvUI".to_string()
        }
    );
    assert!(err.to_string().contains("ElvUI"));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_update_manual_addon_fails() {
    let env = TestEnvironment::new().await.unwrap();
    write_addon(&env.destination, "Loose", "1.0").unwrap();
    let record = AddonRecord::new("Loose", Utc::now());
    env.repository.insert(record.clone()).unwrap();

    let ctx = env.context().unwrap();
    let err = run(&mut UpdateCommand::new(record, false), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { message } if message.contains("cannot be updated")));
}

#[tokio::test]
async fn test_git_update_matches_short_hash() {
    let env = TestEnvironment::new().await.unwrap();
    let fixture = GitFixture::new("RepoAddon").await.unwrap();
    fixture.write("RepoAddon.toc", &toc("RepoAddon", "1.0")).unwrap();
    let head = fixture.commit("initial").await.unwrap();

    let ctx = env.context().unwrap();
    run(&mut InstallCommand::from_url(fixture.url()), &ctx).await.unwrap();
    let record = env
        .repository
        .update("RepoAddon", |r| {
            r.source = AddonSource::Git {
                url: fixture.url(),
                commit: Some(head[..7].to_string()),
            };
        })
        .unwrap();

    let report = run(&mut UpdateCommand::new(record, false), &ctx).await.unwrap();
    assert!(!report.updated);

    fixture.write("RepoAddon.toc", &toc("RepoAddon", "2.0")).unwrap();
    let next = fixture.commit("bump").await.unwrap();
    let record = env.repository.get("RepoAddon").unwrap();
    let report = run(&mut UpdateCommand::new(record, false), &ctx).await.unwrap();
    assert!(report.updated);
    assert_eq!(env.repository.get("RepoAddon").unwrap().source.commit_hash(), Some(next.as_str()));
}

#[tokio::test]
async fn test_install_then_remove_leaves_nothing() {
    let (env, _client) = tukui_env().await;
    install_elvui(&env).await;
    env.events.clear();

    let ctx = env.context().unwrap();
    let report = run(&mut RemoveCommand::new("ElvUI"), &ctx).await.unwrap();
    assert_eq!(report.removed_folders, vec!["ElvUI", "ElvUI_Libraries", "ElvUI_Options"]);

    assert!(tree(&env.destination).is_empty());
    assert!(env.repository.is_empty());
    assert!(env.repository.owner_of("ElvUI_Options").is_none());
    assert_eq!(env.config.forgotten(), vec!["ElvUI", "ElvUI_Libraries", "ElvUI_Options"]);
    assert_eq!(env.events.names(), vec!["remove:start", "remove:complete"]);
}

#[tokio::test]
async fn test_remove_refuses_owned_and_unknown_folders() {
    let (env, _client) = tukui_env().await;
    install_elvui(&env).await;
    let ctx = env.context().unwrap();

    let err = run(&mut RemoveCommand::new("ElvUI_Options"), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::OwnedBy { owner, .. } if owner == "ElvUI"));

    let err = run(&mut RemoveCommand::new("Missing"), &ctx).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::NotFound {
            folder: "Missing".to_string()
        }
    );
    assert!(env.folder("ElvUI_Options").exists());
}

/// Turns an installed folder into a plain file so backing it up fails.
fn break_folder(env: &TestEnvironment, name: &str) {
    std::fs::remove_dir_all(env.folder(name)).unwrap();
    std::fs::write(env.folder(name), "not a folder").unwrap();
}

#[tokio::test]
async fn test_remove_failed_delete_restores_folders_and_record() {
    let (mut env, _client) = tukui_env().await;
    install_elvui(&env).await;
    std::fs::write(env.folder("ElvUI/custom.lua"), b"\x00\x01local").unwrap();
    let before = tree(&env.destination);
    let record = env.repository.get("ElvUI").unwrap();

    let copier = Arc::new(FailingCopier::new("ElvUI_Options"));
    env.set_copier(copier);
    let ctx = env.context().unwrap();

    let err = run(&mut RemoveCommand::new("ElvUI"), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { message } if message.contains("ElvUI_Options")));

    assert_eq!(tree(&env.destination), before);
    assert_eq!(env.repository.get("ElvUI").unwrap(), record);
    assert_eq!(env.repository.owner_of("ElvUI_Options").unwrap().folder, "ElvUI");
}

#[tokio::test]
async fn test_remove_backup_failure_leaves_folders_untouched() {
    let (env, _client) = tukui_env().await;
    install_elvui(&env).await;
    break_folder(&env, "ElvUI_Options");
    let before = tree(&env.destination);
    let record = env.repository.get("ElvUI").unwrap();
    let ctx = env.context().unwrap();

    let err = run(&mut RemoveCommand::new("ElvUI"), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { message } if message.contains("back up")));

    assert_eq!(tree(&env.destination), before);
    assert!(env.folder("ElvUI/Core/init.lua").is_file());
    assert_eq!(env.repository.get("ElvUI").unwrap(), record);
}

#[tokio::test]
async fn test_update_backup_failure_leaves_folders_untouched() {
    let (env, client) = tukui_env().await;
    install_elvui(&env).await;
    break_folder(&env, "ElvUI_Options");
    let before = tree(&env.destination);

    client.set("elvui", elvui_metadata(&env, "13.80"));
    let ctx = env.context().unwrap();
    let record = env.repository.get("ElvUI").unwrap();
    let err = run(&mut UpdateCommand::new(record.clone(), false), &ctx).await.unwrap_err();
    assert!(matches!(err, CommandError::Failed { .. }));

    assert_eq!(tree(&env.destination), before);
    assert_eq!(
        std::fs::read_to_string(env.folder("ElvUI/Core/init.lua")).unwrap(),
        "-- ElvUI 13.74"
    );
    assert_eq!(env.repository.get("ElvUI").unwrap(), record);
}

#[tokio::test]
async fn test_update_undo_restores_claimed_records() {
    let (env, client) = tukui_env().await;
    install_elvui(&env).await;
    write_addon(&env.destination, "ElvUI_Extra", "0.9").unwrap();
    let extra = AddonRecord::new("ElvUI_Extra", Utc::now());
    env.repository.insert(extra.clone()).unwrap();
    let before = tree(&env.destination);

    // the new release ships a folder that was tracked on its own
    let archive = env.archive("elvui-13.80-extra.zip");
    write_zip(
        &archive,
        &[
            ("ElvUI/ElvUI.toc", &toc("ElvUI", "13.80")),
            ("ElvUI_Options/ElvUI_Options.toc", &toc("ElvUI Options", "13.80")),
            ("ElvUI_Libraries/ElvUI_Libraries.toc", &toc("ElvUI Libraries", "13.80")),
            ("ElvUI_Extra/ElvUI_Extra.toc", &toc("ElvUI Extra", "13.80")),
        ],
    )
    .unwrap();
    client.set("elvui", archive_metadata(tukui_source(), "ElvUI", "13.80", &archive));

    let ctx = env.context().unwrap();
    let record = env.repository.get("ElvUI").unwrap();
    let mut update = UpdateCommand::new(record.clone(), false);
    let report = update.execute(&ctx).await.unwrap();
    assert!(report.updated);
    assert!(env.repository.get("ElvUI_Extra").is_none());
    assert_eq!(env.repository.owner_of("ElvUI_Extra").unwrap().folder, "ElvUI");

    update.undo(&ctx).await;
    assert_eq!(env.repository.get("ElvUI").unwrap(), record);
    assert_eq!(env.repository.get("ElvUI_Extra").unwrap(), extra);
    assert!(env.repository.owner_of("ElvUI_Extra").is_none());
    assert_eq!(tree(&env.destination), before);
}

#[tokio::test]
async fn test_scan_adds_then_reports_unchanged() {
    let env = TestEnvironment::new().await.unwrap();
    write_addon(&env.destination, "Bagnon", "10.2").unwrap();
    write_addon(&env.destination, "LibStub", "1.0").unwrap();
    std::fs::create_dir_all(env.folder("NoManifest")).unwrap();

    let ctx = env.context().unwrap();
    let report = run(&mut ScanCommand::new(), &ctx).await.unwrap();
    assert_eq!(report.added, vec!["Bagnon", "LibStub"]);

    let bagnon = env.repository.get("Bagnon").unwrap();
    assert_eq!(bagnon.addon_type(), AddonType::Manual);
    assert_eq!(bagnon.version, "10.2");
    assert_eq!(bagnon.interface_version.as_deref(), Some("110002"));
    assert_eq!(env.repository.get("LibStub").unwrap().kind, AddonKind::Library);

    let report = run(&mut ScanCommand::new(), &ctx).await.unwrap();
    assert!(report.added.is_empty());
    assert_eq!(report.unchanged, vec!["Bagnon", "LibStub"]);
}

#[tokio::test]
async fn test_scan_skips_owned_folders_and_keeps_sources() {
    let (env, _client) = tukui_env().await;
    install_elvui(&env).await;
    std::fs::write(
        env.folder("ElvUI/ElvUI.toc"),
        "## Title: ElvUI\n## Version: 13.74\n## Author: Elv\n## RequiredDeps: ElvUI_Libraries\n",
    )
    .unwrap();

    let ctx = env.context().unwrap();
    let report = run(&mut ScanCommand::new(), &ctx).await.unwrap();
    assert!(report.added.is_empty());
    assert_eq!(report.updated, vec!["ElvUI"]);

    let record = env.repository.get("ElvUI").unwrap();
    assert_eq!(record.source, tukui_source());
    assert_eq!(record.author, "Elv");
    assert!(record.required_deps.contains("ElvUI_Libraries"));
    assert!(env.repository.get("ElvUI_Options").is_none());
}

#[tokio::test]
async fn test_scan_detects_git_checkout() {
    let env = TestEnvironment::new().await.unwrap();
    let fixture = GitFixture::new("Cloned").await.unwrap();
    fixture.write("Cloned.toc", &toc("Cloned", "1.0")).unwrap();
    let head = fixture.commit("initial").await.unwrap();
    assert!(crate::git::shallow_clone(&fixture.url(), &env.folder("Cloned")).await);

    let ctx = env.context().unwrap();
    run(&mut ScanCommand::new(), &ctx).await.unwrap();

    let record = env.repository.get("Cloned").unwrap();
    assert_eq!(record.addon_type(), AddonType::Git);
    assert_eq!(record.source.commit_hash(), Some(head.as_str()));
    assert_eq!(record.source.url(), Some(fixture.url().as_str()));
}
