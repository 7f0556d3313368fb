use std::sync::Arc;
use wam_cli::commands::{self, InstallCommand};
use wam_cli::models::{AddonSource, AddonType};
use wam_cli::orchestrator::{CheckStatus, Orchestrator};
use wam_cli::test_utils::doubles::archive_metadata;
use wam_cli::test_utils::fixtures::toc;
use wam_cli::test_utils::{FixtureClient, TestEnvironment, write_addon, write_zip};

fn tukui_source(slug: &str) -> AddonSource {
    AddonSource::Tukui {
        slug: slug.to_string(),
        url: format!("https://tukui.org/{slug}"),
    }
}

fn publish(env: &TestEnvironment, client: &FixtureClient, slug: &str, folder: &str, version: &str) {
    let archive = env.archive(&format!("{slug}-{version}.zip"));
    write_zip(&archive, &[(&format!("{folder}/{folder}.toc"), &toc(folder, version))]).unwrap();
    client.set(slug, archive_metadata(tukui_source(slug), folder, version, &archive));
}

#[tokio::test]
async fn test_check_then_update_all() {
    let mut env = TestEnvironment::new().await.unwrap();
    let client = Arc::new(FixtureClient::new(AddonType::Tukui));
    env.register(client.clone());
    env.config.update(|s| s.max_concurrency = 1);

    let ctx = env.context().unwrap();
    for (slug, folder) in [("elvui", "ElvUI"), ("tukui", "Tukui"), ("addonskins", "AddOnSkins")] {
        publish(&env, &client, slug, folder, "1.0");
        commands::run(&mut InstallCommand::from_catalog(AddonType::Tukui, slug), &ctx).await.unwrap();
    }
    // manual add-ons are never part of a batch
    write_addon(&env.destination, "Handmade", "0.1").unwrap();
    commands::run(&mut commands::ScanCommand::new(), &ctx).await.unwrap();
    assert_eq!(env.repository.len(), 4);

    publish(&env, &client, "tukui", "Tukui", "2.0");
    let orchestrator = Orchestrator::new(ctx);

    let checks = orchestrator.check_all().await;
    let outdated: Vec<_> = checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::UpdateAvailable { .. }))
        .map(|c| c.folder.as_str())
        .collect();
    assert_eq!(checks.len(), 3);
    assert_eq!(outdated, vec!["Tukui"]);

    let report = orchestrator.update_all(false).await;
    assert_eq!(report.updated(), vec!["Tukui"]);
    assert!(report.failures().is_empty());
    assert_eq!(env.repository.get("Tukui").unwrap().version, "2.0");

    let checks = orchestrator.check_all().await;
    assert!(checks.iter().all(|c| matches!(c.status, CheckStatus::UpToDate { .. })));
}
