use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wam_cli::test_utils::fixtures::toc;
use wam_cli::test_utils::{GitFixture, write_addon};

/// A config file, destination and state directory for one `wam` invocation.
struct CliEnv {
    temp: TempDir,
    config: PathBuf,
    destination: PathBuf,
}

impl CliEnv {
    fn new(configured: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let game = temp.path().join("game").join("_retail_");
        let destination = game.join("Interface").join("AddOns");
        std::fs::create_dir_all(&destination).unwrap();
        std::fs::create_dir_all(game.join("WTF")).unwrap();
        std::fs::write(game.join("WTF").join("Config.wtf"), "SET locale \"enUS\"").unwrap();

        let mut config = String::new();
        if configured {
            config.push_str(&format!("destination = '{}'\n", destination.display()));
        }
        config.push_str(&format!(
            "repository_path = '{}'\n\n[backup]\ndirectory = '{}'\n",
            temp.path().join("addons.toml").display(),
            temp.path().join("backups").display()
        ));
        let config_path = temp.path().join("config.toml");
        std::fs::write(&config_path, config).unwrap();

        Self {
            temp,
            config: config_path,
            destination,
        }
    }

    fn wam(&self) -> Command {
        let mut cmd = Command::cargo_bin("wam").unwrap();
        cmd.env("WAM_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env("HOME", self.temp.path())
            .env_remove("RUST_LOG")
            .arg("--no-progress")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn folder(&self, name: &str) -> PathBuf {
        self.destination.join(name)
    }
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("wam")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("backup"));
}

#[test]
fn test_list_empty() {
    let env = CliEnv::new(true);
    env.wam()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No add-ons tracked"));
}

#[test]
fn test_install_without_destination_fails() {
    let env = CliEnv::new(false);
    env.wam()
        .args(["install", "https://github.com/user/RepoAddon"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not configured"))
        .stderr(predicate::str::contains("destination"));
}

#[test]
fn test_install_rejects_unsupported_url() {
    let env = CliEnv::new(true);
    env.wam()
        .args(["install", "https://example.com/addon.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported add-on source"));
    assert!(is_empty_dir(&env.destination));
}

#[test]
fn test_update_requires_folders_or_all() {
    let env = CliEnv::new(true);
    env.wam().arg("update").assert().failure();
}

#[test]
fn test_scan_then_list() {
    let env = CliEnv::new(true);
    write_addon(&env.destination, "Bagnon", "10.2.5").unwrap();
    write_addon(&env.destination, "Details", "2024.1").unwrap();

    env.wam()
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 added, 0 refreshed, 0 unchanged"));

    env.wam()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bagnon"))
        .stdout(predicate::str::contains("10.2.5"))
        .stdout(predicate::str::contains("manual"));

    env.wam()
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"folder\": \"Details\""));

    env.wam()
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 added, 0 refreshed, 2 unchanged"));
}

#[test]
fn test_remove_unknown_folder_fails() {
    let env = CliEnv::new(true);
    env.wam()
        .args(["remove", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'Nope' is not tracked"));
}

#[test]
fn test_backup_respects_interval() {
    let env = CliEnv::new(true);
    env.wam()
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backed up settings"));
    env.wam()
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("recent enough"));
    assert_eq!(std::fs::read_dir(env.temp.path().join("backups")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_git_install_update_remove() {
    let repo = GitFixture::new("RepoAddon").await.unwrap();
    repo.write("RepoAddon/RepoAddon.toc", &toc("RepoAddon", "1.0")).unwrap();
    repo.write("RepoAddon/core.lua", "-- v1").unwrap();
    repo.commit("v1").await.unwrap();

    let env = CliEnv::new(true);
    env.wam()
        .args(["install", &repo.url()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed RepoAddon"));
    assert!(env.folder("RepoAddon").join("RepoAddon.toc").is_file());

    env.wam()
        .args(["update", "RepoAddon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current RepoAddon"));

    repo.write("RepoAddon/core.lua", "-- v2").unwrap();
    repo.commit("v2").await.unwrap();
    env.wam()
        .args(["update", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated RepoAddon"));
    assert_eq!(std::fs::read_to_string(env.folder("RepoAddon").join("core.lua")).unwrap(), "-- v2");

    env.wam()
        .args(["remove", "RepoAddon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed RepoAddon"));
    assert!(is_empty_dir(&env.destination));
}
