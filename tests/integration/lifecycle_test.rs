//! Install lifecycle against a local marketplace: install, collide, update,
//! remove, and recovery after an interrupted swap.

use skillmart::services::plugins::manifest::load_manifest;
use skillmart::AppError;

use crate::support::{open_manager, write_plugin, LocalMarket};

const INDEX: &str = r#"{
    "ui-polish": {"source": "./plugins/ui-polish", "version": "^1.0", "description": "UI review skills"},
    "strapi-tools": {"source": "./plugins/strapi-tools"}
}"#;

fn market() -> LocalMarket {
    let market = LocalMarket::new(INDEX);
    write_plugin(
        &market.plugin_dir("ui-polish"),
        "ui-polish",
        "1.0.0",
        &[("refactoring-ui", "Improve the visual design of React components, buttons and layouts")],
    );
    write_plugin(
        &market.plugin_dir("strapi-tools"),
        "strapi-tools",
        "0.3.0",
        &[("strapi-plugin-dev", "Develop Strapi CMS plugins with custom content types")],
    );
    market
}

#[tokio::test]
async fn install_from_marketplace_records_manifest_identity() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();

    let results = manager.install(&["ui-polish@local".to_string()], false).await;
    let outcome = results[0].1.as_ref().unwrap();

    assert_eq!(outcome.record.plugin_name, "ui-polish");
    assert_eq!(outcome.record.installed_version, "1.0.0");
    assert_eq!(outcome.record.marketplace.as_deref(), Some("local"));

    let manifest = load_manifest(&outcome.record.install_path).unwrap();
    assert_eq!(outcome.record.plugin_name, manifest.name);
    assert_eq!(outcome.record.installed_version, manifest.version);
    assert!(root.path().join("plugins/ui-polish/skills/refactoring-ui/SKILL.md").is_file());
}

#[tokio::test]
async fn install_then_remove_restores_record_set() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    manager.install(&["strapi-tools@local".to_string()], false).await;
    let before = manager.list().unwrap();

    let results = manager.install(&["ui-polish@local".to_string()], false).await;
    assert!(results[0].1.is_ok());
    assert_eq!(manager.list().unwrap().len(), 2);

    manager.remove("ui-polish").unwrap();
    assert_eq!(manager.list().unwrap(), before);
    assert!(!root.path().join("plugins/ui-polish").exists());
}

#[tokio::test]
async fn remove_unknown_plugin_leaves_records_unchanged() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    manager.install(&["ui-polish@local".to_string()], false).await;
    let before = std::fs::read(root.path().join("installed.json")).unwrap();

    let err = manager.remove("does-not-exist").unwrap_err();
    assert!(matches!(err, AppError::NotInstalled(ref name) if name == "does-not-exist"));
    assert_eq!(std::fs::read(root.path().join("installed.json")).unwrap(), before);
}

#[tokio::test]
async fn same_name_from_other_source_collides_without_force() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    manager.install(&["ui-polish@local".to_string()], false).await;
    let first = manager.list().unwrap();

    let fork = tempfile::tempdir().unwrap();
    write_plugin(fork.path(), "ui-polish", "9.0.0", &[("forked", "A fork of the UI skills")]);
    let fork_ref = fork.path().display().to_string();

    let results = manager.install(&[fork_ref.clone()], false).await;
    let err = results[0].1.as_ref().unwrap_err();
    assert_eq!(err.kind(), "NameCollision");
    assert!(err.to_string().contains("ui-polish"));
    assert_eq!(manager.list().unwrap(), first);
    assert!(root.path().join("plugins/ui-polish/skills/refactoring-ui").is_dir());

    let results = manager.install(&[fork_ref], true).await;
    let forced = results[0].1.as_ref().unwrap();
    assert_eq!(forced.record.installed_version, "9.0.0");
    assert!(!root.path().join("plugins/ui-polish/skills/refactoring-ui").exists());
}

#[tokio::test]
async fn update_twice_without_upstream_change_is_identical() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    manager.install(&["ui-polish@local".to_string()], false).await;

    let first = manager.update("ui-polish").await.unwrap();
    let second = manager.update("ui-polish").await.unwrap();
    assert!(!first.changed);
    assert!(!second.changed);
    assert_eq!(first.record, second.record);
    assert_eq!(manager.list().unwrap(), vec![second.record]);
}

#[tokio::test]
async fn update_records_version_bump() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    let installed = manager.install(&["ui-polish@local".to_string()], false).await;
    let installed_at = installed[0].1.as_ref().unwrap().record.installed_at;

    write_plugin(
        &market.plugin_dir("ui-polish"),
        "ui-polish",
        "1.1.0",
        &[("refactoring-ui", "Improve the visual design of React components, buttons and layouts")],
    );
    let outcome = manager.update("ui-polish").await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.record.installed_version, "1.1.0");
    assert_eq!(outcome.record.installed_at, installed_at);
    assert!(outcome.record.updated_at.is_some());
}

#[tokio::test]
async fn failed_fetch_leaves_prior_install_intact() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    manager.install(&["ui-polish@local".to_string()], false).await;
    let before = manager.list().unwrap();

    // Upstream now ships a broken manifest.
    std::fs::write(market.plugin_dir("ui-polish").join("plugin.json"), r#"{"name": "ui-polish"}"#).unwrap();
    let err = manager.update("ui-polish").await.unwrap_err();
    assert!(err.is_invalid_format());

    assert_eq!(manager.list().unwrap(), before);
    let manifest = load_manifest(&root.path().join("plugins/ui-polish")).unwrap();
    assert_eq!(manifest.version, "1.0.0");
    let staging: Vec<_> = std::fs::read_dir(root.path().join("staging")).unwrap().collect();
    assert!(staging.is_empty());
}

#[tokio::test]
async fn interrupted_swap_is_rolled_back_on_next_open() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    {
        let manager = open_manager(root.path());
        manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
        manager.install(&["ui-polish@local".to_string()], false).await;
    }
    let before = std::fs::read(root.path().join("installed.json")).unwrap();

    // Simulate a crash after live -> backup and staged -> live, before the
    // record was written.
    let live = root.path().join("plugins/ui-polish");
    let backup = root.path().join("staging/backup-ui-polish");
    std::fs::rename(&live, &backup).unwrap();
    write_plugin(&live, "ui-polish", "2.0.0", &[("half-written", "Should never be visible")]);

    let manager = open_manager(root.path());
    assert_eq!(std::fs::read(root.path().join("installed.json")).unwrap(), before);
    assert!(!backup.exists());
    let manifest = load_manifest(&live).unwrap();
    assert_eq!(manifest.version, "1.0.0");
    assert_eq!(manager.info("ui-polish").unwrap().skills[0].descriptor.skill_id(), "refactoring-ui");
}

#[tokio::test]
async fn batch_install_continues_past_failures() {
    let root = tempfile::tempdir().unwrap();
    let market = market();
    let manager = open_manager(root.path());
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();

    let results = manager
        .install(
            &[
                "ui-polish@local".to_string(),
                "missing@local".to_string(),
                "strapi-tools@nowhere".to_string(),
                "strapi-tools".to_string(),
            ],
            false,
        )
        .await;

    let kinds: Vec<_> = results
        .iter()
        .map(|(_, r)| r.as_ref().map(|_| "ok").unwrap_or_else(|e| e.kind()))
        .collect();
    assert_eq!(kinds, vec!["ok", "NotFound", "UnknownMarketplace", "ok"]);

    let names: Vec<_> = manager.list().unwrap().into_iter().map(|r| r.plugin_name).collect();
    assert_eq!(names, vec!["strapi-tools", "ui-polish"]);
}
