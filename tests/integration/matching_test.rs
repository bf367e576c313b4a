//! Skill activation over installed plugins.

use crate::support::{open_manager, write_plugin, LocalMarket};

async fn installed(root: &std::path::Path) -> (skillmart::PluginManager, LocalMarket) {
    let market = LocalMarket::new(
        r#"{
            "ui-polish": {"source": "./plugins/ui-polish"},
            "strapi-tools": {"source": "./plugins/strapi-tools"},
            "docs-kit": {"source": "./plugins/docs-kit"}
        }"#,
    );
    write_plugin(
        &market.plugin_dir("ui-polish"),
        "ui-polish",
        "1.0.0",
        &[("refactoring-ui", "Refactor React components and improve button, spacing and color design")],
    );
    write_plugin(
        &market.plugin_dir("strapi-tools"),
        "strapi-tools",
        "1.0.0",
        &[("strapi-plugin-dev", "Build Strapi CMS plugins, content types and admin panel extensions")],
    );
    write_plugin(
        &market.plugin_dir("docs-kit"),
        "docs-kit",
        "1.0.0",
        &[
            ("api-docs", "Write API reference documentation for endpoints"),
            ("changelog", "Draft release notes and changelog entries"),
        ],
    );

    let manager = open_manager(root);
    manager.marketplaces().add(&market.reference(), Some("local")).await.unwrap();
    let results = manager
        .install(
            &["ui-polish".to_string(), "strapi-tools".to_string(), "docs-kit".to_string()],
            false,
        )
        .await;
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    (manager, market)
}

#[tokio::test]
async fn react_button_task_activates_only_ui_skill() {
    let root = tempfile::tempdir().unwrap();
    let (manager, _market) = installed(root.path()).await;

    let result = manager
        .match_task("Refactor the React button component to use the new design tokens", None, false)
        .unwrap();
    let ids: Vec<_> = result.matches.iter().map(|m| m.skill.skill_id()).collect();
    assert_eq!(ids, vec!["refactoring-ui"]);
    assert_eq!(result.matches[0].plugin, "ui-polish");
}

#[tokio::test]
async fn unrelated_task_matches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let (manager, _market) = installed(root.path()).await;

    let result = manager
        .match_task("tune postgres vacuum thresholds", None, true)
        .unwrap();
    assert!(result.matches.is_empty());
    assert!(result.context.is_none());
}

#[tokio::test]
async fn matching_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    let (manager, _market) = installed(root.path()).await;

    let task = "write documentation and release notes for the API endpoints";
    let first = manager.match_task(task, Some(0), false).unwrap();
    for _ in 0..5 {
        let again = manager.match_task(task, Some(0), false).unwrap();
        let a: Vec<_> = first.matches.iter().map(|m| (m.plugin.clone(), m.skill.skill_id().to_string())).collect();
        let b: Vec<_> = again.matches.iter().map(|m| (m.plugin.clone(), m.skill.skill_id().to_string())).collect();
        assert_eq!(a, b);
    }
    assert!(first.matches.len() >= 2);
    assert!(first.matches.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn top_k_and_injection() {
    let root = tempfile::tempdir().unwrap();
    let (manager, _market) = installed(root.path()).await;

    let task = "write documentation and release notes for the API endpoints";
    let result = manager.match_task(task, Some(1), true).unwrap();
    assert_eq!(result.matches.len(), 1);

    let context = result.context.unwrap();
    assert!(context.starts_with("## Active Skills"));
    assert!(context.contains(&format!("### {}", result.matches[0].skill.skill_id())));
    assert!(context.contains("checklist"));
}

#[tokio::test]
async fn removed_plugin_skills_stop_matching() {
    let root = tempfile::tempdir().unwrap();
    let (manager, _market) = installed(root.path()).await;
    manager.remove("ui-polish").unwrap();

    let result = manager
        .match_task("Refactor the React button component", None, false)
        .unwrap();
    assert!(result.matches.iter().all(|m| m.plugin != "ui-polish"));
}
