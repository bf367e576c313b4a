//! Plugin Commands
//!
//! `plugin install | remove | list | update | info`.

use crate::commands::CommandOutput;
use crate::services::plugins::installer::InstallOutcome;
use crate::services::plugins::models::InstallRecord;
use crate::state::AppState;
use crate::utils::error::AppResult;

fn describe_outcome(outcome: &InstallOutcome) -> String {
    let record = &outcome.record;
    match (&outcome.previous, outcome.changed) {
        (_, false) => format!(
            "{} {} is already up to date",
            record.plugin_name, record.installed_version
        ),
        (Some(prev), true) if prev.installed_version != record.installed_version => format!(
            "Updated {} {} -> {}",
            record.plugin_name, prev.installed_version, record.installed_version
        ),
        (Some(_), true) => format!(
            "Reinstalled {} {}",
            record.plugin_name, record.installed_version
        ),
        (None, true) => format!(
            "Installed {} {} from {}",
            record.plugin_name, record.installed_version, record.source
        ),
    }
}

fn describe_record(record: &InstallRecord) -> String {
    format!(
        "{:<24} {:<10} {:<16} {}",
        record.plugin_name,
        record.installed_version,
        record.marketplace.as_deref().unwrap_or("-"),
        record.last_changed().format("%Y-%m-%d %H:%M")
    )
}

/// Install a batch of plugins. Failures are reported per plugin; the
/// others still install.
pub async fn install(state: &AppState, targets: &[String], force: bool) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let results = manager.install(targets, force).await;

    let mut installed = Vec::new();
    let mut lines = Vec::new();
    let mut failures = Vec::new();
    for (_, outcome) in results {
        match outcome {
            Ok(outcome) => {
                lines.push(describe_outcome(&outcome));
                installed.push(outcome);
            }
            Err(e) => failures.push(e),
        }
    }

    Ok(CommandOutput::new(&installed, lines.join("\n"))?.with_failures(failures))
}

pub fn remove(state: &AppState, name: &str) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let removed = manager.remove(name)?;
    let text = format!("Removed {} {}", removed.plugin_name, removed.installed_version);
    CommandOutput::new(&removed, text)
}

pub fn list(state: &AppState) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let records = manager.list()?;
    let text = if records.is_empty() {
        "No plugins installed.".to_string()
    } else {
        records.iter().map(describe_record).collect::<Vec<_>>().join("\n")
    };
    CommandOutput::new(&records, text)
}

pub async fn update(state: &AppState, name: &str) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let outcome = manager.update(name).await?;
    let text = describe_outcome(&outcome);
    CommandOutput::new(&outcome, text)
}

pub fn info(state: &AppState, name: &str) -> AppResult<CommandOutput> {
    let manager = state.plugin_manager()?;
    let info = manager.info(name)?;

    let mut lines = vec![
        format!("{} {}", info.manifest.name, info.manifest.version),
        format!("  source:      {}", info.record.source),
        format!("  path:        {}", info.record.install_path.display()),
        format!("  installed:   {}", info.record.installed_at.format("%Y-%m-%d %H:%M")),
    ];
    if let Some(updated) = info.record.updated_at {
        lines.push(format!("  updated:     {}", updated.format("%Y-%m-%d %H:%M")));
    }
    if let Some(market) = &info.record.marketplace {
        lines.push(format!("  marketplace: {}", market));
    }
    if !info.manifest.description.is_empty() {
        lines.push(format!("  description: {}", info.manifest.description));
    }
    let declared: Vec<_> = info.manifest.capabilities.keys().map(|k| k.as_str()).collect();
    if !declared.is_empty() {
        lines.push(format!("  provides:    {}", declared.join(", ")));
    }
    if !info.skills.is_empty() {
        lines.push("  skills:".to_string());
        for skill in &info.skills {
            lines.push(format!(
                "    {:<22} {}",
                skill.descriptor.skill_id(),
                skill.descriptor.trigger_description()
            ));
        }
    }

    CommandOutput::new(&info, lines.join("\n"))
}
