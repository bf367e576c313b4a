//! Settings Commands
//!
//! `config show | set | reset`.

use std::str::FromStr;

use crate::commands::CommandOutput;
use crate::models::settings::SettingsUpdate;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub fn show(state: &AppState) -> AppResult<CommandOutput> {
    let config = state.get_config();
    let text = serde_json::to_string_pretty(config)?;
    CommandOutput::new(config, text)
}

pub fn set(state: &mut AppState, key: &str, value: &str) -> AppResult<CommandOutput> {
    let update = parse_update(key, value)?;
    let config = state.update_config(update)?;
    CommandOutput::new(&config, format!("Set {} = {}", key, value))
}

pub fn reset(state: &mut AppState) -> AppResult<CommandOutput> {
    let config = state.reset_config()?;
    CommandOutput::new(&config, "Settings reset to defaults")
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("invalid value '{}' for {}", value, key)))
}

/// Turn a `section.field` key into a partial settings update.
fn parse_update(key: &str, value: &str) -> AppResult<SettingsUpdate> {
    let mut update = SettingsUpdate::default();
    match key {
        "fetch.max_attempts" => update.max_attempts = Some(parse_value(key, value)?),
        "fetch.initial_backoff_ms" => update.initial_backoff_ms = Some(parse_value(key, value)?),
        "fetch.max_backoff_ms" => update.max_backoff_ms = Some(parse_value(key, value)?),
        "fetch.timeout_secs" => update.timeout_secs = Some(parse_value(key, value)?),
        "matcher.min_score" => update.min_score = Some(parse_value(key, value)?),
        "matcher.top_k" => update.top_k = Some(parse_value(key, value)?),
        "matcher.max_content_lines" => update.max_content_lines = Some(parse_value(key, value)?),
        _ => return Err(AppError::validation(format!("unknown setting '{}'", key))),
    }
    Ok(update)
}
