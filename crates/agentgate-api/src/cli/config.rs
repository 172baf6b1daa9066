//! `agentgate config`: dump the effective settings.

use agentgate_types::config::Settings;

/// Settings as pretty JSON. Secrets serialize as `[REDACTED]`.
pub fn render_config(settings: &Settings) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(settings)?)
}

pub fn show_config(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", render_config(settings)?);
    Ok(())
}
