// src/pipeline/validate.rs

use std::path::Path;

use crate::config::{load_config, resolve_token};
use crate::error::Result;
use crate::models::Config;
use crate::storage::StateStore;
use crate::utils::report;

/// Validate the configuration file and report what a run would do.
pub fn run_validate(config_path: &Path) -> Result<Config> {
    report::header("Validating configuration");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Validation failed: {e}");
            return Err(e);
        }
    };

    report::success("Configuration OK");
    let formats: Vec<&str> = config.export.formats.iter().map(|f| f.extension()).collect();
    report::sub_item(&format!("Formats: {}", formats.join(", ")));
    report::sub_item(&format!("Partition: {:?}", config.export.partition));
    report::sub_item(&format!("Export timeout: {}s", config.export.timeout_secs));
    for (key, server) in &config.servers {
        report::sub_item(&format!(
            "{key}: guild {} ({} include, {} exclude, {} forums)",
            server.guild_id,
            server.include_channels.len(),
            server.exclude_channels.len(),
            server.forum_channels.len()
        ));
    }

    if !Path::new(&config.capture.command).exists() {
        log::warn!("Capture tool not found at {}", config.capture.command);
    }
    if resolve_token(&config.capture).is_err() {
        log::warn!(
            "{} is not set; sync will refuse to start",
            config.capture.token_env
        );
    }

    Ok(config)
}

/// Show configured paths and sync state size.
pub async fn run_info(config: &Config) -> Result<()> {
    report::header("Archive info");

    let paths = &config.paths;
    for (label, path) in [
        ("Exports", &paths.exports_dir),
        ("Public", &paths.public_dir),
        ("State", &paths.state_file),
    ] {
        let status = if path.exists() { "exists" } else { "not found" };
        report::sub_item(&format!("{label}: {} ({status})", path.display()));
    }

    let state = StateStore::new(&paths.state_file).load().await?;
    for (server, server_state) in &state.servers {
        let threads: usize = server_state.forums.values().map(|f| f.threads.len()).sum();
        report::sub_item(&format!(
            "{}: {} channels, {threads} threads in [{}]",
            config.server_display_name(server),
            server_state.channels.len(),
            state.forum_names(server).join(", ")
        ));
    }
    log::info!("{} sync records", state.entry_count());
    Ok(())
}
