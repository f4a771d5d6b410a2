//! `splitprobe config generate|validate`

use crate::utils::load_config;
use anyhow::{Context, Result};
use splitprobe_config::ProbeConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Handle configuration validation
pub fn config_validate_command(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match load_config(Some(config_file)) {
        Ok(config) => {
            println!("Configuration file is valid");
            println!(
                "  router {} (Host: {}), admin {}, {} test(s), {} origin(s)",
                config.router.base_url,
                config.router.domain_host,
                config.admin.base_url,
                config.topology.tests.len(),
                config.topology.all_origins().count()
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration validation failed: {:#}", e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
pub fn config_generate_command(output: Option<&Path>, force: bool) -> Result<()> {
    let content = ProbeConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", content);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }

    fs::write(output, content)
        .with_context(|| format!("Failed to write configuration to {:?}", output))?;
    println!("Configuration written to {:?}", output);
    Ok(())
}
