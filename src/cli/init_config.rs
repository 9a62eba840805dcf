use super::config::{default_config_path, default_data_dir, GatehouseConfig};
use std::path::PathBuf;

/// Write a commented default config file.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(config_path: Option<String>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(format!(
            "config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    GatehouseConfig::create_default(&config_path, &default_data_dir())?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
