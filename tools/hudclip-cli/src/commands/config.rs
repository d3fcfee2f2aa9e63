//! Show or initialize the configuration file.

use std::path::PathBuf;

use hudclip_common::config::{config_file_path, AppConfig};

pub fn run(init: bool, path: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);

    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            AppConfig::default().save_to(&path)?;
            println!("Wrote default config: {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
