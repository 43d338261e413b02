//! 설정 명령어

use std::path::PathBuf;

use crate::config::CliConfig;

pub fn set(policy: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = CliConfig::load().unwrap_or_default();

    if let Some(p) = policy {
        config.policy_path = Some(p);
    }

    config.save()?;
    println!("Config updated.");
    show()
}

pub fn show() -> anyhow::Result<()> {
    let config = CliConfig::load().unwrap_or_default();

    println!("Current config (~/.tnt/config.json):");
    println!(
        "  policy: {}",
        config
            .policy_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );

    Ok(())
}

pub fn clear() -> anyhow::Result<()> {
    CliConfig::clear()?;
    println!("Config cleared.");
    Ok(())
}
