//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("logic-graph CLI Configuration");
    println!("{:-<40}", "");
    println!("Speed:       {} ticks/s", config.speed);
    println!("Frame Rate:  {} fps", config.frame_rate);
    println!("Store Dir:   {}", config.store_dir.display());

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }
    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "speed" => {
            config.speed = value.parse()?;
            config.sim_config()?;
        }
        "frame-rate" | "fps" => {
            let frame_rate: f64 = value.parse()?;
            anyhow::ensure!(frame_rate > 0.0, "frame-rate must be > 0");
            config.frame_rate = frame_rate;
        }
        "store-dir" => {
            config.store_dir = value.into();
        }
        _ => {
            anyhow::bail!(
                "Unknown config key: {}. Valid keys: speed, frame-rate, store-dir",
                key
            );
        }
    }

    config.save()?;
    println!("Set {} to: {}", key, value);
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let value = match key {
        "speed" => config.speed.to_string(),
        "frame-rate" | "fps" => config.frame_rate.to_string(),
        "store-dir" => config.store_dir.display().to_string(),
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    };

    println!("{}", value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    Config::default().save()?;
    println!("Configuration reset to defaults");
    Ok(())
}
