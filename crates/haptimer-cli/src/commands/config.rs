use clap::Subcommand;
use haptimer_core::{Config, ConfigError};

/// Keys are dot paths into `config.toml`: `premium`,
/// `timer.{tick_interval_ms,auto_reset_grace_ms,default_duration_secs,default_color}`,
/// `haptics.{completion_pattern,default_pattern,rng_seed}`.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value (e.g. "premium", "haptics.default_pattern")
    Get { key: String },
    /// Change one value; "none" clears an optional key such as haptics.rng_seed
    Set { key: String, value: String },
    /// Print the whole configuration as JSON
    List,
    /// Restore the defaults (free tier, 100 ms ticks, pulse everywhere)
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("configuration reset to defaults");
        }
    }
    Ok(())
}
