use clap::Subcommand;
use blackhole_core::storage::Database;
use blackhole_core::{Config, ConfigError};

use super::{open_controller, print_events};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "work_minutes", "sound_mode")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(&db);
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(ConfigError::UnknownKey(key).into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let (_lock, mut ctl, _) = open_controller(&db)?;
            let candidate = ctl.config().with_value(&key, &value)?;
            // Display-only: keep the focus cycle and a paused countdown.
            if key == "leading_zero" {
                ctl.set_leading_zero(candidate.leading_zero);
                print_events(&[ctl.status()])?;
            } else {
                let event = ctl.apply_config(candidate)?;
                print_events(&[event])?;
            }
        }
        ConfigAction::List => {
            let config = Config::load(&db);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let (_lock, mut ctl, _) = open_controller(&db)?;
            ctl.apply_config(Config::default())?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
