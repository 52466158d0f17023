//! `stratigraph config`: inspect and edit the CLI config file

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::config::{config_file_path, Config};
use crate::output::{format_json, format_table, OutputFormat};
use stratigraph_core::Schema;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get { key: String },
    /// Change one setting; a schema path is checked by loading it
    Set { key: String, value: String },
    /// Restore one setting to its default
    Unset { key: String },
    /// Show every setting and whether it differs from the default
    #[command(alias = "list")]
    Show,
    /// Print where the config file lives
    Path,
    /// Write a config file with default settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct Setting {
    key: &'static str,
    value: String,
    default: bool,
}

pub fn run(args: &ConfigArgs, format: Option<&str>) -> anyhow::Result<()> {
    let path = config_file_path();
    tracing::debug!("Config file: {}", path.display());

    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load();
            let Some(value) = config.get(key) else {
                anyhow::bail!(
                    "Unknown config key: {} (available: {})",
                    key,
                    Config::keys().join(", ")
                );
            };
            println!("{}", value);
        }
        ConfigCommands::Set { key, value } => {
            if key == "schema_path" && !value.is_empty() {
                let schema = Schema::from_path(value)
                    .with_context(|| format!("{} is not a usable schema table", value))?;
                println!("Schema {} at {}", schema.version(), value);
            }
            let mut config = Config::load();
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Unset { key } => {
            let mut config = Config::load();
            config.reset(key)?;
            config.save()?;
            println!("{} reset to {}", key, config.get(key).unwrap_or_default());
        }
        ConfigCommands::Show => {
            let config = Config::load();
            let defaults = Config::default();
            let settings: Vec<Setting> = Config::keys()
                .iter()
                .map(|&key| Setting {
                    key,
                    value: config.get(key).unwrap_or_default(),
                    default: config.get(key) == defaults.get(key),
                })
                .collect();

            if format.map(OutputFormat::from) == Some(OutputFormat::Json) {
                println!("{}", format_json(&settings)?);
            } else {
                println!("# {}", path.display());
                let rows: Vec<Vec<String>> = settings
                    .iter()
                    .map(|s| {
                        let value = if s.value.is_empty() { "-".to_string() } else { s.value.clone() };
                        let status = if s.default { "default" } else { "changed" };
                        vec![s.key.to_string(), value, status.to_string()]
                    })
                    .collect();
                println!("{}", format_table(&["key", "value", "status"], &rows));
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("{} exists; pass --force to replace it", path.display());
            }
            Config::default().save()?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
