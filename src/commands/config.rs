use colored::*;
use eyre::Result;

use crate::cli::OutputFormat;
use crate::config::Config;

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "winlogstream configuration".bold());
            println!();

            println!("{}:", "formatting".cyan());
            println!("  format: {}", config.formatting.style);
            println!("  msgout: {}", config.formatting.policy);
            println!("  logname: {}", config.formatting.log_name);
            println!("  usecolor: {}", config.formatting.use_color);
            println!();

            println!("{}:", "logging".cyan());
            println!("  log_level: {}", config.log_level.as_filter());
            println!();

            match &config.source {
                Some(path) => println!("{} Loaded from {}", "✓".green(), path.display()),
                None => println!("{} No config file, using environment and defaults", "→".blue()),
            }
        }
    }

    Ok(())
}
